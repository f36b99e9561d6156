// Library exports for storyfeed
// Integration tests and the binary both build on these modules

pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod mentor;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
