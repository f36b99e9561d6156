use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenIssuer;
use crate::config::Config;
use crate::mentor::MentorProxy;
use crate::store::{PostStore, SqlitePostStore, SqliteUserStore, UserStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<TokenIssuer>,
    pub mentor: Arc<MentorProxy>,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config, tokens: TokenIssuer, mentor: MentorProxy) -> Self {
        Self {
            posts: Arc::new(SqlitePostStore::new(pool.clone())),
            users: Arc::new(SqliteUserStore::new(pool)),
            tokens: Arc::new(tokens),
            mentor: Arc::new(mentor),
            config,
        }
    }

    /// Production wiring: token secret and mentor upstream come from config.
    pub fn from_config(pool: DbPool, config: Config) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::from_config(&config.auth);
        let mentor = MentorProxy::from_config(&config.mentor)?;
        Ok(Self::new(pool, config, tokens, mentor))
    }
}
