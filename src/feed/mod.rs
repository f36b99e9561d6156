//! Client-side feed narrowing: tabs, named filters and the creator cap.

pub mod cache;
pub mod filter;
pub mod render;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::db::models::{AuthorSnapshot, ContentKind, Post};

pub use cache::{CacheError, FilterCache};
pub use filter::{default_filters, FeedFilter, FilterError, NewFilter};

/// The feed tab bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum FeedTab {
    #[default]
    All,
    Photos,
    Videos,
    Text,
}

impl FeedTab {
    fn admits(self, kind: ContentKind) -> bool {
        match self {
            FeedTab::All => true,
            FeedTab::Photos => kind == ContentKind::Photo,
            FeedTab::Videos => kind == ContentKind::Video,
            FeedTab::Text => kind == ContentKind::Text,
        }
    }
}

/// A post as the feed sees it, with tags parsed and location optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: i64,
    pub kind: ContentKind,
    pub author: AuthorSnapshot,
    pub content: String,
    pub caption: String,
    pub likes: i64,
    pub comments: i64,
    pub reposts: i64,
    pub tags: Vec<String>,
    pub location: Option<String>,
    pub created_at: String,
}

impl From<Post> for FeedPost {
    fn from(post: Post) -> Self {
        let location = post.location.trim();
        FeedPost {
            id: post.id,
            kind: post.content_type,
            tags: parse_tags(&post.filter_tags),
            location: (!location.is_empty()).then(|| location.to_string()),
            author: post.author,
            content: post.content,
            caption: post.caption,
            likes: post.likes,
            comments: post.comments,
            reposts: post.reposts,
            created_at: post.created_at,
        }
    }
}

/// Stored tags are a JSON array when the server wrote them, but older rows and
/// hand-entered values may be comma-separated text.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    let tags = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(tags) => tags,
        Err(_) => raw.split(',').map(str::to_string).collect(),
    };
    filter::clean_entries(tags)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Whether a single post passes every criterion of the filter.
/// The creator cap is a property of the whole list and is applied separately.
pub fn matches(post: &FeedPost, filter: &FeedFilter) -> bool {
    if !filter.allows(post.kind) {
        return false;
    }

    if !filter.keywords.is_empty()
        && !filter
            .keywords
            .iter()
            .any(|k| contains_ci(&post.caption, k))
    {
        return false;
    }

    if !filter.tags.is_empty()
        && !post
            .tags
            .iter()
            .any(|t| filter.tags.iter().any(|ft| contains_ci(t, ft)))
    {
        return false;
    }

    // Posts without a location are not judged by the location list.
    if let Some(location) = &post.location {
        if !filter.locations.is_empty()
            && !filter.locations.iter().any(|l| contains_ci(location, l))
        {
            return false;
        }
    }

    if let Some(min) = filter.min_likes {
        if post.likes < min {
            return false;
        }
    }

    true
}

/// Keep only posts from the first `max` distinct authors, in list order.
fn cap_creators(posts: Vec<FeedPost>, max: u32) -> Vec<FeedPost> {
    let max = max as usize;
    let mut allowed: HashSet<&str> = HashSet::new();
    let keep: Vec<bool> = posts
        .iter()
        .map(|p| {
            let name = p.author.username.as_str();
            allowed.contains(name) || (allowed.len() < max && allowed.insert(name))
        })
        .collect();

    posts
        .into_iter()
        .zip(keep)
        .filter_map(|(post, keep)| keep.then_some(post))
        .collect()
}

/// Narrow `posts` by tab, then by the active filter if any.
pub fn apply(posts: &[FeedPost], tab: FeedTab, filter: Option<&FeedFilter>) -> Vec<FeedPost> {
    let by_tab: Vec<FeedPost> = posts
        .iter()
        .filter(|p| tab.admits(p.kind))
        .cloned()
        .collect();

    match filter {
        None => by_tab,
        Some(filter) => {
            let matching = by_tab
                .into_iter()
                .filter(|p| matches(p, filter))
                .collect();
            cap_creators(matching, filter.max_creators)
        }
    }
}
