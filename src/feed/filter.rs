use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::ContentKind;

/// Creator bound used when a new filter does not name one.
pub const DEFAULT_MAX_CREATORS: u32 = 20;

/// A named, shareable narrowing of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedFilter {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub creator: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub max_creators: u32,
    pub post_types: Vec<ContentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_likes: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub usage_count: u64,
}

impl FeedFilter {
    pub fn allows(&self, kind: ContentKind) -> bool {
        self.post_types.contains(&kind)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("Filter name is required")]
    EmptyName,

    #[error("A filter must allow at least one post type")]
    NoPostTypes,

    #[error("Max creators must be at least 1")]
    ZeroCreators,
}

/// User input for a new filter, before normalisation.
#[derive(Debug, Clone, Default)]
pub struct NewFilter {
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub tags: Vec<String>,
    pub locations: Vec<String>,
    pub max_creators: Option<u32>,
    /// `None` allows every kind.
    pub post_types: Option<Vec<ContentKind>>,
    pub min_likes: Option<i64>,
    pub is_public: bool,
}

impl NewFilter {
    pub fn build(self) -> Result<FeedFilter, FilterError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FilterError::EmptyName);
        }

        let post_types = match self.post_types {
            None => ContentKind::ALL.to_vec(),
            Some(kinds) => {
                let mut out = Vec::new();
                for kind in kinds {
                    if !out.contains(&kind) {
                        out.push(kind);
                    }
                }
                out
            }
        };
        if post_types.is_empty() {
            return Err(FilterError::NoPostTypes);
        }

        let max_creators = self.max_creators.unwrap_or(DEFAULT_MAX_CREATORS);
        if max_creators < 1 {
            return Err(FilterError::ZeroCreators);
        }

        Ok(FeedFilter {
            id: format!("filter-{}", uuid::Uuid::now_v7()),
            name,
            description: self.description.trim().to_string(),
            creator: "You".to_string(),
            is_default: false,
            is_public: self.is_public,
            keywords: clean_entries(self.keywords),
            tags: clean_entries(self.tags),
            locations: clean_entries(self.locations),
            max_creators,
            post_types,
            min_likes: self.min_likes.filter(|n| *n > 0),
            created_at: Utc::now(),
            usage_count: 0,
        })
    }
}

/// Trim entries, drop blanks and exact duplicates, keep first-seen order.
pub fn clean_entries(entries: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() || out.iter().any(|e| e == entry) {
            continue;
        }
        out.push(entry.to_string());
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn system_filter(
    id: &str,
    name: &str,
    description: &str,
    keywords: &[&str],
    tags: &[&str],
    locations: &[&str],
    max_creators: u32,
    post_types: &[ContentKind],
    min_likes: Option<i64>,
    usage_count: u64,
) -> FeedFilter {
    let owned = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
    FeedFilter {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        creator: "System".to_string(),
        is_default: true,
        is_public: true,
        keywords: owned(keywords),
        tags: owned(tags),
        locations: owned(locations),
        max_creators,
        post_types: post_types.to_vec(),
        min_likes,
        created_at: DateTime::<Utc>::UNIX_EPOCH,
        usage_count,
    }
}

/// Built-in filters offered alongside the user's own.
pub fn default_filters() -> Vec<FeedFilter> {
    use ContentKind::{Photo, Text, Video};

    vec![
        system_filter(
            "trending",
            "🔥 Trending Now",
            "Most popular posts from across the platform",
            &[],
            &["trending", "popular"],
            &[],
            50,
            &[Photo, Video, Text],
            Some(100),
            12_500,
        ),
        system_filter(
            "tech",
            "💻 Tech & Innovation",
            "Latest in tech, startups, and innovation",
            &["tech", "innovation", "startup", "coding"],
            &["technology", "programming", "ai", "gadgets"],
            &["San Francisco", "Silicon Valley", "Remote"],
            30,
            &[Photo, Video, Text],
            None,
            8_400,
        ),
        system_filter(
            "travel",
            "✈️ Travel Adventures",
            "Explore the world through amazing travel content",
            &["travel", "adventure", "explore", "wanderlust"],
            &["travel", "nature", "landscape", "culture"],
            &[],
            40,
            &[Photo, Video],
            None,
            9_200,
        ),
        system_filter(
            "creative",
            "🎨 Creative Minds",
            "Art, design, photography, and creative work",
            &["art", "design", "creative", "photography"],
            &["art", "design", "photography", "creative"],
            &[],
            25,
            &[Photo, Video],
            Some(50),
            6_700,
        ),
        system_filter(
            "business",
            "💼 Business & Finance",
            "Entrepreneurship, finance, and career growth",
            &["business", "finance", "entrepreneur", "career"],
            &["business", "finance", "entrepreneurship"],
            &[],
            35,
            &[Text, Photo],
            None,
            5_800,
        ),
    ]
}
