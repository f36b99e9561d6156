use chrono::{NaiveDateTime, Utc};

use super::{FeedFilter, FeedPost, FeedTab};
use crate::db::models::ContentKind;

/// `12500` → `12,500`.
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Database timestamps are `YYYY-MM-DD HH:MM:SS` in UTC; anything else is shown raw.
pub fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

/// One post as a plain-text card, without a trailing newline.
pub fn render_post(post: &FeedPost) -> String {
    let mut lines = vec![format!(
        "{} (@{}) · {}",
        post.author.display_name,
        post.author.username,
        parse_and_format_time(&post.created_at)
    )];

    match post.kind {
        ContentKind::Photo => lines.push(format!("[photo] {}", post.content)),
        ContentKind::Video => lines.push(format!("[video] {}", post.content)),
        ContentKind::Text => lines.extend(post.content.lines().map(|l| format!("  {}", l))),
    }

    if !post.caption.is_empty() {
        lines.push(post.caption.clone());
    }
    if !post.tags.is_empty() {
        let tags: Vec<String> = post.tags.iter().map(|t| format!("#{}", t)).collect();
        lines.push(tags.join(" "));
    }
    if let Some(location) = &post.location {
        lines.push(format!("@ {}", location));
    }

    lines.push(format!(
        "♥ {}  💬 {}  ↻ {}  #{}",
        format_count(post.likes),
        format_count(post.comments),
        format_count(post.reposts),
        post.id
    ));
    lines.join("\n")
}

/// Short summary of a filter's criteria, one chip per non-empty criterion.
pub fn filter_chips(filter: &FeedFilter) -> Vec<String> {
    let mut chips = Vec::new();
    if !filter.keywords.is_empty() {
        chips.push(format!("keywords: {}", filter.keywords.join(", ")));
    }
    if !filter.tags.is_empty() {
        chips.push(format!("tags: {}", filter.tags.join(", ")));
    }
    if !filter.locations.is_empty() {
        chips.push(format!("near: {}", filter.locations.join(", ")));
    }
    if filter.post_types.len() < ContentKind::ALL.len() {
        let kinds: Vec<&str> = filter.post_types.iter().map(ContentKind::as_str).collect();
        chips.push(format!("types: {}", kinds.join(", ")));
    }
    if let Some(min) = filter.min_likes {
        chips.push(format!("{}+ likes", format_count(min)));
    }
    chips.push(format!("max {} creators", filter.max_creators));
    chips
}

/// One line per filter for `filters list`.
pub fn render_filter_line(filter: &FeedFilter, active: bool) -> String {
    let marker = if active { "*" } else { " " };
    let origin = if filter.is_default { "built-in" } else { "yours" };
    format!(
        "{} {:<28} {:<10} used {:>6}  {}",
        marker,
        filter.id,
        origin,
        format_count(filter.usage_count as i64),
        filter.name
    )
}

/// The whole feed: a header naming the tab and filter, then cards separated by blank lines.
pub fn render_feed(posts: &[FeedPost], tab: FeedTab, filter: Option<&FeedFilter>) -> String {
    let tab_name = match tab {
        FeedTab::All => "All",
        FeedTab::Photos => "Photos",
        FeedTab::Videos => "Videos",
        FeedTab::Text => "Text",
    };
    let mut lines = vec![format!("── {} · {} posts ──", tab_name, posts.len())];

    if let Some(filter) = filter {
        lines.push(format!("Filter: {}", filter.name));
        lines.push(format!("  {}", filter_chips(filter).join(" | ")));
    }

    if posts.is_empty() {
        lines.push(String::new());
        lines.push("No posts match.".to_string());
    }
    for post in posts {
        lines.push(String::new());
        lines.push(render_post(post));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
