use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{AuthorSnapshot, NewPost, Post, PostChanges};
use crate::state::DbPool;
use crate::store::{PostStore, StoreError};

const POST_COLUMNS: &str = "id, user_id, username, display_name, avatar_url, content_type, \
     content, caption, likes, comments, reposts, filter_tags, location, created_at, updated_at";

pub struct SqlitePostStore {
    pool: DbPool,
}

impl SqlitePostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        user_id: row.get(1)?,
        author: AuthorSnapshot {
            username: row.get(2)?,
            display_name: row.get(3)?,
            avatar_url: row.get(4)?,
        },
        content_type: row.get(5)?,
        content: row.get(6)?,
        caption: row.get(7)?,
        likes: row.get(8)?,
        comments: row.get(9)?,
        reposts: row.get(10)?,
        filter_tags: row.get(11)?,
        location: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn fetch(conn: &Connection, id: i64) -> Result<Option<Post>, StoreError> {
    let post = conn
        .query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![id],
            post_from_row,
        )
        .optional()?;
    Ok(post)
}

/// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO posts (user_id, username, display_name, avatar_url, content_type,
                                content, caption, filter_tags, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                post.user_id,
                post.author.username,
                post.author.display_name,
                post.author.avatar_url,
                post.content_type,
                post.content,
                post.caption,
                post.filter_tags,
                post.location,
            ],
        )?;
        let id = conn.last_insert_rowid();

        // Separate round trip: a delete racing in between surfaces as a missing row.
        fetch(&conn, id)?.ok_or(StoreError::Sql(rusqlite::Error::QueryReturnedNoRows))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;
        fetch(&conn, id)
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC, id DESC LIMIT ?1",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![sql_limit(limit)], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn list_by_user(
        &self,
        user_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![user_id, sql_limit(limit)], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn update(&self, id: i64, changes: PostChanges) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;

        let rows = conn.execute(
            "UPDATE posts SET
                caption = COALESCE(?1, caption),
                likes = COALESCE(?2, likes),
                comments = COALESCE(?3, comments),
                reposts = COALESCE(?4, reposts),
                filter_tags = COALESCE(?5, filter_tags),
                location = COALESCE(?6, location),
                updated_at = CURRENT_TIMESTAMP
             WHERE id = ?7",
            params![
                changes.caption,
                changes.likes,
                changes.comments,
                changes.reposts,
                changes.filter_tags,
                changes.location,
                id,
            ],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        fetch(&conn, id)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn adjust_likes(&self, id: i64, increment: bool) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;
        let change: i64 = if increment { 1 } else { -1 };

        let rows = conn.execute(
            "UPDATE posts SET likes = likes + ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![change, id],
        )?;

        if rows == 0 {
            return Ok(None);
        }
        fetch(&conn, id)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let conn = self.pool.get()?;
        let n = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, models::ContentKind};

    fn store() -> SqlitePostStore {
        let pool = db::create_memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        SqlitePostStore::new(pool)
    }

    fn new_post(user_id: i64, username: &str, kind: ContentKind, caption: &str) -> NewPost {
        NewPost {
            user_id,
            author: AuthorSnapshot {
                username: username.to_string(),
                display_name: username.to_uppercase(),
                avatar_url: format!("https://example.com/{}.jpg", username),
            },
            content_type: kind,
            content: "hi".to_string(),
            caption: caption.to_string(),
            filter_tags: String::new(),
            location: String::new(),
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_zero_counters() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Text, "hello"))
            .await
            .unwrap();

        assert!(post.id > 0);
        assert_eq!((post.likes, post.comments, post.reposts), (0, 0, 0));
        assert_eq!(post.content_type, ContentKind::Text);
        assert_eq!(post.author.display_name, "ALEX");
        assert!(!post.created_at.is_empty());
        assert_eq!(post.created_at, post.updated_at);
    }

    #[tokio::test]
    async fn find_by_id_returns_none_for_missing() {
        let store = store();
        assert!(store.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first_and_respects_limit() {
        let store = store();
        for caption in ["first", "second", "third"] {
            store
                .create(new_post(1, "alex", ContentKind::Text, caption))
                .await
                .unwrap();
        }

        let all = store.list(None).await.unwrap();
        let captions: Vec<_> = all.iter().map(|p| p.caption.as_str()).collect();
        assert_eq!(captions, vec!["third", "second", "first"]);

        let limited = store.list(Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].caption, "third");
    }

    #[tokio::test]
    async fn list_by_user_filters_owner() {
        let store = store();
        store
            .create(new_post(1, "alex", ContentKind::Text, "a"))
            .await
            .unwrap();
        store
            .create(new_post(2, "maya", ContentKind::Photo, "b"))
            .await
            .unwrap();
        store
            .create(new_post(1, "alex", ContentKind::Video, "c"))
            .await
            .unwrap();

        let alex = store.list_by_user(1, None).await.unwrap();
        assert_eq!(alex.len(), 2);
        assert!(alex.iter().all(|p| p.user_id == 1));
        assert!(store.list_by_user(3, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Text, "before"))
            .await
            .unwrap();

        let updated = store
            .update(
                post.id,
                PostChanges {
                    caption: Some("after".into()),
                    likes: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.caption, "after");
        assert_eq!(updated.likes, 5);
        assert_eq!(updated.content, "hi");
        assert_eq!(updated.comments, 0);
    }

    #[tokio::test]
    async fn empty_update_keeps_record() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Text, "same"))
            .await
            .unwrap();
        let updated = store
            .update(post.id, PostChanges::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.caption, "same");
    }

    #[tokio::test]
    async fn update_missing_returns_none() {
        let store = store();
        let result = store.update(42, PostChanges::default()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Text, "bye"))
            .await
            .unwrap();

        assert!(store.delete(post.id).await.unwrap());
        assert!(!store.delete(post.id).await.unwrap());
        assert!(store.find_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adjust_likes_moves_by_one_per_call() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Photo, "likes"))
            .await
            .unwrap();
        store
            .update(
                post.id,
                PostChanges {
                    likes: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        store.adjust_likes(post.id, true).await.unwrap();
        let post = store.adjust_likes(post.id, true).await.unwrap().unwrap();
        assert_eq!(post.likes, 7);

        let post = store.adjust_likes(post.id, false).await.unwrap().unwrap();
        assert_eq!(post.likes, 6);
    }

    #[tokio::test]
    async fn adjust_likes_can_go_negative() {
        let store = store();
        let post = store
            .create(new_post(1, "alex", ContentKind::Text, "unloved"))
            .await
            .unwrap();
        let post = store.adjust_likes(post.id, false).await.unwrap().unwrap();
        assert_eq!(post.likes, -1);
    }

    #[tokio::test]
    async fn adjust_likes_on_missing_post_is_none() {
        let store = store();
        assert!(store.adjust_likes(5, true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn count_tracks_rows() {
        let store = store();
        assert_eq!(store.count().await.unwrap(), 0);
        store
            .create(new_post(1, "alex", ContentKind::Text, "one"))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
