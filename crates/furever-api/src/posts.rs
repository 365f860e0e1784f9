use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use furever_db::Database;
use furever_types::models::{FeedPost, UserPost};

use crate::error::ApiError;

/// Returns the new post's id, or `None` when the author does not exist.
pub fn create_post(
    db: &Database,
    username: &str,
    content: &str,
    date_posted: Option<DateTime<Utc>>,
) -> Result<Option<Uuid>, ApiError> {
    let id = Uuid::new_v4();
    let date_posted = date_posted.unwrap_or_else(Utc::now);

    if !db.insert_post(&id.to_string(), username, content, date_posted)? {
        warn!("Post rejected, user '{}' does not exist", username);
        return Ok(None);
    }

    info!("Post {} created by {}", id, username);
    Ok(Some(id))
}

pub fn fetch_all_posts(db: &Database) -> Result<Vec<FeedPost>, ApiError> {
    Ok(db.get_feed_posts()?)
}

pub fn fetch_user_posts(db: &Database, username: &str) -> Result<Vec<UserPost>, ApiError> {
    Ok(db.get_posts_by_username(username)?)
}
