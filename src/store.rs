use crate::models::{FavoriteGenreSet, FavoriteRecord, Movie, Principal};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("preference backend is not configured")]
    NotConfigured,

    #[error("preference backend rejected the request: {0}")]
    Backend(String),

    #[error("preference backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("malformed stored data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rating must be between {min} and {max}, got {0}", min = RATING_MIN, max = RATING_MAX)]
    InvalidRating(u8),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 10;

pub fn check_rating(rating: u8) -> StoreResult<u8> {
    if (RATING_MIN..=RATING_MAX).contains(&rating) {
        Ok(rating)
    } else {
        Err(StoreError::InvalidRating(rating))
    }
}

/// Per-user favorites, ratings and favorite genres.
///
/// Reads of rows that do not exist return empty values. Writes are single
/// round trips; nothing here spans more than one call.
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Inserts the (user, movie) pair with a snapshot of the movie. A second
    /// add for the same pair leaves the first record in place.
    async fn add_favorite(&self, who: &Principal, movie: &Movie) -> StoreResult<()>;

    /// Succeeds whether or not the pair existed.
    async fn remove_favorite(&self, who: &Principal, movie_id: i64) -> StoreResult<()>;

    /// Ordering is left to the backend.
    async fn list_favorites(&self, who: &Principal) -> StoreResult<Vec<FavoriteRecord>>;

    async fn upsert_rating(&self, who: &Principal, movie_id: i64, rating: u8) -> StoreResult<()>;

    async fn get_rating(&self, who: &Principal, movie_id: i64) -> StoreResult<Option<u8>>;

    /// Replaces the whole set.
    async fn save_favorite_genres(&self, who: &Principal, genre_ids: &[i64]) -> StoreResult<()>;

    async fn get_favorite_genres(&self, who: &Principal) -> StoreResult<FavoriteGenreSet>;
}
