use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{error::AppResult, models::Genre, tmdb::MetadataSource};

/// The provider's genre list, fetched on first use and kept for the life of
/// the process. A failed fetch is not memoized; the next caller retries.
pub struct GenreCatalog {
    metadata: Arc<dyn MetadataSource>,
    cell: OnceCell<Vec<Genre>>,
}

impl GenreCatalog {
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self { metadata, cell: OnceCell::new() }
    }

    pub async fn all(&self) -> AppResult<&[Genre]> {
        let genres = self
            .cell
            .get_or_try_init(|| async {
                let genres = self.metadata.genres().await?;
                tracing::debug!(count = genres.len(), "genre catalog loaded");
                Ok::<_, crate::error::AppError>(genres)
            })
            .await?;
        Ok(genres)
    }

    /// Resolves ids against the catalog, keeping the caller's order and
    /// dropping ids the catalog does not know.
    pub async fn resolve(&self, ids: &[i64]) -> AppResult<Vec<Genre>> {
        let all = self.all().await?;
        Ok(ids.iter().filter_map(|id| all.iter().find(|g| g.id == *id).cloned()).collect())
    }
}

/// Adds `genre_id` when absent, removes it when present. Order of the
/// remaining ids is kept.
pub fn toggle(ids: &[i64], genre_id: i64) -> Vec<i64> {
    if ids.contains(&genre_id) {
        ids.iter().copied().filter(|id| *id != genre_id).collect()
    } else {
        let mut next = ids.to_vec();
        next.push(genre_id);
        next
    }
}

/// Sorted, de-duplicated copy; stored sets never carry repeats.
pub fn normalize(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
