use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{error::AppError, models::MovieDetails, tmdb::MetadataSource};

#[derive(Debug)]
pub enum SelectOutcome {
    Loaded(Box<MovieDetails>),
    Failed(AppError),
    /// A later `select` or a `close` superseded this one; nothing was applied.
    Stale,
}

/// The movie currently open in the detail modal.
///
/// Each `select` and `close` bumps a generation counter. A details response
/// is applied only if its generation is still current when it arrives.
/// While a `select` is pending the browser shows the placeholder fragment
/// from `templates::modal_loading`; that fragment is the loading state, so
/// none is kept here.
pub struct MovieSelection {
    metadata: Arc<dyn MetadataSource>,
    generation: AtomicU64,
    movie: RwLock<Option<MovieDetails>>,
}

impl MovieSelection {
    pub fn new(metadata: Arc<dyn MetadataSource>) -> Self {
        Self { metadata, generation: AtomicU64::new(0), movie: RwLock::new(None) }
    }

    pub async fn select(&self, movie_id: i64) -> SelectOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.metadata.movie_details(movie_id).await;

        let mut movie = self.movie.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(movie_id, generation, "discarding stale movie details");
            return SelectOutcome::Stale;
        }

        match result {
            Ok(details) => {
                *movie = Some(details.clone());
                SelectOutcome::Loaded(Box::new(details))
            },
            Err(err) => {
                warn!(movie_id, error = %err, "failed to load movie details");
                SelectOutcome::Failed(err)
            },
        }
    }

    pub async fn close(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.movie.write().await = None;
    }

    /// The selected movie if it is `movie_id`.
    pub async fn current(&self, movie_id: i64) -> Option<MovieDetails> {
        self.movie.read().await.clone().filter(|m| m.movie.id == movie_id)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::AppResult,
        models::{Genre, Movie, Paged, TimeWindow},
        tmdb::ProviderRegions,
    };

    /// Details for id N arrive after N * 20ms; id 0 always fails.
    struct SlowDetails;

    #[async_trait::async_trait]
    impl MetadataSource for SlowDetails {
        async fn popular(&self, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn trending(&self, _: TimeWindow, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn search(&self, _: &str, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn discover_by_genre(&self, _: i64, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn discover_by_year(&self, _: i16, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn top_rated(&self, _: u32) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn movie_details(&self, movie_id: i64) -> AppResult<MovieDetails> {
            if movie_id == 0 {
                return Err(anyhow::anyhow!("404").into());
            }
            tokio::time::sleep(Duration::from_millis(movie_id as u64 * 20)).await;
            Ok(serde_json::from_value(serde_json::json!({ "id": movie_id, "title": format!("#{movie_id}") }))
                .unwrap())
        }
        async fn similar(&self, _: i64) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn recommendations(&self, _: i64) -> AppResult<Paged<Movie>> {
            Ok(Paged::empty())
        }
        async fn genres(&self) -> AppResult<Vec<Genre>> {
            Ok(Vec::new())
        }
        async fn watch_providers(&self, _: i64) -> AppResult<ProviderRegions> {
            Ok(ProviderRegions::default())
        }
    }

    fn selection() -> Arc<MovieSelection> {
        Arc::new(MovieSelection::new(Arc::new(SlowDetails)))
    }

    #[tokio::test]
    async fn select_loads_details() {
        let sel = selection();
        assert!(matches!(sel.select(1).await, SelectOutcome::Loaded(d) if d.movie.id == 1));
        assert_eq!(sel.current(1).await.unwrap().movie.title, "#1");
        assert!(sel.current(2).await.is_none());
    }

    #[tokio::test]
    async fn later_selection_wins_over_slow_earlier_one() {
        let sel = selection();
        let slow = tokio::spawn({
            let sel = sel.clone();
            async move { sel.select(5).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(sel.select(1).await, SelectOutcome::Loaded(_)));
        assert!(matches!(slow.await.unwrap(), SelectOutcome::Stale));
        assert!(sel.current(1).await.is_some());
        assert!(sel.current(5).await.is_none());
    }

    #[tokio::test]
    async fn close_discards_in_flight_response() {
        let sel = selection();
        let pending = tokio::spawn({
            let sel = sel.clone();
            async move { sel.select(3).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        sel.close().await;
        assert!(matches!(pending.await.unwrap(), SelectOutcome::Stale));
        assert!(sel.current(3).await.is_none());
    }

    #[tokio::test]
    async fn failure_keeps_previous_selection() {
        let sel = selection();
        sel.select(1).await;
        assert!(matches!(sel.select(0).await, SelectOutcome::Failed(_)));
        assert!(sel.current(1).await.is_some());
    }
}
