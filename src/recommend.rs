use rand::{Rng, seq::IndexedRandom};
use tracing::debug;

use crate::{
    error::AppResult,
    models::{Movie, Principal},
    store::PreferenceStore,
    tmdb::MetadataSource,
};

/// How many recommendations the home widget shows before linking out.
pub const WIDGET_SIZE: usize = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strategy {
    SimilarTo(i64),
    Genre(i64),
    Popular,
}

impl Strategy {
    /// Favorite movies win over favorite genres; with neither, popular.
    pub fn pick<R: Rng + ?Sized>(favorite_movies: &[i64], favorite_genres: &[i64], rng: &mut R) -> Self {
        if let Some(id) = favorite_movies.choose(rng) {
            Strategy::SimilarTo(*id)
        } else if let Some(id) = favorite_genres.choose(rng) {
            Strategy::Genre(*id)
        } else {
            Strategy::Popular
        }
    }
}

pub async fn recommend(metadata: &dyn MetadataSource, strategy: Strategy) -> AppResult<Vec<Movie>> {
    debug!(?strategy, "resolving recommendations");
    let page = match strategy {
        Strategy::SimilarTo(movie_id) => metadata.recommendations(movie_id).await?,
        Strategy::Genre(genre_id) => metadata.discover_by_genre(genre_id, 1).await?,
        Strategy::Popular => metadata.popular(1).await?,
    };
    Ok(page.results)
}

#[derive(Clone, Debug)]
pub struct Recommendations {
    pub strategy: Strategy,
    pub movies: Vec<Movie>,
}

/// Recommendations for a signed-in user with at least one favorite movie or
/// genre. `None` for anonymous users and users with no preferences, which
/// hides the widget. Each call picks afresh.
pub async fn for_user(
    metadata: &dyn MetadataSource,
    store: &dyn PreferenceStore,
    who: Option<&Principal>,
) -> AppResult<Option<Recommendations>> {
    let Some(who) = who else {
        return Ok(None);
    };

    let (favorites, genres) =
        futures::try_join!(store.list_favorites(who), store.get_favorite_genres(who))?;
    let favorite_ids: Vec<i64> = favorites.iter().map(|f| f.movie_id).collect();

    if favorite_ids.is_empty() && genres.genre_ids.is_empty() {
        return Ok(None);
    }

    let strategy = Strategy::pick(&favorite_ids, &genres.genre_ids, &mut rand::rng());
    let movies = recommend(metadata, strategy).await?;
    Ok(Some(Recommendations { strategy, movies }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        models::{FavoriteGenreSet, FavoriteRecord, Genre, MovieDetails, Paged, TimeWindow},
        store::StoreResult,
        tmdb::ProviderRegions,
    };

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn log(&self, call: String) -> AppResult<Paged<Movie>> {
            self.calls.lock().unwrap().push(call);
            let movie = serde_json::from_value(serde_json::json!({ "id": 1, "title": "x" })).unwrap();
            Ok(Paged { results: vec![movie], total_pages: Some(1) })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl MetadataSource for Recorder {
        async fn popular(&self, page: u32) -> AppResult<Paged<Movie>> {
            self.log(format!("popular:{page}"))
        }
        async fn trending(&self, _: TimeWindow, _: u32) -> AppResult<Paged<Movie>> {
            self.log("trending".into())
        }
        async fn search(&self, _: &str, _: u32) -> AppResult<Paged<Movie>> {
            self.log("search".into())
        }
        async fn discover_by_genre(&self, genre_id: i64, page: u32) -> AppResult<Paged<Movie>> {
            self.log(format!("genre:{genre_id}:{page}"))
        }
        async fn discover_by_year(&self, _: i16, _: u32) -> AppResult<Paged<Movie>> {
            self.log("year".into())
        }
        async fn top_rated(&self, _: u32) -> AppResult<Paged<Movie>> {
            self.log("top_rated".into())
        }
        async fn movie_details(&self, _: i64) -> AppResult<MovieDetails> {
            Err(anyhow::anyhow!("unused").into())
        }
        async fn similar(&self, movie_id: i64) -> AppResult<Paged<Movie>> {
            self.log(format!("similar:{movie_id}"))
        }
        async fn recommendations(&self, movie_id: i64) -> AppResult<Paged<Movie>> {
            self.log(format!("recommendations:{movie_id}"))
        }
        async fn genres(&self) -> AppResult<Vec<Genre>> {
            Ok(Vec::new())
        }
        async fn watch_providers(&self, _: i64) -> AppResult<ProviderRegions> {
            Ok(ProviderRegions::default())
        }
    }

    struct Prefs {
        favorites: Vec<i64>,
        genres: Vec<i64>,
    }

    #[async_trait::async_trait]
    impl PreferenceStore for Prefs {
        async fn add_favorite(&self, _: &Principal, _: &Movie) -> StoreResult<()> {
            Ok(())
        }
        async fn remove_favorite(&self, _: &Principal, _: i64) -> StoreResult<()> {
            Ok(())
        }
        async fn list_favorites(&self, who: &Principal) -> StoreResult<Vec<FavoriteRecord>> {
            Ok(self
                .favorites
                .iter()
                .map(|id| FavoriteRecord {
                    user_id: who.user_id.clone(),
                    movie_id: *id,
                    movie: serde_json::from_value(serde_json::json!({ "id": id })).unwrap(),
                })
                .collect())
        }
        async fn upsert_rating(&self, _: &Principal, _: i64, _: u8) -> StoreResult<()> {
            Ok(())
        }
        async fn get_rating(&self, _: &Principal, _: i64) -> StoreResult<Option<u8>> {
            Ok(None)
        }
        async fn save_favorite_genres(&self, _: &Principal, _: &[i64]) -> StoreResult<()> {
            Ok(())
        }
        async fn get_favorite_genres(&self, _: &Principal) -> StoreResult<FavoriteGenreSet> {
            Ok(FavoriteGenreSet { genre_ids: self.genres.clone(), updated_at: None })
        }
    }

    #[test]
    fn precedence_is_movies_then_genres_then_popular() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert!(matches!(
                Strategy::pick(&[550, 27205], &[28], &mut rng),
                Strategy::SimilarTo(550 | 27205)
            ));
            assert!(matches!(Strategy::pick(&[], &[28, 12], &mut rng), Strategy::Genre(28 | 12)));
            assert_eq!(Strategy::pick(&[], &[], &mut rng), Strategy::Popular);
        }
    }

    #[test]
    fn genre_pick_covers_every_favorite() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            if let Strategy::Genre(id) = Strategy::pick(&[], &[28, 12], &mut rng) {
                seen.insert(id);
            }
        }
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn genres_only_user_gets_one_discover_call_on_page_one() {
        let metadata = Recorder::default();
        let store = Prefs { favorites: vec![], genres: vec![28, 12] };
        let who = Principal::new("u1");

        let recs = for_user(&metadata, &store, Some(&who)).await.unwrap().unwrap();
        assert!(matches!(recs.strategy, Strategy::Genre(28 | 12)));

        let calls = metadata.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0] == "genre:28:1" || calls[0] == "genre:12:1", "{calls:?}");
    }

    #[tokio::test]
    async fn favorite_movies_take_precedence() {
        let metadata = Recorder::default();
        let store = Prefs { favorites: vec![550], genres: vec![28] };
        let recs = for_user(&metadata, &store, Some(&Principal::new("u1"))).await.unwrap().unwrap();
        assert_eq!(recs.strategy, Strategy::SimilarTo(550));
        assert_eq!(metadata.calls(), vec!["recommendations:550"]);
    }

    #[tokio::test]
    async fn anonymous_or_empty_users_get_nothing() {
        let metadata = Recorder::default();
        let store = Prefs { favorites: vec![], genres: vec![] };
        assert!(for_user(&metadata, &store, None).await.unwrap().is_none());
        assert!(for_user(&metadata, &store, Some(&Principal::new("u1"))).await.unwrap().is_none());
        assert!(metadata.calls().is_empty());

        let movies = recommend(&metadata, Strategy::Popular).await.unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(metadata.calls(), vec!["popular:1"]);
    }
}
