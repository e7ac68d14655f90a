use std::{
    collections::HashSet,
    sync::{Mutex, PoisonError},
};

use tracing::info;

use crate::{
    models::{FavoriteRecord, Movie, Principal},
    store::{PreferenceStore, StoreResult},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ToggleOutcome {
    Favorited,
    Unfavorited,
    /// Another toggle for the same movie is still running; nothing written.
    Busy,
}

/// Movies with a toggle in progress for one session.
#[derive(Debug, Default)]
pub struct InFlight {
    movies: Mutex<HashSet<i64>>,
}

impl InFlight {
    pub fn try_begin(&self, movie_id: i64) -> Option<InFlightGuard<'_>> {
        let mut movies = self.movies.lock().unwrap_or_else(PoisonError::into_inner);
        movies.insert(movie_id).then_some(InFlightGuard { owner: self, movie_id })
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.movies.lock().unwrap_or_else(PoisonError::into_inner).contains(&movie_id)
    }
}

pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    movie_id: i64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.movies.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.movie_id);
    }
}

/// A user's favorites as the store reports them. Views derive "is this a
/// favorite" from here rather than tracking it themselves.
#[derive(Clone, Debug, Default)]
pub struct FavoriteList {
    records: Vec<FavoriteRecord>,
}

impl FavoriteList {
    pub async fn load(store: &dyn PreferenceStore, who: &Principal) -> StoreResult<Self> {
        Ok(Self { records: store.list_favorites(who).await? })
    }

    pub fn contains(&self, movie_id: i64) -> bool {
        self.records.iter().any(|r| r.movie_id == movie_id)
    }

    pub fn movie_ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.movie_id).collect()
    }

    pub fn movies(&self) -> impl Iterator<Item = &Movie> {
        self.records.iter().map(|r| &r.movie)
    }
}

/// Reads the authoritative list, then issues exactly one write: remove if
/// the movie is a favorite, add with `movie` as the snapshot otherwise.
pub async fn toggle_favorite(
    store: &dyn PreferenceStore,
    in_flight: &InFlight,
    who: &Principal,
    movie: &Movie,
) -> StoreResult<ToggleOutcome> {
    let Some(_guard) = in_flight.try_begin(movie.id) else {
        return Ok(ToggleOutcome::Busy);
    };

    let current = FavoriteList::load(store, who).await?;
    if current.contains(movie.id) {
        store.remove_favorite(who, movie.id).await?;
        info!(user_id = %who.user_id, movie_id = movie.id, "favorite removed");
        Ok(ToggleOutcome::Unfavorited)
    } else {
        store.add_favorite(who, movie).await?;
        info!(user_id = %who.user_id, movie_id = movie.id, "favorite added");
        Ok(ToggleOutcome::Favorited)
    }
}
