use jiff::Timestamp;
use reqwest::Method;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;

use super::{SupabaseClient, error_message};
use crate::{
    models::{FavoriteGenreSet, FavoriteRecord, Movie, Principal},
    store::{PreferenceStore, StoreError, StoreResult, check_rating},
};

const IGNORE_DUPLICATES: &str = "resolution=ignore-duplicates,return=minimal";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

#[derive(Serialize)]
struct FavoriteRow<'a> {
    user_id: &'a str,
    movie_id: i64,
    movie_data: &'a Movie,
}

#[derive(Deserialize)]
struct RatingRow {
    rating: u8,
}

#[derive(Deserialize)]
struct GenreRow {
    #[serde(default)]
    genre_ids: Vec<i64>,
    updated_at: Option<Timestamp>,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl SupabaseClient {
    fn table(&self, method: Method, table: &str, who: &Principal) -> StoreResult<reqwest::RequestBuilder> {
        if !self.is_configured() {
            return Err(StoreError::NotConfigured);
        }
        Ok(self.request(method, &format!("/rest/v1/{table}"), who.access_token.as_deref()))
    }

    async fn send(req: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(StoreError::Backend(error_message(resp).await))
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        who: &Principal,
        query: &[(&str, String)],
    ) -> StoreResult<Vec<T>> {
        let req = self.table(Method::GET, table, who)?.query(query);
        Ok(Self::send(req).await?.json().await?)
    }
}

#[async_trait::async_trait]
impl PreferenceStore for SupabaseClient {
    async fn add_favorite(&self, who: &Principal, movie: &Movie) -> StoreResult<()> {
        let row = FavoriteRow { user_id: &who.user_id, movie_id: movie.id, movie_data: movie };
        let req = self
            .table(Method::POST, "favorites", who)?
            .query(&[("on_conflict", "user_id,movie_id")])
            .header("Prefer", IGNORE_DUPLICATES)
            .json(&[row]);
        Self::send(req).await?;
        Ok(())
    }

    async fn remove_favorite(&self, who: &Principal, movie_id: i64) -> StoreResult<()> {
        let req = self
            .table(Method::DELETE, "favorites", who)?
            .query(&[("user_id", eq(&who.user_id)), ("movie_id", eq(movie_id))]);
        Self::send(req).await?;
        Ok(())
    }

    async fn list_favorites(&self, who: &Principal) -> StoreResult<Vec<FavoriteRecord>> {
        self.select(
            "favorites",
            who,
            &[("select", "user_id,movie_id,movie_data".to_string()), ("user_id", eq(&who.user_id))],
        )
        .await
    }

    async fn upsert_rating(&self, who: &Principal, movie_id: i64, rating: u8) -> StoreResult<()> {
        let rating = check_rating(rating)?;
        let req = self
            .table(Method::POST, "ratings", who)?
            .query(&[("on_conflict", "user_id,movie_id")])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&json!([{ "user_id": who.user_id, "movie_id": movie_id, "rating": rating }]));
        Self::send(req).await?;
        Ok(())
    }

    async fn get_rating(&self, who: &Principal, movie_id: i64) -> StoreResult<Option<u8>> {
        let rows: Vec<RatingRow> = self
            .select(
                "ratings",
                who,
                &[
                    ("select", "rating".to_string()),
                    ("user_id", eq(&who.user_id)),
                    ("movie_id", eq(movie_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|r| r.rating))
    }

    async fn save_favorite_genres(&self, who: &Principal, genre_ids: &[i64]) -> StoreResult<()> {
        let body = json!([{
            "user_id": who.user_id,
            "genre_ids": genre_ids,
            "updated_at": Timestamp::now(),
        }]);
        let req = self
            .table(Method::POST, "favorite_genres", who)?
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&body);
        Self::send(req).await?;
        Ok(())
    }

    async fn get_favorite_genres(&self, who: &Principal) -> StoreResult<FavoriteGenreSet> {
        let rows: Vec<GenreRow> = self
            .select(
                "favorite_genres",
                who,
                &[("select", "genre_ids,updated_at".to_string()), ("user_id", eq(&who.user_id))],
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| FavoriteGenreSet { genre_ids: r.genre_ids, updated_at: r.updated_at })
            .unwrap_or_default())
    }
}
