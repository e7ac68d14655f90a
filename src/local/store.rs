use jiff::Timestamp;
use sea_orm::{
    ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, sea_query::OnConflict,
};

use super::{LocalBackend, now_sec};
use crate::{
    entities::{favorite_genres, favorites, ratings},
    models::{FavoriteGenreSet, FavoriteRecord, Movie, Principal},
    store::{PreferenceStore, StoreResult, check_rating},
};

#[async_trait::async_trait]
impl PreferenceStore for LocalBackend {
    async fn add_favorite(&self, who: &Principal, movie: &Movie) -> StoreResult<()> {
        let model = favorites::ActiveModel {
            user_id: Set(who.user_id.clone()),
            movie_id: Set(movie.id),
            movie_data: Set(serde_json::to_string(movie)?),
            created_at: Set(now_sec()),
        };

        let inserted = favorites::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([favorites::Column::UserId, favorites::Column::MovieId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            tracing::debug!(user_id = %who.user_id, movie_id = movie.id, "favorite already present");
        }
        Ok(())
    }

    async fn remove_favorite(&self, who: &Principal, movie_id: i64) -> StoreResult<()> {
        let res = favorites::Entity::delete_many()
            .filter(favorites::Column::UserId.eq(who.user_id.as_str()))
            .filter(favorites::Column::MovieId.eq(movie_id))
            .exec(&self.db)
            .await?;
        tracing::debug!(user_id = %who.user_id, movie_id, removed = res.rows_affected, "favorite removed");
        Ok(())
    }

    async fn list_favorites(&self, who: &Principal) -> StoreResult<Vec<FavoriteRecord>> {
        let rows = favorites::Entity::find()
            .filter(favorites::Column::UserId.eq(who.user_id.as_str()))
            .order_by_desc(favorites::Column::CreatedAt)
            .order_by_desc(favorites::Column::MovieId)
            .all(&self.db)
            .await?;

        rows.into_iter()
            .map(|row| -> StoreResult<FavoriteRecord> {
                Ok(FavoriteRecord {
                    movie: serde_json::from_str(&row.movie_data)?,
                    user_id: row.user_id,
                    movie_id: row.movie_id,
                })
            })
            .collect()
    }

    async fn upsert_rating(&self, who: &Principal, movie_id: i64, rating: u8) -> StoreResult<()> {
        let rating = check_rating(rating)?;
        let model = ratings::ActiveModel {
            user_id: Set(who.user_id.clone()),
            movie_id: Set(movie_id),
            rating: Set(i32::from(rating)),
            updated_at: Set(now_sec()),
        };

        ratings::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([ratings::Column::UserId, ratings::Column::MovieId])
                    .update_columns([ratings::Column::Rating, ratings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn get_rating(&self, who: &Principal, movie_id: i64) -> StoreResult<Option<u8>> {
        let row = ratings::Entity::find_by_id((who.user_id.clone(), movie_id)).one(&self.db).await?;
        Ok(row.and_then(|r| u8::try_from(r.rating).ok()))
    }

    async fn save_favorite_genres(&self, who: &Principal, genre_ids: &[i64]) -> StoreResult<()> {
        let model = favorite_genres::ActiveModel {
            user_id: Set(who.user_id.clone()),
            genre_ids: Set(serde_json::to_string(genre_ids)?),
            updated_at: Set(now_sec()),
        };

        favorite_genres::Entity::insert(model)
            .on_conflict(
                OnConflict::column(favorite_genres::Column::UserId)
                    .update_columns([
                        favorite_genres::Column::GenreIds,
                        favorite_genres::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn get_favorite_genres(&self, who: &Principal) -> StoreResult<FavoriteGenreSet> {
        let Some(row) =
            favorite_genres::Entity::find_by_id(who.user_id.clone()).one(&self.db).await?
        else {
            return Ok(FavoriteGenreSet::default());
        };

        Ok(FavoriteGenreSet {
            genre_ids: serde_json::from_str(&row.genre_ids)?,
            updated_at: Timestamp::from_second(row.updated_at).ok(),
        })
    }
}
