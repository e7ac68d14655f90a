use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(string(Favorites::UserId))
                    .col(big_integer(Favorites::MovieId))
                    .col(text(Favorites::MovieData))
                    .col(big_integer(Favorites::CreatedAt))
                    .primary_key(Index::create().col(Favorites::UserId).col(Favorites::MovieId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_user_created")
                    .table(Favorites::Table)
                    .col(Favorites::UserId)
                    .col(Favorites::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(string(Ratings::UserId))
                    .col(big_integer(Ratings::MovieId))
                    .col(integer(Ratings::Rating))
                    .col(big_integer(Ratings::UpdatedAt))
                    .primary_key(Index::create().col(Ratings::UserId).col(Ratings::MovieId))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FavoriteGenres::Table)
                    .if_not_exists()
                    .col(string(FavoriteGenres::UserId).primary_key())
                    .col(text(FavoriteGenres::GenreIds))
                    .col(big_integer(FavoriteGenres::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(FavoriteGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Ratings::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Favorites::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Favorites {
    Table,
    UserId,
    MovieId,
    MovieData,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Ratings {
    Table,
    UserId,
    MovieId,
    Rating,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FavoriteGenres {
    Table,
    UserId,
    GenreIds,
    UpdatedAt,
}
