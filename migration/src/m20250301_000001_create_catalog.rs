use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::Title))
                    .col(string(Movies::Slug))
                    .col(text(Movies::Description))
                    .col(big_integer(Movies::PriceCents))
                    .col(integer(Movies::ReleaseYear))
                    .col(integer(Movies::Duration))
                    .col(double(Movies::Rating))
                    .col(string_null(Movies::PosterUrl))
                    .col(string_null(Movies::TrailerUrl))
                    .col(string(Movies::Status).default("active"))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_slug")
                    .table(Movies::Table)
                    .col(Movies::Slug)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_status_created_at")
                    .table(Movies::Table)
                    .col(Movies::Status)
                    .col(Movies::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_auto(Categories::Id))
                    .col(string_uniq(Categories::Name))
                    .col(text_null(Categories::Description))
                    .col(big_integer(Categories::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieCategories::Table)
                    .if_not_exists()
                    .col(integer(MovieCategories::MovieId))
                    .col(integer(MovieCategories::CategoryId))
                    .primary_key(
                        Index::create()
                            .col(MovieCategories::MovieId)
                            .col(MovieCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_categories_movie")
                            .from(MovieCategories::Table, MovieCategories::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_categories_category")
                            .from(MovieCategories::Table, MovieCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_categories_category")
                    .table(MovieCategories::Table)
                    .col(MovieCategories::CategoryId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieCategories::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Categories::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Movies {
    Table,
    Id,
    Title,
    Slug,
    Description,
    PriceCents,
    ReleaseYear,
    Duration,
    Rating,
    PosterUrl,
    TrailerUrl,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MovieCategories {
    Table,
    MovieId,
    CategoryId,
}
