use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait,
    sea_query::{Expr, LikeExpr},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    entities::{category, movie, movie_category, order, order_item, user, watchlist},
    error::AppResult,
    models::{MovieStatus, OrderStatus},
};

/// Lowercase, hyphen-separated form of a title: characters other than ASCII
/// letters, digits and whitespace are dropped and whitespace runs collapse to
/// one hyphen.
pub fn slugify(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_lowercase()
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieSort {
    #[default]
    Newest,
    Rating,
    Title,
    Price,
}

impl MovieSort {
    pub const ALL: [MovieSort; 4] =
        [MovieSort::Newest, MovieSort::Rating, MovieSort::Title, MovieSort::Price];

    pub fn as_code(self) -> &'static str {
        match self {
            MovieSort::Newest => "newest",
            MovieSort::Rating => "rating",
            MovieSort::Title => "title",
            MovieSort::Price => "price",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MovieFilter {
    pub category_id: Option<i32>,
    pub include_inactive: bool,
    pub sort: MovieSort,
    pub limit: Option<u64>,
}

/// Validated movie fields as written by the admin screens.
#[derive(Clone, Debug, PartialEq)]
pub struct MovieInput {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub release_year: i32,
    pub duration: i32,
    pub rating: f64,
    pub trailer_url: Option<String>,
    pub status: MovieStatus,
    /// `None` on update keeps the current poster.
    pub poster_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub price: String,
    pub release_year: i32,
    pub rating: f64,
    pub poster_url: Option<String>,
}

impl From<&movie::Model> for MovieSummary {
    fn from(m: &movie::Model) -> Self {
        Self {
            id: m.id,
            title: m.title.clone(),
            slug: m.slug.clone(),
            price: crate::models::format_cents(m.price_cents),
            release_year: m.release_year,
            rating: m.rating,
            poster_url: m.poster_url.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CategoryCreate {
    Created(i32),
    Duplicate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MovieDelete {
    Deleted,
    InUse { order_items: u64 },
    NotFound,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub movies: u64,
    pub active_movies: u64,
    pub categories: u64,
    pub users: u64,
    pub orders: u64,
    pub revenue_cents: i64,
}

#[derive(Clone, Debug)]
pub struct MovieUsage {
    pub movie: movie::Model,
    pub order_count: i64,
    pub watchlist_count: i64,
}

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_movie(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn find_movie_by_slug(&self, slug: &str) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find()
            .filter(movie::Column::Slug.eq(slug))
            .order_by_asc(movie::Column::Id)
            .one(&self.db)
            .await?)
    }

    pub async fn list_movies(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>> {
        let mut query = movie::Entity::find();

        if !filter.include_inactive {
            query = query.filter(movie::Column::Status.eq(MovieStatus::Active));
        }
        if let Some(category_id) = filter.category_id {
            query = query
                .inner_join(movie_category::Entity)
                .filter(movie_category::Column::CategoryId.eq(category_id));
        }

        query = match filter.sort {
            MovieSort::Newest => query.order_by_desc(movie::Column::CreatedAt),
            MovieSort::Rating => query.order_by_desc(movie::Column::Rating),
            MovieSort::Title => query.order_by_asc(movie::Column::Title),
            MovieSort::Price => query.order_by_asc(movie::Column::PriceCents),
        };
        query = query.order_by_desc(movie::Column::Id);

        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        Ok(query.all(&self.db).await?)
    }

    /// Active movies whose title or description contains `term`.
    pub async fn search(&self, term: &str) -> AppResult<Vec<movie::Model>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(term));
        let contains = |col: movie::Column| {
            Expr::col((movie::Entity, col)).like(LikeExpr::new(pattern.as_str()).escape('\\'))
        };

        let movies = movie::Entity::find()
            .filter(movie::Column::Status.eq(MovieStatus::Active))
            .filter(
                Condition::any()
                    .add(contains(movie::Column::Title))
                    .add(contains(movie::Column::Description)),
            )
            .order_by_desc(movie::Column::Rating)
            .order_by_desc(movie::Column::CreatedAt)
            .all(&self.db)
            .await?;

        debug!(term = %term, results = movies.len(), "catalog search");
        Ok(movies)
    }

    pub async fn categories_for(&self, movie_id: i32) -> AppResult<Vec<category::Model>> {
        Ok(category::Entity::find()
            .inner_join(movie_category::Entity)
            .filter(movie_category::Column::MovieId.eq(movie_id))
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Active movies sharing at least one category with `movie_id`.
    pub async fn related_movies(&self, movie_id: i32, limit: u64) -> AppResult<Vec<movie::Model>> {
        let category_ids: Vec<i32> = movie_category::Entity::find()
            .filter(movie_category::Column::MovieId.eq(movie_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|mc| mc.category_id)
            .collect();

        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(movie::Entity::find()
            .inner_join(movie_category::Entity)
            .filter(movie_category::Column::CategoryId.is_in(category_ids))
            .filter(movie::Column::Id.ne(movie_id))
            .filter(movie::Column::Status.eq(MovieStatus::Active))
            .distinct()
            .order_by_desc(movie::Column::Rating)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn category_ids_for(&self, movie_id: i32) -> AppResult<Vec<i32>> {
        Ok(movie_category::Entity::find()
            .filter(movie_category::Column::MovieId.eq(movie_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|mc| mc.category_id)
            .collect())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<category::Model>> {
        Ok(category::Entity::find().order_by_asc(category::Column::Name).all(&self.db).await?)
    }

    pub async fn find_category(&self, id: i32) -> AppResult<Option<category::Model>> {
        Ok(category::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<CategoryCreate> {
        let model = category::ActiveModel {
            name: Set(name.trim().to_string()),
            description: Set(description.map(str::trim).filter(|d| !d.is_empty()).map(String::from)),
            created_at: Set(now_sec()),
            ..Default::default()
        };

        match category::Entity::insert(model).exec(&self.db).await {
            Ok(res) => {
                info!(category_id = res.last_insert_id, name = %name, "category created");
                Ok(CategoryCreate::Created(res.last_insert_id))
            },
            Err(err) if is_unique_violation(&err) => Ok(CategoryCreate::Duplicate),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn delete_category(&self, id: i32) -> AppResult<bool> {
        let res = category::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn create_movie(&self, input: &MovieInput, category_ids: &[i32]) -> AppResult<i32> {
        let now = now_sec();
        let txn = self.db.begin().await?;

        let model = movie::ActiveModel {
            title: Set(input.title.clone()),
            slug: Set(slugify(&input.title)),
            description: Set(input.description.clone()),
            price_cents: Set(input.price_cents),
            release_year: Set(input.release_year),
            duration: Set(input.duration),
            rating: Set(input.rating),
            poster_url: Set(input.poster_url.clone()),
            trailer_url: Set(input.trailer_url.clone()),
            status: Set(input.status),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let movie_id = movie::Entity::insert(model).exec(&txn).await?.last_insert_id;
        replace_categories(&txn, movie_id, category_ids).await?;

        txn.commit().await?;

        info!(movie_id = movie_id, title = %input.title, "movie created");
        Ok(movie_id)
    }

    /// Returns `false` when the movie does not exist.
    pub async fn update_movie(
        &self,
        id: i32,
        input: &MovieInput,
        category_ids: &[i32],
    ) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        let Some(existing) = movie::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(false);
        };

        let mut model: movie::ActiveModel = existing.into();
        model.title = Set(input.title.clone());
        model.slug = Set(slugify(&input.title));
        model.description = Set(input.description.clone());
        model.price_cents = Set(input.price_cents);
        model.release_year = Set(input.release_year);
        model.duration = Set(input.duration);
        model.rating = Set(input.rating);
        model.trailer_url = Set(input.trailer_url.clone());
        model.status = Set(input.status);
        if let Some(poster) = &input.poster_url {
            model.poster_url = Set(Some(poster.clone()));
        }
        model.updated_at = Set(now_sec());
        model.update(&txn).await?;

        replace_categories(&txn, id, category_ids).await?;
        txn.commit().await?;

        info!(movie_id = id, "movie updated");
        Ok(true)
    }

    /// Movies referenced by past orders are kept so order history stays intact.
    pub async fn delete_movie(&self, id: i32) -> AppResult<MovieDelete> {
        let order_items = order_item::Entity::find()
            .filter(order_item::Column::MovieId.eq(id))
            .count(&self.db)
            .await?;
        if order_items > 0 {
            return Ok(MovieDelete::InUse { order_items });
        }

        let res = movie::Entity::delete_by_id(id).exec(&self.db).await?;
        if res.rows_affected == 0 {
            return Ok(MovieDelete::NotFound);
        }

        info!(movie_id = id, "movie deleted");
        Ok(MovieDelete::Deleted)
    }

    pub async fn toggle_status(&self, id: i32) -> AppResult<Option<MovieStatus>> {
        let Some(existing) = movie::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };

        let status = existing.status.toggled();
        let mut model: movie::ActiveModel = existing.into();
        model.status = Set(status);
        model.updated_at = Set(now_sec());
        model.update(&self.db).await?;

        info!(movie_id = id, status = status.label(), "movie status changed");
        Ok(Some(status))
    }

    pub async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let movies = movie::Entity::find().count(&self.db).await?;
        let active_movies = movie::Entity::find()
            .filter(movie::Column::Status.eq(MovieStatus::Active))
            .count(&self.db)
            .await?;
        let categories = category::Entity::find().count(&self.db).await?;
        let users = user::Entity::find().count(&self.db).await?;
        let orders = order::Entity::find().count(&self.db).await?;

        let revenue_cents = order::Entity::find()
            .select_only()
            .column_as(order::Column::TotalCents.sum(), "revenue")
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?
            .flatten()
            .unwrap_or(0);

        Ok(DashboardStats { movies, active_movies, categories, users, orders, revenue_cents })
    }

    /// Every movie, newest first, with how often it was ordered and bookmarked.
    pub async fn movies_with_usage(&self) -> AppResult<Vec<MovieUsage>> {
        let movies = movie::Entity::find()
            .order_by_desc(movie::Column::CreatedAt)
            .order_by_desc(movie::Column::Id)
            .all(&self.db)
            .await?;

        let order_counts: HashMap<i32, i64> = order_item::Entity::find()
            .select_only()
            .column(order_item::Column::MovieId)
            .column_as(order_item::Column::Id.count(), "n")
            .group_by(order_item::Column::MovieId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        let watchlist_counts: HashMap<i32, i64> = watchlist::Entity::find()
            .select_only()
            .column(watchlist::Column::MovieId)
            .column_as(watchlist::Column::Id.count(), "n")
            .group_by(watchlist::Column::MovieId)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(movies
            .into_iter()
            .map(|movie| MovieUsage {
                order_count: order_counts.get(&movie.id).copied().unwrap_or(0),
                watchlist_count: watchlist_counts.get(&movie.id).copied().unwrap_or(0),
                movie,
            })
            .collect())
    }
}

async fn replace_categories<C: ConnectionTrait>(
    conn: &C,
    movie_id: i32,
    category_ids: &[i32],
) -> Result<(), DbErr> {
    movie_category::Entity::delete_many()
        .filter(movie_category::Column::MovieId.eq(movie_id))
        .exec(conn)
        .await?;

    let mut ids = category_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(());
    }

    let rows = ids.into_iter().map(|category_id| movie_category::ActiveModel {
        movie_id: Set(movie_id),
        category_id: Set(category_id),
    });
    movie_category::Entity::insert_many(rows).exec(conn).await?;
    Ok(())
}

/// Makes `%`, `_` and the escape character itself match literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::connect_in_memory, testing};

    #[test]
    fn slug_from_title() {
        assert_eq!(slugify("The Matrix: Reloaded!"), "the-matrix-reloaded");
        assert_eq!(slugify("  Spider-Man   2 "), "spiderman-2");
        assert_eq!(slugify("Amélie"), "amlie");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn create_movie_derives_slug_and_links_categories() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let CategoryCreate::Created(scifi) = catalog.create_category("Sci-Fi", None).await.unwrap()
        else {
            panic!("category not created");
        };
        let CategoryCreate::Created(action) =
            catalog.create_category("Action", Some("Explosions")).await.unwrap()
        else {
            panic!("category not created");
        };

        let input = testing::movie_input("The Matrix: Reloaded!", 1299);
        let id = catalog.create_movie(&input, &[scifi, action, scifi]).await.unwrap();

        let movie = catalog.find_movie(id).await.unwrap().unwrap();
        assert_eq!(movie.slug, "the-matrix-reloaded");
        assert_eq!(movie.price_cents, 1299);

        let names: Vec<_> =
            catalog.categories_for(id).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Action", "Sci-Fi"]);

        let by_slug = catalog.find_movie_by_slug("the-matrix-reloaded").await.unwrap();
        assert_eq!(by_slug.map(|m| m.id), Some(id));
    }

    #[tokio::test]
    async fn duplicate_category_is_reported_not_raised() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db);
        assert!(matches!(
            catalog.create_category("Drama", None).await.unwrap(),
            CategoryCreate::Created(_)
        ));
        assert_eq!(catalog.create_category("Drama", None).await.unwrap(), CategoryCreate::Duplicate);
        assert_eq!(catalog.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_categories_and_keeps_poster_when_absent() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let CategoryCreate::Created(comedy) = catalog.create_category("Comedy", None).await.unwrap()
        else {
            panic!("category not created");
        };
        let CategoryCreate::Created(horror) = catalog.create_category("Horror", None).await.unwrap()
        else {
            panic!("category not created");
        };

        let mut input = testing::movie_input("Scream", 499);
        input.poster_url = Some("/uploads/scream-1.jpg".into());
        let id = catalog.create_movie(&input, &[comedy]).await.unwrap();

        let mut changed = testing::movie_input("Scream 2", 599);
        changed.poster_url = None;
        assert!(catalog.update_movie(id, &changed, &[horror]).await.unwrap());
        assert!(!catalog.update_movie(id + 100, &changed, &[]).await.unwrap());

        let movie = catalog.find_movie(id).await.unwrap().unwrap();
        assert_eq!(movie.title, "Scream 2");
        assert_eq!(movie.slug, "scream-2");
        assert_eq!(movie.price_cents, 599);
        assert_eq!(movie.poster_url.as_deref(), Some("/uploads/scream-1.jpg"));
        assert_eq!(catalog.category_ids_for(id).await.unwrap(), vec![horror]);
    }

    #[tokio::test]
    async fn listing_hides_inactive_and_filters_by_category() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let CategoryCreate::Created(drama) = catalog.create_category("Drama", None).await.unwrap()
        else {
            panic!("category not created");
        };

        let a = catalog.create_movie(&testing::movie_input("Alpha", 100), &[drama]).await.unwrap();
        let b = catalog.create_movie(&testing::movie_input("Beta", 300), &[]).await.unwrap();
        let mut hidden = testing::movie_input("Gamma", 200);
        hidden.status = MovieStatus::Inactive;
        let c = catalog.create_movie(&hidden, &[drama]).await.unwrap();

        let by_price = catalog
            .list_movies(&MovieFilter { sort: MovieSort::Price, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(by_price.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a, b]);

        let everything = catalog
            .list_movies(&MovieFilter {
                include_inactive: true,
                sort: MovieSort::Title,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(everything.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a, b, c]);

        let in_drama = catalog
            .list_movies(&MovieFilter { category_id: Some(drama), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(in_drama.iter().map(|m| m.id).collect::<Vec<_>>(), vec![a]);
    }

    #[tokio::test]
    async fn search_matches_title_or_description() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let mut input = testing::movie_input("Heat", 399);
        input.description = "A heist thriller in Los Angeles".into();
        let heat = catalog.create_movie(&input, &[]).await.unwrap();
        catalog.create_movie(&testing::movie_input("Up", 299), &[]).await.unwrap();

        let found: Vec<_> =
            catalog.search("heist").await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(found, vec![heat]);
        assert!(catalog.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_wildcards_match_literally() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let percent = catalog.create_movie(&testing::movie_input("100% Wolf", 499), &[]).await.unwrap();
        catalog.create_movie(&testing::movie_input("Alien", 799), &[]).await.unwrap();
        catalog.create_movie(&testing::movie_input("Jaws", 599), &[]).await.unwrap();

        let ids = |movies: Vec<movie::Model>| movies.into_iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(catalog.search("%").await.unwrap()), vec![percent]);
        assert!(catalog.search("_").await.unwrap().is_empty());
        assert!(catalog.search("a_i").await.unwrap().is_empty());
        assert_eq!(escape_like(r"50%_\"), r"50\%\_\\");
    }

    #[tokio::test]
    async fn related_movies_share_a_category() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let CategoryCreate::Created(noir) = catalog.create_category("Noir", None).await.unwrap()
        else {
            panic!("category not created");
        };
        let a = catalog.create_movie(&testing::movie_input("A", 100), &[noir]).await.unwrap();
        let b = catalog.create_movie(&testing::movie_input("B", 100), &[noir]).await.unwrap();
        catalog.create_movie(&testing::movie_input("C", 100), &[]).await.unwrap();

        let related: Vec<_> =
            catalog.related_movies(a, 4).await.unwrap().into_iter().map(|m| m.id).collect();
        assert_eq!(related, vec![b]);
    }

    #[tokio::test]
    async fn delete_is_refused_while_orders_reference_the_movie() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let user_id = testing::user(&db, "buyer").await;
        let sold = testing::movie(&db, "Sold", 999).await;
        let unsold = testing::movie(&db, "Unsold", 999).await;
        testing::order_with_items(&db, user_id, &[(sold, 999)]).await;

        assert_eq!(
            catalog.delete_movie(sold).await.unwrap(),
            MovieDelete::InUse { order_items: 1 }
        );
        assert_eq!(catalog.delete_movie(unsold).await.unwrap(), MovieDelete::Deleted);
        assert_eq!(catalog.delete_movie(unsold).await.unwrap(), MovieDelete::NotFound);
    }

    #[tokio::test]
    async fn toggle_flips_status() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let id = testing::movie(&db, "Flip", 100).await;
        assert_eq!(catalog.toggle_status(id).await.unwrap(), Some(MovieStatus::Inactive));
        assert_eq!(catalog.toggle_status(id).await.unwrap(), Some(MovieStatus::Active));
        assert_eq!(catalog.toggle_status(id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn dashboard_counts_and_usage() {
        let db = connect_in_memory().await;
        let catalog = Catalog::new(db.clone());
        let user_id = testing::user(&db, "viewer").await;
        let a = testing::movie(&db, "A", 1000).await;
        let b = testing::movie(&db, "B", 500).await;
        testing::order_with_items(&db, user_id, &[(a, 1000), (b, 500)]).await;
        crate::watchlist::Watchlist::new(db.clone()).add(user_id, a).await.unwrap();

        let stats = catalog.dashboard_stats().await.unwrap();
        assert_eq!(stats.movies, 2);
        assert_eq!(stats.active_movies, 2);
        assert_eq!(stats.users, 1);
        assert_eq!(stats.orders, 1);
        assert_eq!(stats.revenue_cents, 1500);

        let usage = catalog.movies_with_usage().await.unwrap();
        let a_usage = usage.iter().find(|u| u.movie.id == a).unwrap();
        assert_eq!((a_usage.order_count, a_usage.watchlist_count), (1, 1));
        let b_usage = usage.iter().find(|u| u.movie.id == b).unwrap();
        assert_eq!((b_usage.order_count, b_usage.watchlist_count), (1, 0));
    }
}
