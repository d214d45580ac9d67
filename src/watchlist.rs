use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use crate::{
    catalog::is_unique_violation,
    entities::{movie, watchlist},
    error::AppResult,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchlistAdd {
    Added,
    AlreadyPresent,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WatchlistAction {
    Add,
    Remove,
}

impl WatchlistAction {
    /// Anything other than `remove` counts as an add.
    pub fn from_form(action: Option<&str>) -> Self {
        match action {
            Some("remove") => WatchlistAction::Remove,
            _ => WatchlistAction::Add,
        }
    }
}

#[derive(Clone)]
pub struct Watchlist {
    db: DatabaseConnection,
}

impl Watchlist {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add(&self, user_id: i32, movie_id: i32) -> AppResult<WatchlistAdd> {
        let model = watchlist::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            created_at: Set(jiff::Timestamp::now().as_second()),
            ..Default::default()
        };

        match watchlist::Entity::insert(model).exec(&self.db).await {
            Ok(_) => {
                debug!(user_id = user_id, movie_id = movie_id, "added to watchlist");
                Ok(WatchlistAdd::Added)
            },
            Err(err) if is_unique_violation(&err) => Ok(WatchlistAdd::AlreadyPresent),
            Err(err) => Err(err.into()),
        }
    }

    /// Removing an entry that is not there is not an error.
    pub async fn remove(&self, user_id: i32, movie_id: i32) -> AppResult<()> {
        let res = watchlist::Entity::delete_many()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::MovieId.eq(movie_id))
            .exec(&self.db)
            .await?;
        debug!(user_id = user_id, movie_id = movie_id, removed = res.rows_affected, "watchlist remove");
        Ok(())
    }

    pub async fn contains(&self, user_id: i32, movie_id: i32) -> AppResult<bool> {
        let n = watchlist::Entity::find()
            .filter(watchlist::Column::UserId.eq(user_id))
            .filter(watchlist::Column::MovieId.eq(movie_id))
            .count(&self.db)
            .await?;
        Ok(n > 0)
    }

    /// The user's bookmarked movies, most recently added first.
    pub async fn list(&self, user_id: i32) -> AppResult<Vec<(movie::Model, i64)>> {
        let rows = watchlist::Entity::find()
            .find_also_related(movie::Entity)
            .filter(watchlist::Column::UserId.eq(user_id))
            .order_by_desc(watchlist::Column::CreatedAt)
            .order_by_desc(watchlist::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(entry, movie)| movie.map(|m| (m, entry.created_at)))
            .collect())
    }
}
