use sea_orm::entity::prelude::*;

use crate::models::MovieStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub slug: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price_cents: i64,
    pub release_year: i32,
    pub duration: i32,
    pub rating: f64,
    pub poster_url: Option<String>,
    pub trailer_url: Option<String>,
    pub status: MovieStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movie_category::Entity")]
    MovieCategory,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
    #[sea_orm(has_many = "super::watchlist::Entity")]
    Watchlist,
}

impl Related<super::movie_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MovieCategory.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

impl Related<super::watchlist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Watchlist.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::movie_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::movie_category::Relation::Movie.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
