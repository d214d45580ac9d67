//! Fixtures shared by the database-backed unit tests.

use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::{
    catalog::{Catalog, MovieInput},
    entities::{order, order_history, order_item, user},
    models::{MovieStatus, OrderStatus, PaymentStatus, Role},
};

pub fn movie_input(title: &str, price_cents: i64) -> MovieInput {
    MovieInput {
        title: title.to_string(),
        description: format!("{title} description"),
        price_cents,
        release_year: 2001,
        duration: 120,
        rating: 7.5,
        trailer_url: None,
        status: MovieStatus::Active,
        poster_url: None,
    }
}

pub async fn movie(db: &DatabaseConnection, title: &str, price_cents: i64) -> i32 {
    Catalog::new(db.clone()).create_movie(&movie_input(title, price_cents), &[]).await.unwrap()
}

/// A plain user row. The password hash is not a real hash.
pub async fn user(db: &DatabaseConnection, username: &str) -> i32 {
    let now = jiff::Timestamp::now().as_second();
    let model = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("x".to_string()),
        role: Set(Role::User),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    user::Entity::insert(model).exec(db).await.unwrap().last_insert_id
}

/// A completed order whose total is the sum of `items` prices, tax free.
pub async fn order_with_items(db: &DatabaseConnection, user_id: i32, items: &[(i32, i64)]) -> i32 {
    let now = jiff::Timestamp::now().as_second();
    let total: i64 = items.iter().map(|(_, price)| price).sum();

    let order_id = order::Entity::insert(order::ActiveModel {
        user_id: Set(user_id),
        subtotal_cents: Set(total),
        tax_cents: Set(0),
        total_cents: Set(total),
        status: Set(OrderStatus::Completed),
        payment_method: Set("credit_card".to_string()),
        payment_status: Set(PaymentStatus::Completed),
        payment_reference: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .exec(db)
    .await
    .unwrap()
    .last_insert_id;

    for &(movie_id, price_cents) in items {
        order_item::Entity::insert(order_item::ActiveModel {
            order_id: Set(order_id),
            movie_id: Set(movie_id),
            price_cents: Set(price_cents),
            quantity: Set(1),
            created_at: Set(now),
            ..Default::default()
        })
        .exec(db)
        .await
        .unwrap();
    }

    order_history::Entity::insert(order_history::ActiveModel {
        order_id: Set(order_id),
        status: Set(OrderStatus::Completed),
        description: Set(None),
        created_at: Set(now),
        ..Default::default()
    })
    .exec(db)
    .await
    .unwrap();

    order_id
}
