use std::{collections::HashMap, sync::Arc};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, error, info, warn};

use crate::{
    cart::Cart,
    entities::{movie, order, order_history, order_item, user},
    error::AppResult,
    models::{MovieStatus, OrderStatus, PaymentMethod, PaymentStatus},
    payment::{Authorization, PaymentError, PaymentProcessor},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckoutLine {
    pub movie_id: i32,
    pub title: String,
    pub price_cents: i64,
}

/// Authoritative prices for a cart at one point in time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Quote {
    pub lines: Vec<CheckoutLine>,
    /// Cart ids that no longer resolve to a purchasable movie.
    pub missing: Vec<i32>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl Quote {
    fn new(lines: Vec<CheckoutLine>, missing: Vec<i32>, tax_rate_bps: u32) -> Self {
        let subtotal_cents: i64 = lines.iter().map(|l| l.price_cents).sum();
        let tax_cents = tax_for(subtotal_cents, tax_rate_bps);
        Self { lines, missing, subtotal_cents, tax_cents, total_cents: subtotal_cents + tax_cents }
    }
}

/// Tax in cents for `subtotal_cents` at `rate_bps` basis points, rounded half up.
pub fn tax_for(subtotal_cents: i64, rate_bps: u32) -> i64 {
    (subtotal_cents * i64::from(rate_bps) + 5_000) / 10_000
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlacedOrder {
    pub order_id: i32,
    pub quote: Quote,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,
    #[error("none of the movies in your cart are available any more")]
    NothingAvailable { missing: Vec<i32> },
    #[error("payment was declined: {0}")]
    PaymentDeclined(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error("the order could not be saved")]
    Persistence(#[from] DbErr),
}

/// Everything written for one order, already priced.
struct OrderDraft<'a> {
    user_id: i32,
    quote: &'a Quote,
    method: PaymentMethod,
    payment_reference: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OrderLine {
    pub movie_id: i32,
    pub title: String,
    pub poster_url: Option<String>,
    pub price_cents: i64,
    pub quantity: i32,
}

#[derive(Clone, Debug)]
pub struct OrderDetail {
    pub order: order::Model,
    pub lines: Vec<OrderLine>,
}

#[derive(Clone, Debug)]
pub struct AdminOrderRow {
    pub order: order::Model,
    pub username: String,
    pub item_count: usize,
}

#[derive(Clone)]
pub struct OrderEngine {
    db: DatabaseConnection,
    payments: Arc<dyn PaymentProcessor>,
    tax_rate_bps: u32,
}

impl OrderEngine {
    pub fn new(db: DatabaseConnection, payments: Arc<dyn PaymentProcessor>, tax_rate_bps: u32) -> Self {
        Self { db, payments, tax_rate_bps }
    }

    pub fn tax_rate_bps(&self) -> u32 {
        self.tax_rate_bps
    }

    /// Re-reads current title and price for every cart entry. Ids that are gone
    /// or inactive are reported in `missing` and left out of the totals.
    pub async fn quote(&self, cart: &Cart) -> Result<Quote, DbErr> {
        let ids = cart.ids();
        if ids.is_empty() {
            return Ok(Quote::new(Vec::new(), Vec::new(), self.tax_rate_bps));
        }

        let found: HashMap<i32, movie::Model> = movie::Entity::find()
            .filter(movie::Column::Id.is_in(ids.iter().copied()))
            .filter(movie::Column::Status.eq(MovieStatus::Active))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut lines = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for &id in ids {
            match found.get(&id) {
                Some(m) => lines.push(CheckoutLine {
                    movie_id: m.id,
                    title: m.title.clone(),
                    price_cents: m.price_cents,
                }),
                None => missing.push(id),
            }
        }

        if !missing.is_empty() {
            debug!(missing = ?missing, "cart entries no longer in catalog");
        }

        Ok(Quote::new(lines, missing, self.tax_rate_bps))
    }

    /// Prices the cart, authorizes payment and writes the order, its items
    /// and a history entry in one transaction. The cart itself is left alone;
    /// the caller clears it once this succeeds.
    pub async fn place_order(
        &self,
        user_id: i32,
        cart: &Cart,
        method: PaymentMethod,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let quote = self.quote(cart).await?;
        if quote.lines.is_empty() {
            return Err(CheckoutError::NothingAvailable { missing: quote.missing });
        }

        let reference = match self.payments.authorize(quote.total_cents, method).await? {
            Authorization::Approved { reference } => reference,
            Authorization::Declined { reason } => {
                warn!(user_id = user_id, total_cents = quote.total_cents, reason = %reason, "payment declined");
                return Err(CheckoutError::PaymentDeclined(reason));
            },
        };

        let draft =
            OrderDraft { user_id, quote: &quote, method, payment_reference: Some(reference) };
        let order_id = self.commit_order(&draft).await?;

        info!(
            order_id = order_id,
            user_id = user_id,
            items = quote.lines.len(),
            total_cents = quote.total_cents,
            "order placed"
        );
        Ok(PlacedOrder { order_id, quote })
    }

    async fn commit_order(&self, draft: &OrderDraft<'_>) -> Result<i32, DbErr> {
        let txn = self.db.begin().await?;
        match write_order(&txn, draft).await {
            Ok(order_id) => {
                txn.commit().await?;
                Ok(order_id)
            },
            Err(err) => {
                error!(user_id = draft.user_id, error = %err, "order write failed, rolling back");
                txn.rollback().await?;
                Err(err)
            },
        }
    }

    /// The order if it exists and belongs to `user_id`.
    pub async fn order_for_user(&self, user_id: i32, order_id: i32) -> AppResult<Option<OrderDetail>> {
        let order = order::Entity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        let Some(order) = order else {
            return Ok(None);
        };

        let mut lines = self.lines_for(&[order.id]).await?;
        Ok(Some(OrderDetail { lines: lines.remove(&order.id).unwrap_or_default(), order }))
    }

    pub async fn orders_for_user(&self, user_id: i32) -> AppResult<Vec<OrderDetail>> {
        let orders = order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&self.db)
            .await?;

        let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
        let mut lines = self.lines_for(&ids).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderDetail { lines: lines.remove(&order.id).unwrap_or_default(), order })
            .collect())
    }

    pub async fn recent_orders(&self, limit: u64) -> AppResult<Vec<AdminOrderRow>> {
        let rows = order::Entity::find()
            .find_also_related(user::Entity)
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|(o, _)| o.id).collect();
        let lines = self.lines_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|(order, user)| AdminOrderRow {
                item_count: lines.get(&order.id).map_or(0, Vec::len),
                username: user.map(|u| u.username).unwrap_or_else(|| "(deleted)".to_string()),
                order,
            })
            .collect())
    }

    /// Moves an order to `status` and records why. Returns `false` for an
    /// unknown order.
    pub async fn set_status(
        &self,
        order_id: i32,
        status: OrderStatus,
        note: Option<&str>,
    ) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        let Some(existing) = order::Entity::find_by_id(order_id).one(&txn).await? else {
            return Ok(false);
        };
        let previous = existing.status;
        let now = now_sec();

        let mut model: order::ActiveModel = existing.into();
        model.status = Set(status);
        model.updated_at = Set(now);
        model.update(&txn).await?;

        let description = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => note.to_string(),
            None => format!("Status changed from {} to {}", previous.label(), status.label()),
        };
        order_history::Entity::insert(order_history::ActiveModel {
            order_id: Set(order_id),
            status: Set(status),
            description: Set(Some(description)),
            created_at: Set(now),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        txn.commit().await?;

        info!(order_id = order_id, from = previous.label(), to = status.label(), "order status changed");
        Ok(true)
    }

    pub async fn history(&self, order_id: i32) -> AppResult<Vec<order_history::Model>> {
        Ok(order_history::Entity::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_history::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn lines_for(&self, order_ids: &[i32]) -> AppResult<HashMap<i32, Vec<OrderLine>>> {
        let mut out: HashMap<i32, Vec<OrderLine>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(out);
        }

        let rows = order_item::Entity::find()
            .find_also_related(movie::Entity)
            .filter(order_item::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await?;

        for (item, movie) in rows {
            out.entry(item.order_id).or_default().push(OrderLine {
                movie_id: item.movie_id,
                title: movie.as_ref().map_or_else(|| "(removed)".to_string(), |m| m.title.clone()),
                poster_url: movie.and_then(|m| m.poster_url),
                price_cents: item.price_cents,
                quantity: item.quantity,
            });
        }
        Ok(out)
    }
}

async fn write_order<C: ConnectionTrait>(conn: &C, draft: &OrderDraft<'_>) -> Result<i32, DbErr> {
    let now = now_sec();
    let quote = draft.quote;

    let order = order::ActiveModel {
        user_id: Set(draft.user_id),
        subtotal_cents: Set(quote.subtotal_cents),
        tax_cents: Set(quote.tax_cents),
        total_cents: Set(quote.total_cents),
        status: Set(OrderStatus::Completed),
        payment_method: Set(draft.method.as_code().to_string()),
        payment_status: Set(PaymentStatus::Completed),
        payment_reference: Set(draft.payment_reference.clone()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let order_id = order::Entity::insert(order).exec(conn).await?.last_insert_id;

    for line in &quote.lines {
        let item = order_item::ActiveModel {
            order_id: Set(order_id),
            movie_id: Set(line.movie_id),
            price_cents: Set(line.price_cents),
            quantity: Set(1),
            created_at: Set(now),
            ..Default::default()
        };
        order_item::Entity::insert(item).exec(conn).await?;
    }

    order_history::Entity::insert(order_history::ActiveModel {
        order_id: Set(order_id),
        status: Set(OrderStatus::Completed),
        description: Set(Some(format!("Order placed via {}", draft.method.label()))),
        created_at: Set(now),
        ..Default::default()
    })
    .exec(conn)
    .await?;

    Ok(order_id)
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{
        db::connect_in_memory,
        payment::{DecliningProcessor, DemoProcessor},
        testing,
    };

    fn engine(db: &DatabaseConnection, tax_rate_bps: u32) -> OrderEngine {
        OrderEngine::new(db.clone(), Arc::new(DemoProcessor), tax_rate_bps)
    }

    async fn counts(db: &DatabaseConnection) -> (u64, u64, u64) {
        (
            order::Entity::find().count(db).await.unwrap(),
            order_item::Entity::find().count(db).await.unwrap(),
            order_history::Entity::find().count(db).await.unwrap(),
        )
    }

    #[test]
    fn tax_rounds_half_up() {
        assert_eq!(tax_for(2498, 700), 175);
        assert_eq!(tax_for(999, 700), 70);
        assert_eq!(tax_for(0, 700), 0);
        assert_eq!(tax_for(2498, 0), 0);
        assert_eq!(tax_for(50, 1000), 5);
    }

    #[tokio::test]
    async fn two_item_checkout_persists_order_and_items() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "neo").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let b = testing::movie(&db, "Movie B", 1499).await;

        let mut cart = Cart::default();
        cart.add_item(a);
        cart.add_item(b);

        let placed = engine(&db, 0).place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();
        assert_eq!(placed.quote.subtotal_cents, 2498);
        assert_eq!(placed.quote.total_cents, 2498);

        let order = order::Entity::find_by_id(placed.order_id).one(&db).await.unwrap().unwrap();
        assert_eq!(order.user_id, user_id);
        assert_eq!(order.subtotal_cents, 2498);
        assert_eq!(order.total_cents, 2498);
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.payment_status, PaymentStatus::Completed);
        assert_eq!(order.payment_method, "credit_card");
        assert!(order.payment_reference.is_some());

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(placed.order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&db)
            .await
            .unwrap();
        let prices: Vec<_> = items.iter().map(|i| (i.movie_id, i.price_cents, i.quantity)).collect();
        assert_eq!(prices, vec![(a, 999, 1), (b, 1499, 1)]);

        assert_eq!(counts(&db).await, (1, 2, 1));
    }

    #[tokio::test]
    async fn persisted_total_includes_tax() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "trinity").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let b = testing::movie(&db, "Movie B", 1499).await;

        let mut cart = Cart::default();
        cart.add_item(a);
        cart.add_item(b);

        let placed = engine(&db, 700).place_order(user_id, &cart, PaymentMethod::Paypal).await.unwrap();
        let order = order::Entity::find_by_id(placed.order_id).one(&db).await.unwrap().unwrap();
        assert_eq!((order.subtotal_cents, order.tax_cents, order.total_cents), (2498, 175, 2673));
    }

    #[tokio::test]
    async fn item_price_is_read_at_checkout_not_at_add_time() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "oracle").await;
        let a = testing::movie(&db, "Movie A", 999).await;

        let mut cart = Cart::default();
        cart.add_item(a);

        let movie = movie::Entity::find_by_id(a).one(&db).await.unwrap().unwrap();
        let mut model: movie::ActiveModel = movie.into();
        model.price_cents = Set(1299);
        model.update(&db).await.unwrap();

        let placed = engine(&db, 0).place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();
        let item = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(placed.order_id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.price_cents, 1299);
        assert_eq!(placed.quote.subtotal_cents, 1299);
    }

    #[tokio::test]
    async fn deleted_movie_is_dropped_from_the_order() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "cypher").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let b = testing::movie(&db, "Movie B", 1499).await;

        let mut cart = Cart::default();
        cart.add_item(a);
        cart.add_item(b);

        movie::Entity::delete_by_id(b).exec(&db).await.unwrap();

        let placed = engine(&db, 0).place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();
        assert_eq!(placed.quote.missing, vec![b]);

        let order = order::Entity::find_by_id(placed.order_id).one(&db).await.unwrap().unwrap();
        assert_eq!(order.subtotal_cents, 999);

        let items = order_item::Entity::find().all(&db).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!((items[0].movie_id, items[0].price_cents), (a, 999));
    }

    #[tokio::test]
    async fn inactive_movie_is_not_sold() {
        let db = connect_in_memory().await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let b = testing::movie(&db, "Movie B", 1499).await;
        crate::catalog::Catalog::new(db.clone()).toggle_status(b).await.unwrap();

        let mut cart = Cart::default();
        cart.add_item(a);
        cart.add_item(b);

        let quote = engine(&db, 0).quote(&cart).await.unwrap();
        assert_eq!(quote.lines.iter().map(|l| l.movie_id).collect::<Vec<_>>(), vec![a]);
        assert_eq!(quote.missing, vec![b]);
    }

    #[tokio::test]
    async fn empty_and_fully_stale_carts_are_refused() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "mouse").await;
        let engine = engine(&db, 700);

        let err = engine.place_order(user_id, &Cart::default(), PaymentMethod::CreditCard).await;
        assert!(matches!(err, Err(CheckoutError::EmptyCart)));

        let mut cart = Cart::default();
        cart.add_item(404);
        let err = engine.place_order(user_id, &cart, PaymentMethod::CreditCard).await;
        assert!(matches!(err, Err(CheckoutError::NothingAvailable { ref missing }) if missing == &vec![404]));

        assert_eq!(counts(&db).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn declined_payment_writes_nothing() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "apoc").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let engine = OrderEngine::new(db.clone(), Arc::new(DecliningProcessor), 700);

        let mut cart = Cart::default();
        cart.add_item(a);

        let err = engine.place_order(user_id, &cart, PaymentMethod::ApplePay).await;
        assert!(matches!(err, Err(CheckoutError::PaymentDeclined(_))));
        assert_eq!(counts(&db).await, (0, 0, 0));
        assert_eq!(cart.ids(), &[a]);
    }

    #[tokio::test]
    async fn failure_after_order_insert_rolls_everything_back() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "dozer").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let engine = engine(&db, 0);

        // The second line points at a movie that does not exist, so the item
        // insert fails on its foreign key after the order row is written.
        let quote = Quote::new(
            vec![
                CheckoutLine { movie_id: a, title: "Movie A".into(), price_cents: 999 },
                CheckoutLine { movie_id: 9_999, title: "Ghost".into(), price_cents: 100 },
            ],
            Vec::new(),
            0,
        );
        let draft = OrderDraft {
            user_id,
            quote: &quote,
            method: PaymentMethod::CreditCard,
            payment_reference: None,
        };

        assert!(engine.commit_order(&draft).await.is_err());
        assert_eq!(counts(&db).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn double_submit_creates_two_orders() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "niobe").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let engine = engine(&db, 0);

        let mut cart = Cart::default();
        cart.add_item(a);
        let first = engine.place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();
        let second = engine.place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();
        assert_ne!(first.order_id, second.order_id);
        assert_eq!(counts(&db).await, (2, 2, 2));
    }

    #[tokio::test]
    async fn orders_are_only_visible_to_their_owner() {
        let db = connect_in_memory().await;
        let owner = testing::user(&db, "owner").await;
        let other = testing::user(&db, "other").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let engine = engine(&db, 0);

        let mut cart = Cart::default();
        cart.add_item(a);
        let placed = engine.place_order(owner, &cart, PaymentMethod::CreditCard).await.unwrap();

        let detail = engine.order_for_user(owner, placed.order_id).await.unwrap().unwrap();
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].title, "Movie A");
        assert!(engine.order_for_user(other, placed.order_id).await.unwrap().is_none());

        assert_eq!(engine.orders_for_user(owner).await.unwrap().len(), 1);
        assert!(engine.orders_for_user(other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn status_change_appends_history() {
        let db = connect_in_memory().await;
        let user_id = testing::user(&db, "ghost").await;
        let a = testing::movie(&db, "Movie A", 999).await;
        let engine = engine(&db, 0);

        let mut cart = Cart::default();
        cart.add_item(a);
        let placed = engine.place_order(user_id, &cart, PaymentMethod::CreditCard).await.unwrap();

        assert!(engine.set_status(placed.order_id, OrderStatus::Refunded, None).await.unwrap());
        assert!(!engine.set_status(placed.order_id + 1, OrderStatus::Refunded, None).await.unwrap());

        let history = engine.history(placed.order_id).await.unwrap();
        let statuses: Vec<_> = history.iter().map(|h| h.status).collect();
        assert_eq!(statuses, vec![OrderStatus::Completed, OrderStatus::Refunded]);
        assert_eq!(
            history[1].description.as_deref(),
            Some("Status changed from completed to refunded")
        );

        let rows = engine.recent_orders(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].username, "ghost");
        assert_eq!(rows[0].item_count, 1);
        assert_eq!(rows[0].order.status, OrderStatus::Refunded);
    }
}
