use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, Uri},
    response::{Html, Redirect, Response},
};
use serde::Deserialize;
use tracing::error;

use super::{MovieIdForm, back, chrome, need_login};
use crate::{
    AppState,
    cart::CartAdd,
    checkout::CheckoutError,
    error::AppResult,
    models::{Flash, MovieStatus, PaymentMethod},
    session::Session,
    templates,
};

pub async fn view_cart(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let quote = state.orders.quote(session.cart()).await?;
    if !quote.missing.is_empty() {
        session.cart_mut().retain_only(|id| !quote.missing.contains(&id));
        session.flash(Flash::info("Some movies are no longer available and were removed from your cart."));
    }

    let chrome = chrome(&state, &mut session);
    let body = templates::cart_page(&chrome, &quote, state.orders.tax_rate_bps());
    session.respond(Html(body)).await
}

pub async fn add_to_cart(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut session: Session,
    Form(form): Form<MovieIdForm>,
) -> AppResult<Response> {
    let movie = state.catalog.find_movie(form.movie_id).await?;
    let flash = match movie.filter(|m| m.status == MovieStatus::Active) {
        None => Flash::error("That movie is not available."),
        Some(movie) => match session.cart_mut().add_item(movie.id) {
            CartAdd::Added => Flash::success(format!("{} was added to your cart.", movie.title)),
            CartAdd::AlreadyInCart => Flash::info(format!("{} is already in your cart.", movie.title)),
        },
    };

    session.flash(flash);
    session.respond(back(&headers, "/cart")).await
}

pub async fn remove_from_cart(
    headers: HeaderMap,
    mut session: Session,
    Form(form): Form<MovieIdForm>,
) -> AppResult<Response> {
    if session.cart_mut().remove_item(form.movie_id) {
        session.flash(Flash::success("Removed from your cart."));
    }
    session.respond(back(&headers, "/cart")).await
}

#[derive(Debug, Default, Deserialize)]
pub struct BuyNowQuery {
    movie_id: Option<i32>,
}

pub async fn checkout_summary(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(q): Query<BuyNowQuery>,
    mut session: Session,
) -> AppResult<Response> {
    if session.user().is_none() {
        return need_login(session, &uri).await;
    }

    if let Some(movie_id) = q.movie_id {
        let available = state
            .catalog
            .find_movie(movie_id)
            .await?
            .is_some_and(|m| m.status == MovieStatus::Active);
        if available {
            session.cart_mut().replace_with(movie_id);
        } else {
            session.flash(Flash::error("That movie is not available."));
        }
        return session.respond(Redirect::to("/checkout")).await;
    }

    if session.cart().is_empty() {
        session.flash(Flash::info("Your cart is empty."));
        return session.respond(Redirect::to("/movies")).await;
    }

    let quote = state.orders.quote(session.cart()).await?;
    if quote.lines.is_empty() {
        session.cart_mut().clear();
        session.flash(Flash::info("The movies in your cart are no longer available."));
        return session.respond(Redirect::to("/movies")).await;
    }

    let chrome = chrome(&state, &mut session);
    let body = templates::checkout_page(&chrome, &quote, state.orders.tax_rate_bps());
    session.respond(Html(body)).await
}

#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    payment_method: String,
}

pub async fn place_order(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    mut session: Session,
    Form(form): Form<CheckoutForm>,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let Some(method) = PaymentMethod::from_code(&form.payment_method) else {
        session.flash(Flash::error("Please choose a payment method."));
        return session.respond(Redirect::to("/checkout")).await;
    };

    let cart = session.cart().clone();
    let (flash, target) = match state.orders.place_order(user.id, &cart, method).await {
        Ok(placed) => {
            session.cart_mut().clear();
            session.set_last_order(placed.order_id);
            (
                Flash::success("Thank you! Your order has been placed."),
                format!("/orders/{}", placed.order_id),
            )
        },
        Err(CheckoutError::EmptyCart) => (Flash::info("Your cart is empty."), "/movies".to_string()),
        Err(CheckoutError::NothingAvailable { missing }) => {
            session.cart_mut().retain_only(|id| !missing.contains(&id));
            (
                Flash::info("The movies in your cart are no longer available."),
                "/movies".to_string(),
            )
        },
        Err(CheckoutError::PaymentDeclined(reason)) => {
            (Flash::error(format!("Your payment was declined: {reason}")), "/checkout".to_string())
        },
        Err(err) => {
            error!(user_id = user.id, error = %err, "checkout failed");
            (
                Flash::error("We could not complete your order. Please try again."),
                "/checkout".to_string(),
            )
        },
    };

    session.flash(flash);
    session.respond(Redirect::to(&target)).await
}

pub async fn orders(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    mut session: Session,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let orders = state.orders.orders_for_user(user.id).await?;
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::orders_page(&chrome, &orders))).await
}

pub async fn order_detail(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Path(order_id): Path<i32>,
    mut session: Session,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let Some(detail) = state.orders.order_for_user(user.id, order_id).await? else {
        session.flash(Flash::error("That order could not be found."));
        return session.respond(Redirect::to("/orders")).await;
    };

    let just_placed = session.last_order() == Some(order_id);
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::order_page(&chrome, &detail, just_placed))).await
}
