mod accounts;
mod admin;
mod cart;
mod catalog;
mod checkout;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod payment;
mod routes;
mod session;
mod templates;
#[cfg(test)]
mod testing;
mod upload;
mod watchlist;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    accounts::Accounts,
    catalog::Catalog,
    checkout::OrderEngine,
    config::{Config, SessionBackend},
    payment::DemoProcessor,
    session::{DatabaseSessionStore, MemorySessionStore, SessionLocks, SessionStore},
    watchlist::Watchlist,
};

pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub watchlist: Watchlist,
    pub orders: OrderEngine,
    pub accounts: Accounts,
    pub sessions: Arc<dyn SessionStore>,
    pub session_locks: SessionLocks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,streamflix=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("database setup failed: {e}"))?;

    let accounts = Accounts::new(db.clone());
    accounts.ensure_admin(&config).await?;

    let sessions: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(config.session_ttl_seconds())),
        SessionBackend::Database => {
            let store = DatabaseSessionStore::new(db.clone(), config.session_ttl_seconds());
            let purged =
                store.purge_expired().await.map_err(|e| anyhow::anyhow!("session purge failed: {e}"))?;
            tracing::debug!(purged = purged, "expired sessions removed");
            Arc::new(store)
        },
    };

    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let state = Arc::new(AppState {
        config: config.clone(),
        catalog: Catalog::new(db.clone()),
        watchlist: Watchlist::new(db.clone()),
        orders: OrderEngine::new(db, Arc::new(DemoProcessor), config.tax_rate_bps),
        accounts,
        sessions,
        session_locks: SessionLocks::default(),
    });

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, site = %config.site_name, "listening");
    axum::serve(listener, app(state)).await?;

    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    use routes::{account, admin, cart, shop, watchlist};

    // Room for the poster plus the other form fields.
    let upload_limit = state.config.max_upload_bytes + 64 * 1024;

    let admin_routes = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/movies/new", get(admin::new_movie).post(admin::create_movie))
        .route("/admin/movies/{id}/edit", get(admin::edit_movie).post(admin::update_movie))
        .route("/admin/movies/{id}/delete", post(admin::delete_movie))
        .route("/admin/movies/{id}/toggle", post(admin::toggle_movie))
        .route("/admin/categories", get(admin::categories).post(admin::create_category))
        .route("/admin/categories/{id}/delete", post(admin::delete_category))
        .route("/admin/orders", get(admin::orders))
        .route("/admin/orders/{id}/status", post(admin::update_order_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), routes::require_admin))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(shop::home))
        .route("/movies", get(shop::movies))
        .route("/movies/{id}", get(shop::movie_detail))
        .route("/search", get(shop::search))
        .route("/api/search", get(shop::api_search))
        .route("/cart", get(cart::view_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/remove", post(cart::remove_from_cart))
        .route("/checkout", get(cart::checkout_summary).post(cart::place_order))
        .route("/orders", get(cart::orders))
        .route("/orders/{id}", get(cart::order_detail))
        .route("/watchlist", get(watchlist::view).post(watchlist::update))
        .route("/login", get(account::login_form).post(account::login))
        .route("/register", get(account::register_form).post(account::register))
        .route("/logout", post(account::logout))
        .route("/profile", get(account::profile).post(account::update_profile))
        .merge(admin_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        .layer(middleware::from_fn_with_state(state.clone(), session::session_layer))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
