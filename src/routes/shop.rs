use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{Html, Redirect, Response},
};
use serde::{Deserialize, Serialize};

use super::chrome;
use crate::{
    AppState,
    catalog::{MovieFilter, MovieSort, MovieSummary},
    error::AppResult,
    models::{Flash, MovieStatus},
    session::Session,
    templates,
};

const HOME_SHELF: u64 = 8;
const RELATED_LIMIT: u64 = 4;

pub async fn home(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let latest = state
        .catalog
        .list_movies(&MovieFilter { sort: MovieSort::Newest, limit: Some(HOME_SHELF), ..Default::default() })
        .await?;
    let top_rated = state
        .catalog
        .list_movies(&MovieFilter { sort: MovieSort::Rating, limit: Some(HOME_SHELF), ..Default::default() })
        .await?;

    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::home_page(&chrome, &latest, &top_rated))).await
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    category: Option<String>,
    sort: Option<String>,
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CatalogQuery>,
    mut session: Session,
) -> AppResult<Response> {
    let category_id = q.category.as_deref().and_then(|c| c.trim().parse::<i32>().ok());
    let sort = q
        .sort
        .as_deref()
        .and_then(|s| MovieSort::ALL.into_iter().find(|m| m.as_code() == s))
        .unwrap_or_default();

    let movies = state
        .catalog
        .list_movies(&MovieFilter { category_id, sort, ..Default::default() })
        .await?;
    let categories = state.catalog.list_categories().await?;

    let chrome = chrome(&state, &mut session);
    session
        .respond(Html(templates::movies_page(&chrome, &movies, &categories, category_id, sort)))
        .await
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    mut session: Session,
) -> AppResult<Response> {
    let is_admin = session.user().is_some_and(|u| u.is_admin());
    // Numeric keys are ids, anything else is looked up as a slug.
    let movie = match key.parse::<i32>() {
        Ok(id) => state.catalog.find_movie(id).await?,
        Err(_) => state.catalog.find_movie_by_slug(&key).await?,
    };
    let movie = movie.filter(|m| m.status == MovieStatus::Active || is_admin);

    let Some(movie) = movie else {
        session.flash(Flash::error("That movie could not be found."));
        return session.respond(Redirect::to("/")).await;
    };

    let id = movie.id;
    let categories = state.catalog.categories_for(id).await?;
    let related = state.catalog.related_movies(id, RELATED_LIMIT).await?;
    let in_watchlist = match session.user() {
        Some(user) => state.watchlist.contains(user.id, id).await?,
        None => false,
    };
    let in_cart = session.cart().contains(id);

    let view = templates::MovieView {
        movie: &movie,
        categories: &categories,
        related: &related,
        in_cart,
        in_watchlist,
    };
    let chrome = chrome(&state, &mut session);
    let body = templates::movie_page(&chrome, &view);
    session.respond(Html(body)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
    mut session: Session,
) -> AppResult<Response> {
    let results = state.catalog.search(&query.q).await?;
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::search_page(&chrome, query.q.trim(), &results))).await
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    movies: Vec<MovieSummary>,
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let results = state.catalog.search(&query.q).await?;
    Ok(Json(SearchResponse { movies: results.iter().map(MovieSummary::from).collect() }))
}
