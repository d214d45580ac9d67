use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, Uri},
    response::{Html, Response},
};
use serde::Deserialize;

use super::{back, chrome, need_login};
use crate::{
    AppState,
    error::AppResult,
    models::Flash,
    session::Session,
    templates,
    watchlist::{WatchlistAction, WatchlistAdd},
};

pub async fn view(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    mut session: Session,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let entries = state.watchlist.list(user.id).await?;
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::watchlist_page(&chrome, &entries))).await
}

#[derive(Debug, Deserialize)]
pub struct WatchlistForm {
    movie_id: i32,
    action: Option<String>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    mut session: Session,
    Form(form): Form<WatchlistForm>,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let Some(movie) = state.catalog.find_movie(form.movie_id).await? else {
        session.flash(Flash::error("That movie could not be found."));
        return session.respond(back(&headers, "/watchlist")).await;
    };

    let flash = match WatchlistAction::from_form(form.action.as_deref()) {
        WatchlistAction::Add => match state.watchlist.add(user.id, movie.id).await? {
            WatchlistAdd::Added => Flash::success(format!("{} was added to your watchlist.", movie.title)),
            WatchlistAdd::AlreadyPresent => {
                Flash::info(format!("{} is already on your watchlist.", movie.title))
            },
        },
        WatchlistAction::Remove => {
            state.watchlist.remove(user.id, movie.id).await?;
            Flash::success(format!("{} was removed from your watchlist.", movie.title))
        },
    };

    session.flash(flash);
    session.respond(back(&headers, "/watchlist")).await
}
