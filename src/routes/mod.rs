pub mod account;
pub mod admin;
pub mod cart;
pub mod shop;
pub mod watchlist;

use axum::{
    extract::Request,
    http::{HeaderMap, Uri, header::REFERER},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{AppState, models::Flash, session::Session, templates::Chrome};

#[derive(Debug, Deserialize)]
pub struct MovieIdForm {
    pub movie_id: i32,
}

pub fn chrome(state: &AppState, session: &mut Session) -> Chrome {
    Chrome {
        site_name: state.config.site_name.clone(),
        user: session.user().cloned(),
        cart_count: session.cart().len(),
        flash: session.take_flash(),
    }
}

/// Only same-site paths are accepted as redirect targets.
pub fn local_path(target: &str) -> Option<&str> {
    (target.starts_with('/') && !target.starts_with("//") && !target.contains('\\')).then_some(target)
}

/// Redirect to the page the form was posted from, keeping only its path and
/// query.
pub fn back(headers: &HeaderMap, fallback: &str) -> Redirect {
    let target = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .filter(|pq| local_path(pq).is_some());

    match target {
        Some(path) => Redirect::to(&path),
        None => Redirect::to(fallback),
    }
}

pub fn login_redirect(return_to: &str) -> Redirect {
    Redirect::to(&format!("/login?redirect={}", urlencoding::encode(return_to)))
}

/// Sends anonymous visitors to the login page, remembering `uri` for after.
pub async fn need_login(mut session: Session, uri: &Uri) -> crate::error::AppResult<Response> {
    let return_to = uri.path_and_query().map_or("/", |pq| pq.as_str());
    session.flash(Flash::info("Please log in to continue."));
    session.respond(login_redirect(return_to)).await
}

/// Guards `/admin`. Anyone without the admin role is bounced to the store.
pub async fn require_admin(session: Session, req: Request, next: Next) -> Response {
    // The handler loads the session again, so this request's turn is released first.
    let user = session.user().cloned();
    drop(session);

    match user {
        Some(user) if user.is_admin() => next.run(req).await,
        Some(user) => {
            tracing::warn!(user_id = user.id, path = %req.uri().path(), "non-admin tried admin area");
            Redirect::to("/").into_response()
        },
        None => login_redirect(req.uri().path()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn location(redirect: Redirect) -> String {
        let resp = redirect.into_response();
        resp.headers()["location"].to_str().unwrap().to_string()
    }

    #[test]
    fn back_keeps_path_and_query_only() {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("http://evil.example/movies?sort=title"));
        assert_eq!(location(back(&headers, "/")), "/movies?sort=title");

        headers.insert(REFERER, HeaderValue::from_static("/movies/3"));
        assert_eq!(location(back(&headers, "/")), "/movies/3");

        assert_eq!(location(back(&HeaderMap::new(), "/cart")), "/cart");
    }

    #[test]
    fn only_local_paths_are_redirect_targets() {
        assert_eq!(local_path("/orders"), Some("/orders"));
        assert_eq!(local_path("//evil.example"), None);
        assert_eq!(local_path("https://evil.example"), None);
        assert_eq!(local_path("/\\evil"), None);
    }

    #[test]
    fn login_redirect_encodes_target() {
        assert_eq!(location(login_redirect("/checkout?movie_id=4")), "/login?redirect=%2Fcheckout%3Fmovie_id%3D4");
    }
}
