use std::sync::Arc;

use axum::{
    Form,
    extract::{Multipart, Path, State},
    response::{Html, Redirect, Response},
};
use serde::Deserialize;

use super::chrome;
use crate::{
    AppState,
    admin::{MovieForm, MovieFormError},
    catalog::{CategoryCreate, MovieDelete},
    error::AppResult,
    models::{Flash, OrderStatus},
    session::Session,
    templates,
    upload::UploadError,
};

const RECENT_ORDERS: u64 = 10;
const ALL_ORDERS: u64 = 500;

fn current_year() -> i32 {
    let today: jiff::civil::Date = jiff::Zoned::now().into();
    i32::from(today.year())
}

pub async fn dashboard(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let stats = state.catalog.dashboard_stats().await?;
    let movies = state.catalog.movies_with_usage().await?;
    let recent = state.orders.recent_orders(RECENT_ORDERS).await?;

    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::admin_dashboard_page(&chrome, &stats, &movies, &recent))).await
}

pub async fn new_movie(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let categories = state.catalog.list_categories().await?;
    let form = MovieForm { active: true, ..Default::default() };
    let chrome = chrome(&state, &mut session);
    session
        .respond(Html(templates::admin_movie_form_page(&chrome, None, &form, &categories, &[])))
        .await
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MovieForm::read(multipart).await?;

    match save_movie(&state, None, &form).await? {
        Ok(_) => {
            session.flash(Flash::success(format!("{} was added.", form.title.trim())));
            session.respond(Redirect::to("/admin")).await
        },
        Err(err) => render_form(&state, session, None, &form, &err.messages()).await,
    }
}

pub async fn edit_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut session: Session,
) -> AppResult<Response> {
    let Some(movie) = state.catalog.find_movie(id).await? else {
        session.flash(Flash::error("That movie could not be found."));
        return session.respond(Redirect::to("/admin")).await;
    };

    let form = MovieForm::from_movie(&movie, state.catalog.category_ids_for(id).await?);
    render_form(&state, session, Some(id), &form, &[]).await
}

pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = MovieForm::read(multipart).await?;

    match save_movie(&state, Some(id), &form).await? {
        Ok(_) => {
            session.flash(Flash::success(format!("{} was updated.", form.title.trim())));
            session.respond(Redirect::to("/admin")).await
        },
        Err(err) => render_form(&state, session, Some(id), &form, &err.messages()).await,
    }
}

/// Validates the form, stores any poster and writes the movie. The outer
/// result carries storage failures, the inner one problems to show on the
/// form.
async fn save_movie(
    state: &AppState,
    id: Option<i32>,
    form: &MovieForm,
) -> AppResult<Result<i32, MovieFormError>> {
    if form.oversized {
        let max_bytes = state.config.max_upload_bytes;
        return Ok(Err(UploadError::TooLarge { max_bytes }.into()));
    }

    let mut input = match form.validate(current_year()) {
        Ok(input) => input,
        Err(err) => return Ok(Err(err)),
    };

    let now = jiff::Timestamp::now().as_second();
    input.poster_url = match form
        .resolve_poster(&state.config.upload_dir, state.config.max_upload_bytes, now)
        .await
    {
        Ok(poster) => poster,
        Err(err) => return Ok(Err(err)),
    };

    match id {
        None => Ok(Ok(state.catalog.create_movie(&input, &form.category_ids).await?)),
        Some(id) => {
            if state.catalog.update_movie(id, &input, &form.category_ids).await? {
                Ok(Ok(id))
            } else {
                Ok(Err(MovieFormError::Invalid(vec!["That movie no longer exists.".to_string()])))
            }
        },
    }
}

async fn render_form(
    state: &AppState,
    mut session: Session,
    id: Option<i32>,
    form: &MovieForm,
    errors: &[String],
) -> AppResult<Response> {
    let categories = state.catalog.list_categories().await?;
    let chrome = chrome(state, &mut session);
    session
        .respond(Html(templates::admin_movie_form_page(&chrome, id, form, &categories, errors)))
        .await
}

pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut session: Session,
) -> AppResult<Response> {
    let flash = match state.catalog.delete_movie(id).await? {
        MovieDelete::Deleted => Flash::success("Movie deleted."),
        MovieDelete::InUse { order_items } => Flash::error(format!(
            "This movie has been purchased {order_items} time(s) and cannot be deleted. Deactivate it instead."
        )),
        MovieDelete::NotFound => Flash::error("That movie could not be found."),
    };
    session.flash(flash);
    session.respond(Redirect::to("/admin")).await
}

pub async fn toggle_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut session: Session,
) -> AppResult<Response> {
    let flash = match state.catalog.toggle_status(id).await? {
        Some(status) => Flash::success(format!("Movie is now {}.", status.label())),
        None => Flash::error("That movie could not be found."),
    };
    session.flash(flash);
    session.respond(Redirect::to("/admin")).await
}

pub async fn categories(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let categories = state.catalog.list_categories().await?;
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::admin_categories_page(&chrome, &categories, &[]))).await
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let name = form.name.trim();
    if name.is_empty() {
        let categories = state.catalog.list_categories().await?;
        let chrome = chrome(&state, &mut session);
        let errors = ["Category name is required.".to_string()];
        return session
            .respond(Html(templates::admin_categories_page(&chrome, &categories, &errors)))
            .await;
    }

    let description = Some(form.description.trim()).filter(|d| !d.is_empty());
    let flash = match state.catalog.create_category(name, description).await? {
        CategoryCreate::Created(_) => Flash::success(format!("Category {name} was added.")),
        CategoryCreate::Duplicate => Flash::info(format!("Category {name} already exists.")),
    };
    session.flash(flash);
    session.respond(Redirect::to("/admin/categories")).await
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    mut session: Session,
) -> AppResult<Response> {
    let flash = match state.catalog.find_category(id).await? {
        Some(category) => {
            state.catalog.delete_category(category.id).await?;
            Flash::success(format!("Category {} was deleted.", category.name))
        },
        None => Flash::error("That category could not be found."),
    };
    session.flash(flash);
    session.respond(Redirect::to("/admin/categories")).await
}

pub async fn orders(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    let rows = state.orders.recent_orders(ALL_ORDERS).await?;
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::admin_orders_page(&chrome, &rows))).await
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    status: String,
    #[serde(default)]
    note: String,
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i32>,
    mut session: Session,
    Form(form): Form<StatusForm>,
) -> AppResult<Response> {
    let flash = match OrderStatus::parse(&form.status) {
        None => Flash::error("Unknown order status."),
        Some(status) => {
            if state.orders.set_status(order_id, status, Some(&form.note)).await? {
                Flash::success(format!("Order #{order_id} is now {}.", status.label()))
            } else {
                Flash::error("That order could not be found.")
            }
        },
    };
    session.flash(flash);
    session.respond(Redirect::to("/admin/orders")).await
}
