use std::sync::Arc;

use axum::{
    Form,
    extract::{Query, State},
    http::Uri,
    response::{Html, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use super::{chrome, local_path, need_login};
use crate::{
    AppState,
    accounts::{ProfileError, ProfileForm, RegisterError, RegisterForm},
    entities::user,
    error::AppResult,
    models::Flash,
    session::{Session, SessionUser},
    templates,
};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    redirect: String,
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    Query(q): Query<LoginQuery>,
    mut session: Session,
) -> AppResult<Response> {
    if session.user().is_some() {
        return session.respond(Redirect::to("/")).await;
    }
    let redirect = local_path(&q.redirect).unwrap_or("/");
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::login_page(&chrome, "", redirect, None))).await
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    redirect: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let target = local_path(&form.redirect).unwrap_or("/").to_string();

    match state.accounts.authenticate(&form.login, &form.password).await? {
        Some(user) => {
            info!(user_id = user.id, "logged in");
            session.log_in(SessionUser::from(&user)).await?;
            session.flash(Flash::success(format!("Welcome back, {}!", user.username)));
            session.respond(Redirect::to(&target)).await
        },
        None => {
            warn!(login = %form.login.trim(), "failed login");
            let chrome = chrome(&state, &mut session);
            let body = templates::login_page(
                &chrome,
                form.login.trim(),
                &target,
                Some("Invalid username/email or password."),
            );
            session.respond(Html(body)).await
        },
    }
}

pub async fn register_form(State(state): State<Arc<AppState>>, mut session: Session) -> AppResult<Response> {
    if session.user().is_some() {
        return session.respond(Redirect::to("/")).await;
    }
    let chrome = chrome(&state, &mut session);
    session.respond(Html(templates::register_page(&chrome, &RegisterForm::default(), &[]))).await
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    mut session: Session,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let errors = match state.accounts.register(&form).await {
        Ok(user) => {
            session.log_in(SessionUser::from(&user)).await?;
            session.flash(Flash::success("Your account has been created."));
            return session.respond(Redirect::to("/")).await;
        },
        Err(RegisterError::Invalid(errors)) => errors,
        Err(err @ (RegisterError::UsernameTaken | RegisterError::EmailTaken)) => vec![err.to_string()],
        Err(RegisterError::Db(err)) => return Err(err.into()),
        Err(RegisterError::Hash(msg)) => return Err(anyhow::anyhow!(msg).into()),
    };

    let chrome = chrome(&state, &mut session);
    let shown = RegisterForm { password: String::new(), confirm_password: String::new(), ..form };
    session.respond(Html(templates::register_page(&chrome, &shown, &errors))).await
}

pub async fn logout(mut session: Session) -> AppResult<Response> {
    if let Some(user) = session.user() {
        info!(user_id = user.id, "logged out");
    }
    session.destroy().await?;
    session.flash(Flash::info("You have been logged out."));
    session.respond(Redirect::to("/")).await
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    mut session: Session,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };
    let Some(account) = state.accounts.find_user(user.id).await? else {
        return account_gone(session).await;
    };

    let form = ProfileForm::from_user(&account);
    render_profile(&state, session, &account, &form, &[]).await
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    mut session: Session,
    Form(form): Form<ProfileForm>,
) -> AppResult<Response> {
    let Some(user) = session.user().cloned() else {
        return need_login(session, &uri).await;
    };

    let errors = match state.accounts.update_profile(user.id, &form).await {
        Ok(_) => {
            session.flash(Flash::success("Your profile has been updated."));
            return session.respond(Redirect::to("/profile")).await;
        },
        Err(ProfileError::Invalid(errors)) => errors,
        Err(err @ ProfileError::EmailTaken) => vec![err.to_string()],
        Err(ProfileError::NotFound(_)) => return account_gone(session).await,
        Err(ProfileError::Db(err)) => return Err(err.into()),
        Err(ProfileError::Hash(msg)) => return Err(anyhow::anyhow!(msg).into()),
    };

    let Some(account) = state.accounts.find_user(user.id).await? else {
        return account_gone(session).await;
    };
    render_profile(&state, session, &account, &form.without_passwords(), &errors).await
}

async fn render_profile(
    state: &AppState,
    mut session: Session,
    account: &user::Model,
    form: &ProfileForm,
    errors: &[String],
) -> AppResult<Response> {
    let orders = state.orders.orders_for_user(account.id).await?;
    let chrome = chrome(state, &mut session);
    session
        .respond(Html(templates::profile_page(&chrome, account, form, &orders, errors)))
        .await
}

/// The session points at a deleted user.
async fn account_gone(mut session: Session) -> AppResult<Response> {
    session.destroy().await?;
    session.flash(Flash::error("Your account could not be found. Please log in again."));
    session.respond(Redirect::to("/login")).await
}
