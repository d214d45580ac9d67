use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use cookie::{Cookie, SameSite};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::{
    AppState,
    cart::Cart,
    entities::session,
    error::{AppError, AppResult},
    models::{Flash, Role},
};

pub const SESSION_COOKIE: &str = "streamflix_session";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub user: Option<SessionUser>,
    #[serde(default)]
    pub cart: Cart,
    #[serde(default)]
    pub flash: Option<Flash>,
    #[serde(default)]
    pub last_order: Option<i32>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<SessionData>>;
    async fn set(&self, key: &str, data: &SessionData) -> AppResult<()>;
    async fn clear(&self, key: &str) -> AppResult<()>;
}

pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (SessionData, i64)>>,
    ttl_seconds: i64,
}

impl MemorySessionStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl_seconds }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<SessionData>> {
        let now = now_sec();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((data, expires_at)) if *expires_at >= now => return Ok(Some(data.clone())),
                Some(_) => {},
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, data: &SessionData) -> AppResult<()> {
        let now = now_sec();
        let expires_at = now + self.ttl_seconds;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, exp)| *exp >= now);
        entries.insert(key.to_string(), (data.clone(), expires_at));
        Ok(())
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Session rows in the `sessions` table, payload stored as JSON.
pub struct DatabaseSessionStore {
    db: DatabaseConnection,
    ttl_seconds: i64,
}

impl DatabaseSessionStore {
    pub fn new(db: DatabaseConnection, ttl_seconds: i64) -> Self {
        Self { db, ttl_seconds }
    }

    pub async fn purge_expired(&self) -> AppResult<u64> {
        let res = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lt(now_sec()))
            .exec(&self.db)
            .await?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl SessionStore for DatabaseSessionStore {
    async fn get(&self, key: &str) -> AppResult<Option<SessionData>> {
        let row = session::Entity::find_by_id(key.to_string())
            .filter(session::Column::ExpiresAt.gte(now_sec()))
            .one(&self.db)
            .await?;
        match row {
            Some(row) => Ok(Some(serde_json::from_str(&row.data)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, data: &SessionData) -> AppResult<()> {
        let model = session::ActiveModel {
            key: Set(key.to_string()),
            data: Set(serde_json::to_string(data)?),
            expires_at: Set(now_sec() + self.ttl_seconds),
        };

        session::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(session::Column::Key)
                    .update_columns([session::Column::Data, session::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn clear(&self, key: &str) -> AppResult<()> {
        session::Entity::delete_by_id(key.to_string()).exec(&self.db).await?;
        Ok(())
    }
}

/// One async mutex per session key. A [`Session`] holds its key's lock from
/// load until it is dropped, so requests from the same browser take turns
/// instead of overwriting each other's writes.
#[derive(Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Entries nobody holds or waits on are only referenced by the map.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Set on a response when the handler issued a fresh session id.
#[derive(Clone, Copy, Debug)]
struct RotatedSession(SessionId);

/// Makes sure every request carries a session id, minting one (and the cookie
/// for it) when the browser has none.
pub async fn session_layer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let existing =
        jar.get(SESSION_COOKIE).and_then(|c| Uuid::parse_str(c.value()).ok()).map(SessionId);

    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    };
    req.extensions_mut().insert(id);

    let mut resp = next.run(req).await;

    let issued = match resp.extensions().get::<RotatedSession>() {
        Some(rotated) => Some(rotated.0),
        None => fresh.then_some(id),
    };
    if let Some(id) = issued {
        let cookie = Cookie::build((SESSION_COOKIE, id.key()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(state.config.session_ttl_seconds()))
            .build();
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            resp.headers_mut().append(SET_COOKIE, value);
        }
    }
    resp
}

/// Per-request view of the session. Mutations stay local until
/// [`Session::save`] or [`Session::respond`] writes them back to the store.
pub struct Session {
    id: SessionId,
    data: SessionData,
    store: Arc<dyn SessionStore>,
    dirty: bool,
    rotated: bool,
    _turn: OwnedMutexGuard<()>,
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<SessionId>()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("session layer is not installed"))?;
        Session::load(state.sessions.clone(), &state.session_locks, id).await
    }
}

impl Session {
    /// Waits for any other request on the same session to finish, then reads
    /// the stored data.
    pub async fn load(
        store: Arc<dyn SessionStore>,
        locks: &SessionLocks,
        id: SessionId,
    ) -> AppResult<Self> {
        let turn = locks.acquire(&id.key()).await;
        let data = store.get(&id.key()).await?.unwrap_or_default();
        Ok(Self { id, data, store, dirty: false, rotated: false, _turn: turn })
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.data.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        self.dirty = true;
        &mut self.data.cart
    }

    pub fn last_order(&self) -> Option<i32> {
        self.data.last_order
    }

    pub fn set_last_order(&mut self, order_id: i32) {
        self.dirty = true;
        self.data.last_order = Some(order_id);
    }

    pub fn flash(&mut self, flash: Flash) {
        self.dirty = true;
        self.data.flash = Some(flash);
    }

    pub fn take_flash(&mut self) -> Option<Flash> {
        let flash = self.data.flash.take();
        if flash.is_some() {
            self.dirty = true;
        }
        flash
    }

    /// Logs the user in under a fresh session id. The cart carries over.
    pub async fn log_in(&mut self, user: SessionUser) -> AppResult<()> {
        self.store.clear(&self.id.key()).await?;
        self.id = SessionId::generate();
        self.rotated = true;
        self.dirty = true;
        self.data.user = Some(user);
        Ok(())
    }

    /// Drops everything held for this session, cart included.
    pub async fn destroy(&mut self) -> AppResult<()> {
        self.store.clear(&self.id.key()).await?;
        self.data = SessionData::default();
        self.dirty = false;
        Ok(())
    }

    pub async fn save(&mut self) -> AppResult<()> {
        if self.dirty {
            self.store.set(&self.id.key(), &self.data).await?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Persists pending changes and finalizes the response, re-issuing the
    /// cookie when the id changed.
    pub async fn respond(mut self, resp: impl IntoResponse) -> AppResult<Response> {
        self.save().await?;
        let mut resp = resp.into_response();
        if self.rotated {
            resp.extensions_mut().insert(RotatedSession(self.id));
        }
        Ok(resp)
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn sample() -> SessionData {
        let mut data = SessionData::default();
        data.cart.add_item(5);
        data.user = Some(SessionUser { id: 1, username: "neo".into(), role: Role::User });
        data
    }

    async fn exercise(store: Arc<dyn SessionStore>) {
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", &sample()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(sample()));
        store.clear("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.clear("missing").await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_get_set_clear() {
        exercise(Arc::new(MemorySessionStore::new(60))).await;
    }

    #[tokio::test]
    async fn database_store_get_set_clear() {
        let db = connect_in_memory().await;
        exercise(Arc::new(DatabaseSessionStore::new(db, 60))).await;
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemorySessionStore::new(-10);
        store.set("k", &sample()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);

        let db = connect_in_memory().await;
        let store = DatabaseSessionStore::new(db, -10);
        store.set("k", &sample()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn session_writes_back_only_when_changed() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(60));
        let locks = SessionLocks::default();
        let id = SessionId::generate();

        let mut session = Session::load(store.clone(), &locks, id).await.unwrap();
        session.save().await.unwrap();
        assert_eq!(store.get(&id.key()).await.unwrap(), None);

        session.cart_mut().add_item(42);
        session.flash(Flash::info("hello"));
        session.save().await.unwrap();
        drop(session);

        let mut again = Session::load(store.clone(), &locks, id).await.unwrap();
        assert_eq!(again.cart().ids(), &[42]);
        assert_eq!(again.take_flash(), Some(Flash::info("hello")));
        again.save().await.unwrap();
        drop(again);

        let third = Session::load(store, &locks, id).await.unwrap();
        assert_eq!(third.data.flash, None);
    }

    #[tokio::test]
    async fn log_in_rotates_the_id_and_keeps_the_cart() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(60));
        let locks = SessionLocks::default();
        let id = SessionId::generate();

        let mut session = Session::load(store.clone(), &locks, id).await.unwrap();
        session.cart_mut().add_item(7);
        session.save().await.unwrap();

        session
            .log_in(SessionUser { id: 3, username: "trinity".into(), role: Role::User })
            .await
            .unwrap();
        session.save().await.unwrap();

        assert_eq!(store.get(&id.key()).await.unwrap(), None);
        let rotated = store.get(&session.id.key()).await.unwrap().unwrap();
        assert_eq!(rotated.cart.ids(), &[7]);
        assert_eq!(rotated.user.map(|u| u.id), Some(3));
    }

    #[tokio::test]
    async fn overlapping_requests_on_one_session_keep_both_writes() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(60));
        let locks = Arc::new(SessionLocks::default());
        let id = SessionId::generate();

        let mut first = Session::load(store.clone(), &locks, id).await.unwrap();

        let second = tokio::spawn({
            let (store, locks) = (store.clone(), locks.clone());
            async move {
                let mut second = Session::load(store, &locks, id).await.unwrap();
                second.cart_mut().add_item(2);
                second.save().await.unwrap();
            }
        });
        tokio::task::yield_now().await;
        assert!(!second.is_finished());

        first.cart_mut().add_item(1);
        first.save().await.unwrap();
        drop(first);
        second.await.unwrap();

        let stored = store.get(&id.key()).await.unwrap().unwrap();
        assert_eq!(stored.cart.ids(), &[1, 2]);
    }

    #[tokio::test]
    async fn different_sessions_do_not_wait_on_each_other() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(60));
        let locks = SessionLocks::default();

        let _held = Session::load(store.clone(), &locks, SessionId::generate()).await.unwrap();
        let other = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            Session::load(store, &locks, SessionId::generate()),
        )
        .await;
        assert!(other.is_ok());
    }
}
