use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, SqlErr,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    config::Config,
    entities::user,
    error::AppResult,
    models::Role,
    session::SessionUser,
};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("{}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error("That username is already taken.")]
    UsernameTaken,
    #[error("An account with that email already exists.")]
    EmailTaken,
    #[error("could not hash password: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Editable account details. Blank password fields leave the password alone.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ProfileForm {
    pub fn from_user(u: &user::Model) -> Self {
        Self {
            first_name: u.first_name.clone().unwrap_or_default(),
            last_name: u.last_name.clone().unwrap_or_default(),
            email: u.email.clone(),
            phone: u.phone.clone().unwrap_or_default(),
            address: u.address.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// The same form with the password fields blanked, for re-rendering.
    pub fn without_passwords(self) -> Self {
        Self { password: String::new(), confirm_password: String::new(), ..self }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("{}", .0.join(" "))]
    Invalid(Vec<String>),
    #[error("An account with that email already exists.")]
    EmailTaken,
    #[error("account {0} no longer exists")]
    NotFound(i32),
    #[error("could not hash password: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] DbErr),
}

/// Field problems for a registration form, in display order. Empty when the
/// form is acceptable.
pub fn validate_registration(form: &RegisterForm) -> Vec<String> {
    let mut errors = Vec::new();
    let username = form.username.trim();
    let email = form.email.trim();

    if username.is_empty() {
        errors.push("Username is required.".to_string());
    } else if !(3..=50).contains(&username.chars().count()) {
        errors.push("Username must be between 3 and 50 characters.".to_string());
    } else if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push("Username may only contain letters, numbers and underscores.".to_string());
    }

    if email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if !looks_like_email(email) {
        errors.push("Please enter a valid email address.".to_string());
    }

    if form.password.chars().count() < 6 {
        errors.push("Password must be at least 6 characters.".to_string());
    } else if form.password != form.confirm_password {
        errors.push("Passwords do not match.".to_string());
    }

    errors
}

pub fn validate_profile(form: &ProfileForm) -> Vec<String> {
    let mut errors = Vec::new();
    let email = form.email.trim();

    if email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if !looks_like_email(email) {
        errors.push("Please enter a valid email address.".to_string());
    }

    if form.first_name.trim().chars().count() > 50 || form.last_name.trim().chars().count() > 50 {
        errors.push("Names must be at most 50 characters.".to_string());
    }

    let phone = form.phone.trim();
    if phone.chars().count() > 20
        || !phone.chars().all(|c| c.is_ascii_digit() || " +-().".contains(c))
    {
        errors.push("Please enter a valid phone number.".to_string());
    }

    if !form.password.is_empty() || !form.confirm_password.is_empty() {
        if form.password.chars().count() < 6 {
            errors.push("Password must be at least 6 characters.".to_string());
        } else if form.password != form.confirm_password {
            errors.push("Passwords do not match.".to_string());
        }
    }

    errors
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.contains(char::is_whitespace)
        && domain.split_once('.').is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(err) => {
            warn!(error = %err, "stored password hash is unreadable");
            false
        },
    }
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Taken {
    Username,
    Email,
}

/// Which unique user column a failed insert or update ran into.
fn duplicate_column(err: &DbErr) -> Option<Taken> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) if msg.contains("email") => Some(Taken::Email),
        Some(SqlErr::UniqueConstraintViolation(_)) => Some(Taken::Username),
        _ => None,
    }
}

impl From<&user::Model> for SessionUser {
    fn from(u: &user::Model) -> Self {
        Self { id: u.id, username: u.username.clone(), role: u.role }
    }
}

#[derive(Clone)]
pub struct Accounts {
    db: DatabaseConnection,
}

impl Accounts {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<user::Model, RegisterError> {
        let errors = validate_registration(form);
        if !errors.is_empty() {
            return Err(RegisterError::Invalid(errors));
        }

        let username = form.username.trim();
        let email = form.email.trim();

        if self.find_by_username(username).await?.is_some() {
            return Err(RegisterError::UsernameTaken);
        }
        if user::Entity::find().filter(user::Column::Email.eq(email)).one(&self.db).await?.is_some()
        {
            return Err(RegisterError::EmailTaken);
        }

        let password_hash =
            hash_password(&form.password).map_err(|e| RegisterError::Hash(e.to_string()))?;
        // A concurrent registration can still win the race to the unique index.
        let created = match self.insert_user(username, email, &password_hash, Role::User).await {
            Ok(created) => created,
            Err(err) => {
                return Err(match duplicate_column(&err) {
                    Some(Taken::Email) => RegisterError::EmailTaken,
                    Some(Taken::Username) => RegisterError::UsernameTaken,
                    None => RegisterError::Db(err),
                });
            },
        };

        info!(user_id = created.id, username = %created.username, "user registered");
        Ok(created)
    }

    pub async fn find_user(&self, id: i32) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(id).one(&self.db).await
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        form: &ProfileForm,
    ) -> Result<user::Model, ProfileError> {
        let errors = validate_profile(form);
        if !errors.is_empty() {
            return Err(ProfileError::Invalid(errors));
        }

        let current = self.find_user(user_id).await?.ok_or(ProfileError::NotFound(user_id))?;
        let email = form.email.trim();

        let clash = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::Id.ne(user_id))
            .count(&self.db)
            .await?;
        if clash > 0 {
            return Err(ProfileError::EmailTaken);
        }

        let mut active: user::ActiveModel = current.into();
        active.first_name = Set(optional(&form.first_name));
        active.last_name = Set(optional(&form.last_name));
        active.email = Set(email.to_string());
        active.phone = Set(optional(&form.phone));
        active.address = Set(optional(&form.address));
        if !form.password.is_empty() {
            let hash = hash_password(&form.password).map_err(|e| ProfileError::Hash(e.to_string()))?;
            active.password_hash = Set(hash);
        }
        active.updated_at = Set(jiff::Timestamp::now().as_second());

        let updated = match active.update(&self.db).await {
            Ok(updated) => updated,
            Err(err) if duplicate_column(&err).is_some() => return Err(ProfileError::EmailTaken),
            Err(err) => return Err(err.into()),
        };

        info!(user_id, password_changed = !form.password.is_empty(), "profile updated");
        Ok(updated)
    }

    /// Looks the account up by username or email and checks the password.
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<Option<user::Model>> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Ok(None);
        }

        let found = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login)),
            )
            .one(&self.db)
            .await?;

        Ok(found.filter(|u| verify_password(password, &u.password_hash)))
    }

    /// Creates the configured admin account unless some admin already exists.
    pub async fn ensure_admin(&self, config: &Config) -> anyhow::Result<()> {
        let admins =
            user::Entity::find().filter(user::Column::Role.eq(Role::Admin)).count(&self.db).await?;
        if admins > 0 {
            return Ok(());
        }

        let password_hash = hash_password(&config.admin_password)
            .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;
        let admin = self
            .insert_user(&config.admin_username, &config.admin_email, &password_hash, Role::Admin)
            .await?;
        warn!(username = %admin.username, "created default admin account, change its password");
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find().filter(user::Column::Username.eq(username)).one(&self.db).await
    }

    async fn insert_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<user::Model, DbErr> {
        let now = jiff::Timestamp::now().as_second();
        let model = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        user::Entity::insert(model).exec_with_returning(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: password.into(),
        }
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration(&form("neo_1", "neo@zion.io", "secret")).is_empty());
        assert_eq!(validate_registration(&form("ab", "neo@zion.io", "secret")).len(), 1);
        assert_eq!(validate_registration(&form("bad name", "neo@zion.io", "secret")).len(), 1);
        assert_eq!(validate_registration(&form("neo", "neo@zion", "secret")).len(), 1);
        assert_eq!(validate_registration(&form("neo", "neo@zion.io", "short")).len(), 1);

        let mut mismatch = form("neo", "neo@zion.io", "secret");
        mismatch.confirm_password = "secrets".into();
        assert_eq!(validate_registration(&mismatch), vec!["Passwords do not match.".to_string()]);

        assert_eq!(validate_registration(&RegisterForm::default()).len(), 3);
    }

    #[tokio::test]
    async fn register_then_log_in_by_username_or_email() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db);

        let created = accounts.register(&form("trinity", "trinity@zion.io", "followthewhite")).await.unwrap();
        assert_eq!(created.role, Role::User);
        assert_ne!(created.password_hash, "followthewhite");

        let by_name = accounts.authenticate("trinity", "followthewhite").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(created.id));
        let by_email = accounts.authenticate("trinity@zion.io", "followthewhite").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));

        assert!(accounts.authenticate("trinity", "wrong").await.unwrap().is_none());
        assert!(accounts.authenticate("nobody", "followthewhite").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicates_are_reported() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db);
        accounts.register(&form("tank", "tank@zion.io", "operator")).await.unwrap();

        let err = accounts.register(&form("tank", "other@zion.io", "operator")).await;
        assert!(matches!(err, Err(RegisterError::UsernameTaken)));
        let err = accounts.register(&form("dozer", "tank@zion.io", "operator")).await;
        assert!(matches!(err, Err(RegisterError::EmailTaken)));
    }

    #[tokio::test]
    async fn losing_the_insert_race_reports_the_taken_field() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db);
        accounts.insert_user("mouse", "mouse@zion.io", "x", Role::User).await.unwrap();

        let err = accounts.insert_user("mouse", "other@zion.io", "x", Role::User).await.unwrap_err();
        assert_eq!(duplicate_column(&err), Some(Taken::Username));
        let err = accounts.insert_user("switch", "mouse@zion.io", "x", Role::User).await.unwrap_err();
        assert_eq!(duplicate_column(&err), Some(Taken::Email));
    }

    fn profile(email: &str) -> ProfileForm {
        ProfileForm {
            first_name: " Thomas ".into(),
            last_name: "Anderson".into(),
            email: email.into(),
            phone: "+1 (555) 010-0101".into(),
            address: "Capitol City".into(),
            ..Default::default()
        }
    }

    #[test]
    fn profile_rules() {
        assert!(validate_profile(&profile("neo@zion.io")).is_empty());
        assert_eq!(validate_profile(&profile("")), vec!["Email is required.".to_string()]);

        let mut bad_phone = profile("neo@zion.io");
        bad_phone.phone = "call me".into();
        assert_eq!(validate_profile(&bad_phone).len(), 1);

        let mut half_password = profile("neo@zion.io");
        half_password.confirm_password = "secret".into();
        assert_eq!(
            validate_profile(&half_password),
            vec!["Password must be at least 6 characters.".to_string()]
        );
    }

    #[tokio::test]
    async fn profile_update_writes_details_and_password() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db);
        let neo = accounts.register(&form("neo", "neo@zion.io", "redpill")).await.unwrap();

        let updated = accounts.update_profile(neo.id, &profile("neo@matrix.io")).await.unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Thomas"));
        assert_eq!(updated.email, "neo@matrix.io");
        assert_eq!(updated.address.as_deref(), Some("Capitol City"));
        // Blank password fields keep the old password.
        assert!(accounts.authenticate("neo", "redpill").await.unwrap().is_some());

        let mut cleared = profile("neo@matrix.io");
        cleared.address = "  ".into();
        cleared.password = "bluepill".into();
        cleared.confirm_password = "bluepill".into();
        let updated = accounts.update_profile(neo.id, &cleared).await.unwrap();
        assert_eq!(updated.address, None);
        assert!(accounts.authenticate("neo", "redpill").await.unwrap().is_none());
        assert!(accounts.authenticate("neo", "bluepill").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn profile_email_must_stay_unique() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db);
        let neo = accounts.register(&form("neo", "neo@zion.io", "redpill")).await.unwrap();
        accounts.register(&form("smith", "smith@matrix.io", "program")).await.unwrap();

        let err = accounts.update_profile(neo.id, &profile("smith@matrix.io")).await;
        assert!(matches!(err, Err(ProfileError::EmailTaken)));
        // Keeping your own address is fine.
        assert!(accounts.update_profile(neo.id, &profile("neo@zion.io")).await.is_ok());
        assert!(matches!(
            accounts.update_profile(999, &profile("x@y.io")).await,
            Err(ProfileError::NotFound(999))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_runs_once() {
        let db = connect_in_memory().await;
        let accounts = Accounts::new(db.clone());
        let config = Config {
            addr: "127.0.0.1:0".parse().unwrap(),
            site_name: "Test".into(),
            database_url: "sqlite::memory:".into(),
            tax_rate_bps: 0,
            upload_dir: "uploads".into(),
            max_upload_bytes: 1024,
            session_backend: crate::config::SessionBackend::Memory,
            session_ttl_minutes: 10,
            admin_username: "root".into(),
            admin_email: "root@example.com".into(),
            admin_password: "toor123".into(),
        };

        accounts.ensure_admin(&config).await.unwrap();
        accounts.ensure_admin(&config).await.unwrap();

        assert_eq!(user::Entity::find().count(&db).await.unwrap(), 1);
        let admin = accounts.authenticate("root", "toor123").await.unwrap().unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(SessionUser::from(&admin).is_admin());
    }
}
