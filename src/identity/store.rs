/// Identity store implementation using runtime queries
use crate::{
    db::models::User,
    error::{ApiError, ApiResult},
    identity::{NewUser, UpdateDetails},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, full_name, avatar, cover_image, \
     password_hash, refresh_token, watch_history, created_at, updated_at";

/// User records and credential verification
pub struct IdentityStore {
    db: SqlitePool,
}

impl IdentityStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a user. Username and email are trimmed and lowercased; a
    /// duplicate of either is a conflict.
    ///
    /// The duplicate precheck is not race-proof; the UNIQUE columns in the
    /// schema are the backstop for concurrent registration.
    pub async fn create_user(&self, fields: NewUser) -> ApiResult<User> {
        self.check_registration(
            &fields.username,
            &fields.email,
            &fields.full_name,
            &fields.password,
        )
        .await?;
        if fields.avatar.trim().is_empty() {
            return Err(ApiError::Validation("Avatar image is required".to_string()));
        }

        let username = fields.username.trim().to_lowercase();
        let email = fields.email.trim().to_lowercase();
        let full_name = fields.full_name.trim().to_string();
        let password = fields.password.trim().to_string();

        let password_hash = hash_password(&password)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, avatar, cover_image, password_hash, watch_history, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', ?8, ?8)",
        )
        .bind(&id)
        .bind(&username)
        .bind(&email)
        .bind(&full_name)
        .bind(fields.avatar.trim())
        .bind(&fields.cover_image)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        self.get_user(&id).await
    }

    /// Validate registration fields and reject duplicates without writing.
    ///
    /// Callers that stage side effects around registration (media uploads)
    /// run this first, so a doomed registration touches nothing else.
    pub async fn check_registration(
        &self,
        username: &str,
        email: &str,
        full_name: &str,
        password: &str,
    ) -> ApiResult<()> {
        let username = username.trim().to_lowercase();
        let email = email.trim().to_lowercase();

        if username.is_empty()
            || email.is_empty()
            || full_name.trim().is_empty()
            || password.trim().is_empty()
        {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        if self.username_exists(&username).await? || self.email_exists(&email).await? {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        Ok(())
    }

    /// Find a user by username or email, lowercase-normalised
    pub async fn find_by_credential(&self, identifier: &str) -> ApiResult<Option<User>> {
        let identifier = identifier.trim().to_lowercase();
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = ?1"
        ))
        .bind(&identifier)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(user)
    }

    /// Get a user by id
    pub async fn get_user(&self, id: &str) -> ApiResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::Database)?
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))
    }

    /// Get a user by normalised username
    pub async fn get_by_username(&self, username: &str) -> ApiResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username.trim().to_lowercase())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))
    }

    /// Verify a plaintext password against the stored hash
    pub fn verify_password(&self, user: &User, plaintext: &str) -> ApiResult<bool> {
        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| ApiError::Internal(format!("Corrupt password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }

    /// Change a user's password; the old password must verify and the new one
    /// must differ from it.
    pub async fn change_password(&self, user_id: &str, old: &str, new: &str) -> ApiResult<()> {
        let old = old.trim();
        let new = new.trim();
        if old.is_empty() || new.is_empty() {
            return Err(ApiError::Validation("Password is required".to_string()));
        }
        if old == new {
            return Err(ApiError::Validation(
                "New password cannot be same as old password".to_string(),
            ));
        }

        let user = self.get_user(user_id).await?;
        if !self.verify_password(&user, old)? {
            return Err(ApiError::Validation("Incorrect password".to_string()));
        }

        let password_hash = hash_password(new)?;
        sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    /// Update display name and email
    pub async fn update_details(&self, user_id: &str, details: UpdateDetails) -> ApiResult<User> {
        let full_name = details.full_name.trim().to_string();
        let email = details.email.trim().to_lowercase();
        if full_name.is_empty() || email.is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        // Email must stay unique across other accounts
        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2")
                .bind(&email)
                .bind(user_id)
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::Database)?;
        if taken > 0 {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        sqlx::query("UPDATE users SET full_name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&full_name)
            .bind(&email)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_user(user_id).await
    }

    /// Replace the avatar URL
    pub async fn set_avatar(&self, user_id: &str, url: &str) -> ApiResult<User> {
        sqlx::query("UPDATE users SET avatar = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(url)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_user(user_id).await
    }

    /// Replace or clear the cover image URL
    pub async fn set_cover_image(&self, user_id: &str, url: Option<&str>) -> ApiResult<User> {
        sqlx::query("UPDATE users SET cover_image = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(url)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        self.get_user(user_id).await
    }

    /// Record a watched video: most recent first, repeat views move the id
    /// to the front instead of duplicating it.
    pub async fn record_watch(&self, user_id: &str, video_id: &str) -> ApiResult<()> {
        let user = self.get_user(user_id).await?;

        let mut history = user.watch_history.0;
        history.retain(|id| id != video_id);
        history.insert(0, video_id.to_string());

        sqlx::query("UPDATE users SET watch_history = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(serde_json::to_string(&history).map_err(|e| {
                ApiError::Internal(format!("Failed to encode watch history: {}", e))
            })?)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(())
    }

    async fn username_exists(&self, username: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1")
            .bind(username)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }

    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }
}

/// Hash a password with Argon2id and a fresh salt
fn hash_password(plaintext: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            full_name: "Ana".to_string(),
            password: "p1".to_string(),
            avatar: "http://cdn/a.png".to_string(),
            cover_image: None,
        }
    }

    async fn store() -> IdentityStore {
        IdentityStore::new(memory_pool().await)
    }

    #[tokio::test]
    async fn test_create_user_normalises_and_hashes() {
        let store = store().await;
        let user = store.create_user(new_user("  AnaBanana ", "Ana@X.com")).await.unwrap();

        assert_eq!(user.username, "anabanana");
        assert_eq!(user.email, "ana@x.com");
        assert_ne!(user.password_hash, "p1");
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(store.verify_password(&user, "p1").unwrap());
        assert!(!store.verify_password(&user, "wrong").unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_user_conflicts() {
        let store = store().await;
        store.create_user(new_user("ana", "a@x.com")).await.unwrap();

        // Same username, different case
        let err = store
            .create_user(new_user("ANA", "other@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Same email
        let err = store
            .create_user(new_user("other", "A@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_user_requires_all_fields() {
        let store = store().await;
        let mut fields = new_user("ana", "a@x.com");
        fields.full_name = "   ".to_string();
        assert!(matches!(
            store.create_user(fields).await.unwrap_err(),
            ApiError::Validation(_)
        ));

        let mut fields = new_user("ana", "a@x.com");
        fields.avatar = "".to_string();
        assert!(matches!(
            store.create_user(fields).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_find_by_credential() {
        let store = store().await;
        store.create_user(new_user("ana", "a@x.com")).await.unwrap();

        assert!(store.find_by_credential("ana").await.unwrap().is_some());
        assert!(store.find_by_credential("A@X.COM").await.unwrap().is_some());
        assert!(store.find_by_credential("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_change_password() {
        let store = store().await;
        let user = store.create_user(new_user("ana", "a@x.com")).await.unwrap();

        // New password must differ
        assert!(store.change_password(&user.id, "p1", "p1").await.is_err());
        // Old password must verify
        assert!(store.change_password(&user.id, "bad", "p2").await.is_err());

        store.change_password(&user.id, "p1", "p2").await.unwrap();
        let user = store.get_user(&user.id).await.unwrap();
        assert!(store.verify_password(&user, "p2").unwrap());
        assert!(!store.verify_password(&user, "p1").unwrap());
    }

    #[tokio::test]
    async fn test_update_details_checks_email_uniqueness() {
        let store = store().await;
        let ana = store.create_user(new_user("ana", "a@x.com")).await.unwrap();
        store.create_user(new_user("bo", "b@x.com")).await.unwrap();

        let err = store
            .update_details(
                &ana.id,
                UpdateDetails {
                    full_name: "Ana".to_string(),
                    email: "b@x.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let updated = store
            .update_details(
                &ana.id,
                UpdateDetails {
                    full_name: "Ana B".to_string(),
                    email: "New@X.com".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Ana B");
        assert_eq!(updated.email, "new@x.com");
    }

    #[tokio::test]
    async fn test_watch_history_moves_to_front() {
        let store = store().await;
        let user = store.create_user(new_user("ana", "a@x.com")).await.unwrap();

        store.record_watch(&user.id, "v1").await.unwrap();
        store.record_watch(&user.id, "v2").await.unwrap();
        store.record_watch(&user.id, "v1").await.unwrap();

        let user = store.get_user(&user.id).await.unwrap();
        assert_eq!(user.watch_history.0, vec!["v1", "v2"]);
    }
}
