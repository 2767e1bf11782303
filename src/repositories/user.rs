//! # User Repository
//!
//! Users are the validators and editors recorded on validations. Each user
//! owns one API token; only its SHA-256 digest is stored.

use std::sync::LazyLock;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::RngCore;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel as UserActiveModel, Entity as User, Model as UserModel};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]{1,150}$").expect("valid username pattern"));

/// Hex-encoded SHA-256 digest of an API token.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Generate a new random API token (32 bytes, URL-safe base64).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Repository for user database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a user and return it together with its plaintext token.
    ///
    /// The token is only available here; it cannot be recovered later.
    pub async fn create_user(
        &self,
        username: &str,
        is_staff: bool,
    ) -> Result<(UserModel, String), RepositoryError> {
        let username = username.trim();
        if !USERNAME_RE.is_match(username) {
            return Err(RepositoryError::field(
                "username",
                "Use up to 150 letters, digits and @/./+/-/_ characters",
            ));
        }

        let token = generate_token();
        let user = UserActiveModel {
            username: Set(username.to_string()),
            is_staff: Set(is_staff),
            api_token_hash: Set(hash_token(&token)),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let model = user
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(user_id = model.id, username = %model.username, is_staff, "Created user");

        Ok((model, token))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Resolve the user owning `token`, if any.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<UserModel>, RepositoryError> {
        let digest = hash_token(token);
        let candidate = User::find()
            .filter(user::Column::ApiTokenHash.eq(digest.clone()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(candidate.filter(|user| {
            bool::from(user.api_token_hash.as_bytes().ct_eq(digest.as_bytes()))
        }))
    }

    pub async fn list(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .order_by_asc(user::Column::Username)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        let digest = hash_token("secret");
        assert_eq!(digest.len(), 64);
        assert_eq!(
            digest,
            "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        );
    }

    #[test]
    fn generated_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn username_pattern() {
        assert!(USERNAME_RE.is_match("maria.silva"));
        assert!(USERNAME_RE.is_match("ops+noc@empresa"));
        assert!(!USERNAME_RE.is_match(""));
        assert!(!USERNAME_RE.is_match("has space"));
    }
}
