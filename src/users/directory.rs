use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::SubjectId;
use crate::error::AppError;
use crate::users::models::{NewUser, User};

/// Lookup and creation of login accounts.
///
/// This is the password-check collaborator of the token gate: handlers ask it
/// for a user, verify the password, then ask the gate for a credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with `AppError::Conflict` if the username or email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;
}

pub fn verify_password(user: &User, password: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, &user.password_hash)?)
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    next_id: u64,
}

/// Process-local directory; contents are lost on restart.
pub struct InMemoryUserDirectory {
    inner: RwLock<Inner>,
    hash_cost: u32,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    pub fn with_cost(hash_cost: u32) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            hash_cost,
        }
    }
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(username).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let password_hash = bcrypt::hash(&new_user.password, self.hash_cost)?;

        let mut inner = self.inner.write().await;
        let taken = inner.users.values().any(|u| {
            u.username == new_user.username || u.email.eq_ignore_ascii_case(&new_user.email)
        });
        if taken {
            return Err(AppError::Conflict("Username or email already exists".into()));
        }

        inner.next_id += 1;
        let user = User {
            id: SubjectId(inner.next_id),
            username: new_user.username,
            email: new_user.email,
            password_hash,
            created_at: Utc::now(),
        };
        inner.users.insert(user.username.clone(), user.clone());

        info!(user_id = %user.id, "user created");
        Ok(user)
    }
}
