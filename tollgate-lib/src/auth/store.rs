use ahash::AHashMap;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::error::{GateError, Result};

/// Purpose a token was issued for. Only authentication tokens are resolved
/// by the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Authentication,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activated: bool,
}

/// Permission codes granted to a user, e.g. `"movies:read"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn new(codes: Vec<String>) -> Self {
        Self(codes)
    }

    pub fn include(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }
}

/// Lookup of users and permissions backing the authentication middleware.
///
/// `Ok(None)` means the token is unknown (or expired); `Err` is a store failure.
pub trait AuthStore: Send + Sync + 'static {
    fn user_for_token(
        &self,
        scope: TokenScope,
        token: &str,
    ) -> impl Future<Output = Result<Option<User>>> + Send;

    fn permissions_for_user(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Permissions>> + Send;
}

/// In-memory [`AuthStore`], used by tests and the demo binary.
#[derive(Default)]
pub struct MemoryAuthStore {
    users: RwLock<AHashMap<i64, User>>,
    tokens: RwLock<AHashMap<(TokenScope, String), i64>>,
    permissions: RwLock<AHashMap<i64, Permissions>>,
    unavailable: AtomicBool,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.id, user);
    }

    pub fn insert_token(&self, scope: TokenScope, token: &str, user_id: i64) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((scope, token.to_string()), user_id);
    }

    pub fn grant(&self, user_id: i64, codes: &[&str]) {
        self.permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, Permissions::new(codes.iter().map(|c| c.to_string()).collect()));
    }

    /// Make every lookup fail, to exercise store error paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(GateError::Store("auth store unavailable".into()));
        }
        Ok(())
    }
}

impl AuthStore for MemoryAuthStore {
    async fn user_for_token(&self, scope: TokenScope, token: &str) -> Result<Option<User>> {
        self.check_available()?;
        let user_id = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(scope, token.to_string()))
            .copied();
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        Ok(self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }

    async fn permissions_for_user(&self, user_id: i64) -> Result<Permissions> {
        self.check_available()?;
        Ok(self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
