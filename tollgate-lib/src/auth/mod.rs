//! Request authentication and authorization gates.
//!
//! The authentication stage resolves a bearer token (from the `Authorization`
//! header, or the `authentication_token` cookie) against an [`AuthStore`] and
//! stores a [`CurrentUser`] in the request extensions. Handlers then use the
//! `require_*` gates to enforce access rules.

mod store;

pub use store::{AuthStore, MemoryAuthStore, Permissions, TokenScope, User};

use http::header::{AUTHORIZATION, COOKIE};
use http::{HeaderMap, Request};

use crate::server::http_result::{HttpError, HttpResult};

/// Cookie carrying the token for browser clients.
pub const TOKEN_COOKIE: &str = "authentication_token";

/// Length of a plaintext token (16 random bytes, base32 without padding).
pub const TOKEN_LENGTH: usize = 26;

/// The user a request is acting as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentUser {
    Anonymous,
    Authenticated(User),
}

impl CurrentUser {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CurrentUser::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Anonymous => None,
            CurrentUser::Authenticated(user) => Some(user),
        }
    }
}

/// The user set by the authentication stage, anonymous if none was set.
pub fn current_user<B>(req: &Request<B>) -> CurrentUser {
    req.extensions()
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or(CurrentUser::Anonymous)
}

/// Resolve the caller of a request.
///
/// - no header and no cookie: anonymous
/// - malformed header, token of the wrong shape (an empty cookie included), or
///   unknown token: `InvalidCredentials`
/// - store failure: `Internal`
pub async fn authenticate<A: AuthStore>(store: &A, headers: &HeaderMap) -> HttpResult<CurrentUser> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(CurrentUser::Anonymous);
    };

    if !is_valid_token_plaintext(token) {
        return Err(HttpError::InvalidCredentials);
    }

    match store.user_for_token(TokenScope::Authentication, token).await {
        Ok(Some(user)) => Ok(CurrentUser::Authenticated(user)),
        Ok(None) => Err(HttpError::InvalidCredentials),
        Err(e) => Err(HttpError::Internal(e.to_string())),
    }
}

/// Extract the bearer token, preferring the `Authorization` header over the cookie.
fn bearer_token(headers: &HeaderMap) -> HttpResult<Option<&str>> {
    match headers.get(AUTHORIZATION) {
        Some(value) => {
            let value = value.to_str().map_err(|_| HttpError::InvalidCredentials)?;
            match value.split_once(' ') {
                Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => {
                    Ok(Some(token))
                }
                _ => Err(HttpError::InvalidCredentials),
            }
        }
        None => Ok(cookie_value(headers, TOKEN_COOKIE)),
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

fn is_valid_token_plaintext(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
}

pub fn require_authenticated_user(user: &CurrentUser) -> HttpResult<&User> {
    user.user().ok_or(HttpError::AuthenticationRequired)
}

/// Authenticated and activated.
pub fn require_activated_user(user: &CurrentUser) -> HttpResult<&User> {
    let user = require_authenticated_user(user)?;
    if !user.activated {
        return Err(HttpError::InactiveAccount);
    }
    Ok(user)
}

/// Activated and granted `code`.
pub async fn require_permission<'a, A: AuthStore>(
    store: &A,
    user: &'a CurrentUser,
    code: &str,
) -> HttpResult<&'a User> {
    let user = require_activated_user(user)?;
    let permissions = store
        .permissions_for_user(user.id)
        .await
        .map_err(|e| HttpError::Internal(e.to_string()))?;
    if !permissions.include(code) {
        return Err(HttpError::NotPermitted);
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const TOKEN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    fn store() -> MemoryAuthStore {
        let store = MemoryAuthStore::new();
        store.insert_user(User {
            id: 1,
            name: "Alice".into(),
            email: "alice@example.com".into(),
            activated: true,
        });
        store.insert_token(TokenScope::Authentication, TOKEN, 1);
        store
    }

    #[tokio::test]
    async fn no_credentials_is_anonymous() {
        let result = authenticate(&store(), &HeaderMap::new()).await;
        assert_eq!(result, Ok(CurrentUser::Anonymous));
    }

    #[tokio::test]
    async fn bearer_header_resolves_user() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        );
        let result = authenticate(&store(), &headers).await;
        assert!(matches!(result, Ok(CurrentUser::Authenticated(ref u)) if u.id == 1));
    }

    #[tokio::test]
    async fn cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; authentication_token=ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        );
        let result = authenticate(&store(), &headers).await;
        assert!(matches!(result, Ok(CurrentUser::Authenticated(_))));
    }

    #[tokio::test]
    async fn empty_cookie_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("authentication_token="));
        let result = authenticate(&store(), &headers).await;
        assert_eq!(result, Err(HttpError::InvalidCredentials));
    }

    #[tokio::test]
    async fn malformed_header_is_rejected() {
        for value in ["Basic abc", "Bearer", "Bearer short", "Bearer a b"] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            let result = authenticate(&store(), &headers).await;
            assert_eq!(result, Err(HttpError::InvalidCredentials), "{value}");
        }
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer ZZZZZZZZZZZZZZZZZZZZZZZZZZ"),
        );
        let result = authenticate(&store(), &headers).await;
        assert_eq!(result, Err(HttpError::InvalidCredentials));
    }

    #[tokio::test]
    async fn store_failure_is_internal() {
        let store = store();
        store.set_unavailable(true);
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        );
        let result = authenticate(&store, &headers).await;
        assert!(matches!(result, Err(HttpError::Internal(_))));
    }

    #[tokio::test]
    async fn gates_check_activation_and_permissions() {
        let store = store();
        store.grant(1, &["movies:read"]);
        let alice = CurrentUser::Authenticated(User {
            id: 1,
            name: "Alice".into(),
            email: "alice@example.com".into(),
            activated: true,
        });

        assert_eq!(
            require_authenticated_user(&CurrentUser::Anonymous),
            Err(HttpError::AuthenticationRequired)
        );
        assert!(require_permission(&store, &alice, "movies:read").await.is_ok());
        assert_eq!(
            require_permission(&store, &alice, "movies:write").await,
            Err(HttpError::NotPermitted)
        );

        let inactive = CurrentUser::Authenticated(User {
            id: 2,
            name: "Bob".into(),
            email: "bob@example.com".into(),
            activated: false,
        });
        assert_eq!(require_activated_user(&inactive), Err(HttpError::InactiveAccount));
    }
}
