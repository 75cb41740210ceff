use std::fmt;

use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Identity handed over by the session provider.
///
/// The client never signs in on its own; it only needs the user id and, when
/// the backend expects one, the session's access token.
#[derive(Clone)]
pub struct AuthUser {
    pub id: Uuid,
    access_token: Option<String>,
}

impl AuthUser {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub(crate) fn bearer(&self) -> Option<String> {
        self.access_token.as_ref().map(|t| format!("Bearer {t}"))
    }
}

// Keeps the token out of logs.
impl fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthUser")
            .field("id", &self.id)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

pub(crate) fn require_user(user: Option<&AuthUser>) -> ClientResult<&AuthUser> {
    match user {
        Some(u) if !u.id.is_nil() => Ok(u),
        Some(_) => Err(ClientError::precondition("user id is nil")),
        None => Err(ClientError::precondition("no authenticated user")),
    }
}
