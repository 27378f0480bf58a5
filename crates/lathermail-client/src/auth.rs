//! Per-request authentication headers
//!
//! lathermail scopes every request to an inbox with two headers: the inbox
//! identifier and its password. Listing inboxes is the one call made
//! without an inbox identifier.

use std::fmt;

/// Header carrying the inbox identifier
pub const INBOX_HEADER: &str = "X-Mail-Inbox";

/// Header carrying the inbox password
pub const PASSWORD_HEADER: &str = "X-Mail-Password";

/// Stored inbox credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Inbox identifier
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Headers for a request, falling back to the stored password
    ///
    /// An empty `password` counts as absent. With `user` set to `None` the
    /// inbox header is omitted entirely.
    pub fn headers(&self, user: Option<&str>, password: Option<&str>) -> AuthHeaders {
        AuthHeaders {
            inbox: user.map(str::to_string),
            password: password.filter(|p| !p.is_empty()).unwrap_or(&self.password).to_string(),
        }
    }

    /// Headers identifying the stored inbox
    pub fn default_headers(&self) -> AuthHeaders {
        self.headers(Some(&self.user), None)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The auth header pair sent with one request
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    inbox: Option<String>,
    password: String,
}

impl AuthHeaders {
    pub fn inbox(&self) -> Option<&str> {
        self.inbox.as_deref()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Header name/value pairs, in the order they are sent
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(inbox) = &self.inbox {
            pairs.push((INBOX_HEADER, inbox.clone()));
        }
        pairs.push((PASSWORD_HEADER, self.password.clone()));
        pairs
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("inbox", &self.inbox)
            .field("password", &"<redacted>")
            .finish()
    }
}
