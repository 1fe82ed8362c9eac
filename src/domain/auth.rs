//! Login check against a fixed credential set.
//!
//! Passwords are compared in plaintext. This is a demo gate, not a security
//! boundary.

use std::sync::Arc;

use async_graphql::{Enum, SimpleObject};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// The compiled-in set used when configuration supplies none.
    pub fn defaults() -> Vec<Credential> {
        vec![
            Credential::new("user1", "pass1"),
            Credential::new("user2", "pass2"),
        ]
    }
}

pub trait CredentialStore: Send + Sync {
    fn password_for(&self, username: &str) -> Option<&str>;
}

pub struct StaticCredentials {
    entries: Vec<Credential>,
}

impl StaticCredentials {
    pub fn new(entries: Vec<Credential>) -> Self {
        Self { entries }
    }
}

impl CredentialStore for StaticCredentials {
    fn password_for(&self, username: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|c| c.username == username)
            .map(|c| c.password.as_str())
    }
}

/// Which field the most recent failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum LoginErrorTag {
    Uname,
    Pass,
}

impl LoginErrorTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginErrorTag::Uname => "uname",
            LoginErrorTag::Pass => "pass",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            LoginErrorTag::Uname => "invalid username",
            LoginErrorTag::Pass => "invalid password",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Form state carried between submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct LoginState {
    pub attempts: u32,
    pub submitted: bool,
    pub error: Option<LoginErrorTag>,
}

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Check one submission. Failures bump the counter and replace any
    /// earlier error; success forwards the counter including this attempt.
    pub fn attempt(&self, state: &LoginState, form: &LoginForm) -> LoginState {
        let attempts = state.attempts.saturating_add(1);

        let error = match self.store.password_for(&form.username) {
            None => Some(LoginErrorTag::Uname),
            Some(expected) if expected != form.password => Some(LoginErrorTag::Pass),
            Some(_) => None,
        };

        match error {
            Some(tag) => {
                warn!(field = tag.as_str(), attempts, "login rejected");
                LoginState {
                    attempts,
                    submitted: false,
                    error: Some(tag),
                }
            }
            None => {
                info!(username = %form.username, attempts, "login accepted");
                LoginState {
                    attempts,
                    submitted: true,
                    error: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> Authenticator {
        Authenticator::new(Arc::new(StaticCredentials::new(Credential::defaults())))
    }

    fn form(username: &str, password: &str) -> LoginForm {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn wrong_password_is_tagged_pass() {
        let state = authenticator().attempt(&LoginState::default(), &form("user1", "wrong"));
        assert_eq!(state.error, Some(LoginErrorTag::Pass));
        assert_eq!(state.attempts, 1);
        assert!(!state.submitted);
    }

    #[test]
    fn unknown_user_is_tagged_uname() {
        let state = authenticator().attempt(&LoginState::default(), &form("nouser", "x"));
        assert_eq!(state.error, Some(LoginErrorTag::Uname));
        assert!(!state.submitted);
    }

    #[test]
    fn success_forwards_attempt_count() {
        let auth = authenticator();
        let first = auth.attempt(&LoginState::default(), &form("user1", "wrong"));
        let second = auth.attempt(&first, &form("nouser", "x"));
        assert_eq!(second.error, Some(LoginErrorTag::Uname));
        assert_eq!(second.attempts, 2);

        let done = auth.attempt(&second, &form("user1", "pass1"));
        assert!(done.submitted);
        assert_eq!(done.error, None);
        assert_eq!(done.attempts, 3);
    }

    #[test]
    fn only_latest_error_is_kept() {
        let auth = authenticator();
        let first = auth.attempt(&LoginState::default(), &form("nouser", "x"));
        let second = auth.attempt(&first, &form("user2", "nope"));
        assert_eq!(second.error, Some(LoginErrorTag::Pass));
    }

    #[test]
    fn store_can_be_swapped() {
        struct Single;
        impl CredentialStore for Single {
            fn password_for(&self, username: &str) -> Option<&str> {
                (username == "admin").then_some("hunter2")
            }
        }
        let auth = Authenticator::new(Arc::new(Single));
        assert!(auth.attempt(&LoginState::default(), &form("admin", "hunter2")).submitted);
        assert_eq!(
            auth.attempt(&LoginState::default(), &form("user1", "pass1")).error,
            Some(LoginErrorTag::Uname)
        );
    }
}
