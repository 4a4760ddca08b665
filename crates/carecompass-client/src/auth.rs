use async_trait::async_trait;

/// Source of the bearer credential issued by the identity provider
///
/// Returning `None` sends the request anonymously instead of failing it.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// No credential at all
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

#[async_trait]
impl TokenProvider for Anonymous {
    async fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A fixed, already-issued ID token
#[derive(Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Reads the token from an environment variable. Unset or blank means `None`.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(|token| Self::new(token.trim()))
    }
}

// Keep the credential out of logs
impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").field("token", &"<redacted>").finish()
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}
