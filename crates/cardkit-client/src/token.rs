//! Access tokens and the providers that grant them.
//!
//! Every card manager operation asks an [`AccessTokenProvider`] for a bearer
//! token through a fresh [`TokenContext`]. After an unauthorized response
//! the manager sets `force_reload` on that context before asking again.

use async_trait::async_trait;
use std::fmt;
use tokio::sync::RwLock;

use crate::error::{ClientError, Result};

/// The kind of operation a token is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenOperation {
    Get,
    Search,
    Publish,
}

impl TokenOperation {
    /// Lowercase operation tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenOperation::Get => "get",
            TokenOperation::Search => "search",
            TokenOperation::Publish => "publish",
        }
    }
}

impl fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-operation token request context.
///
/// Created once per outer operation and private to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenContext {
    /// The operation being authorized.
    pub operation: TokenOperation,

    /// Identity the token is requested for (publish only).
    pub identity: Option<String>,

    /// Set after an unauthorized response; cached tokens must be refreshed.
    pub force_reload: bool,
}

impl TokenContext {
    /// Context for an operation with no identity.
    pub fn new(operation: TokenOperation) -> Self {
        Self {
            operation,
            identity: None,
            force_reload: false,
        }
    }

    /// Context for an operation on behalf of `identity`.
    pub fn for_identity(operation: TokenOperation, identity: impl Into<String>) -> Self {
        Self {
            operation,
            identity: Some(identity.into()),
            force_reload: false,
        }
    }
}

/// A bearer credential bound to an identity.
///
/// Debug output never includes the credential itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    identity: String,
    value: String,
}

impl AccessToken {
    pub fn new(identity: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            value: value.into(),
        }
    }

    /// The identity this token was granted to.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The bearer credential string.
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Grants access tokens for card service calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Obtain a token for the operation described by `context`.
    async fn get_token(&self, context: &TokenContext) -> Result<AccessToken>;
}

/// Always returns the same token.
#[derive(Debug, Clone)]
pub struct ConstAccessTokenProvider {
    token: AccessToken,
}

impl ConstAccessTokenProvider {
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenProvider for ConstAccessTokenProvider {
    async fn get_token(&self, _context: &TokenContext) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Where a [`CachingTokenProvider`] gets fresh tokens from.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Mint or fetch a new token.
    async fn fetch_token(&self, context: &TokenContext) -> Result<AccessToken>;
}

/// Caches the last token from a [`TokenSource`].
///
/// The cached token is reused until a context arrives with `force_reload`
/// set, or until it was granted to a different identity than the one
/// requested.
pub struct CachingTokenProvider<S> {
    source: S,
    cached: RwLock<Option<AccessToken>>,
}

impl<S: TokenSource> CachingTokenProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Drop the cached token.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

#[async_trait]
impl<S: TokenSource> AccessTokenProvider for CachingTokenProvider<S> {
    async fn get_token(&self, context: &TokenContext) -> Result<AccessToken> {
        if !context.force_reload {
            if let Some(token) = self.cached.read().await.as_ref() {
                let same_identity = context
                    .identity
                    .as_deref()
                    .map_or(true, |identity| identity == token.identity());
                if same_identity {
                    return Ok(token.clone());
                }
            }
        }

        tracing::debug!(
            operation = %context.operation,
            force_reload = context.force_reload,
            "fetching access token"
        );
        let token = self.source.fetch_token(context).await?;
        if token.as_str().is_empty() {
            return Err(ClientError::TokenUnavailable(
                "token source returned an empty token".into(),
            ));
        }
        *self.cached.write().await = Some(token.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self, context: &TokenContext) -> Result<AccessToken> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            let identity = context.identity.clone().unwrap_or_else(|| "alice".into());
            Ok(AccessToken::new(identity, format!("token-{n}")))
        }
    }

    fn caching() -> CachingTokenProvider<CountingSource> {
        CachingTokenProvider::new(CountingSource {
            fetches: AtomicU32::new(0),
        })
    }

    #[tokio::test]
    async fn test_const_provider() {
        let provider = ConstAccessTokenProvider::new(AccessToken::new("alice", "secret"));
        let token = provider
            .get_token(&TokenContext::new(TokenOperation::Get))
            .await
            .unwrap();
        assert_eq!(token.identity(), "alice");
        assert_eq!(token.as_str(), "secret");
    }

    #[tokio::test]
    async fn test_caching_reuses_token() {
        let provider = caching();
        let ctx = TokenContext::new(TokenOperation::Search);

        let first = provider.get_token(&ctx).await.unwrap();
        let second = provider.get_token(&ctx).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_caching_force_reload_refreshes() {
        let provider = caching();
        let mut ctx = TokenContext::new(TokenOperation::Get);

        let first = provider.get_token(&ctx).await.unwrap();
        ctx.force_reload = true;
        let second = provider.get_token(&ctx).await.unwrap();

        assert_ne!(first.as_str(), second.as_str());
        assert_eq!(second.as_str(), "token-2");

        ctx.force_reload = false;
        assert_eq!(provider.get_token(&ctx).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_caching_refetches_for_other_identity() {
        let provider = caching();
        provider
            .get_token(&TokenContext::for_identity(TokenOperation::Publish, "alice"))
            .await
            .unwrap();
        let bob = provider
            .get_token(&TokenContext::for_identity(TokenOperation::Publish, "bob"))
            .await
            .unwrap();

        assert_eq!(bob.identity(), "bob");
        assert_eq!(provider.source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let provider = caching();
        let ctx = TokenContext::new(TokenOperation::Get);
        provider.get_token(&ctx).await.unwrap();
        provider.invalidate().await;
        provider.get_token(&ctx).await.unwrap();
        assert_eq!(provider.source.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_token_debug_hides_value() {
        let debug = format!("{:?}", AccessToken::new("alice", "s3cr3t"));
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cr3t"));
    }
}
