//! Scripted collaborators for card manager tests.
//!
//! [`ScriptedClient`] fails calls according to a script before delegating to
//! an in-memory card service. [`RecordingTokenProvider`] hands out numbered
//! tokens and records every context it was asked with.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use cardkit_client::{
    AccessToken, AccessTokenProvider, CardClient, ClientError, GetCardResponse, MemoryCardService,
    Result, TokenContext,
};
use cardkit_core::{Card, CardCrypto, CardId, CardVerifier, RawSignedModel};

/// A scripted response for one card service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Reject the token.
    Unauthorized,
    /// Fail with a service error of this status.
    Fail(u16),
    /// Delegate to the in-memory service.
    Pass,
}

/// Card client that replays a script, then delegates.
pub struct ScriptedClient {
    inner: MemoryCardService,
    script: Mutex<VecDeque<Reply>>,
    /// Reply once the script is exhausted.
    fallback: Reply,
    calls: AtomicU32,
    tokens: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Replay `script`, then pass every further call through.
    pub fn new(crypto: Arc<dyn CardCrypto>, script: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            inner: MemoryCardService::new(crypto),
            script: Mutex::new(script.into_iter().collect()),
            fallback: Reply::Pass,
            calls: AtomicU32::new(0),
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Pass every call through.
    pub fn passing(crypto: Arc<dyn CardCrypto>) -> Self {
        Self::new(crypto, std::iter::empty())
    }

    /// Reject every call as unauthorized.
    pub fn always_unauthorized(crypto: Arc<dyn CardCrypto>) -> Self {
        Self {
            fallback: Reply::Unauthorized,
            ..Self::new(crypto, std::iter::empty())
        }
    }

    /// Reject the first `n` calls as unauthorized.
    pub fn unauthorized_times(crypto: Arc<dyn CardCrypto>, n: usize) -> Self {
        Self::new(crypto, std::iter::repeat(Reply::Unauthorized).take(n))
    }

    /// The backing in-memory service, for seeding cards.
    pub fn service(&self) -> &MemoryCardService {
        &self.inner
    }

    /// Number of calls received, including rejected ones.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens received, in call order.
    pub async fn tokens(&self) -> Vec<String> {
        self.tokens.lock().await.clone()
    }

    async fn next_reply(&self, token: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().await.push(token.to_string());

        let reply = self.script.lock().await.pop_front().unwrap_or(self.fallback);
        match reply {
            Reply::Unauthorized => Err(ClientError::Unauthorized("scripted".into())),
            Reply::Fail(status) => Err(ClientError::Service {
                status,
                message: "scripted failure".into(),
            }),
            Reply::Pass => Ok(()),
        }
    }
}

#[async_trait]
impl CardClient for ScriptedClient {
    async fn get_card(&self, id: &CardId, token: &str) -> Result<GetCardResponse> {
        self.next_reply(token).await?;
        self.inner.get_card(id, token).await
    }

    async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>> {
        self.next_reply(token).await?;
        self.inner.search_cards(identity, token).await
    }

    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
        self.next_reply(token).await?;
        self.inner.publish_card(model, token).await
    }
}

/// Token provider that issues `token-1`, `token-2`, ... for a fixed identity.
pub struct RecordingTokenProvider {
    identity: String,
    issued: AtomicU32,
    contexts: Mutex<Vec<TokenContext>>,
}

impl RecordingTokenProvider {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            issued: AtomicU32::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Every context passed to `get_token`, in call order.
    pub async fn contexts(&self) -> Vec<TokenContext> {
        self.contexts.lock().await.clone()
    }
}

#[async_trait]
impl AccessTokenProvider for RecordingTokenProvider {
    async fn get_token(&self, context: &TokenContext) -> Result<AccessToken> {
        self.contexts.lock().await.push(context.clone());
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(self.identity.clone(), format!("token-{n}")))
    }
}

/// Token provider that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTokenProvider;

#[async_trait]
impl AccessTokenProvider for FailingTokenProvider {
    async fn get_token(&self, _context: &TokenContext) -> Result<AccessToken> {
        Err(ClientError::TokenUnavailable("scripted".into()))
    }
}

/// Rejects every card.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAllVerifier;

impl CardVerifier for RejectAllVerifier {
    fn verify_card(&self, _card: &Card) -> bool {
        false
    }
}
