//! The card manager: publish, fetch and search cards against a card service.
//!
//! Every remote operation follows the same shape: build a token context,
//! obtain a token, call the service, parse, verify. An unauthorized answer
//! from the service is retried with a force-reloaded token up to
//! [`CardManagerConfig::max_attempts`] total attempts. Everything else fails
//! the operation immediately.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use cardkit_client::{AccessToken, AccessTokenProvider, CardClient, TokenContext, TokenOperation};
use cardkit_core::{
    link_chains, parse_card, parse_cards, Card, CardCrypto, CardId, CardVerifier, ExtraFields,
    ModelSigner, PrivateKey, PublicKey, RawSignedModel, StandardCardVerifier, ValidationError,
    SELF_SIGNER,
};

use crate::error::{ManagerError, Result};

/// Default bound on attempts per operation.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Configuration for the card manager.
#[derive(Debug, Clone)]
pub struct CardManagerConfig {
    /// Total attempts per operation when the service keeps answering unauthorized.
    pub max_attempts: u32,
}

impl Default for CardManagerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Error type returned by a [`SignCallback`].
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Co-signing hook run on every model right before it is published.
///
/// The returned model replaces the one submitted. It may carry additional
/// signatures but must keep the original content.
#[async_trait]
pub trait SignCallback: Send + Sync {
    async fn sign(&self, model: RawSignedModel) -> std::result::Result<RawSignedModel, CallbackError>;
}

/// Inputs for generating and publishing a new card.
#[derive(Debug, Clone)]
pub struct CardParams {
    pub identity: String,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    pub previous_card_id: Option<CardId>,
    pub extra_fields: Option<ExtraFields>,
}

impl CardParams {
    pub fn new(identity: impl Into<String>, public_key: PublicKey, private_key: PrivateKey) -> Self {
        Self {
            identity: identity.into(),
            public_key,
            private_key,
            previous_card_id: None,
            extra_fields: None,
        }
    }

    /// Supersede an existing card.
    pub fn previous_card_id(mut self, id: CardId) -> Self {
        self.previous_card_id = Some(id);
        self
    }

    /// Attach extra fields to the self signature.
    pub fn extra_fields(mut self, fields: ExtraFields) -> Self {
        self.extra_fields = Some(fields);
        self
    }

    /// Check the key pair, and the identity when the card is built from it.
    fn validate(&self, require_identity: bool) -> std::result::Result<(), ValidationError> {
        if require_identity && self.identity.trim().is_empty() {
            return Err(ValidationError::MissingIdentity);
        }
        if self.private_key.public_key() != self.public_key {
            return Err(ValidationError::InvalidParams(
                "private key does not match public key".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`CardManager`].
#[derive(Default)]
pub struct CardManagerBuilder {
    crypto: Option<Arc<dyn CardCrypto>>,
    token_provider: Option<Arc<dyn AccessTokenProvider>>,
    client: Option<Arc<dyn CardClient>>,
    verifier: Option<Arc<dyn CardVerifier>>,
    sign_callback: Option<Arc<dyn SignCallback>>,
    config: CardManagerConfig,
}

impl CardManagerBuilder {
    pub fn crypto(mut self, crypto: Arc<dyn CardCrypto>) -> Self {
        self.crypto = Some(crypto);
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    pub fn client(mut self, client: Arc<dyn CardClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the trust policy. Defaults to a [`StandardCardVerifier`] checking
    /// self signatures.
    pub fn verifier(mut self, verifier: Arc<dyn CardVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn sign_callback(mut self, callback: Arc<dyn SignCallback>) -> Self {
        self.sign_callback = Some(callback);
        self
    }

    pub fn config(mut self, config: CardManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the manager.
    ///
    /// Fails when the crypto capability, token provider or client is missing.
    pub fn build(self) -> Result<CardManager> {
        let crypto = self
            .crypto
            .ok_or_else(|| missing("crypto capability"))?;
        let token_provider = self
            .token_provider
            .ok_or_else(|| missing("access token provider"))?;
        let client = self.client.ok_or_else(|| missing("card client"))?;
        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => Arc::new(StandardCardVerifier::new(Arc::clone(&crypto))),
        };

        Ok(CardManager {
            signer: ModelSigner::new(Arc::clone(&crypto)),
            crypto,
            token_provider,
            client,
            verifier,
            sign_callback: self.sign_callback,
            config: self.config,
        })
    }
}

fn missing(what: &str) -> ValidationError {
    ValidationError::InvalidParams(format!("{what} is required"))
}

/// Orchestrates card operations against a card service.
///
/// Operations are independent; a manager can be shared across tasks.
pub struct CardManager {
    crypto: Arc<dyn CardCrypto>,
    signer: ModelSigner,
    token_provider: Arc<dyn AccessTokenProvider>,
    client: Arc<dyn CardClient>,
    verifier: Arc<dyn CardVerifier>,
    sign_callback: Option<Arc<dyn SignCallback>>,
    config: CardManagerConfig,
}

impl CardManager {
    pub fn builder() -> CardManagerBuilder {
        CardManagerBuilder::default()
    }

    /// Get the configuration.
    pub fn config(&self) -> &CardManagerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a card by id.
    pub async fn get_card_by_id(&self, id: &CardId) -> Result<Card> {
        let mut context = TokenContext::new(TokenOperation::Get);
        let token = self.token_provider.get_token(&context).await?;

        let response = self
            .execute(&mut context, token, move |token| async move {
                self.client.get_card(id, token.as_str()).await
            })
            .await?;

        let card = parse_card(self.crypto.as_ref(), &response.model, response.is_outdated)?;
        if card.id() != id {
            return Err(ManagerError::InvalidResponse(format!(
                "requested card {id}, got {}",
                card.id()
            )));
        }

        self.verify(&card)?;
        Ok(card)
    }

    /// Fetch every card for `identity`, linked into version chains.
    ///
    /// Superseded cards are reachable only through their successor's
    /// `previous_card`; the returned list holds chain heads.
    pub async fn search_cards_by_identity(&self, identity: &str) -> Result<Vec<Card>> {
        if identity.trim().is_empty() {
            return Err(ValidationError::MissingIdentity.into());
        }

        let mut context = TokenContext::new(TokenOperation::Search);
        let token = self.token_provider.get_token(&context).await?;

        let models = self
            .execute(&mut context, token, move |token| async move {
                self.client.search_cards(identity, token.as_str()).await
            })
            .await?;

        let cards = parse_cards(self.crypto.as_ref(), &models)?;
        for card in &cards {
            if card.identity() != identity {
                return Err(ManagerError::InvalidResponse(format!(
                    "search for {identity:?} returned card {} for {:?}",
                    card.id(),
                    card.identity()
                )));
            }
            self.verify(card)?;
        }

        Ok(link_chains(cards)?)
    }

    /// Generate, self-sign and publish a card.
    ///
    /// The card's identity is taken from the granted token, not from
    /// `params.identity`, which only scopes the token request and may be blank.
    pub async fn publish_card(&self, params: CardParams) -> Result<Card> {
        params.validate(false)?;

        let mut context = if params.identity.trim().is_empty() {
            TokenContext::new(TokenOperation::Publish)
        } else {
            TokenContext::for_identity(TokenOperation::Publish, &params.identity)
        };
        let token = self.token_provider.get_token(&context).await?;

        let model = self.generate_model(token.identity(), &params)?;
        self.publish(&mut context, token, model).await
    }

    /// Publish an already built, typically co-signed, model.
    pub async fn publish_raw_model(&self, model: RawSignedModel) -> Result<Card> {
        let content = model.content()?;

        let mut context = TokenContext::for_identity(TokenOperation::Publish, content.identity);
        let token = self.token_provider.get_token(&context).await?;

        self.publish(&mut context, token, model).await
    }

    async fn publish(
        &self,
        context: &mut TokenContext,
        token: AccessToken,
        model: RawSignedModel,
    ) -> Result<Card> {
        if !model.has_signer(SELF_SIGNER) {
            return Err(ValidationError::MissingSelfSignature.into());
        }

        let model = match &self.sign_callback {
            Some(callback) => {
                let signed = callback
                    .sign(model.clone())
                    .await
                    .map_err(|e| ManagerError::SignCallback(e.to_string()))?;
                if signed.content_snapshot() != model.content_snapshot() {
                    return Err(ManagerError::SignCallback(
                        "callback changed the card content".into(),
                    ));
                }
                signed
            }
            None => model,
        };

        let submitted = &model;
        let stored = self
            .execute(context, token, move |token| async move {
                self.client.publish_card(submitted, token.as_str()).await
            })
            .await?;

        if stored.content_snapshot() != model.content_snapshot() {
            return Err(ManagerError::InvalidResponse(
                "published card content differs from the submitted card".into(),
            ));
        }

        let card = parse_card(self.crypto.as_ref(), &stored, false)?;
        self.verify(&card)?;

        tracing::info!(card_id = %card.id(), identity = card.identity(), "published card");
        Ok(card)
    }

    /// Run `call` with the bounded unauthorized-retry policy.
    async fn execute<T, F, Fut>(
        &self,
        context: &mut TokenContext,
        mut token: AccessToken,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = cardkit_client::Result<T>>,
    {
        let mut attempt = 1;
        loop {
            tracing::debug!(
                operation = %context.operation,
                attempt,
                identity = token.identity(),
                "calling card service"
            );

            match call(token).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_unauthorized() && attempt < self.config.max_attempts => {
                    tracing::warn!(
                        operation = %context.operation,
                        attempt,
                        "card service rejected token, reloading: {}",
                        e
                    );
                    context.force_reload = true;
                    token = self.token_provider.get_token(context).await?;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn verify(&self, card: &Card) -> Result<()> {
        if self.verifier.verify_card(card) {
            Ok(())
        } else {
            Err(ManagerError::CardValidation { card_id: *card.id() })
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate a self-signed model without contacting the service.
    pub fn generate_raw_card(&self, params: &CardParams) -> Result<RawSignedModel> {
        params.validate(true)?;
        self.generate_model(&params.identity, params)
    }

    fn generate_model(&self, identity: &str, params: &CardParams) -> Result<RawSignedModel> {
        let mut model = RawSignedModel::generate(
            self.crypto.as_ref(),
            identity,
            &params.public_key,
            params.previous_card_id,
        )?;
        self.signer
            .self_sign(&mut model, &params.private_key, params.extra_fields.as_ref())?;
        Ok(model)
    }

    /// Export a card in the base64 string form.
    pub fn export_card_as_string(&self, card: &Card) -> Result<String> {
        Ok(RawSignedModel::from_card(card)?.export_as_string()?)
    }

    /// Export a card in the JSON form.
    pub fn export_card_as_json(&self, card: &Card) -> Result<String> {
        Ok(RawSignedModel::from_card(card)?.export_as_json()?)
    }

    /// Import a card from the base64 string form.
    pub fn import_card_from_string(&self, s: &str) -> Result<Card> {
        let model = RawSignedModel::import_from_string(s)?;
        Ok(parse_card(self.crypto.as_ref(), &model, false)?)
    }

    /// Import a card from the JSON form.
    pub fn import_card_from_json(&self, json: &str) -> Result<Card> {
        let model = RawSignedModel::import_from_json(json)?;
        Ok(parse_card(self.crypto.as_ref(), &model, false)?)
    }
}
