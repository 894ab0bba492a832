//! Card service abstraction.
//!
//! The card service is the remote authority that stores published cards.
//! Implementations may use HTTP or any other transport; they only have to
//! distinguish [`ClientError::Unauthorized`] from other failures.

use async_trait::async_trait;

use cardkit_core::{CardId, RawSignedModel};

use crate::error::Result;

/// A card fetched by id, with the service's outdated flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCardResponse {
    pub model: RawSignedModel,

    /// Set when the service knows a newer card supersedes this one.
    pub is_outdated: bool,
}

/// Remote card service calls, each authorized by a bearer token.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CardClient: Send + Sync {
    /// Fetch a single card.
    async fn get_card(&self, id: &CardId, token: &str) -> Result<GetCardResponse>;

    /// Fetch every card published for `identity`.
    async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>>;

    /// Publish a model, returning the model as stored by the service.
    async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel>;
}

/// A simple in-memory card service for testing.
pub mod memory {
    use super::*;
    use cardkit_core::{generate_card_id, CardCrypto, ModelSigner, PrivateKey};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::error::ClientError;

    #[derive(Debug, Clone)]
    struct StoredCard {
        model: RawSignedModel,
        identity: String,
        is_outdated: bool,
    }

    #[derive(Default)]
    struct State {
        cards: HashMap<CardId, StoredCard>,
        /// Publish order, for stable search results.
        order: Vec<CardId>,
    }

    /// In-memory card service.
    ///
    /// Published cards are keyed by their content-derived id. Publishing a
    /// card whose `previous_card_id` names a stored card marks that card
    /// outdated.
    pub struct MemoryCardService {
        crypto: Arc<dyn CardCrypto>,
        required_token: Option<String>,
        service_signer: Option<(String, PrivateKey)>,
        state: RwLock<State>,
    }

    impl MemoryCardService {
        /// Create a service that accepts any non-empty token.
        pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
            Self {
                crypto,
                required_token: None,
                service_signer: None,
                state: RwLock::new(State::default()),
            }
        }

        /// Only accept `token`; anything else is unauthorized.
        pub fn require_token(mut self, token: impl Into<String>) -> Self {
            self.required_token = Some(token.into());
            self
        }

        /// Countersign every published card as `signer`.
        pub fn with_service_signer(mut self, signer: impl Into<String>, key: PrivateKey) -> Self {
            self.service_signer = Some((signer.into(), key));
            self
        }

        /// Number of stored cards.
        pub async fn len(&self) -> usize {
            self.state.read().await.cards.len()
        }

        /// Whether no card has been published yet.
        pub async fn is_empty(&self) -> bool {
            self.state.read().await.cards.is_empty()
        }

        fn authorize(&self, token: &str) -> Result<()> {
            if token.is_empty() {
                return Err(ClientError::Unauthorized("missing token".into()));
            }
            match &self.required_token {
                Some(required) if required != token => {
                    Err(ClientError::Unauthorized("token rejected".into()))
                }
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl CardClient for MemoryCardService {
        async fn get_card(&self, id: &CardId, token: &str) -> Result<GetCardResponse> {
            self.authorize(token)?;
            let state = self.state.read().await;
            let stored = state
                .cards
                .get(id)
                .ok_or_else(|| ClientError::NotFound(id.to_hex()))?;
            Ok(GetCardResponse {
                model: stored.model.clone(),
                is_outdated: stored.is_outdated,
            })
        }

        async fn search_cards(&self, identity: &str, token: &str) -> Result<Vec<RawSignedModel>> {
            self.authorize(token)?;
            let state = self.state.read().await;
            Ok(state
                .order
                .iter()
                .filter_map(|id| state.cards.get(id))
                .filter(|stored| stored.identity == identity)
                .map(|stored| stored.model.clone())
                .collect())
        }

        async fn publish_card(&self, model: &RawSignedModel, token: &str) -> Result<RawSignedModel> {
            self.authorize(token)?;

            let content = model.content()?;
            let id = generate_card_id(self.crypto.as_ref(), model.content_snapshot())?;

            let mut stored_model = model.clone();
            if let Some((signer, key)) = &self.service_signer {
                ModelSigner::new(Arc::clone(&self.crypto))
                    .sign(&mut stored_model, signer, key, None)
                    .map_err(|e| ClientError::Service {
                        status: 400,
                        message: e.to_string(),
                    })?;
            }

            let mut state = self.state.write().await;
            if state.cards.contains_key(&id) {
                return Err(ClientError::Service {
                    status: 409,
                    message: format!("card {id} already exists"),
                });
            }

            if let Some(previous_id) = content.previous_card_id {
                let previous = state.cards.get_mut(&previous_id).ok_or_else(|| {
                    ClientError::Service {
                        status: 400,
                        message: format!("previous card {previous_id} not found"),
                    }
                })?;
                if previous.identity != content.identity {
                    return Err(ClientError::Service {
                        status: 400,
                        message: "previous card belongs to another identity".into(),
                    });
                }
                if previous.is_outdated {
                    return Err(ClientError::Service {
                        status: 409,
                        message: format!("previous card {previous_id} is already superseded"),
                    });
                }
                previous.is_outdated = true;
            }

            tracing::debug!(card_id = %id, identity = %content.identity, "stored card");
            state.cards.insert(
                id,
                StoredCard {
                    model: stored_model.clone(),
                    identity: content.identity,
                    is_outdated: false,
                },
            );
            state.order.push(id);
            Ok(stored_model)
        }
    }
}
