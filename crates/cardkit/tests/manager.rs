//! Card manager behaviour against scripted collaborators.

use async_trait::async_trait;
use std::sync::Arc;

use cardkit::client::{CardClient, ClientError, GetCardResponse, TokenOperation};
use cardkit::core::{
    CardCrypto, CardId, Ed25519Crypto, Keypair, ModelSigner, RawSignedModel, ValidationError,
    SELF_SIGNER,
};
use cardkit::{
    CallbackError, CardManager, CardManagerConfig, CardParams, ManagerError, SignCallback,
};
use cardkit_testkit::{
    multi_owner_fixtures, FailingTokenProvider, RecordingTokenProvider, RejectAllVerifier, Reply,
    ScriptedClient, TestFixture,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn crypto() -> Arc<dyn CardCrypto> {
    Arc::new(Ed25519Crypto::new())
}

struct Harness {
    manager: CardManager,
    client: Arc<ScriptedClient>,
    tokens: Arc<RecordingTokenProvider>,
}

fn harness(client: ScriptedClient) -> Harness {
    harness_with(client, |builder| builder)
}

fn harness_with(
    client: ScriptedClient,
    configure: impl FnOnce(cardkit::CardManagerBuilder) -> cardkit::CardManagerBuilder,
) -> Harness {
    init_tracing();
    let client = Arc::new(client);
    let tokens = Arc::new(RecordingTokenProvider::new("alice"));
    let builder = CardManager::builder()
        .crypto(crypto())
        .token_provider(tokens.clone())
        .client(client.clone());
    let manager = configure(builder).build().unwrap();
    Harness {
        manager,
        client,
        tokens,
    }
}

fn alice_params() -> CardParams {
    let keypair = Keypair::from_seed(&[0x42; 32]);
    CardParams::new("alice", keypair.public_key(), keypair.private_key().clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Retry policy
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_retries_stop_after_three_attempts() {
    let h = harness(ScriptedClient::always_unauthorized(crypto()));

    let err = h
        .manager
        .search_cards_by_identity("alice")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(h.client.calls(), 3);
    assert_eq!(h.client.tokens().await, vec!["token-1", "token-2", "token-3"]);
}

#[tokio::test]
async fn test_retry_sets_force_reload() {
    let h = harness(ScriptedClient::always_unauthorized(crypto()));
    let _ = h.manager.get_card_by_id(&CardId::from_bytes([0x01; 32])).await;

    let contexts = h.tokens.contexts().await;
    assert_eq!(contexts.len(), 3);
    assert!(!contexts[0].force_reload);
    assert!(contexts[1].force_reload);
    assert!(contexts[2].force_reload);
    assert!(contexts.iter().all(|c| c.operation == TokenOperation::Get));
}

#[tokio::test]
async fn test_success_on_second_attempt() {
    let h = harness(ScriptedClient::unauthorized_times(crypto(), 1));

    let card = h.manager.publish_card(alice_params()).await.unwrap();

    assert_eq!(card.identity(), "alice");
    assert_eq!(h.client.calls(), 2);
    assert_eq!(h.client.tokens().await, vec!["token-1", "token-2"]);
}

#[tokio::test]
async fn test_configured_attempt_bound() {
    let h = harness_with(ScriptedClient::always_unauthorized(crypto()), |b| {
        b.config(CardManagerConfig { max_attempts: 5 })
    });

    assert!(h
        .manager
        .search_cards_by_identity("alice")
        .await
        .unwrap_err()
        .is_unauthorized());
    assert_eq!(h.client.calls(), 5);
}

#[tokio::test]
async fn test_service_failure_is_not_retried() {
    let h = harness(ScriptedClient::new(crypto(), [Reply::Fail(503)]));

    let err = h
        .manager
        .search_cards_by_identity("alice")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManagerError::Client(ClientError::Service { status: 503, .. })
    ));
    assert_eq!(h.client.calls(), 1);
}

#[tokio::test]
async fn test_token_failure_propagates_without_call() {
    init_tracing();
    let client = Arc::new(ScriptedClient::passing(crypto()));
    let manager = CardManager::builder()
        .crypto(crypto())
        .token_provider(Arc::new(FailingTokenProvider))
        .client(client.clone())
        .build()
        .unwrap();

    let err = manager.publish_card(alice_params()).await.unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Client(ClientError::TokenUnavailable(_))
    ));
    assert_eq!(client.calls(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Verifier veto
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_verifier_veto_on_every_operation() {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let seeded = fixture.make_model("alice", 1_736_870_400, None);
    let seeded_id = *fixture.parse(&seeded).id();

    let h = harness_with(ScriptedClient::passing(crypto()), |b| {
        b.verifier(Arc::new(RejectAllVerifier))
    });
    h.client.service().publish_card(&seeded, "seed").await.unwrap();

    let get = h.manager.get_card_by_id(&seeded_id).await.unwrap_err();
    assert!(matches!(get, ManagerError::CardValidation { card_id } if card_id == seeded_id));

    let search = h.manager.search_cards_by_identity("alice").await.unwrap_err();
    assert!(matches!(search, ManagerError::CardValidation { .. }));

    let publish = h.manager.publish_card(alice_params()).await.unwrap_err();
    assert!(matches!(publish, ManagerError::CardValidation { .. }));

    // Every call reached the service and succeeded there.
    assert_eq!(h.client.calls(), 3);
    assert_eq!(h.client.service().len().await, 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// End to end
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_alice_end_to_end() {
    let h = harness(ScriptedClient::passing(crypto()));
    let crypto = Ed25519Crypto::new();
    let keypair = Keypair::from_seed(&[0x42; 32]);

    let mut model = RawSignedModel::generate(&crypto, "alice", &keypair.public_key(), None).unwrap();
    let json = model.export_as_json().unwrap();
    assert!(!json.contains("previous_card_id"));

    ModelSigner::new(Arc::new(crypto))
        .self_sign(&mut model, keypair.private_key(), None)
        .unwrap();

    let card = h.manager.publish_raw_model(model.clone()).await.unwrap();

    assert_eq!(card.identity(), "alice");
    assert_eq!(card.signatures().len(), 1);
    assert_eq!(card.signatures()[0].signer, SELF_SIGNER);

    let hash = crypto.generate_sha512(model.content_snapshot());
    assert_eq!(card.id().as_bytes()[..], hash[..32]);

    let contexts = h.tokens.contexts().await;
    assert_eq!(contexts[0].operation, TokenOperation::Publish);
    assert_eq!(contexts[0].identity.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_publish_then_get_and_search() {
    let h = harness(ScriptedClient::passing(crypto()));

    let published = h.manager.publish_card(alice_params()).await.unwrap();
    let fetched = h.manager.get_card_by_id(published.id()).await.unwrap();
    assert_eq!(fetched, published);
    assert!(!fetched.is_outdated());

    let found = h.manager.search_cards_by_identity("alice").await.unwrap();
    assert_eq!(found, vec![published]);
}

#[tokio::test]
async fn test_search_links_versions() {
    let h = harness(ScriptedClient::passing(crypto()));

    let v1 = h.manager.publish_card(alice_params()).await.unwrap();
    let v2 = h
        .manager
        .publish_card(alice_params().previous_card_id(*v1.id()))
        .await
        .unwrap();
    let v3 = h
        .manager
        .publish_card(alice_params().previous_card_id(*v2.id()))
        .await
        .unwrap();

    let heads = h.manager.search_cards_by_identity("alice").await.unwrap();
    assert_eq!(heads.len(), 1);

    let head = &heads[0];
    assert_eq!(head.id(), v3.id());
    let previous = head.previous_card().unwrap();
    assert_eq!(previous.id(), v2.id());
    assert!(previous.is_outdated());
    assert_eq!(previous.previous_card().unwrap().id(), v1.id());

    let old = h.manager.get_card_by_id(v1.id()).await.unwrap();
    assert!(old.is_outdated());
}

#[tokio::test]
async fn test_extra_fields_survive_publish() {
    let h = harness(ScriptedClient::passing(crypto()));
    let mut extra = cardkit::ExtraFields::new();
    extra.insert("device".into(), "laptop".into());

    let card = h
        .manager
        .publish_card(alice_params().extra_fields(extra.clone()))
        .await
        .unwrap();

    assert_eq!(card.self_signature().unwrap().extra_fields, Some(extra));
}

// ─────────────────────────────────────────────────────────────────────────────
// Co-signing hook
// ─────────────────────────────────────────────────────────────────────────────

struct WitnessCallback {
    signer: ModelSigner,
    key: Keypair,
}

#[async_trait]
impl SignCallback for WitnessCallback {
    async fn sign(&self, mut model: RawSignedModel) -> Result<RawSignedModel, CallbackError> {
        self.signer
            .sign(&mut model, "witness", self.key.private_key(), None)?;
        Ok(model)
    }
}

struct ContentSwapCallback;

#[async_trait]
impl SignCallback for ContentSwapCallback {
    async fn sign(&self, _model: RawSignedModel) -> Result<RawSignedModel, CallbackError> {
        Ok(TestFixture::with_seed([0x09; 32]).make_model("mallory", 1, None))
    }
}

struct FailingCallback;

#[async_trait]
impl SignCallback for FailingCallback {
    async fn sign(&self, _model: RawSignedModel) -> Result<RawSignedModel, CallbackError> {
        Err("witness offline".into())
    }
}

#[tokio::test]
async fn test_sign_callback_cosigns_before_submit() {
    let witness = Keypair::from_seed(&[0x07; 32]);
    let callback = WitnessCallback {
        signer: ModelSigner::new(crypto()),
        key: witness.clone(),
    };
    let verifier = cardkit::core::StandardCardVerifier::new(crypto())
        .require_signer("witness", witness.public_key());

    let h = harness_with(ScriptedClient::passing(crypto()), |b| {
        b.sign_callback(Arc::new(callback)).verifier(Arc::new(verifier))
    });

    let card = h.manager.publish_card(alice_params()).await.unwrap();
    let signers: Vec<&str> = card.signatures().iter().map(|s| s.signer.as_str()).collect();
    assert_eq!(signers, vec![SELF_SIGNER, "witness"]);
}

#[tokio::test]
async fn test_sign_callback_cannot_change_content() {
    let h = harness_with(ScriptedClient::passing(crypto()), |b| {
        b.sign_callback(Arc::new(ContentSwapCallback))
    });

    let err = h.manager.publish_card(alice_params()).await.unwrap_err();
    assert!(matches!(err, ManagerError::SignCallback(_)));
    assert_eq!(h.client.calls(), 0);
}

#[tokio::test]
async fn test_sign_callback_failure() {
    let h = harness_with(ScriptedClient::passing(crypto()), |b| {
        b.sign_callback(Arc::new(FailingCallback))
    });

    let err = h.manager.publish_card(alice_params()).await.unwrap_err();
    assert!(matches!(err, ManagerError::SignCallback(ref m) if m.contains("witness offline")));
    assert_eq!(h.client.calls(), 0);
}

#[tokio::test]
async fn test_publish_raw_model_without_self_signature_is_rejected() {
    let h = harness_with(ScriptedClient::passing(crypto()), |b| {
        b.verifier(Arc::new(cardkit::core::AcceptAllVerifier))
    });
    let keypair = Keypair::from_seed(&[0x42; 32]);
    let unsigned =
        RawSignedModel::generate(&Ed25519Crypto::new(), "alice", &keypair.public_key(), None)
            .unwrap();

    assert!(matches!(
        h.manager.publish_raw_model(unsigned).await,
        Err(ManagerError::Validation(ValidationError::MissingSelfSignature))
    ));
    assert_eq!(h.client.calls(), 0);
    assert!(h.client.service().is_empty().await);
}

#[tokio::test]
async fn test_publish_raw_model_keeps_extra_fields() {
    let h = harness(ScriptedClient::passing(crypto()));
    let fixture = TestFixture::with_seed([0x42; 32]);
    let mut extra = cardkit::ExtraFields::new();
    extra.insert("issuer".into(), "hr".into());

    let model = fixture.make_model_with_extra("alice", 1_736_870_400, None, Some(&extra));
    let card = h.manager.publish_raw_model(model).await.unwrap();

    assert_eq!(card.self_signature().unwrap().extra_fields, Some(extra));
}

// ─────────────────────────────────────────────────────────────────────────────
// Response checks
// ─────────────────────────────────────────────────────────────────────────────

/// Answers every call with the same model, whatever was asked.
struct CannedClient {
    model: RawSignedModel,
}

#[async_trait]
impl CardClient for CannedClient {
    async fn get_card(&self, _id: &CardId, _token: &str) -> cardkit::client::Result<GetCardResponse> {
        Ok(GetCardResponse {
            model: self.model.clone(),
            is_outdated: false,
        })
    }

    async fn search_cards(
        &self,
        _identity: &str,
        _token: &str,
    ) -> cardkit::client::Result<Vec<RawSignedModel>> {
        Ok(vec![self.model.clone()])
    }

    async fn publish_card(
        &self,
        _model: &RawSignedModel,
        _token: &str,
    ) -> cardkit::client::Result<RawSignedModel> {
        Ok(self.model.clone())
    }
}

fn canned_manager(model: RawSignedModel) -> CardManager {
    init_tracing();
    CardManager::builder()
        .crypto(crypto())
        .token_provider(Arc::new(RecordingTokenProvider::new("alice")))
        .client(Arc::new(CannedClient { model }))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_get_rejects_card_with_other_id() {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let manager = canned_manager(fixture.make_model("alice", 1_736_870_400, None));

    let err = manager
        .get_card_by_id(&CardId::from_bytes([0x01; 32]))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_search_rejects_card_for_other_identity() {
    let owners = multi_owner_fixtures(2);
    let manager = canned_manager(owners[1].make_model("bob", 1_736_870_400, None));

    let err = manager.search_cards_by_identity("alice").await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_publish_rejects_changed_content() {
    let fixture = TestFixture::with_seed([0x42; 32]);
    let manager = canned_manager(fixture.make_model("alice", 1, None));

    let err = manager.publish_card(alice_params()).await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidResponse(_)));
}
