use std::time::Duration;

use super::fake_verifier::{assertion, attestation, challenge_of, FakeVerifier};
use super::{harness, harness_with, DEFAULT_TIMEOUT, DEFAULT_TTL};
use crate::db::{credentials, users};
use crate::error::AppError;
use crate::webauthn::sessions::{CeremonyKind, CeremonySessionStore};

const KEY_A: &[u8] = b"credential-a";
const KEY_B: &[u8] = b"credential-b";

#[tokio::test]
async fn register_then_authenticate_bumps_the_counter() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();

    let options = h.service.begin_registration("alice").await.unwrap();
    assert_eq!(options["publicKey"]["user"]["name"], "alice");
    assert_eq!(options["publicKey"]["user"]["displayName"], "Alice A");

    let created = h
        .service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap();
    assert_eq!(created.credential_id, KEY_A);
    assert_eq!(created.authenticator.sign_count, 0);

    let user = h.service.get_user("alice").await.unwrap();
    assert_eq!(user.credentials.len(), 1);

    let options = h.service.begin_authentication("alice").await.unwrap();
    assert_eq!(
        options["publicKey"]["allowCredentials"][0]["id"],
        credentials::encode_id(KEY_A)
    );

    let used = h
        .service
        .finish_authentication("alice", assertion(&options, KEY_A, 1))
        .await
        .unwrap();
    assert_eq!(used.authenticator.sign_count, 1);
    assert!(!used.authenticator.clone_warning);
    assert!(used.last_used_at.is_some());

    let stored = credentials::find_by_credential_id(&h.db, KEY_A).await.unwrap();
    assert_eq!(stored.authenticator.sign_count, 1);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn finish_without_begin_has_no_ceremony() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();

    let err = h
        .service
        .finish_registration("alice", serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveCeremony(_)));
}

#[tokio::test]
async fn begin_for_unknown_user_fails() {
    let h = harness().await;

    let err = h.service.begin_registration("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(_)));

    let err = h.service.begin_authentication("nobody").await.unwrap_err();
    assert!(matches!(err, AppError::UserNotFound(_)));
}

#[tokio::test]
async fn failed_verification_consumes_the_session_and_stores_nothing() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();

    let mut forged = attestation(&options, KEY_A);
    forged["challenge"] = "not-the-challenge".into();
    let err = h.service.finish_registration("alice", forged).await.unwrap_err();
    assert!(matches!(err, AppError::VerificationFailed(_)));

    let user = h.service.get_user("alice").await.unwrap();
    assert!(user.credentials.is_empty());

    // The same response cannot be replayed against the consumed challenge
    let err = h
        .service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveCeremony(_)));
}

#[tokio::test]
async fn a_new_begin_supersedes_the_previous_challenge() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();

    let first = h.service.begin_registration("alice").await.unwrap();
    let second = h.service.begin_registration("alice").await.unwrap();
    assert_ne!(challenge_of(&first), challenge_of(&second));
    assert_eq!(h.sessions.len(), 1);

    let err = h
        .service
        .finish_registration("alice", attestation(&first, KEY_A))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VerificationFailed(_)));

    let third = h.service.begin_registration("alice").await.unwrap();
    h.service
        .finish_registration("alice", attestation(&third, KEY_A))
        .await
        .unwrap();
}

#[tokio::test]
async fn authentication_needs_a_registered_passkey() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();

    let err = h.service.begin_authentication("alice").await.unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound(_)));
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn ceremony_kinds_do_not_cross() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();

    let err = h
        .service
        .finish_authentication("alice", assertion(&options, KEY_A, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveCeremony(_)));

    // The registration is still pending and can complete
    assert_eq!(
        h.sessions.get("alice").unwrap().kind,
        CeremonyKind::Registration
    );
    h.service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_ceremony_cannot_finish() {
    let h = harness_with(FakeVerifier::new(), Duration::ZERO, DEFAULT_TIMEOUT).await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();

    let err = h
        .service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NoActiveCeremony(_)));
}

#[tokio::test]
async fn purge_drops_expired_sessions() {
    let h = harness_with(FakeVerifier::new(), Duration::ZERO, DEFAULT_TIMEOUT).await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    h.service.register_user("bob", "Bob B").await.unwrap();
    h.service.begin_registration("alice").await.unwrap();
    h.service.begin_registration("bob").await.unwrap();

    assert_eq!(h.service.purge_expired_sessions(), 2);
    assert!(h.sessions.is_empty());
}

#[tokio::test]
async fn slow_verification_times_out() {
    let h = harness_with(
        FakeVerifier::slow(Duration::from_millis(300)),
        DEFAULT_TTL,
        Duration::from_millis(50),
    )
    .await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();

    let err = h
        .service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VerificationFailed(_)));

    let user = h.service.get_user("alice").await.unwrap();
    assert!(user.credentials.is_empty());
}

#[tokio::test]
async fn duplicate_credential_is_rejected_across_users() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    h.service.register_user("bob", "Bob B").await.unwrap();

    let options = h.service.begin_registration("alice").await.unwrap();
    h.service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap();

    let options = h.service.begin_registration("bob").await.unwrap();
    let err = h
        .service
        .finish_registration("bob", attestation(&options, KEY_A))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));

    let bob = h.service.get_user("bob").await.unwrap();
    assert!(bob.credentials.is_empty());
}

#[tokio::test]
async fn another_users_credential_does_not_authenticate() {
    let h = harness().await;
    for (name, key) in [("alice", KEY_A), ("bob", KEY_B)] {
        h.service.register_user(name, name).await.unwrap();
        let options = h.service.begin_registration(name).await.unwrap();
        h.service
            .finish_registration(name, attestation(&options, key))
            .await
            .unwrap();
    }

    let options = h.service.begin_authentication("alice").await.unwrap();
    let err = h
        .service
        .finish_authentication("alice", assertion(&options, KEY_B, 7))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound(_)));

    let bobs = credentials::find_by_credential_id(&h.db, KEY_B).await.unwrap();
    assert_eq!(bobs.authenticator.sign_count, 0);
}

#[tokio::test]
async fn unknown_credential_is_not_found() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();
    h.service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap();

    let options = h.service.begin_authentication("alice").await.unwrap();
    let err = h
        .service
        .finish_authentication("alice", assertion(&options, b"never-registered", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialNotFound(_)));
}

#[tokio::test]
async fn clone_warning_is_recorded() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();
    h.service
        .finish_registration("alice", attestation(&options, KEY_A))
        .await
        .unwrap();

    let options = h.service.begin_authentication("alice").await.unwrap();
    h.service
        .finish_authentication("alice", assertion(&options, KEY_A, 5))
        .await
        .unwrap();

    let options = h.service.begin_authentication("alice").await.unwrap();
    let used = h
        .service
        .finish_authentication("alice", assertion(&options, KEY_A, 3))
        .await
        .unwrap();
    assert!(used.authenticator.clone_warning);

    let stored = credentials::find_by_credential_id(&h.db, KEY_A).await.unwrap();
    assert!(stored.authenticator.clone_warning);
    assert_eq!(stored.authenticator.sign_count, 3);
}

#[tokio::test]
async fn concurrent_finishes_consume_one_session() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();
    let options = h.service.begin_registration("alice").await.unwrap();
    let response = attestation(&options, KEY_A);

    let (first, second) = tokio::join!(
        h.service.finish_registration("alice", response.clone()),
        h.service.finish_registration("alice", response),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(AppError::NoActiveCeremony(_)))));

    let user = users::find_by_username(&h.db, "alice").await.unwrap();
    assert_eq!(user.credentials.len(), 1);
}

#[tokio::test]
async fn register_user_validates_input() {
    let h = harness().await;
    h.service.register_user("alice", "Alice A").await.unwrap();

    let err = h.service.register_user("alice", "Other").await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));

    let err = h.service.register_user("  ", "Blank").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = h.service.register_user("carol", "").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}
