//! # Ceremony Verification
//!
//! The cryptographic half of each ceremony lives behind [`CeremonyVerifier`].
//! The orchestrator never inspects challenge state or client responses; it
//! only moves them between the verifier, the session cache and the store.
//!
//! [`PasskeyVerifier`] is the production implementation on top of
//! `webauthn-rs`. Its challenge state is serialized to bytes so the session
//! cache can hold it without knowing the library's types.

use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use webauthn_rs::prelude::*;

use crate::config::Config;
use crate::db::credentials::encode_id;
use crate::db::models::{AuthenticatorState, Credential as StoredCredential, CredentialFlags};
use crate::error::{AppError, AppResult};

use super::identity::WebAuthnIdentity;

/// What a ceremony start hands back
#[derive(Debug, Clone)]
pub struct CeremonyChallenge {
    /// Options for `navigator.credentials.create()` / `.get()`
    pub options: Value,

    /// Opaque server-side state the matching finish needs
    pub state: Vec<u8>,
}

/// Outcome of a successful verification
///
/// After registration this describes the new credential. After
/// authentication it describes the credential that was used, carrying the
/// new signature counter and clone verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub credential_id: Vec<u8>,
    pub public_key: Vec<u8>,
    pub attestation_type: String,
    pub transports: Vec<String>,
    pub flags: CredentialFlags,
    pub authenticator: AuthenticatorState,
}

/// External protocol capability driving both ceremonies
///
/// Calls are synchronous and must not have side effects when they fail.
pub trait CeremonyVerifier: Send + Sync + 'static {
    fn start_registration(&self, user: &dyn WebAuthnIdentity) -> AppResult<CeremonyChallenge>;

    fn verify_registration(
        &self,
        user: &dyn WebAuthnIdentity,
        response: &Value,
        state: &[u8],
    ) -> AppResult<VerifiedCredential>;

    /// Challenge the user to prove possession of one of `user`'s credentials
    fn start_authentication(&self, user: &dyn WebAuthnIdentity) -> AppResult<CeremonyChallenge>;

    fn verify_authentication(
        &self,
        user: &dyn WebAuthnIdentity,
        response: &Value,
        state: &[u8],
    ) -> AppResult<VerifiedCredential>;
}

/// `webauthn-rs` passkey flows
pub struct PasskeyVerifier {
    webauthn: Webauthn,
}

impl PasskeyVerifier {
    /// Configure the relying party from the application config
    ///
    /// Fails if the origin is not a URL or does not match the RP ID.
    pub fn new(config: &Config) -> AppResult<Self> {
        let rp_origin = Url::parse(&config.rp_origin)
            .map_err(|e| AppError::Internal(format!("Invalid RP origin: {e}")))?;

        let webauthn = WebauthnBuilder::new(&config.rp_id, &rp_origin)
            .and_then(|builder| builder.rp_name(&config.rp_name).build())
            .map_err(|e| AppError::Internal(format!("Invalid relying party: {e}")))?;

        Ok(Self { webauthn })
    }
}

impl CeremonyVerifier for PasskeyVerifier {
    fn start_registration(&self, user: &dyn WebAuthnIdentity) -> AppResult<CeremonyChallenge> {
        // Already registered authenticators are excluded so the browser
        // refuses to register the same one twice
        let exclude: Vec<CredentialID> = user
            .webauthn_credentials()
            .iter()
            .map(|c| CredentialID::from(c.credential_id.clone()))
            .collect();
        let exclude = (!exclude.is_empty()).then_some(exclude);

        let (ccr, reg_state) = self.webauthn.start_passkey_registration(
            user.webauthn_id(),
            user.webauthn_name(),
            user.webauthn_display_name(),
            exclude,
        )?;

        Ok(CeremonyChallenge {
            options: serde_json::to_value(&ccr)?,
            state: serde_json::to_vec(&reg_state)?,
        })
    }

    fn verify_registration(
        &self,
        _user: &dyn WebAuthnIdentity,
        response: &Value,
        state: &[u8],
    ) -> AppResult<VerifiedCredential> {
        let reg_state: PasskeyRegistration = serde_json::from_slice(state)?;
        let reg_credential: RegisterPublicKeyCredential = serde_json::from_value(response.clone())?;

        let passkey = self
            .webauthn
            .finish_passkey_registration(&reg_credential, &reg_state)?;

        let internals: Credential = passkey.clone().into();
        let transports = internals
            .transports
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(serde_tag)
            .collect();

        Ok(VerifiedCredential {
            credential_id: id_bytes(passkey.cred_id()),
            public_key: serde_json::to_vec(&passkey)?,
            attestation_type: serde_tag(&internals.attestation_format),
            transports,
            flags: CredentialFlags {
                // Passkey ceremonies always demand user presence
                user_present: true,
                user_verified: internals.user_verified,
                backup_eligible: internals.backup_eligible,
                backup_state: internals.backup_state,
            },
            authenticator: AuthenticatorState {
                aaguid: None,
                sign_count: internals.counter,
                clone_warning: false,
            },
        })
    }

    fn start_authentication(&self, user: &dyn WebAuthnIdentity) -> AppResult<CeremonyChallenge> {
        let passkeys = user
            .webauthn_credentials()
            .iter()
            .map(restore_passkey)
            .collect::<AppResult<Vec<Passkey>>>()?;

        let (rcr, auth_state) = self.webauthn.start_passkey_authentication(&passkeys)?;

        Ok(CeremonyChallenge {
            options: serde_json::to_value(&rcr)?,
            state: serde_json::to_vec(&auth_state)?,
        })
    }

    fn verify_authentication(
        &self,
        user: &dyn WebAuthnIdentity,
        response: &Value,
        state: &[u8],
    ) -> AppResult<VerifiedCredential> {
        let auth_state: PasskeyAuthentication = serde_json::from_slice(state)?;
        let auth_credential: PublicKeyCredential = serde_json::from_value(response.clone())?;

        // A regressed counter is rejected here as CredentialPossibleCompromise,
        // so a successful result never carries a clone warning
        let result = self
            .webauthn
            .finish_passkey_authentication(&auth_credential, &auth_state)?;

        let used_id = id_bytes(result.cred_id());
        let stored = user
            .webauthn_credentials()
            .iter()
            .find(|c| c.credential_id == used_id)
            .ok_or_else(|| {
                AppError::CredentialNotFound(format!(
                    "Credential '{}' is not registered to '{}'",
                    encode_id(&used_id),
                    user.webauthn_name()
                ))
            })?;

        Ok(VerifiedCredential {
            credential_id: used_id,
            public_key: stored.public_key.clone(),
            attestation_type: stored.attestation_type.clone(),
            transports: stored.transports.clone(),
            flags: CredentialFlags {
                user_present: true,
                user_verified: result.user_verified(),
                backup_eligible: result.backup_eligible(),
                backup_state: result.backup_state(),
            },
            authenticator: AuthenticatorState {
                aaguid: stored.authenticator.aaguid.clone(),
                sign_count: result.counter(),
                clone_warning: false,
            },
        })
    }
}

/// Rebuild the library passkey from a stored credential
///
/// The stored columns are authoritative for the counter and backup state;
/// the serialized passkey is only trusted for the key and its policy.
fn restore_passkey(credential: &StoredCredential) -> AppResult<Passkey> {
    let passkey: Passkey = serde_json::from_slice(&credential.public_key)?;
    let mut internals: Credential = passkey.into();
    internals.counter = credential.authenticator.sign_count;
    internals.backup_state = credential.flags.backup_state;

    Ok(Passkey::from(internals))
}

fn id_bytes(id: &CredentialID) -> Vec<u8> {
    let bytes: &[u8] = id.as_ref();
    bytes.to_vec()
}

/// The wire name of a library enum, e.g. `"usb"` for a transport
fn serde_tag<T: Serialize + Debug>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(tag)) => tag,
        _ => format!("{value:?}").to_lowercase(),
    }
}
