use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::Serialize;

use crate::constants::{KDF_CONTEXT_EVENT_ID, SECRET_KEY_SIZE};
use crate::error::{CodecError, IdentityError};
use crate::event::Event;
use crate::types::{EventId, Pubkey, Pubkey64};

/// A node's signing identity based on Ed25519.
/// The public key is the author key of every event the node creates.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

/// The fields an event id commits to.
#[derive(Serialize)]
struct IdPreimage<'a> {
    pubkey: &'a Pubkey,
    created_at: i64,
    kind: u16,
    tags: &'a [Vec<String>],
    content: &'a str,
}

impl Identity {
    /// Generate a new random identity
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Restore identity from secret key bytes
    pub fn from_secret_bytes(secret: &[u8; SECRET_KEY_SIZE]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        Self { signing_key }
    }

    /// Restore identity from a 64-character hex secret
    pub fn from_secret_hex(hex_secret: &str) -> Result<Self, CodecError> {
        let bytes = hex::decode(hex_secret.trim())?;
        if bytes.len() != SECRET_KEY_SIZE {
            return Err(CodecError::Length {
                expected: SECRET_KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut secret = [0u8; SECRET_KEY_SIZE];
        secret.copy_from_slice(&bytes);
        Ok(Self::from_secret_bytes(&secret))
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn pubkey64(&self) -> Pubkey64 {
        self.pubkey().pubkey64()
    }

    /// Get the raw secret key bytes
    pub fn secret_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        self.signing_key.as_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Build a signed event authored by this identity.
    pub fn sign_event(
        &self,
        kind: u16,
        tags: Vec<Vec<String>>,
        content: String,
        created_at: i64,
    ) -> Result<Event, CodecError> {
        let pubkey = self.pubkey();
        let id = compute_event_id(&pubkey, created_at, kind, &tags, &content)?;
        let sig = self.sign(&id.0).to_bytes().to_vec();
        Ok(Event {
            id,
            pubkey,
            created_at,
            kind,
            tags,
            content,
            sig,
        })
    }
}

/// Derive an event id: keyed BLAKE3 over the bincode encoding of the
/// author, timestamp, kind, tags and content.
pub fn compute_event_id(
    pubkey: &Pubkey,
    created_at: i64,
    kind: u16,
    tags: &[Vec<String>],
    content: &str,
) -> Result<EventId, CodecError> {
    let preimage = bincode::serialize(&IdPreimage {
        pubkey,
        created_at,
        kind,
        tags,
        content,
    })
    .map_err(|source| CodecError::Encode {
        what: "event id preimage",
        source,
    })?;

    let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_EVENT_ID);
    hasher.update(&preimage);
    Ok(EventId(*hasher.finalize().as_bytes()))
}

/// Check that an event's id matches its body and its signature is valid.
pub fn verify_event(event: &Event) -> Result<(), IdentityError> {
    let expected = compute_event_id(
        &event.pubkey,
        event.created_at,
        event.kind,
        &event.tags,
        &event.content,
    )
    .map_err(|_| IdentityError::IdMismatch)?;
    if expected != event.id {
        return Err(IdentityError::IdMismatch);
    }

    let verifying_key =
        VerifyingKey::from_bytes(&event.pubkey.0).map_err(|_| IdentityError::InvalidKeyBytes)?;
    let signature =
        Signature::from_slice(&event.sig).map_err(|_| IdentityError::BadSignature)?;
    verifying_key
        .verify(&event.id.0, &signature)
        .map_err(|_| IdentityError::BadSignature)
}
