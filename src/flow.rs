//! Flow endpoint payload decryption.
//!
//! A WhatsApp Flow with a data endpoint posts its requests encrypted:
//!
//! - `encrypted_aes_key`: a fresh AES-128 key, encrypted with your RSA public
//!   key (OAEP, SHA-256).
//! - `encrypted_flow_data`: the JSON request body, AES-GCM encrypted with that
//!   key, with the 16-byte tag appended.
//! - `initial_vector`: the GCM nonce.
//!
//! All three are base64. [`decrypt_flow`] recovers the JSON body together with
//! the key and nonce, which [`encrypt_flow_response`] needs to answer the
//! same request.
//!
//! RSA decryption is CPU-bound; from async code use [`decrypt_flow_blocking`],
//! which runs it on tokio's blocking pool.
//!
//! ```rust,no_run
//! use whatsapp_webhook_rs::flow::{decrypt_flow_blocking, encrypt_flow_response, EncryptedFlowRequest};
//!
//! # async fn example(pem: String, body: &str) -> Result<(), whatsapp_webhook_rs::Error> {
//! let request: EncryptedFlowRequest = serde_json::from_str(body).unwrap();
//! let flow = decrypt_flow_blocking(pem, request).await?;
//! println!("action: {}", flow.body["action"]);
//!
//! let reply = encrypt_flow_response(&flow, &serde_json::json!({ "screen": "SUCCESS" }))?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

use aes_gcm::{
    aead::{
        consts::{U12, U16},
        generic_array::ArrayLength,
        Aead, KeyInit,
    },
    aes::Aes128,
    AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::{pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, Oaep, RsaPrivateKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::Error;

/// Length of the GCM authentication tag appended to `encrypted_flow_data`.
pub const TAG_LENGTH: usize = 16;

/// The encrypted body a flow data endpoint receives.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct EncryptedFlowRequest {
    pub encrypted_aes_key: String,
    pub encrypted_flow_data: String,
    pub initial_vector: String,
}

/// A decrypted flow request.
#[derive(Clone, Debug, PartialEq)]
pub struct DecryptedFlow {
    /// The request body.
    pub body: Value,
    /// The AES key the platform generated for this request.
    pub aes_key: Vec<u8>,
    /// The request's nonce.
    pub initial_vector: Vec<u8>,
}

/// A flow payload could not be decrypted or encrypted.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum FlowError {
    /// The private key is not a PKCS#8 or PKCS#1 PEM.
    #[error("Flow private key is not a valid RSA PEM")]
    PrivateKey,

    /// A request field is not valid base64.
    #[error("Flow field '{field}' is not valid base64: {source}")]
    Encoding {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The AES key could not be recovered with the private key.
    #[error("Unable to decrypt the flow AES key: {0}")]
    KeyDecryption(#[source] rsa::Error),

    /// The recovered AES key is not 16 bytes long.
    #[error("Flow AES key must be 16 bytes, got {0}")]
    KeyLength(usize),

    /// The nonce is neither 12 nor 16 bytes long.
    #[error("Flow initial vector must be 12 or 16 bytes, got {0}")]
    NonceLength(usize),

    /// The flow data is shorter than its tag, or the tag does not match.
    #[error("Flow data failed authentication")]
    Authentication,

    /// The decrypted body is not JSON.
    #[error("Decrypted flow data is not valid JSON: {0}")]
    Body(#[source] serde_json::Error),
}

/// Decrypts a flow data endpoint request with your RSA private key.
///
/// `private_pem` may be PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1
/// (`BEGIN RSA PRIVATE KEY`). Passphrase-protected keys are not supported.
pub fn decrypt_flow(private_pem: &str, request: &EncryptedFlowRequest) -> Result<DecryptedFlow, Error> {
    let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_pem))
        .map_err(|_| FlowError::PrivateKey)?;

    let encrypted_key = from_base64("encrypted_aes_key", &request.encrypted_aes_key)?;
    let flow_data = from_base64("encrypted_flow_data", &request.encrypted_flow_data)?;
    let initial_vector = from_base64("initial_vector", &request.initial_vector)?;

    let aes_key = private_key
        .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
        .map_err(FlowError::KeyDecryption)?;

    if flow_data.len() < TAG_LENGTH {
        return Err(FlowError::Authentication.into());
    }

    let plain = match initial_vector.len() {
        16 => gcm_decrypt::<U16>(&aes_key, &initial_vector, &flow_data)?,
        12 => gcm_decrypt::<U12>(&aes_key, &initial_vector, &flow_data)?,
        n => return Err(FlowError::NonceLength(n).into()),
    };

    let body = serde_json::from_slice(&plain).map_err(FlowError::Body)?;

    Ok(DecryptedFlow {
        body,
        aes_key,
        initial_vector,
    })
}

/// [`decrypt_flow`] on tokio's blocking thread pool.
pub async fn decrypt_flow_blocking(
    private_pem: String,
    request: EncryptedFlowRequest,
) -> Result<DecryptedFlow, Error> {
    tokio::task::spawn_blocking(move || decrypt_flow(&private_pem, &request))
        .await
        .map_err(|err| Error::internal(Box::new(err)))?
}

/// Encrypts the response to a decrypted flow request.
///
/// The response reuses the request's AES key with the request nonce's bits
/// inverted, and is returned as base64 (ciphertext followed by the tag), ready
/// to be sent as a `text/plain` body.
pub fn encrypt_flow_response(flow: &DecryptedFlow, response: &Value) -> Result<String, Error> {
    let plain = serde_json::to_vec(response).map_err(FlowError::Body)?;
    let flipped: Vec<u8> = flow.initial_vector.iter().map(|b| !b).collect();

    let sealed = match flipped.len() {
        16 => gcm_encrypt::<U16>(&flow.aes_key, &flipped, &plain)?,
        12 => gcm_encrypt::<U12>(&flow.aes_key, &flipped, &plain)?,
        n => return Err(FlowError::NonceLength(n).into()),
    };

    Ok(STANDARD.encode(sealed))
}

fn from_base64(field: &'static str, value: &str) -> Result<Vec<u8>, FlowError> {
    STANDARD
        .decode(value)
        .map_err(|source| FlowError::Encoding { field, source })
}

fn cipher<N: ArrayLength<u8>>(key: &[u8]) -> Result<AesGcm<Aes128, N>, FlowError> {
    AesGcm::<Aes128, N>::new_from_slice(key).map_err(|_| FlowError::KeyLength(key.len()))
}

fn gcm_decrypt<N: ArrayLength<u8>>(key: &[u8], nonce: &[u8], data: &[u8]) -> Result<Vec<u8>, FlowError> {
    cipher::<N>(key)?
        .decrypt(Nonce::<N>::from_slice(nonce), data)
        .map_err(|_| FlowError::Authentication)
}

fn gcm_encrypt<N: ArrayLength<u8>>(key: &[u8], nonce: &[u8], data: &[u8]) -> Result<Vec<u8>, FlowError> {
    cipher::<N>(key)?
        .encrypt(Nonce::<N>::from_slice(nonce), data)
        .map_err(|_| FlowError::Authentication)
}
