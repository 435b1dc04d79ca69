use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, AeadCore, Nonce};
use hkdf::Hkdf;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const HKDF_SALT: &[u8] = b"hirebridge-v1";
const CREDENTIALS_INFO: &[u8] = b"aes256gcm-credentials";
const TRACKING_INFO: &[u8] = b"tracking-signature";
const NONCE_LEN: usize = 12;

#[derive(Debug)]
pub enum CryptoError {
    InvalidKey(String),
    Encrypt(String),
    Decrypt(String),
    Serialize(String),
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::InvalidKey(msg) => write!(f, "Invalid key: {msg}"),
            CryptoError::Encrypt(msg) => write!(f, "Encryption failed: {msg}"),
            CryptoError::Decrypt(msg) => write!(f, "Decryption failed: {msg}"),
            CryptoError::Serialize(msg) => write!(f, "Invalid credential payload: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

fn derive_key(key: &str, info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), key.as_bytes());
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// Encrypt bytes using AES-256-GCM. Returns nonce (12 bytes) prepended to ciphertext.
pub fn encrypt(plaintext: &[u8], key: &str) -> Result<Vec<u8>, CryptoError> {
    let key_bytes = derive_key(key, CREDENTIALS_INFO);
    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encrypt(e.to_string()))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt ciphertext (nonce prepended) using AES-256-GCM.
pub fn decrypt(data: &[u8], key: &str) -> Result<Vec<u8>, CryptoError> {
    if data.len() <= NONCE_LEN {
        return Err(CryptoError::Decrypt("ciphertext too short".to_string()));
    }

    let key_bytes = derive_key(key, CREDENTIALS_INFO);
    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &data[NONCE_LEN..])
        .map_err(|e| CryptoError::Decrypt(e.to_string()))
}

/// Serialize a credential record to JSON and encrypt it for storage.
pub fn encrypt_credentials<T: Serialize>(record: &T, key: &str) -> Result<Vec<u8>, CryptoError> {
    let json = serde_json::to_vec(record).map_err(|e| CryptoError::Serialize(e.to_string()))?;
    encrypt(&json, key)
}

/// Decrypt a stored credential record.
pub fn decrypt_credentials<T: DeserializeOwned>(data: &[u8], key: &str) -> Result<T, CryptoError> {
    let plaintext = decrypt(data, key)?;
    serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Serialize(e.to_string()))
}

/// Mask a secret for display: first and last four characters only.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

/// Signature binding a tracked link to its email log entry.
pub fn tracking_signature(key: &str, log_id: &str, url: &str) -> String {
    let signing_key = derive_key(key, TRACKING_INFO);
    let mut hasher = Sha256::new();
    hasher.update(signing_key);
    hasher.update(log_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(url.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

pub fn verify_tracking_signature(key: &str, log_id: &str, url: &str, signature: &str) -> bool {
    let expected = tracking_signature(key, log_id, url);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
