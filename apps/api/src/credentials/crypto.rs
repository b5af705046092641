//! Password-based secret encryption: PBKDF2-HMAC-SHA256 → AES-256-GCM.
//!
//! This protects provider keys at rest against casual inspection of the
//! database. It is not a substitute for server-side secret management: anyone
//! holding the user's password can decrypt.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;
use sha2::Sha256;

use crate::credentials::CredentialError;

/// PBKDF2 iteration count for new records.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Deployments may raise the count but never below this floor.
pub const MIN_PBKDF2_ITERATIONS: u32 = 10_000;
pub const SALT_LEN: usize = 16;
/// AES-GCM standard nonce length.
pub const IV_LEN: usize = 12;
/// AES-256 key length.
pub const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

/// Output of one encryption: everything needed to decrypt except the password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedSecret {
    pub ciphertext: Vec<u8>, // includes the 16-byte GCM tag
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    pub iterations: u32,
}

/// Encrypts `plaintext` under a key derived from `password`.
/// Fresh salt and IV on every call, so equal inputs never produce equal output.
pub fn seal(
    plaintext: &str,
    password: &str,
    params: KdfParams,
) -> Result<SealedSecret, CredentialError> {
    if params.iterations == 0 {
        return Err(CredentialError::Encryption(
            "iteration count must be positive".to_string(),
        ));
    }

    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let cipher = derive_cipher(password, &salt, params.iterations);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CredentialError::Encryption("AES-GCM encryption failed".to_string()))?;

    Ok(SealedSecret {
        ciphertext,
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        iterations: params.iterations,
    })
}

/// Decrypts a sealed secret. Any wrong password, tampered byte, or malformed
/// field is a `Decryption` error; there is no partial or empty result.
pub fn open(sealed: &SealedSecret, password: &str) -> Result<SecretString, CredentialError> {
    if sealed.iv.len() != IV_LEN || sealed.salt.len() != SALT_LEN || sealed.iterations == 0 {
        return Err(CredentialError::Decryption);
    }

    let cipher = derive_cipher(password, &sealed.salt, sealed.iterations);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed.iv), sealed.ciphertext.as_slice())
        .map_err(|_| CredentialError::Decryption)?;

    String::from_utf8(plaintext)
        .map(SecretString::from)
        .map_err(|_| CredentialError::Decryption)
}

fn derive_cipher(password: &str, salt: &[u8], iterations: u32) -> Aes256Gcm {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    key.fill(0);
    cipher
}
