//! Wire payload encoding for trace submission.
//!
//! The remote service expects each event as a pipe-delimited field list,
//! events joined by semicolons, the whole string AES-256-CBC encrypted
//! under the session game tag. The IV is the first 16 characters of the
//! base64-encoded random 12-byte nonce that prefixes the output. Deriving
//! the IV from public nonce material is cryptographically weak, but it is
//! what the deployed service decrypts; reproduce it bit for bit and do not
//! reuse the construction elsewhere.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use thiserror::Error;

use crate::trace::GameTrace;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
/// base64 of 12 bytes is exactly 16 characters, which is also the IV width.
const NONCE_B64_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("game tag must be {KEY_LEN} bytes, got {0}")]
    KeyLength(usize),
    #[error("payload too short for the nonce prefix")]
    Truncated,
    #[error("payload ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("ciphertext failed to decrypt")]
    Decrypt,
    #[error("decrypted payload is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serialize a trace into the plaintext wire string.
///
/// Field order per event: absolute timestamp, hook x/y, shot angle,
/// hit x/y, item type, item size, points. Coordinates always carry three
/// decimal places.
#[must_use]
pub fn serialize(trace: &GameTrace) -> String {
    trace
        .events
        .iter()
        .map(|event| {
            let timestamp = trace.started_at_ms + event.time_offset_ms as i64;
            format!(
                "{timestamp}|{:.3}|{:.3}|{:.3}|{:.3}|{:.3}|{}|{}|{}",
                event.hook_x,
                event.hook_y,
                event.shot_angle,
                event.hit_x,
                event.hit_y,
                event.item_type,
                event.item_size,
                event.points
            )
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Serialize and encrypt a trace under the session game tag, drawing a
/// fresh nonce from `rng`.
pub fn encode(
    trace: &GameTrace,
    game_tag: &str,
    rng: &mut (impl RngCore + ?Sized),
) -> Result<String, PayloadError> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce);
    encode_with_nonce(trace, game_tag, &nonce)
}

/// Deterministic variant of [`encode`] for a caller-supplied nonce.
pub fn encode_with_nonce(
    trace: &GameTrace,
    game_tag: &str,
    nonce: &[u8; NONCE_LEN],
) -> Result<String, PayloadError> {
    let key = game_tag.as_bytes();
    if key.len() != KEY_LEN {
        return Err(PayloadError::KeyLength(key.len()));
    }
    let nonce_b64 = BASE64.encode(nonce);
    let iv = &nonce_b64.as_bytes()[..NONCE_B64_LEN];
    let cipher =
        Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| PayloadError::KeyLength(key.len()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(serialize(trace).as_bytes());
    Ok(format!("{nonce_b64}{}", BASE64.encode(ciphertext)))
}

/// Reverse [`encode`]: recover the plaintext wire string. Verification aid
/// for the wire construction; the live flow never decrypts.
pub fn decode(payload: &str, game_tag: &str) -> Result<String, PayloadError> {
    let key = game_tag.as_bytes();
    if key.len() != KEY_LEN {
        return Err(PayloadError::KeyLength(key.len()));
    }
    let bytes = payload.as_bytes();
    if bytes.len() < NONCE_B64_LEN {
        return Err(PayloadError::Truncated);
    }
    let (iv, ciphertext_b64) = bytes.split_at(NONCE_B64_LEN);
    let ciphertext = BASE64.decode(ciphertext_b64)?;
    let cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| PayloadError::KeyLength(key.len()))?;
    let plaintext = cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| PayloadError::Decrypt)?;
    Ok(String::from_utf8(plaintext)?)
}
