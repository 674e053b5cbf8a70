//! secp256k1 keys, keccak256 addresses and recoverable signatures.
//!
//! Signatures are RFC 6979 deterministic and low-S normalized: the same key and message
//! always give the same 65 bytes (`r || s || recovery_id`).

use crate::error::CodecError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};

/// 20-byte account address.
pub type Address = [u8; 20];

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn signing_key(key: &[u8]) -> Result<SigningKey, CodecError> {
    SigningKey::from_slice(key).map_err(|e| CodecError::InvalidKey(e.to_string()))
}

/// Uncompressed SEC1 public key (65 bytes, `0x04` prefix).
pub fn private_key_to_public_key(key: &[u8]) -> Result<[u8; 65], CodecError> {
    let point = signing_key(key)?.verifying_key().to_encoded_point(false);
    <[u8; 65]>::try_from(point.as_bytes())
        .map_err(|_| CodecError::InvalidKey("unexpected public key length".into()))
}

/// Address of an uncompressed public key: last 20 bytes of keccak256 over the X||Y part.
pub fn public_key_to_address(public_key: &[u8]) -> Result<Address, CodecError> {
    if public_key.len() != 65 {
        return Err(CodecError::malformed(format!(
            "expected 65-byte public key, got {}",
            public_key.len()
        )));
    }
    let hash = keccak256(&public_key[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Ok(out)
}

pub fn private_key_to_address(key: &[u8]) -> Result<Address, CodecError> {
    public_key_to_address(&private_key_to_public_key(key)?)
}

/// Sign keccak256(`data`).
pub fn sign(data: &[u8], key: &[u8]) -> Result<[u8; 65], CodecError> {
    let hash = keccak256(data);
    let (signature, recovery_id) = signing_key(key)?
        .sign_prehash_recoverable(&hash)
        .map_err(|e| CodecError::Signing(e.to_string()))?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    Ok(out)
}

/// Recover the signer address of `data` from a 65-byte signature.
pub fn sender(data: &[u8], signature: &[u8]) -> Result<Address, CodecError> {
    if signature.len() != 65 {
        return Err(CodecError::malformed(format!(
            "expected 65-byte signature, got {}",
            signature.len()
        )));
    }
    let hash = keccak256(data);
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| CodecError::malformed(format!("signature: {e}")))?;
    let recovery_id = RecoveryId::from_byte(signature[64])
        .ok_or_else(|| CodecError::malformed(format!("recovery id {}", signature[64])))?;
    let key = VerifyingKey::recover_from_prehash(&hash, &sig, recovery_id)
        .map_err(|e| CodecError::malformed(format!("recover: {e}")))?;
    public_key_to_address(key.to_encoded_point(false).as_bytes())
}
