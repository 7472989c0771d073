//! # Hashing Utilities
//!
//! One hash function, used two ways:
//!
//! - **Authorization hash**: Keccak-256 over the packed payload fields. This
//!   is the 32-byte value an off-chain signer treats as "the message".
//! - **Signed digest**: Keccak-256 over the personal-message prefix followed
//!   by the authorization hash. This is what the ECDSA signature is actually
//!   over.
//!
//! Address derivation also uses Keccak-256; see `keys::address_of`.

use sha3::{Digest, Keccak256};

use crate::config::SIGNED_MESSAGE_PREFIX;

/// Compute the Keccak-256 hash of the input data.
///
/// # Example
///
/// ```
/// use escrow_protocol::crypto::keccak256;
///
/// let hash = keccak256(b"");
/// assert_eq!(
///     hex::encode(hash),
///     "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
/// );
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    keccak256_concat(&[data])
}

/// Keccak-256 over several slices, as if they were concatenated.
pub fn keccak256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Wrap a 32-byte hash in the personal-message envelope and hash again.
///
/// `keccak256("\x19Ethereum Signed Message:\n32" || hash)`
pub fn signed_message_digest(hash: &[u8; 32]) -> [u8; 32] {
    keccak256_concat(&[SIGNED_MESSAGE_PREFIX, &hash[..]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_known_vector() {
        // "abc" is the classic vector; Keccak-256 (not SHA3-256) output.
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn concat_matches_single_buffer() {
        let joined = keccak256(b"hello world");
        let parts = keccak256_concat(&[&b"hello"[..], &b" "[..], &b"world"[..]]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn signed_digest_differs_from_raw_hash() {
        let hash = keccak256(b"payload");
        let digest = signed_message_digest(&hash);
        assert_ne!(hash, digest);
        assert_eq!(digest, signed_message_digest(&hash));
    }

    #[test]
    fn keccak_of_uint256_word() {
        let mut word = [0u8; 32];
        word[31] = 10;
        assert_eq!(
            hex::encode(keccak256(&word)),
            "c65a7bb8d6351c1cf70c95a316cc6a92839c986682d98bc35f958f4883f9d2a8"
        );
    }

    #[test]
    fn signed_digest_known_vector() {
        // hashMessage(arrayify(h)) as computed by ethers for a packed
        // fiat-payment authorization hash.
        let hash: [u8; 32] =
            hex::decode("a89c668e5b514f011e0d087029ccf056525e39f4c7475b3ed6fc6fa8cda6d3a4")
                .unwrap()
                .try_into()
                .unwrap();
        assert_eq!(
            hex::encode(signed_message_digest(&hash)),
            "7d07c366cda56f4f4c1331699d89f2f5e1790a57565395b22f3ce274eec7e37b"
        );
        assert_eq!(SIGNED_MESSAGE_PREFIX.len(), 28);
    }
}
