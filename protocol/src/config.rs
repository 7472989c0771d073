//! # Protocol Configuration & Constants
//!
//! Every magic number in the escrow relay lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong.
//!
//! The byte-level constants below define the signed payload format. Changing
//! any of them invalidates every authorization signers have already issued,
//! so treat them as frozen.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The protocol version string reported by nodes.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Signatures are ECDSA over secp256k1 with a recovery byte appended.
pub const SIGNING_ALGORITHM: &str = "secp256k1-ECDSA-recoverable";

/// The hash function used for authorization digests and address derivation.
pub const PRIMARY_HASH_FUNCTION: &str = "Keccak-256";

/// Secret key length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Identity length in bytes: the trailing 20 bytes of the Keccak-256 hash of
/// the uncompressed public key.
pub const ADDRESS_LENGTH: usize = 20;

/// Width of a packed integer word. Every integer field in a signed payload
/// occupies exactly this many big-endian bytes, no matter how small it is.
pub const WORD_LENGTH: usize = 32;

/// Recoverable signature length: `r (32) || s (32) || v (1)`.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to the raw recovery id when encoding `v`. Signers following
/// the Ethereum convention emit 27 or 28; we accept 0 and 1 as well.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// Prefix prepended to a 32-byte authorization hash before the final digest
/// is signed. This is the personal-message envelope, so a signed
/// authorization can never double as a signed transaction.
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

// ---------------------------------------------------------------------------
// Metering Defaults
// ---------------------------------------------------------------------------

/// Default execution units charged for a fiat-payment funding (two asset
/// transfers plus the reimbursement).
pub const DEFAULT_FIAT_PAYMENT_UNITS: u64 = 95_000;

/// Default execution units charged for a relayed-payment funding (one native
/// transfer plus the reimbursement).
pub const DEFAULT_RELAYED_PAYMENT_UNITS: u64 = 60_000;

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default REST API port for the node.
pub const DEFAULT_API_PORT: u16 = 8645;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8646;
