//! # Pluto Core
//!
//! Pure, synchronous building blocks shared by the auth and manifest services.
//!
//! ## Modules
//! - [`canonical`]: deterministic JSON canonicalization (RFC 8785 base rules
//!   plus identity sorting of independently identifiable collections)
//! - [`payload`]: canonical manifest payload, the exact input to the
//!   detached signer
//! - [`fingerprint`]: canonical device fingerprint used as the session key
//! - [`clock`]: injectable wall clock

pub mod canonical;
pub mod clock;
pub mod fingerprint;
pub mod payload;

pub use canonical::{canonical_actions, canonical_ui, canonicalize, canonicalize_str};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::Fingerprint;
pub use payload::{build_canonical_payload, PayloadInput, PayloadMeta};

/// Canonicalization error. Always a client error: the input cannot be given
/// a single deterministic encoding.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalizationError {
    /// Embedded fragment is not valid JSON or has the wrong shape
    #[error("malformed fragment: {0}")]
    Malformed(String),
    /// Collection member lacks its identity field
    #[error("{collection}[{index}] has no `{field}` identity field")]
    MissingIdentity {
        collection: String,
        index: usize,
        field: &'static str,
    },
    /// Identity field is present but not a string
    #[error("{collection}[{index}].{field} must be a string")]
    NonStringIdentity {
        collection: String,
        index: usize,
        field: &'static str,
    },
    /// Serializer failure
    #[error("canonical encoding failed: {0}")]
    Encode(String),
}
