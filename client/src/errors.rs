//! Application-wide error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A ledger read or write could not reach the remote ledger, or the
    /// ledger returned an unusable payload. Recoverable by caller retry.
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// An authorization write was submitted but did not confirm. The funding
    /// action aborts before any value moves.
    #[error("Authorization not confirmed: {0}")]
    AuthorizationNotConfirmed(String),

    /// The confirmation wait exceeded its bound. Inconclusive, not a definite
    /// failure; callers must re-check ledger state before retrying.
    #[error("Confirmation wait for tx {tx_hash} exceeded {attempts} attempts")]
    ConfirmationTimeout { tx_hash: String, attempts: u32 },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// One recipient's gift write failed; siblings in the batch are not
    /// affected.
    #[error("Gift issuance failed for {recipient}: {reason}")]
    RecipientIssuanceFailed { recipient: String, reason: String },

    /// The requested batch size exceeds what the code format can produce.
    #[error("Redeem-code space exhausted: {0}")]
    CodeSpaceExhausted(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
