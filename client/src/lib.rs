//! Giving-fund client core.
//!
//! The orchestration layer of a charitable-giving client: funding a general
//! balance, creating bespoke and matching giving-fund tokens, and gifting
//! portions of those funds via redeemable codes.
//!
//! The interesting part is the funding sequence in [`orchestrator`]: read
//! the live allowance, authorize the spender only if it falls short, wait
//! (bounded) for that authorization to confirm, then submit the
//! value-moving write. [`gifts`] drives that sequence once per recipient of
//! a batch upload, with one amortized authorization and per-recipient
//! failure isolation. Everything reaches the ledger through the capability
//! traits in [`ledger`], so the whole flow is testable against a scripted
//! in-memory ledger.

pub mod amount;
pub mod config;
pub mod contracts;
pub mod directory;
pub mod errors;
pub mod gifts;
pub mod ledger;
pub mod orchestrator;
pub mod recipients;
pub mod redeem;

pub use errors::{ClientError, Result};
