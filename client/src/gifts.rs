//! Gift batch issuance.
//!
//! One authorization for the batch total, then one `createGift` write per
//! usable recipient, strictly in order. All writes come from a single
//! signing identity, so submissions are serialized rather than parallelized;
//! concurrent writes would race that identity's sequencing counter.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::contracts::{ContractRef, FundKind, Gift};
use crate::errors::{ClientError, Result};
use crate::ledger::format_tx_hash;
use crate::orchestrator::{FundingAction, FundingOrchestrator};
use crate::recipients::Recipient;
use crate::redeem::{generate_code, DEFAULT_CHARSET, DEFAULT_LENGTH, GIFT_CODE_FORMAT};

/// Per-recipient result of a batch run.
#[derive(Debug)]
pub struct IssuanceOutcome {
    pub recipient: Recipient,
    pub status: IssuanceStatus,
}

#[derive(Debug)]
pub enum IssuanceStatus {
    /// The gift write was submitted; the redeem code is live.
    Issued { gift: Gift, tx_hash: String },
    /// This recipient's write failed; siblings were still attempted.
    Failed { error: ClientError },
    /// No positive parseable gift amount; not counted as a failure.
    Skipped,
}

/// Summary counts for reporting a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub issued: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: &[IssuanceOutcome]) -> Self {
        let mut report = BatchReport {
            issued: 0,
            failed: 0,
            skipped: 0,
        };
        for outcome in outcomes {
            match outcome.status {
                IssuanceStatus::Issued { .. } => report.issued += 1,
                IssuanceStatus::Failed { .. } => report.failed += 1,
                IssuanceStatus::Skipped => report.skipped += 1,
            }
        }
        report
    }
}

/// Issue gifts against `fund` for every recipient with a positive amount.
///
/// The allowance for the whole batch total is ensured up front (one
/// authorization transaction at most), then recipients are processed
/// sequentially. One recipient's failure never aborts the rest: the
/// returned list always has one entry per input recipient, in input order,
/// so callers can retry exactly the failed subset.
///
/// Only the up-front allowance leg can fail the batch as a whole.
pub async fn issue_batch(
    orchestrator: &mut FundingOrchestrator<'_>,
    fund: &ContractRef,
    fund_kind: FundKind,
    recipients: &[Recipient],
) -> Result<Vec<IssuanceOutcome>> {
    let decimals = orchestrator.network().token_decimals;
    let resolved: Vec<Option<u128>> = recipients
        .iter()
        .map(|r| r.resolved_base_units(decimals))
        .collect();
    let total: u128 = resolved.iter().flatten().sum();

    if total > 0 {
        // One approval amortized over the whole batch.
        orchestrator.ensure_allowance(&fund.address, total).await?;
    }

    let mut outcomes = Vec::with_capacity(recipients.len());
    let mut used_codes: HashSet<String> = HashSet::with_capacity(recipients.len());

    for (recipient, amount) in recipients.iter().zip(resolved) {
        let Some(amount) = amount else {
            debug!(
                "Skipping {} (no positive gift amount: {:?})",
                recipient.display_name(),
                recipient.gift_amount
            );
            outcomes.push(IssuanceOutcome {
                recipient: recipient.clone(),
                status: IssuanceStatus::Skipped,
            });
            continue;
        };

        // Fresh code per gift, collision-checked within this batch.
        let redeem_code = loop {
            let code = generate_code(DEFAULT_LENGTH, Some(GIFT_CODE_FORMAT), DEFAULT_CHARSET);
            if used_codes.insert(code.clone()) {
                break code;
            }
        };

        let action = FundingAction::CreateGift {
            fund: fund.clone(),
            amount,
            redeem_code: redeem_code.clone(),
        };
        let status = match orchestrator.execute(action).await {
            Ok(handle) => {
                info!(
                    "Issued {} base units to {} in tx {}",
                    amount,
                    recipient.display_name(),
                    format_tx_hash(handle.hash(), 6, 4)
                );
                IssuanceStatus::Issued {
                    gift: Gift {
                        fund_token: fund.address.clone(),
                        amount_base_units: amount,
                        redeem_code,
                        fund_kind,
                    },
                    tx_hash: handle.hash().to_string(),
                }
            }
            Err(e) => {
                warn!("Gift for {} failed: {e}", recipient.display_name());
                IssuanceStatus::Failed {
                    error: ClientError::RecipientIssuanceFailed {
                        recipient: recipient.display_name(),
                        reason: e.to_string(),
                    },
                }
            }
        };
        outcomes.push(IssuanceOutcome {
            recipient: recipient.clone(),
            status,
        });
    }

    let report = BatchReport::from_outcomes(&outcomes);
    info!(
        "Batch finished: {} issued, {} failed, {} skipped",
        report.issued, report.failed, report.skipped
    );
    Ok(outcomes)
}
