//! Funding transaction orchestration: the approve-then-act sequence behind
//! every value-moving action.
//!
//! Each action runs through one pass of the state machine
//! `Idle → CheckingAllowance → (Authorizing →) Executing → Confirmed | Failed`.
//! The allowance is read fresh from the ledger at every decision point and
//! never cached: external approvals can change it at any time, and because
//! nothing is cached there is nothing to roll back when a step fails.
//!
//! The Executing step is not idempotent at this layer; resubmitting a mint
//! or gift after a transient failure can double-spend. Callers must
//! re-verify ledger state before retrying; this module never retries a
//! value-moving write on its own.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::contracts::{Address, ContractRef, FundKind, NetworkContext};
use crate::errors::{ClientError, Result};
use crate::ledger::{decode_u128, Ledger, LedgerRead, Signer, TxHandle};

// ─────────────────────────────────────────────────────────
// Allowance gate
// ─────────────────────────────────────────────────────────

/// Outcome of an allowance read against a pending transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowanceCheck {
    pub sufficient: bool,
    pub current: u128,
}

/// Read the live allowance and compare it to `required`.
///
/// Never mutates state. A read failure propagates as `LedgerUnavailable`;
/// the caller must treat that as insufficient (fail closed), never as
/// permission to proceed.
pub async fn check_allowance<L: LedgerRead + ?Sized>(
    ledger: &L,
    token: &ContractRef,
    owner: &Address,
    spender: &Address,
    required: u128,
) -> Result<AllowanceCheck> {
    let value = ledger
        .read(token, "allowance", &[json!(owner), json!(spender)])
        .await?;
    let current = decode_u128(&value)?;
    Ok(AllowanceCheck {
        sufficient: current >= required,
        current,
    })
}

// ─────────────────────────────────────────────────────────
// Funding actions
// ─────────────────────────────────────────────────────────

/// The value-moving writes the orchestrator knows how to run.
///
/// Amounts are base units. They are serialized as decimal strings on the
/// wire so large balances survive JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingAction {
    /// Top up the general giving fund.
    Mint { amount: u128 },
    /// Add funding to an existing fund token.
    IncreaseFunding { fund: ContractRef, amount: u128 },
    /// Register a new fund through the factory for `kind`. Moves no
    /// stable-token value, so no allowance is needed.
    CreateFund {
        kind: FundKind,
        name: String,
        symbol: String,
    },
    /// Issue one coded gift against a fund.
    CreateGift {
        fund: ContractRef,
        amount: u128,
        redeem_code: String,
    },
}

impl FundingAction {
    /// Contract the write goes to.
    pub fn target(&self, network: &NetworkContext) -> ContractRef {
        match self {
            Self::Mint { .. } => network.giving_fund_token.clone(),
            Self::IncreaseFunding { fund, .. } => fund.clone(),
            Self::CreateFund { kind, .. } => network.factory_for(*kind).clone(),
            Self::CreateGift { fund, .. } => fund.clone(),
        }
    }

    pub fn function(&self) -> &'static str {
        match self {
            Self::Mint { .. } => "mint",
            Self::IncreaseFunding { .. } => "increaseFunding",
            Self::CreateFund { .. } => "createFund",
            Self::CreateGift { .. } => "createGift",
        }
    }

    pub fn args(&self) -> Vec<serde_json::Value> {
        match self {
            Self::Mint { amount } => vec![json!(amount.to_string())],
            Self::IncreaseFunding { amount, .. } => vec![json!(amount.to_string())],
            Self::CreateFund { name, symbol, .. } => vec![json!(name), json!(symbol)],
            Self::CreateGift {
                amount,
                redeem_code,
                ..
            } => vec![json!(amount.to_string()), json!(redeem_code)],
        }
    }

    /// Stable-token value this write moves; zero means no allowance leg.
    pub fn value_moved(&self) -> u128 {
        match self {
            Self::Mint { amount }
            | Self::IncreaseFunding { amount, .. }
            | Self::CreateGift { amount, .. } => *amount,
            Self::CreateFund { .. } => 0,
        }
    }
}

// ─────────────────────────────────────────────────────────
// State machine
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingState {
    Idle,
    CheckingAllowance,
    Authorizing,
    Executing,
    Confirmed,
    Failed,
}

/// Runs funding actions for one signing identity against one network.
///
/// A single orchestrator can run many actions in sequence (the gift batch
/// issuer does exactly that); `state()` always reflects the most recent
/// action's progress.
pub struct FundingOrchestrator<'a> {
    ledger: &'a dyn Ledger,
    network: &'a NetworkContext,
    signer: Signer,
    state: FundingState,
}

impl<'a> FundingOrchestrator<'a> {
    pub fn new(ledger: &'a dyn Ledger, network: &'a NetworkContext, signer: Signer) -> Self {
        Self {
            ledger,
            network,
            signer,
            state: FundingState::Idle,
        }
    }

    pub fn state(&self) -> FundingState {
        self.state
    }

    pub fn network(&self) -> &NetworkContext {
        self.network
    }

    /// Abandon the pending action if it has not reached Executing yet.
    ///
    /// Once Executing starts the write may already be irreversibly
    /// submitted, so cancellation is refused.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            FundingState::Idle | FundingState::CheckingAllowance => {
                self.state = FundingState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Run the full approve-then-act sequence for `action`.
    pub async fn fund(&mut self, action: FundingAction) -> Result<TxHandle> {
        let moved = action.value_moved();
        if moved > 0 {
            let spender = action.target(self.network).address;
            self.ensure_allowance(&spender, moved).await?;
        }
        self.execute(action).await
    }

    /// Make sure `spender` may move `required` of the user's stable tokens,
    /// authorizing exactly that amount only when the live allowance falls
    /// short. Blocks until the authorization confirms; the value-moving step
    /// must never start on an unconfirmed approval.
    pub async fn ensure_allowance(&mut self, spender: &Address, required: u128) -> Result<()> {
        self.state = FundingState::CheckingAllowance;
        let check = check_allowance(
            self.ledger,
            &self.network.stable_token,
            self.signer.address(),
            spender,
            required,
        )
        .await
        .map_err(|e| self.fail(e))?;

        if check.sufficient {
            debug!(
                "existing allowance {} covers required {required} for {spender}",
                check.current
            );
            return Ok(());
        }

        self.state = FundingState::Authorizing;
        info!("Authorizing {required} base units for spender {spender}");
        let handle = self
            .ledger
            .write(
                &self.network.stable_token,
                "approve",
                &[json!(spender), json!(required.to_string())],
                &self.signer,
            )
            .await
            .map_err(|e| self.fail(e))?;

        let receipt = match self.ledger.await_confirmation(&handle).await {
            Ok(receipt) => receipt,
            // Timeout stays inconclusive; other confirmation failures mean
            // the approval definitively did not land.
            Err(e @ ClientError::ConfirmationTimeout { .. }) => return Err(self.fail(e)),
            Err(e) => {
                return Err(self.fail(ClientError::AuthorizationNotConfirmed(e.to_string())))
            }
        };
        if !receipt.success {
            return Err(self.fail(ClientError::AuthorizationNotConfirmed(format!(
                "approval tx {} reverted",
                receipt.tx_hash
            ))));
        }
        info!("Approval confirmed in tx {}", receipt.tx_hash);
        Ok(())
    }

    /// Submit the value-moving write. Assumes any allowance leg has already
    /// run; the gift batch issuer relies on this to amortize one
    /// authorization over a whole batch.
    pub async fn execute(&mut self, action: FundingAction) -> Result<TxHandle> {
        self.state = FundingState::Executing;
        let target = action.target(self.network);
        let function = action.function();
        let handle = self
            .ledger
            .write(&target, function, &action.args(), &self.signer)
            .await
            .map_err(|e| self.fail(e))?;

        self.state = FundingState::Confirmed;
        info!("{function} submitted in tx {}", handle.hash());
        Ok(handle)
    }

    fn fail(&mut self, error: ClientError) -> ClientError {
        warn!("Funding action failed while {:?}: {error}", self.state);
        self.state = FundingState::Failed;
        error
    }
}
