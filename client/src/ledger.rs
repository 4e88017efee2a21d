//! Ledger capabilities: typed read/write access to the remote ledger.
//!
//! ## Resilience
//!
//! * Read calls apply exponential back-off on transport errors and
//!   rate-limit responses, up to [`MAX_BACKOFF_SECS`] seconds and
//!   [`READ_RETRY_LIMIT`] attempts, then fail with `LedgerUnavailable`.
//! * Write calls are submitted exactly once. Retrying a value-moving write
//!   blindly can double-spend, so retry decisions stay with the caller.
//! * Confirmation waits are bounded; exhausting the poll budget yields
//!   `ConfirmationTimeout`, which is inconclusive rather than a failure.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::contracts::{Address, ContractRef};
use crate::errors::{ClientError, Result};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;
const READ_RETRY_LIMIT: u32 = 3;

// ─────────────────────────────────────────────────────────
// Signing identities
// ─────────────────────────────────────────────────────────

/// Who signs a write and how it reaches the ledger. The two variants are
/// functionally equivalent: identical `(contract, function, args)` triples
/// produce the same on-ledger effect; they differ only in who pays gas and
/// how the transaction is relayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Signer {
    /// Externally-owned account signing and submitting directly.
    Direct { address: Address },
    /// Smart-wallet account whose transactions a relayer session submits.
    Relayed { account: Address, session: String },
}

impl Signer {
    pub fn address(&self) -> &Address {
        match self {
            Self::Direct { address } => address,
            Self::Relayed { account, .. } => account,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Capability traits
// ─────────────────────────────────────────────────────────

/// Handle for a submitted transaction, opaque beyond its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHandle(String);

impl TxHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn hash(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusion result for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Read-only ledger access (`allowance`, `balanceOf`, `getFundInfo`, ...).
#[async_trait]
pub trait LedgerRead: Send + Sync {
    async fn read(&self, contract: &ContractRef, function: &str, args: &[Value])
        -> Result<Value>;
}

/// State-changing ledger access plus confirmation waiting.
#[async_trait]
pub trait LedgerWrite: Send + Sync {
    async fn write(
        &self,
        contract: &ContractRef,
        function: &str,
        args: &[Value],
        signer: &Signer,
    ) -> Result<TxHandle>;

    async fn await_confirmation(&self, handle: &TxHandle) -> Result<Receipt>;
}

/// Both capabilities together, as the orchestrator needs them.
pub trait Ledger: LedgerRead + LedgerWrite {}

impl<T: LedgerRead + LedgerWrite> Ledger for T {}

// ─────────────────────────────────────────────────────────
// Value decoding
// ─────────────────────────────────────────────────────────

/// Decode an unsigned integer the gateway may return as a JSON number or a
/// decimal string (large base-unit values do not fit a JSON number).
pub fn decode_u128(value: &Value) -> Result<u128> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| non_numeric(value)),
        Value::String(s) => s.parse().map_err(|_| non_numeric(value)),
        _ => Err(non_numeric(value)),
    }
}

fn non_numeric(value: &Value) -> ClientError {
    ClientError::LedgerUnavailable(format!("non-numeric ledger value: {value}"))
}

pub fn decode_string(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| ClientError::LedgerUnavailable(format!("non-string ledger value: {value}")))
}

pub fn decode_address(value: &Value) -> Result<Address> {
    Address::parse(&decode_string(value)?)
}

/// Shorten a transaction hash for display (`0x1234...abcd`).
pub fn format_tx_hash(hash: &str, start_chars: usize, end_chars: usize) -> String {
    if hash.len() <= start_chars + end_chars {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..start_chars], &hash[hash.len() - end_chars..])
}

// ─────────────────────────────────────────────────────────
// JSON-RPC gateway client
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// [`LedgerRead`]/[`LedgerWrite`] over the JSON-RPC gateway named in config.
pub struct HttpLedger {
    client: Client,
    rpc_url: String,
    chain_id: u64,
    confirm_poll: Duration,
    confirm_max_attempts: u32,
}

impl HttpLedger {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClientError::Http)?;
        Ok(HttpLedger {
            client,
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            confirm_poll: Duration::from_secs(config.confirm_poll_secs),
            confirm_max_attempts: config.confirm_max_attempts,
        })
    }

    /// One JSON-RPC round trip; no retries.
    async fn call_once(&self, method: &str, params: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| ClientError::LedgerUnavailable(format!("{method} request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::LedgerUnavailable(format!(
                "{method} rate-limited by gateway"
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ClientError::LedgerUnavailable(format!("{method} bad response: {e}")))?;

        if let Some(err) = body.error {
            return Err(ClientError::LedgerUnavailable(format!(
                "{method} RPC error {}: {}",
                err.code, err.message
            )));
        }
        body.result
            .ok_or_else(|| ClientError::LedgerUnavailable(format!("{method} returned no result")))
    }

    /// JSON-RPC round trip with back-off; reads only.
    async fn call_with_retry(&self, method: &str, params: Value) -> Result<Value> {
        let mut backoff = INITIAL_BACKOFF_SECS;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.call_once(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < READ_RETRY_LIMIT => {
                    warn!("{method} failed (will retry in {backoff}s): {e}");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl LedgerRead for HttpLedger {
    async fn read(
        &self,
        contract: &ContractRef,
        function: &str,
        args: &[Value],
    ) -> Result<Value> {
        debug!("read {function} on {}", contract.address);
        self.call_with_retry(
            "ledger_read",
            json!({
                "chainId": self.chain_id,
                "contract": contract,
                "function": function,
                "args": args,
            }),
        )
        .await
    }
}

#[async_trait]
impl LedgerWrite for HttpLedger {
    async fn write(
        &self,
        contract: &ContractRef,
        function: &str,
        args: &[Value],
        signer: &Signer,
    ) -> Result<TxHandle> {
        debug!("submit {function} on {} for {}", contract.address, signer.address());
        let result = self
            .call_once(
                "ledger_submit",
                json!({
                    "chainId": self.chain_id,
                    "contract": contract,
                    "function": function,
                    "args": args,
                    "signer": signer,
                }),
            )
            .await?;
        let hash = decode_string(&result)?;
        Ok(TxHandle::new(hash))
    }

    async fn await_confirmation(&self, handle: &TxHandle) -> Result<Receipt> {
        for attempt in 1..=self.confirm_max_attempts {
            let result = self
                .call_with_retry("ledger_getReceipt", json!({ "txHash": handle.hash() }))
                .await?;
            if !result.is_null() {
                let receipt: Receipt = serde_json::from_value(result)?;
                debug!("tx {} confirmed after {attempt} polls", handle.hash());
                return Ok(receipt);
            }
            tokio::time::sleep(self.confirm_poll).await;
        }
        Err(ClientError::ConfirmationTimeout {
            tx_hash: handle.hash().to_string(),
            attempts: self.confirm_max_attempts,
        })
    }
}

// ─────────────────────────────────────────────────────────
// Test support
// ─────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use super::*;
    use crate::contracts::{AbiSchema, NetworkContext};

    /// In-memory ledger double that records the exact operation sequence so
    /// tests can assert orchestration order.
    #[derive(Default)]
    pub(crate) struct ScriptedLedger {
        /// `read:<fn>`, `write:<fn>`, `confirm:<hash>` in call order.
        pub ops: Mutex<Vec<String>>,
        /// `(function, args)` for every submitted write.
        pub writes: Mutex<Vec<(String, Vec<Value>)>>,
        reads: Mutex<HashMap<String, Value>>,
        fail_reads: Mutex<bool>,
        /// Zero-based indices of write() calls that fail at submission.
        fail_write_calls: Mutex<HashSet<usize>>,
        /// Hashes whose confirmation reports a reverted transaction.
        revert_confirmations: Mutex<HashSet<String>>,
        /// Hashes whose confirmation wait times out.
        timeout_confirmations: Mutex<HashSet<String>>,
        write_count: Mutex<usize>,
    }

    impl ScriptedLedger {
        pub fn set_read(&self, function: &str, value: Value) {
            self.reads.lock().unwrap().insert(function.to_string(), value);
        }

        pub fn fail_all_reads(&self) {
            *self.fail_reads.lock().unwrap() = true;
        }

        pub fn fail_write_call(&self, index: usize) {
            self.fail_write_calls.lock().unwrap().insert(index);
        }

        pub fn revert_confirmation_of(&self, hash: &str) {
            self.revert_confirmations.lock().unwrap().insert(hash.to_string());
        }

        pub fn timeout_confirmation_of(&self, hash: &str) {
            self.timeout_confirmations.lock().unwrap().insert(hash.to_string());
        }

        pub fn op_log(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        pub fn writes_named(&self, function: &str) -> Vec<Vec<Value>> {
            self.writes
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _)| name == function)
                .map(|(_, args)| args.clone())
                .collect()
        }
    }

    #[async_trait]
    impl LedgerRead for ScriptedLedger {
        async fn read(
            &self,
            _contract: &ContractRef,
            function: &str,
            _args: &[Value],
        ) -> Result<Value> {
            self.ops.lock().unwrap().push(format!("read:{function}"));
            if *self.fail_reads.lock().unwrap() {
                return Err(ClientError::LedgerUnavailable(
                    "scripted read failure".to_string(),
                ));
            }
            Ok(self
                .reads
                .lock()
                .unwrap()
                .get(function)
                .cloned()
                .unwrap_or(Value::Null))
        }
    }

    #[async_trait]
    impl LedgerWrite for ScriptedLedger {
        async fn write(
            &self,
            _contract: &ContractRef,
            function: &str,
            args: &[Value],
            _signer: &Signer,
        ) -> Result<TxHandle> {
            let index = {
                let mut count = self.write_count.lock().unwrap();
                let index = *count;
                *count += 1;
                index
            };
            self.ops.lock().unwrap().push(format!("write:{function}"));
            self.writes
                .lock()
                .unwrap()
                .push((function.to_string(), args.to_vec()));
            if self.fail_write_calls.lock().unwrap().contains(&index) {
                return Err(ClientError::LedgerUnavailable(
                    "scripted write failure".to_string(),
                ));
            }
            Ok(TxHandle::new(format!("0xtx{index}")))
        }

        async fn await_confirmation(&self, handle: &TxHandle) -> Result<Receipt> {
            self.ops
                .lock()
                .unwrap()
                .push(format!("confirm:{}", handle.hash()));
            if self.timeout_confirmations.lock().unwrap().contains(handle.hash()) {
                return Err(ClientError::ConfirmationTimeout {
                    tx_hash: handle.hash().to_string(),
                    attempts: 30,
                });
            }
            let reverted = self.revert_confirmations.lock().unwrap().contains(handle.hash());
            Ok(Receipt {
                tx_hash: handle.hash().to_string(),
                success: !reverted,
                block_number: Some(1),
            })
        }
    }

    /// A [`NetworkContext`] over placeholder addresses for orchestration tests.
    pub(crate) fn test_network() -> NetworkContext {
        let addr =
            |digit: char| Address::parse(&format!("0x{}", digit.to_string().repeat(40))).unwrap();
        NetworkContext {
            chain_id: 84532,
            token_decimals: 6,
            stable_token: ContractRef::new(addr('1'), AbiSchema::Erc20),
            giving_fund_token: ContractRef::new(addr('2'), AbiSchema::GivingFundToken),
            bespoke_factory: ContractRef::new(addr('3'), AbiSchema::FundTokenFactory),
            matching_factory: ContractRef::new(addr('4'), AbiSchema::FundTokenFactory),
        }
    }

    /// A direct-EOA signer for tests.
    pub(crate) fn test_signer() -> Signer {
        Signer::Direct {
            address: Address::parse("0x9999999999999999999999999999999999999999").unwrap(),
        }
    }

    #[test]
    fn decode_u128_accepts_numbers_and_strings() {
        assert_eq!(decode_u128(&json!(42)).unwrap(), 42);
        assert_eq!(decode_u128(&json!("15000000")).unwrap(), 15_000_000);
        assert!(decode_u128(&json!(null)).is_err());
        assert!(decode_u128(&json!("not a number")).is_err());
        assert!(decode_u128(&json!(-1)).is_err());
    }

    #[test]
    fn tx_hash_shortening() {
        assert_eq!(
            format_tx_hash("0x1234567890abcdef1234567890abcdef", 6, 4),
            "0x1234...cdef"
        );
        assert_eq!(format_tx_hash("0xabc", 6, 4), "0xabc");
    }

    #[test]
    fn signer_serializes_with_mode_tag() {
        let signer = test_signer();
        let value = serde_json::to_value(&signer).unwrap();
        assert_eq!(value["mode"], "direct");
        let relayed = Signer::Relayed {
            account: Address::parse("0x9999999999999999999999999999999999999999").unwrap(),
            session: "sess-1".to_string(),
        };
        assert_eq!(serde_json::to_value(&relayed).unwrap()["mode"], "relayed");
    }
}
