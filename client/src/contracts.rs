//! Typed contract references and on-ledger fund state.
//!
//! The deployed-contract map is resolved once from configuration into a
//! [`NetworkContext`] and threaded through calls explicitly; nothing in the
//! crate looks contracts up by ambient chain id.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::amount;
use crate::config::Config;
use crate::errors::{ClientError, Result};
use crate::ledger::{decode_address, decode_string, decode_u128, LedgerRead};

// ─────────────────────────────────────────────────────────
// Addresses and contract references
// ─────────────────────────────────────────────────────────

/// A checksummed-format ledger address, validated as `0x` + 40 hex digits
/// and normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| ClientError::MalformedInput(format!("address missing 0x prefix: {s}")))?;
        if digits.len() != 40 {
            return Err(ClientError::MalformedInput(format!(
                "address must be 40 hex digits: {s}"
            )));
        }
        hex::decode(digits)
            .map_err(|_| ClientError::MalformedInput(format!("address is not hex: {s}")))?;
        Ok(Address(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ABI schema a contract answers to. Fixes the set of functions the ledger
/// capabilities may be asked for, replacing loosely-typed contract handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiSchema {
    /// `allowance`, `approve`, `balanceOf`, `totalSupply`
    Erc20,
    /// General giving fund: Erc20 plus `mint`, `createGift`
    GivingFundToken,
    /// `createFund`, `getUserFunds`, `getFundInfo`
    FundTokenFactory,
    /// A fund created by a factory: Erc20 plus `increaseFunding`, `createGift`
    FundToken,
}

/// A contract the ledger capabilities can be pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRef {
    pub address: Address,
    pub schema: AbiSchema,
}

impl ContractRef {
    pub fn new(address: Address, schema: AbiSchema) -> Self {
        Self { address, schema }
    }
}

/// The deployed contracts for one chain, built once per session from config.
#[derive(Debug, Clone)]
pub struct NetworkContext {
    pub chain_id: u64,
    /// Stable-token decimals; all human amounts resolve through this.
    pub token_decimals: u32,
    pub stable_token: ContractRef,
    pub giving_fund_token: ContractRef,
    pub bespoke_factory: ContractRef,
    pub matching_factory: ContractRef,
}

impl NetworkContext {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(NetworkContext {
            chain_id: config.chain_id,
            token_decimals: config.token_decimals,
            stable_token: ContractRef::new(
                Address::parse(&config.stable_token_address)?,
                AbiSchema::Erc20,
            ),
            giving_fund_token: ContractRef::new(
                Address::parse(&config.giving_fund_token_address)?,
                AbiSchema::GivingFundToken,
            ),
            bespoke_factory: ContractRef::new(
                Address::parse(&config.bespoke_factory_address)?,
                AbiSchema::FundTokenFactory,
            ),
            matching_factory: ContractRef::new(
                Address::parse(&config.matching_factory_address)?,
                AbiSchema::FundTokenFactory,
            ),
        })
    }

    pub fn factory_for(&self, kind: FundKind) -> &ContractRef {
        match kind {
            FundKind::Bespoke => &self.bespoke_factory,
            FundKind::Matching => &self.matching_factory,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Funds and gifts
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundKind {
    Bespoke,
    Matching,
}

impl FundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bespoke => "bespoke",
            Self::Matching => "matching",
        }
    }
}

/// A giving-fund token as read from the ledger. This is a snapshot: the
/// ledger owns the state, and a stale read may legitimately show
/// `funded_amount > total_issuable` for a moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fund {
    pub address: Address,
    pub creator: Address,
    pub name: String,
    pub symbol: String,
    /// Unix seconds from the creation transaction.
    pub created_at: i64,
    pub total_issuable: u128,
    pub funded_amount: u128,
    pub kind: FundKind,
}

impl Fund {
    pub fn contract(&self) -> ContractRef {
        ContractRef::new(self.address.clone(), AbiSchema::FundToken)
    }

    /// Funded percentage for display; clamps nothing, crashes on nothing.
    pub fn percentage_funded(&self) -> String {
        amount::percentage_funded(self.funded_amount, self.total_issuable)
    }

    pub fn created_date(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.created_at, 0)
            .map(|dt| dt.format("%b %d, %Y").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// A gift issued against a fund, claimable by whoever holds the redeem code.
/// Once the `createGift` write is submitted, redemption and expiry belong to
/// the ledger, not this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub fund_token: Address,
    pub amount_base_units: u128,
    pub redeem_code: String,
    pub fund_kind: FundKind,
}

// ─────────────────────────────────────────────────────────
// Read-side fund queries
// ─────────────────────────────────────────────────────────

/// General-fund balance of `owner` in base units.
pub async fn fetch_balance(
    ledger: &dyn LedgerRead,
    token: &ContractRef,
    owner: &Address,
) -> Result<u128> {
    let value = ledger.read(token, "balanceOf", &[json!(owner)]).await?;
    decode_u128(&value)
}

/// All funds `owner` created through the factory for `kind`, with their
/// details resolved one `getFundInfo` read at a time.
pub async fn fetch_user_funds(
    ledger: &dyn LedgerRead,
    network: &NetworkContext,
    kind: FundKind,
    owner: &Address,
) -> Result<Vec<Fund>> {
    let factory = network.factory_for(kind);
    let listed = ledger.read(factory, "getUserFunds", &[json!(owner)]).await?;
    let addresses = listed.as_array().cloned().unwrap_or_default();

    let mut funds = Vec::with_capacity(addresses.len());
    for entry in &addresses {
        let fund_address = decode_address(entry)?;
        let info = ledger
            .read(factory, "getFundInfo", &[json!(&fund_address)])
            .await?;
        let fields = info.as_array().ok_or_else(|| {
            ClientError::LedgerUnavailable(format!("getFundInfo returned non-tuple: {info}"))
        })?;
        if fields.len() < 6 {
            return Err(ClientError::LedgerUnavailable(format!(
                "getFundInfo returned {} fields, expected 6",
                fields.len()
            )));
        }
        funds.push(Fund {
            address: fund_address,
            creator: decode_address(&fields[0])?,
            name: decode_string(&fields[1])?,
            symbol: decode_string(&fields[2])?,
            created_at: decode_u128(&fields[3])? as i64,
            total_issuable: decode_u128(&fields[4])?,
            funded_amount: decode_u128(&fields[5])?,
            kind,
        });
    }
    Ok(funds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::{test_network, ScriptedLedger};

    const ADDR_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ADDR_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    #[test]
    fn address_parse_normalizes_case() {
        let a = Address::parse("0xAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaa").unwrap();
        assert_eq!(a.as_str(), ADDR_A);
    }

    #[test]
    fn address_parse_rejects_bad_input() {
        assert!(Address::parse("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn fund_percentage_reflects_ledger_counters() {
        let fund = Fund {
            address: Address::parse(ADDR_A).unwrap(),
            creator: Address::parse(ADDR_B).unwrap(),
            name: "Daisy's Giving Fund".to_string(),
            symbol: "DGF".to_string(),
            created_at: 1_704_067_200,
            total_issuable: 2_000,
            funded_amount: 500,
            kind: FundKind::Bespoke,
        };
        assert_eq!(fund.percentage_funded(), "25");
        assert_eq!(fund.created_date(), "Jan 01, 2024");
    }

    #[tokio::test]
    async fn fetch_user_funds_decodes_fund_info() {
        let ledger = ScriptedLedger::default();
        ledger.set_read("getUserFunds", json!([ADDR_A]));
        ledger.set_read(
            "getFundInfo",
            json!([ADDR_B, "Daisy's Giving Fund", "DGF", 1_704_067_200u64, "2000", "500"]),
        );
        let network = test_network();
        let owner = Address::parse(ADDR_B).unwrap();

        let funds = fetch_user_funds(&ledger, &network, FundKind::Bespoke, &owner)
            .await
            .unwrap();
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].name, "Daisy's Giving Fund");
        assert_eq!(funds[0].total_issuable, 2000);
        assert_eq!(funds[0].funded_amount, 500);
        assert_eq!(funds[0].kind, FundKind::Bespoke);
    }
}
