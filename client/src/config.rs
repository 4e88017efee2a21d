//! Application configuration loaded from environment variables.

use crate::errors::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC gateway endpoint for the ledger
    pub rpc_url: String,
    /// Chain the deployed contracts live on
    pub chain_id: u64,
    /// Wallet address of the signed-in user
    pub user_address: String,
    /// Stable token (USDC) contract address
    pub stable_token_address: String,
    /// GivingFundToken contract address (general giving fund)
    pub giving_fund_token_address: String,
    /// BespokeFundTokenFactory contract address
    pub bespoke_factory_address: String,
    /// MatchingFundTokenFactory contract address
    pub matching_factory_address: String,
    /// Base URL of the nonprofit directory search API
    pub directory_url: String,
    /// Decimals of the stable token (6 for USDC)
    pub token_decimals: u32,
    /// Seconds between receipt polls while waiting for confirmation
    pub confirm_poll_secs: u64,
    /// Receipt polls before the wait is declared inconclusive
    pub confirm_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string()),
            chain_id: env_var("CHAIN_ID")
                .unwrap_or_else(|_| "84532".to_string())
                .parse()
                .map_err(|_| ClientError::Config("Invalid CHAIN_ID".to_string()))?,
            user_address: env_var("USER_ADDRESS").map_err(|_| {
                ClientError::Config("USER_ADDRESS environment variable is required".to_string())
            })?,
            stable_token_address: env_var("USDC_ADDRESS").map_err(|_| {
                ClientError::Config("USDC_ADDRESS environment variable is required".to_string())
            })?,
            giving_fund_token_address: env_var("GIVING_FUND_TOKEN_ADDRESS").map_err(|_| {
                ClientError::Config(
                    "GIVING_FUND_TOKEN_ADDRESS environment variable is required".to_string(),
                )
            })?,
            bespoke_factory_address: env_var("BESPOKE_FACTORY_ADDRESS").map_err(|_| {
                ClientError::Config(
                    "BESPOKE_FACTORY_ADDRESS environment variable is required".to_string(),
                )
            })?,
            matching_factory_address: env_var("MATCHING_FACTORY_ADDRESS").map_err(|_| {
                ClientError::Config(
                    "MATCHING_FACTORY_ADDRESS environment variable is required".to_string(),
                )
            })?,
            directory_url: env_var("DIRECTORY_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            token_decimals: env_var("TOKEN_DECIMALS")
                .unwrap_or_else(|_| "6".to_string())
                .parse()
                .map_err(|_| ClientError::Config("Invalid TOKEN_DECIMALS".to_string()))?,
            confirm_poll_secs: env_var("CONFIRM_POLL_SECS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| ClientError::Config("Invalid CONFIRM_POLL_SECS".to_string()))?,
            confirm_max_attempts: env_var("CONFIRM_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| ClientError::Config("Invalid CONFIRM_MAX_ATTEMPTS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| ClientError::Config(format!("Missing env var: {key}")))
}
