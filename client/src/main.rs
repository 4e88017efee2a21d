//! Giving-fund overview entry point.
//!
//! Reads the signed-in user's general balance and their bespoke/matching
//! funds from the ledger and prints a plain-text overview. Configuration
//! comes from the environment (see `config.rs`); `RUST_LOG` controls
//! verbosity.

use tracing_subscriber::EnvFilter;

use givefund_client::amount::format_units;
use givefund_client::config::Config;
use givefund_client::contracts::{fetch_balance, fetch_user_funds, Address, FundKind, NetworkContext};
use givefund_client::ledger::HttpLedger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    let network = NetworkContext::from_config(&config).map_err(|e| anyhow::anyhow!("{e}"))?;
    let user = Address::parse(&config.user_address).map_err(|e| anyhow::anyhow!("{e}"))?;
    let ledger = HttpLedger::new(&config).map_err(|e| anyhow::anyhow!("{e}"))?;

    let balance = fetch_balance(&ledger, &network.giving_fund_token, &user).await?;
    println!("General Giving Fund");
    println!(
        "  Available balance: ${}",
        format_units(balance, network.token_decimals)
    );
    println!();

    for kind in [FundKind::Bespoke, FundKind::Matching] {
        let funds = fetch_user_funds(&ledger, &network, kind, &user).await?;
        match kind {
            FundKind::Bespoke => println!("Bespoke Giving Fund Tokens"),
            FundKind::Matching => println!("Matching Fund Tokens"),
        }
        if funds.is_empty() {
            println!("  (none)");
        }
        for fund in &funds {
            println!(
                "  {} ({})  created {}  funded ${} of ${}  {}%",
                fund.name,
                fund.symbol,
                fund.created_date(),
                format_units(fund.funded_amount, network.token_decimals),
                format_units(fund.total_issuable, network.token_decimals),
                fund.percentage_funded(),
            );
        }
        println!();
    }

    Ok(())
}
