//! Gift-recipient batch parsing (the `Gift-Recipients.csv` upload).

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amount;
use crate::errors::{ClientError, Result};

/// Header row of the downloadable template; always discarded on parse.
pub const BATCH_HEADER: &str = "First Name,Last Name,Email,Phone Number,Gift Amount";

const FIELDS_PER_ROW: usize = 5;

/// One row of the batch upload. Email/phone formats are not validated here;
/// that stays with the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    /// Human-units decimal string as typed in the spreadsheet; may be junk.
    pub gift_amount: String,
}

impl Recipient {
    /// Gift amount resolved to base units, or `None` when the row carries no
    /// positive parseable amount (such rows are skipped, never failed).
    pub fn resolved_base_units(&self, decimals: u32) -> Option<u128> {
        match amount::parse_units(&self.gift_amount, decimals) {
            Ok(0) | Err(_) => None,
            Ok(units) => Some(units),
        }
    }

    /// Label used in logs and per-recipient reports.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        if name.trim().is_empty() {
            self.email.clone()
        } else {
            name.trim().to_string()
        }
    }
}

/// Parse a raw batch upload into recipients, in file order.
///
/// The first line is the header and is dropped; blank lines are ignored;
/// rows with fewer than five comma-separated fields are dropped without
/// aborting the parse. Zero usable rows is a valid (empty) result.
/// Undecodable bytes fail with [`ClientError::MalformedInput`].
pub fn parse_batch(raw: &[u8]) -> Result<Vec<Recipient>> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        ClientError::MalformedInput(format!("batch upload is not valid UTF-8: {e}"))
    })?;

    let mut rows = Vec::new();
    for line in text.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < FIELDS_PER_ROW {
            debug!("Dropping short batch row ({} fields): {line}", fields.len());
            continue;
        }
        rows.push(Recipient {
            first_name: fields[0].trim().to_string(),
            last_name: fields[1].trim().to_string(),
            email: fields[2].trim().to_string(),
            phone_number: fields[3].trim().to_string(),
            gift_amount: fields[4].trim().to_string(),
        });
    }
    Ok(rows)
}
