//! Account credential loading.
//!
//! Accounts arrive as a line-delimited file of raw credential query
//! strings; the display name is dug out of the percent-encoded `user=`
//! JSON blob each line carries.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use url::form_urlencoded;

/// One account, immutable once loaded.
#[derive(Debug, Clone)]
pub struct Account {
    /// 1-based position in the input file, used for logging.
    pub index: usize,
    pub display_name: String,
    /// Raw credential query string exchanged for an access token.
    pub query: String,
}

/// Read accounts from a line-delimited file, skipping blank lines.
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading accounts file {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| Account {
            index: i + 1,
            display_name: display_name_from_query(line)
                .unwrap_or_else(|| "unknown".to_string()),
            query: line.to_string(),
        })
        .collect())
}

/// Pull `first_name` out of the `user=` parameter's JSON value.
fn display_name_from_query(query: &str) -> Option<String> {
    let user_json = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "user")
        .map(|(_, value)| value.into_owned())?;
    let user: serde_json::Value = serde_json::from_str(&user_json).ok()?;
    user.get("first_name")?.as_str().map(str::to_string)
}
