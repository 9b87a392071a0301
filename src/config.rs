//! Ledger configuration
//!
//! Settings come from `config/ledger.toml` (optional) and `LEDGER__*`
//! environment variables, e.g. `LEDGER__LEDGER__NCF_LOW_THRESHOLD=100`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Where the balance sheet reads account balances from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSheetSource {
    /// Recomputed from posted lines up to the report date
    #[default]
    PostedLines,
    /// The running `balance` maintained on each account
    CachedBalances,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Journal used for template postings and business patterns
    #[serde(default = "default_journal_code")]
    pub default_journal_code: String,
    /// Zero padding of the counter part of entry numbers
    #[serde(default = "default_entry_number_width")]
    pub entry_number_width: usize,
    /// Account credited by payments and expenses
    #[serde(default = "default_cash_account_code")]
    pub default_cash_account_code: String,
    /// Account credited when an invoice is collected
    #[serde(default = "default_receivables_account_code")]
    pub default_receivables_account_code: String,
    /// Remaining numbers at which an NCF range is reported as running low
    #[serde(default = "default_ncf_low_threshold")]
    pub ncf_low_threshold: u64,
    /// Reject postings dated outside the company's open fiscal periods
    #[serde(default = "default_enforce_fiscal_periods")]
    pub enforce_fiscal_periods: bool,
    #[serde(default)]
    pub balance_sheet_source: BalanceSheetSource,
}

fn default_journal_code() -> String {
    "GJ".to_string()
}

fn default_entry_number_width() -> usize {
    6
}

fn default_cash_account_code() -> String {
    "111000".to_string()
}

fn default_receivables_account_code() -> String {
    "121000".to_string()
}

fn default_ncf_low_threshold() -> u64 {
    50
}

fn default_enforce_fiscal_periods() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_journal_code: default_journal_code(),
            entry_number_width: default_entry_number_width(),
            default_cash_account_code: default_cash_account_code(),
            default_receivables_account_code: default_receivables_account_code(),
            ncf_low_threshold: default_ncf_low_threshold(),
            enforce_fiscal_periods: default_enforce_fiscal_periods(),
            balance_sheet_source: BalanceSheetSource::default(),
        }
    }
}

impl LedgerConfig {
    /// Load the `[ledger]` section from `config/ledger.toml`, overridden by env vars.
    /// A missing section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/ledger.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        match settings.get::<LedgerConfig>("ledger") {
            Ok(config) => Ok(config),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.default_journal_code, "GJ");
        assert_eq!(config.entry_number_width, 6);
        assert_eq!(config.default_cash_account_code, "111000");
        assert!(config.enforce_fiscal_periods);
        assert_eq!(config.balance_sheet_source, BalanceSheetSource::PostedLines);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = LedgerConfig::load_from("config/does-not-exist.toml").unwrap();
        assert_eq!(config.ncf_low_threshold, 50);
    }
}
