//! # Fiscal Ledger
//!
//! Double-entry accounting core for Dominican businesses: turns POS sales,
//! payments, expenses and invoice collections into balanced journal entries,
//! hands out fiscal receipt numbers (NCF) from authorised ranges, and derives
//! the standard financial reports from posted entries.
//!
//! ## Features
//!
//! - **Chart of accounts**: idempotent bootstrap of the standard Dominican chart, search and
//!   hierarchy
//! - **Journal posting**: validated, atomic double-entry postings with gap-free entry numbers
//! - **Auto-journal templates**: data-driven recipes mapping business events to journal lines
//! - **NCF sequences**: concurrency-safe allocation with exhaustion and expiry checks
//! - **ITBIS**: standard, reduced and exempt rate calculations
//! - **Financial reporting**: trial balance, income statement, balance sheet and general ledger
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use fiscal_ledger::{EventContext, ItbisCalculation, ItbisRate, Ledger, MemoryStorage};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # tokio_test_block(async {
//! let mut ledger = Ledger::new(MemoryStorage::new());
//! ledger.accounts().initialize_chart_of_accounts_for_year(1, "admin", 2025).await?;
//!
//! let sale = ItbisCalculation::calculate(BigDecimal::from(100), ItbisRate::Standard).unwrap();
//! let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
//! let context = EventContext::from_itbis(&sale, "0001", "cash", date);
//! let posting = ledger.post_from_event(1, "pos_sale_cash", &context, "cashier").await?;
//! assert_eq!(posting.entry.entry_number, "GJ-000001");
//! # Ok::<(), fiscal_ledger::LedgerError>(())
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod ledger;
pub mod observability;
pub mod reconciliation;
pub mod reports;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::account::*;
pub use ledger::core::*;
pub use ledger::journal::*;
pub use ledger::period::*;
pub use ledger::template::*;
pub use reconciliation::*;
pub use reports::{
    BalanceSheet, GeneralLedger, GeneralLedgerLine, IncomeStatement, LedgerReports, StatementLine,
    TrialBalance, TrialBalanceRow, TrialBalanceTotals,
};
pub use tax::itbis::*;
pub use tax::ncf::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;

// Re-export posting patterns for convenience
pub use ledger::journal::patterns;
