//! Ledger module: chart of accounts, fiscal periods, postings and templates

pub mod account;
pub mod core;
pub mod journal;
pub mod period;
pub mod seed;
pub mod template;

pub use account::*;
pub use self::core::*;
pub use journal::*;
pub use period::*;
pub use template::*;
