//! Balance reconciliation
//!
//! Accounts carry a running balance updated on every posting. Reports use
//! posted lines instead, so this module checks the two against each other.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::reports::activity_by_account;
use crate::traits::*;
use crate::types::*;

/// An account whose running balance disagrees with its posted lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDiscrepancy {
    pub account_id: Uuid,
    pub account_code: String,
    pub cached_balance: BigDecimal,
    pub derived_balance: BigDecimal,
    /// `cached - derived`
    pub difference: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReconciliation {
    pub company_id: CompanyId,
    pub accounts_checked: usize,
    pub discrepancies: Vec<BalanceDiscrepancy>,
}

impl BalanceReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

pub struct ReconciliationEngine<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> ReconciliationEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Compare every account's running balance with the balance derived from
    /// all of its posted lines
    pub async fn reconcile_balances(
        &self,
        company_id: CompanyId,
    ) -> LedgerResult<BalanceReconciliation> {
        let accounts = self.storage.list_accounts(company_id, None).await?;
        let entries = self
            .storage
            .list_journal_entries(company_id, None, None)
            .await?;
        let activity = activity_by_account(&entries);

        let discrepancies: Vec<BalanceDiscrepancy> = accounts
            .iter()
            .filter_map(|account| {
                let derived = activity
                    .get(&account.id)
                    .map(|a| round_currency(&a.balance_for(account.account_type)))
                    .unwrap_or_else(|| BigDecimal::from(0));
                if amounts_match(&account.balance, &derived) {
                    return None;
                }
                Some(BalanceDiscrepancy {
                    account_id: account.id,
                    account_code: account.code.clone(),
                    difference: &account.balance - &derived,
                    cached_balance: account.balance.clone(),
                    derived_balance: derived,
                })
            })
            .collect();

        for discrepancy in &discrepancies {
            warn!(
                company_id,
                account_code = %discrepancy.account_code,
                cached = %discrepancy.cached_balance,
                derived = %discrepancy.derived_balance,
                "account balance drift"
            );
        }
        info!(
            company_id,
            accounts = accounts.len(),
            discrepancies = discrepancies.len(),
            "reconciled account balances"
        );

        Ok(BalanceReconciliation {
            company_id,
            accounts_checked: accounts.len(),
            discrepancies,
        })
    }
}
