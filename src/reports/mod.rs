//! Financial reports derived from posted journal entries

pub mod general_ledger;
pub mod statements;
pub mod trial_balance;

pub use general_ledger::*;
pub use statements::*;
pub use trial_balance::*;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::config::{BalanceSheetSource, LedgerConfig};
use crate::traits::*;
use crate::types::*;

/// Debit and credit totals posted to one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountActivity {
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
}

impl Default for AccountActivity {
    fn default() -> Self {
        Self {
            total_debit: BigDecimal::from(0),
            total_credit: BigDecimal::from(0),
        }
    }
}

impl AccountActivity {
    pub fn is_empty(&self) -> bool {
        self.total_debit == BigDecimal::from(0) && self.total_credit == BigDecimal::from(0)
    }

    /// Balance signed by the account type's normal side
    pub fn balance_for(&self, account_type: AccountType) -> BigDecimal {
        account_type.signed_balance(&self.total_debit, &self.total_credit)
    }
}

/// Sum posted lines per account
pub fn activity_by_account(entries: &[JournalEntry]) -> HashMap<Uuid, AccountActivity> {
    let mut activity: HashMap<Uuid, AccountActivity> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_posted()) {
        for line in &entry.lines {
            let totals = activity.entry(line.account_id).or_default();
            totals.total_debit += &line.debit_amount;
            totals.total_credit += &line.credit_amount;
        }
    }
    activity
}

/// Storage-backed report generator
pub struct LedgerReports<S: LedgerStorage> {
    storage: S,
    balance_sheet_source: BalanceSheetSource,
}

impl<S: LedgerStorage> LedgerReports<S> {
    pub fn new(storage: S, config: &LedgerConfig) -> Self {
        Self {
            storage,
            balance_sheet_source: config.balance_sheet_source,
        }
    }
}

#[async_trait]
impl<S: LedgerStorage> ReportGenerator for LedgerReports<S> {
    async fn trial_balance(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<TrialBalance> {
        let accounts = self.storage.list_accounts(company_id, None).await?;
        let entries = self
            .storage
            .list_journal_entries(company_id, None, Some(as_of_date))
            .await?;
        debug!(company_id, entries = entries.len(), "building trial balance");
        Ok(build_trial_balance(as_of_date, &accounts, &entries))
    }

    async fn income_statement(
        &self,
        company_id: CompanyId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement> {
        if end_date < start_date {
            return Err(LedgerError::Validation(format!(
                "Report period ends ({}) before it starts ({})",
                end_date, start_date
            )));
        }
        let accounts = self.storage.list_accounts(company_id, None).await?;
        let entries = self
            .storage
            .list_journal_entries(company_id, Some(start_date), Some(end_date))
            .await?;
        Ok(build_income_statement(start_date, end_date, &accounts, &entries))
    }

    async fn balance_sheet(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        let accounts = self.storage.list_accounts(company_id, None).await?;
        let source = match self.balance_sheet_source {
            BalanceSheetSource::PostedLines => {
                let entries = self
                    .storage
                    .list_journal_entries(company_id, None, Some(as_of_date))
                    .await?;
                BalanceSource::Activity(activity_by_account(&entries))
            }
            BalanceSheetSource::CachedBalances => BalanceSource::Cached,
        };
        Ok(build_balance_sheet(as_of_date, &accounts, &source))
    }

    async fn general_ledger(
        &self,
        company_id: CompanyId,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<GeneralLedger> {
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .filter(|a| a.company_id == company_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        let entries = self
            .storage
            .list_journal_entries(company_id, start_date, end_date)
            .await?;
        Ok(build_general_ledger(&account, start_date, end_date, &entries))
    }
}
