//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::ledger::journal::{EntryHeader, JournalLineDraft};
use crate::ledger::template::AutoJournalTemplate;
use crate::reports::{BalanceSheet, GeneralLedger, IncomeStatement, TrialBalance};
use crate::tax::ncf::{NcfIssue, NcfSequence, NcfType};
use crate::types::*;

/// Storage abstraction for the ledger system
///
/// Implementations back this with any store (PostgreSQL, SQLite, in-memory).
/// Methods named `*_if_absent` insert only when the natural key is free and
/// report whether a row was written. `commit_journal_entry` and `issue_ncf`
/// must be atomic: a relational backend runs them in one transaction with row
/// locks (`SELECT ... FOR UPDATE` / `UPDATE ... RETURNING`).
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Insert an account type keyed by its code
    async fn save_account_type_if_absent(
        &mut self,
        definition: &AccountTypeDefinition,
    ) -> LedgerResult<bool>;

    async fn list_account_types(&self) -> LedgerResult<Vec<AccountTypeDefinition>>;

    /// Insert an account keyed by `(company_id, code)`
    async fn save_account_if_absent(&mut self, account: &Account) -> LedgerResult<bool>;

    async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>>;

    async fn get_account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Account>>;

    /// List a company's accounts ordered by code, optionally filtered by type
    async fn list_accounts(
        &self,
        company_id: CompanyId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>>;

    /// Mark an account inactive, provided its balance is zero at that
    /// moment. Only the active flag and timestamp change.
    async fn deactivate_account(&mut self, account_id: Uuid) -> LedgerResult<Account>;

    /// Insert a journal keyed by `(company_id, code)`
    async fn save_journal_if_absent(&mut self, journal: &Journal) -> LedgerResult<bool>;

    async fn get_journal(&self, journal_id: Uuid) -> LedgerResult<Option<Journal>>;

    async fn get_journal_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Journal>>;

    /// Insert a fiscal period keyed by `(company_id, start_date, end_date)`
    async fn save_fiscal_period_if_absent(&mut self, period: &FiscalPeriod) -> LedgerResult<bool>;

    async fn list_fiscal_periods(&self, company_id: CompanyId) -> LedgerResult<Vec<FiscalPeriod>>;

    async fn update_fiscal_period(&mut self, period: &FiscalPeriod) -> LedgerResult<()>;

    /// Insert a template unless the company already has an active template
    /// for the same trigger event
    async fn save_template_if_absent(
        &mut self,
        template: &AutoJournalTemplate,
    ) -> LedgerResult<bool>;

    async fn get_active_template(
        &self,
        company_id: CompanyId,
        trigger_event: &str,
    ) -> LedgerResult<Option<AutoJournalTemplate>>;

    async fn update_template(&mut self, template: &AutoJournalTemplate) -> LedgerResult<()>;

    /// Atomically assign the next entry number of the entry's journal,
    /// persist header and lines, and apply every line to its account balance.
    /// On any failure nothing is written and the counter does not advance.
    /// An entry whose `reverses` points at an already reversed entry is
    /// rejected, and so is one dated outside every open fiscal period when
    /// `rules.enforce_fiscal_periods` is set.
    async fn commit_journal_entry(
        &mut self,
        entry: JournalEntry,
        rules: &PostingRules,
    ) -> LedgerResult<JournalEntry>;

    async fn get_journal_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>>;

    /// Entries of a company within an inclusive date range, ordered by
    /// `(date, created_at)`
    async fn list_journal_entries(
        &self,
        company_id: CompanyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>>;

    /// Insert a sequence; a second active sequence for the same company and
    /// type is rejected
    async fn save_ncf_sequence(&mut self, sequence: &NcfSequence) -> LedgerResult<()>;

    async fn get_ncf_sequence(&self, sequence_id: Uuid) -> LedgerResult<Option<NcfSequence>>;

    async fn list_ncf_sequences(&self, company_id: CompanyId) -> LedgerResult<Vec<NcfSequence>>;

    async fn update_ncf_sequence(&mut self, sequence: &NcfSequence) -> LedgerResult<()>;

    /// Atomically issue the next number of the active sequence for the type
    /// (see [`NcfSequence::issue`]) and persist the advanced counter before
    /// returning.
    async fn issue_ncf(
        &mut self,
        company_id: CompanyId,
        ncf_type: NcfType,
        as_of: NaiveDate,
    ) -> LedgerResult<NcfIssue>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate an account before saving
    fn validate_account(&self, account: &Account) -> LedgerResult<()>;
}

/// Extra business rules checked before an entry is posted.
///
/// The poster always enforces the double-entry rules itself; validators add
/// checks on top of them.
pub trait EntryValidator: Send + Sync {
    fn validate_entry(&self, header: &EntryHeader, lines: &[JournalLineDraft]) -> LedgerResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        if account.code.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account code cannot be empty".to_string(),
            ));
        }

        if account.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Account name cannot be empty".to_string(),
            ));
        }

        if account.is_parent && account.allow_transactions {
            return Err(LedgerError::Validation(format!(
                "Parent account '{}' cannot allow transactions",
                account.code
            )));
        }

        Ok(())
    }
}

/// Default entry validator: a description is required
pub struct DefaultEntryValidator;

impl EntryValidator for DefaultEntryValidator {
    fn validate_entry(
        &self,
        header: &EntryHeader,
        _lines: &[JournalLineDraft],
    ) -> LedgerResult<()> {
        if header.description.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Entry description cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only financial reports over posted entries
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Trial balance of leaf accounts as of a date
    async fn trial_balance(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<TrialBalance>;

    /// Revenues and expenses for a date range
    async fn income_statement(
        &self,
        company_id: CompanyId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement>;

    /// Assets, liabilities and equity as of a date
    async fn balance_sheet(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet>;

    /// Chronological lines of one account with a running balance
    async fn general_ledger(
        &self,
        company_id: CompanyId,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<GeneralLedger>;
}
