//! Main ledger orchestrator wiring accounts, postings, templates, NCF and reports

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::ledger::account::{AccountManager, BootstrapReport, NewAccount};
use crate::ledger::journal::{
    CashMovement, EntryHeader, InvoiceCollection, JournalLineDraft, JournalPoster,
};
use crate::ledger::period::FiscalPeriodRegistry;
use crate::ledger::template::{EventContext, LineResolution, TemplateEngine};
use crate::reconciliation::{BalanceReconciliation, ReconciliationEngine};
use crate::reports::{BalanceSheet, GeneralLedger, IncomeStatement, LedgerReports, TrialBalance};
use crate::tax::ncf::{NcfAllocation, NcfAllocator, NcfSequence, NcfType, NewNcfSequence};
use crate::traits::*;
use crate::types::*;

/// Entry posted for a business event, with the template lines left out
#[derive(Debug, Clone)]
pub struct EventPosting {
    pub entry: JournalEntry,
    pub skipped_lines: Vec<LineResolution>,
}

/// Main ledger system. Every component shares the same storage handle.
pub struct Ledger<S: LedgerStorage> {
    config: LedgerConfig,
    account_manager: AccountManager<S>,
    periods: FiscalPeriodRegistry<S>,
    poster: JournalPoster<S>,
    templates: TemplateEngine<S>,
    ncf: NcfAllocator<S>,
    reports: LedgerReports<S>,
    reconciliation: ReconciliationEngine<S>,
}

impl<S: LedgerStorage + Clone> Ledger<S> {
    /// Create a new ledger with the default configuration
    pub fn new(storage: S) -> Self {
        Self::with_config(storage, LedgerConfig::default())
    }

    pub fn with_config(storage: S, config: LedgerConfig) -> Self {
        Self::with_validators(
            storage,
            config,
            Box::new(DefaultAccountValidator),
            Box::new(DefaultEntryValidator),
        )
    }

    /// Create a new ledger with custom validators
    pub fn with_validators(
        storage: S,
        config: LedgerConfig,
        account_validator: Box<dyn AccountValidator>,
        entry_validator: Box<dyn EntryValidator>,
    ) -> Self {
        Self {
            account_manager: AccountManager::with_validator(storage.clone(), account_validator)
                .default_journal_code(&config.default_journal_code),
            periods: FiscalPeriodRegistry::new(storage.clone()),
            poster: JournalPoster::with_validator(storage.clone(), &config, entry_validator),
            templates: TemplateEngine::new(storage.clone()),
            ncf: NcfAllocator::new(storage.clone(), &config),
            reports: LedgerReports::new(storage.clone(), &config),
            reconciliation: ReconciliationEngine::new(storage),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn accounts(&mut self) -> &mut AccountManager<S> {
        &mut self.account_manager
    }

    pub fn periods(&mut self) -> &mut FiscalPeriodRegistry<S> {
        &mut self.periods
    }

    pub fn poster(&mut self) -> &mut JournalPoster<S> {
        &mut self.poster
    }

    pub fn templates(&mut self) -> &mut TemplateEngine<S> {
        &mut self.templates
    }

    pub fn ncf(&mut self) -> &mut NcfAllocator<S> {
        &mut self.ncf
    }

    pub fn reports(&self) -> &LedgerReports<S> {
        &self.reports
    }

    // Chart of accounts
    pub async fn initialize_chart_of_accounts(
        &mut self,
        company_id: CompanyId,
        created_by: &str,
    ) -> LedgerResult<BootstrapReport> {
        self.account_manager
            .initialize_chart_of_accounts(company_id, created_by)
            .await
    }

    pub async fn search_accounts(
        &self,
        company_id: CompanyId,
        query: &str,
        category: Option<&str>,
    ) -> LedgerResult<Vec<Account>> {
        self.account_manager
            .search_accounts(company_id, query, category)
            .await
    }

    pub async fn create_account(
        &mut self,
        company_id: CompanyId,
        account: NewAccount,
    ) -> LedgerResult<Account> {
        self.account_manager.create_account(company_id, account).await
    }

    pub async fn get_account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        self.account_manager.get_account_by_code(company_id, code).await
    }

    // Postings
    /// Post a balanced entry to a journal
    pub async fn post_entry(
        &mut self,
        company_id: CompanyId,
        journal_code: &str,
        header: EntryHeader,
        lines: Vec<JournalLineDraft>,
    ) -> LedgerResult<JournalEntry> {
        self.poster.post(company_id, journal_code, header, lines).await
    }

    /// Resolve the template for a business event and post the result to the
    /// default journal. Template lines whose account is missing are left out
    /// and reported back; the entry is still rejected if what remains does
    /// not balance.
    pub async fn post_from_event(
        &mut self,
        company_id: CompanyId,
        trigger_event: &str,
        context: &EventContext,
        user_id: &str,
    ) -> LedgerResult<EventPosting> {
        let resolution = self
            .templates
            .resolve(company_id, trigger_event, context)
            .await?;

        let header = EntryHeader::new(context.entry_description(), context.date, user_id)
            .reference(context.reference())
            .source(context.source_module, context.source_id);
        let journal_code = self.config.default_journal_code.clone();
        let entry = self
            .poster
            .post(company_id, &journal_code, header, resolution.drafts())
            .await?;

        let skipped_lines: Vec<LineResolution> = resolution
            .lines
            .into_iter()
            .filter(|line| matches!(line, LineResolution::Skipped { .. }))
            .collect();
        info!(
            company_id,
            trigger = trigger_event,
            entry_number = %entry.entry_number,
            skipped = skipped_lines.len(),
            "posted business event"
        );
        Ok(EventPosting {
            entry,
            skipped_lines,
        })
    }

    pub async fn post_payment(
        &mut self,
        company_id: CompanyId,
        payment: CashMovement,
    ) -> LedgerResult<JournalEntry> {
        self.poster.post_payment(company_id, payment).await
    }

    pub async fn post_expense(
        &mut self,
        company_id: CompanyId,
        expense: CashMovement,
    ) -> LedgerResult<JournalEntry> {
        self.poster.post_expense(company_id, expense).await
    }

    pub async fn post_invoice_payment(
        &mut self,
        company_id: CompanyId,
        collection: InvoiceCollection,
    ) -> LedgerResult<JournalEntry> {
        self.poster.post_invoice_payment(company_id, collection).await
    }

    pub async fn reverse_entry(
        &mut self,
        company_id: CompanyId,
        entry_id: Uuid,
        date: NaiveDate,
        created_by: &str,
    ) -> LedgerResult<JournalEntry> {
        self.poster
            .reverse_entry(company_id, entry_id, date, created_by)
            .await
    }

    pub async fn get_entry(
        &self,
        company_id: CompanyId,
        entry_id: Uuid,
    ) -> LedgerResult<Option<JournalEntry>> {
        self.poster.get_entry(company_id, entry_id).await
    }

    // Fiscal numbering
    pub async fn register_ncf_sequence(
        &mut self,
        company_id: CompanyId,
        request: NewNcfSequence,
    ) -> LedgerResult<NcfSequence> {
        self.ncf.register_sequence(company_id, request).await
    }

    pub async fn allocate_ncf(
        &mut self,
        company_id: CompanyId,
        ncf_type: NcfType,
    ) -> LedgerResult<NcfAllocation> {
        self.ncf.allocate_next(company_id, ncf_type).await
    }

    // Reports
    pub async fn trial_balance(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<TrialBalance> {
        self.reports.trial_balance(company_id, as_of_date).await
    }

    pub async fn income_statement(
        &self,
        company_id: CompanyId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<IncomeStatement> {
        self.reports
            .income_statement(company_id, start_date, end_date)
            .await
    }

    pub async fn balance_sheet(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<BalanceSheet> {
        self.reports.balance_sheet(company_id, as_of_date).await
    }

    pub async fn general_ledger(
        &self,
        company_id: CompanyId,
        account_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<GeneralLedger> {
        self.reports
            .general_ledger(company_id, account_id, start_date, end_date)
            .await
    }

    pub async fn reconcile_balances(
        &self,
        company_id: CompanyId,
    ) -> LedgerResult<BalanceReconciliation> {
        self.reconciliation.reconcile_balances(company_id).await
    }

    /// Validate the integrity of a company's books
    pub async fn validate_integrity(
        &self,
        company_id: CompanyId,
        as_of_date: NaiveDate,
    ) -> LedgerResult<LedgerIntegrityReport> {
        let trial_balance = self.trial_balance(company_id, as_of_date).await?;
        let balance_sheet = self.balance_sheet(company_id, as_of_date).await?;
        let reconciliation = self.reconcile_balances(company_id).await?;
        let entries = self
            .poster
            .list_entries(company_id, None, Some(as_of_date))
            .await?;

        let mut issues = Vec::new();

        if !trial_balance.totals.is_balanced {
            issues.push(format!(
                "Trial balance is not balanced: debits = {}, credits = {}",
                trial_balance.totals.total_debits, trial_balance.totals.total_credits
            ));
        }

        let total_liabilities_equity =
            &balance_sheet.total_liabilities + &balance_sheet.total_equity;
        if !balance_sheet.is_balanced {
            issues.push(format!(
                "Balance sheet is not balanced: assets = {}, liabilities + equity = {}",
                balance_sheet.total_assets, total_liabilities_equity
            ));
        }

        for entry in entries.iter().filter(|e| !e.is_balanced()) {
            issues.push(format!("Entry {} is not balanced", entry.entry_number));
        }

        for discrepancy in &reconciliation.discrepancies {
            issues.push(format!(
                "Account {} balance {} differs from posted lines ({})",
                discrepancy.account_code, discrepancy.cached_balance, discrepancy.derived_balance
            ));
        }

        Ok(LedgerIntegrityReport {
            company_id,
            as_of_date,
            is_valid: issues.is_empty(),
            issues,
            trial_balance_total_debits: trial_balance.totals.total_debits,
            trial_balance_total_credits: trial_balance.totals.total_credits,
            balance_sheet_total_assets: balance_sheet.total_assets,
            balance_sheet_total_liabilities_equity: total_liabilities_equity,
        })
    }
}

/// Report on ledger integrity and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerIntegrityReport {
    pub company_id: CompanyId,
    pub as_of_date: NaiveDate,
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub trial_balance_total_debits: BigDecimal,
    pub trial_balance_total_credits: BigDecimal,
    pub balance_sheet_total_assets: BigDecimal,
    pub balance_sheet_total_liabilities_equity: BigDecimal,
}
