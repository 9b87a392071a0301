//! Journal entry validation and posting

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::ledger::period::ensure_posting_allowed;
use crate::traits::*;
use crate::types::*;

/// Header fields supplied by the caller of [`JournalPoster::post`]
#[derive(Debug, Clone, PartialEq)]
pub struct EntryHeader {
    pub reference: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub source_module: SourceModule,
    pub source_id: Option<i64>,
    pub created_by: String,
    /// Entry-number prefix; the journal code when unset
    pub number_prefix: Option<String>,
    pub reverses: Option<Uuid>,
}

impl EntryHeader {
    pub fn new(
        description: impl Into<String>,
        date: NaiveDate,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            reference: None,
            description: description.into(),
            date,
            source_module: SourceModule::Manual,
            source_id: None,
            created_by: created_by.into(),
            number_prefix: None,
            reverses: None,
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn source(mut self, source_module: SourceModule, source_id: Option<i64>) -> Self {
        self.source_module = source_module;
        self.source_id = source_id;
        self
    }

    pub fn number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.number_prefix = Some(prefix.into());
        self
    }
}

/// A line to be posted, referencing a resolved account
#[derive(Debug, Clone, PartialEq)]
pub struct JournalLineDraft {
    pub account_id: Uuid,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    pub description: Option<String>,
}

impl JournalLineDraft {
    pub fn new(
        account_id: Uuid,
        entry_type: EntryType,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        let zero = BigDecimal::from(0);
        match entry_type {
            EntryType::Debit => Self {
                account_id,
                debit_amount: amount,
                credit_amount: zero,
                description,
            },
            EntryType::Credit => Self {
                account_id,
                debit_amount: zero,
                credit_amount: amount,
                description,
            },
        }
    }

    pub fn debit(account_id: Uuid, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, EntryType::Debit, amount, description)
    }

    pub fn credit(account_id: Uuid, amount: BigDecimal, description: Option<String>) -> Self {
        Self::new(account_id, EntryType::Credit, amount, description)
    }
}

/// Check the double-entry rules on a set of lines and return the rounded
/// debit and credit totals.
///
/// Every line must carry exactly one non-negative, non-zero side and the
/// columns must agree to the cent. A balanced set still needs two lines.
pub fn check_lines(lines: &[JournalLineDraft]) -> LedgerResult<(BigDecimal, BigDecimal)> {
    let zero = BigDecimal::from(0);
    let mut total_debit = BigDecimal::from(0);
    let mut total_credit = BigDecimal::from(0);

    for (index, line) in lines.iter().enumerate() {
        let line_number = index as u32 + 1;
        let debit = round_currency(&line.debit_amount);
        let credit = round_currency(&line.credit_amount);

        if debit < zero || credit < zero {
            return Err(LedgerError::MalformedLine {
                line_number,
                reason: "amounts cannot be negative".to_string(),
            });
        }
        match (debit == zero, credit == zero) {
            (true, true) => {
                return Err(LedgerError::MalformedLine {
                    line_number,
                    reason: "line has no amount".to_string(),
                })
            }
            (false, false) => {
                return Err(LedgerError::MalformedLine {
                    line_number,
                    reason: "line cannot be both a debit and a credit".to_string(),
                })
            }
            _ => {}
        }

        total_debit += debit;
        total_credit += credit;
    }

    if total_debit != total_credit {
        return Err(LedgerError::UnbalancedEntry {
            total_debit,
            total_credit,
        });
    }
    if lines.len() < 2 {
        return Err(LedgerError::Validation(
            "An entry needs at least two lines".to_string(),
        ));
    }

    Ok((total_debit, total_credit))
}

/// Validates and posts journal entries
pub struct JournalPoster<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn EntryValidator>,
    config: LedgerConfig,
}

impl<S: LedgerStorage> JournalPoster<S> {
    pub fn new(storage: S, config: &LedgerConfig) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultEntryValidator),
            config: config.clone(),
        }
    }

    pub fn with_validator(
        storage: S,
        config: &LedgerConfig,
        validator: Box<dyn EntryValidator>,
    ) -> Self {
        Self {
            storage,
            validator,
            config: config.clone(),
        }
    }

    /// Validate and post a balanced entry to a journal.
    ///
    /// Nothing is written unless every check passes; the header, lines,
    /// entry number and account balances are then committed together.
    pub async fn post(
        &mut self,
        company_id: CompanyId,
        journal_code: &str,
        header: EntryHeader,
        lines: Vec<JournalLineDraft>,
    ) -> LedgerResult<JournalEntry> {
        let journal = self
            .storage
            .get_journal_by_code(company_id, journal_code)
            .await?
            .filter(|j| j.is_active)
            .ok_or_else(|| LedgerError::JournalNotFound(journal_code.to_string()))?;

        self.validator.validate_entry(&header, &lines)?;
        let (total_debit, total_credit) = match check_lines(&lines) {
            Ok(totals) => totals,
            Err(err) => {
                warn!(company_id, journal = journal_code, error = %err, "rejected journal entry");
                return Err(err);
            }
        };

        let mut entry_lines = Vec::with_capacity(lines.len());
        for (index, draft) in lines.into_iter().enumerate() {
            let account = self
                .storage
                .get_account(draft.account_id)
                .await?
                .filter(|a| a.company_id == company_id)
                .ok_or_else(|| LedgerError::AccountNotFound(draft.account_id.to_string()))?;
            if !account.is_postable() {
                return Err(LedgerError::Validation(format!(
                    "Account '{}' does not accept postings",
                    account.code
                )));
            }

            entry_lines.push(JournalEntryLine {
                account_id: account.id,
                account_code: account.code,
                line_number: index as u32 + 1,
                description: draft.description,
                debit_amount: round_currency(&draft.debit_amount),
                credit_amount: round_currency(&draft.credit_amount),
            });
        }

        if self.config.enforce_fiscal_periods {
            ensure_posting_allowed(&self.storage, company_id, header.date).await?;
        }

        let rules = PostingRules::new(EntryNumbering::new(
            header.number_prefix.clone().unwrap_or_else(|| journal.code.clone()),
            self.config.entry_number_width,
        ))
        .enforce_fiscal_periods(self.config.enforce_fiscal_periods);
        let entry = JournalEntry {
            id: Uuid::new_v4(),
            company_id,
            journal_id: journal.id,
            entry_number: String::new(),
            reference: header.reference,
            description: header.description,
            date: header.date,
            total_amount: total_debit.clone(),
            total_debit,
            total_credit,
            status: EntryStatus::Posted,
            source_module: header.source_module,
            source_id: header.source_id,
            created_by: header.created_by,
            reverses: header.reverses,
            lines: entry_lines,
            created_at: chrono::Utc::now().naive_utc(),
        };

        debug!(
            company_id,
            journal = journal_code,
            lines = entry.lines.len(),
            "committing journal entry"
        );
        let posted = match self.storage.commit_journal_entry(entry, &rules).await {
            Ok(posted) => posted,
            Err(err) => {
                warn!(
                    company_id,
                    journal = journal_code,
                    error = %err,
                    "journal entry rolled back"
                );
                return Err(err);
            }
        };

        info!(
            company_id,
            entry_number = %posted.entry_number,
            source = %posted.source_module,
            total = %posted.total_debit,
            "posted journal entry"
        );
        Ok(posted)
    }

    /// Post an entry that undoes a posted one by swapping its sides
    pub async fn reverse_entry(
        &mut self,
        company_id: CompanyId,
        entry_id: Uuid,
        date: NaiveDate,
        created_by: &str,
    ) -> LedgerResult<JournalEntry> {
        let original = self
            .get_entry(company_id, entry_id)
            .await?
            .ok_or_else(|| LedgerError::EntryNotFound(entry_id.to_string()))?;
        if !original.is_posted() {
            return Err(LedgerError::Validation(format!(
                "Entry {} is not posted",
                original.entry_number
            )));
        }
        let journal = self
            .storage
            .get_journal(original.journal_id)
            .await?
            .ok_or_else(|| LedgerError::JournalNotFound(original.journal_id.to_string()))?;

        let mut header = EntryHeader::new(
            format!("Reverso de {}: {}", original.entry_number, original.description),
            date,
            created_by,
        )
        .reference(original.entry_number.clone())
        .source(SourceModule::Manual, original.source_id);
        header.reverses = Some(original.id);

        let lines = original
            .lines
            .iter()
            .map(|line| JournalLineDraft {
                account_id: line.account_id,
                debit_amount: line.credit_amount.clone(),
                credit_amount: line.debit_amount.clone(),
                description: line.description.clone(),
            })
            .collect();

        self.post(company_id, &journal.code, header, lines).await
    }

    /// Get an entry belonging to the company
    pub async fn get_entry(
        &self,
        company_id: CompanyId,
        entry_id: Uuid,
    ) -> LedgerResult<Option<JournalEntry>> {
        Ok(self
            .storage
            .get_journal_entry(entry_id)
            .await?
            .filter(|e| e.company_id == company_id))
    }

    pub async fn list_entries(
        &self,
        company_id: CompanyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        self.storage
            .list_journal_entries(company_id, start_date, end_date)
            .await
    }

    async fn account_by_code(&self, company_id: CompanyId, code: &str) -> LedgerResult<Account> {
        self.storage
            .get_account_by_code(company_id, code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// Payment out of the default cash account
    pub async fn post_payment(
        &mut self,
        company_id: CompanyId,
        payment: CashMovement,
    ) -> LedgerResult<JournalEntry> {
        let target = self.account_by_code(company_id, &payment.account_code).await?;
        let cash = self
            .account_by_code(company_id, &self.config.default_cash_account_code.clone())
            .await?;
        let (header, lines) = patterns::cash_payment(&payment, target.id, cash.id)?;
        let journal_code = self.config.default_journal_code.clone();
        self.post(company_id, &journal_code, header, lines).await
    }

    /// Expense paid from the default cash account
    pub async fn post_expense(
        &mut self,
        company_id: CompanyId,
        expense: CashMovement,
    ) -> LedgerResult<JournalEntry> {
        let target = self.account_by_code(company_id, &expense.account_code).await?;
        let cash = self
            .account_by_code(company_id, &self.config.default_cash_account_code.clone())
            .await?;
        let (header, lines) = patterns::cash_expense(&expense, target.id, cash.id)?;
        let journal_code = self.config.default_journal_code.clone();
        self.post(company_id, &journal_code, header, lines).await
    }

    /// Collection of an invoice against the default receivables account
    pub async fn post_invoice_payment(
        &mut self,
        company_id: CompanyId,
        collection: InvoiceCollection,
    ) -> LedgerResult<JournalEntry> {
        let received_in = self
            .account_by_code(company_id, &collection.payment_account_code)
            .await?;
        let receivables = self
            .account_by_code(company_id, &self.config.default_receivables_account_code.clone())
            .await?;
        let (header, lines) =
            patterns::invoice_collection(&collection, received_in.id, receivables.id)?;
        let journal_code = self.config.default_journal_code.clone();
        self.post(company_id, &journal_code, header, lines).await
    }
}

/// Money leaving the cash box towards an account (payments and expenses)
#[derive(Debug, Clone, PartialEq)]
pub struct CashMovement {
    /// Account debited
    pub account_code: String,
    pub amount: BigDecimal,
    pub description: String,
    pub reference: Option<String>,
    pub date: NaiveDate,
    pub source_id: Option<i64>,
    pub created_by: String,
}

/// Payment received for an invoice
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceCollection {
    pub invoice_id: i64,
    pub amount: BigDecimal,
    pub payment_method: String,
    /// Account debited (cash, bank, ...)
    pub payment_account_code: String,
    pub date: NaiveDate,
    pub created_by: String,
}

/// Builder for multi-line manual entries
#[derive(Debug)]
pub struct JournalEntryBuilder {
    header: EntryHeader,
    lines: Vec<JournalLineDraft>,
}

impl JournalEntryBuilder {
    pub fn new(
        description: impl Into<String>,
        date: NaiveDate,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            header: EntryHeader::new(description, date, created_by),
            lines: Vec::new(),
        }
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.header = self.header.reference(reference);
        self
    }

    pub fn source(mut self, source_module: SourceModule, source_id: Option<i64>) -> Self {
        self.header = self.header.source(source_module, source_id);
        self
    }

    pub fn number_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header = self.header.number_prefix(prefix);
        self
    }

    pub fn debit(
        mut self,
        account_id: Uuid,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.lines
            .push(JournalLineDraft::debit(account_id, amount, description));
        self
    }

    pub fn credit(
        mut self,
        account_id: Uuid,
        amount: BigDecimal,
        description: Option<String>,
    ) -> Self {
        self.lines
            .push(JournalLineDraft::credit(account_id, amount, description));
        self
    }

    pub fn line(mut self, line: JournalLineDraft) -> Self {
        self.lines.push(line);
        self
    }

    /// Check the lines and hand back the parts for [`JournalPoster::post`]
    pub fn build(self) -> LedgerResult<(EntryHeader, Vec<JournalLineDraft>)> {
        check_lines(&self.lines)?;
        Ok((self.header, self.lines))
    }
}

/// Entry shapes produced by the payments, expenses and invoicing modules
pub mod patterns {
    use super::*;

    /// Debit the paid account, credit cash
    pub fn cash_payment(
        payment: &CashMovement,
        target_account_id: Uuid,
        cash_account_id: Uuid,
    ) -> LedgerResult<(EntryHeader, Vec<JournalLineDraft>)> {
        let mut builder = JournalEntryBuilder::new(
            format!("Pago: {}", payment.description),
            payment.date,
            payment.created_by.clone(),
        )
        .source(SourceModule::Payments, payment.source_id)
        .number_prefix("PAY")
        .debit(target_account_id, payment.amount.clone(), Some(payment.description.clone()))
        .credit(cash_account_id, payment.amount.clone(), Some(payment.description.clone()));
        if let Some(reference) = &payment.reference {
            builder = builder.reference(reference.clone());
        }
        builder.build()
    }

    /// Debit the expense account, credit cash
    pub fn cash_expense(
        expense: &CashMovement,
        expense_account_id: Uuid,
        cash_account_id: Uuid,
    ) -> LedgerResult<(EntryHeader, Vec<JournalLineDraft>)> {
        let mut builder = JournalEntryBuilder::new(
            format!("Gasto: {}", expense.description),
            expense.date,
            expense.created_by.clone(),
        )
        .source(SourceModule::Expenses, expense.source_id)
        .number_prefix("EXP")
        .debit(expense_account_id, expense.amount.clone(), Some(expense.description.clone()))
        .credit(cash_account_id, expense.amount.clone(), Some(expense.description.clone()));
        if let Some(reference) = &expense.reference {
            builder = builder.reference(reference.clone());
        }
        builder.build()
    }

    /// Debit the account the money arrived in, credit receivables
    pub fn invoice_collection(
        collection: &InvoiceCollection,
        payment_account_id: Uuid,
        receivables_account_id: Uuid,
    ) -> LedgerResult<(EntryHeader, Vec<JournalLineDraft>)> {
        let line_description = format!("Cobro factura #{}", collection.invoice_id);
        JournalEntryBuilder::new(
            format!(
                "Cobro de factura #{} - {}",
                collection.invoice_id, collection.payment_method
            ),
            collection.date,
            collection.created_by.clone(),
        )
        .reference(format!("Cobro Factura #{}", collection.invoice_id))
        .source(SourceModule::InvoicePayments, Some(collection.invoice_id))
        .number_prefix("INV-PAY")
        .debit(payment_account_id, collection.amount.clone(), Some(line_description.clone()))
        .credit(receivables_account_id, collection.amount.clone(), Some(line_description))
        .build()
    }
}
