//! Core types and data structures for the ledger

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::tax::ncf::NcfType;

/// Identifier of the company (tenant) that owns ledger data
pub type CompanyId = i64;

/// Decimal places kept for stored currency amounts
pub const CURRENCY_SCALE: i64 = 2;

/// Round an amount to the ledger's currency precision
pub fn round_currency(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(CURRENCY_SCALE, RoundingMode::HalfUp)
}

/// Smallest currency difference the ledger distinguishes (0.01)
pub fn currency_epsilon() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Currency equality within one cent
pub fn amounts_match(left: &BigDecimal, right: &BigDecimal) -> bool {
    (left - right).abs() < currency_epsilon()
}

/// Account types of the Dominican chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccountType {
    /// ACTIVO - what the business owns
    #[serde(rename = "ACTIVO")]
    Asset,
    /// PASIVO - what the business owes
    #[serde(rename = "PASIVO")]
    Liability,
    /// PATRIMONIO - owners' interest
    #[serde(rename = "PATRIMONIO")]
    Equity,
    /// INGRESOS - income earned
    #[serde(rename = "INGRESOS")]
    Revenue,
    /// GASTOS - costs incurred
    #[serde(rename = "GASTOS")]
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    /// Returns the normal balance side for this account type.
    /// Assets and expenses grow with debits; the rest grow with credits.
    pub fn normal_balance(&self) -> EntryType {
        match self {
            AccountType::Asset | AccountType::Expense => EntryType::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                EntryType::Credit
            }
        }
    }

    /// Stored code of the account type
    pub fn code(&self) -> &'static str {
        match self {
            AccountType::Asset => "ACTIVO",
            AccountType::Liability => "PASIVO",
            AccountType::Equity => "PATRIMONIO",
            AccountType::Revenue => "INGRESOS",
            AccountType::Expense => "GASTOS",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Balance movement produced by debit and credit totals, signed by the normal side
    pub fn signed_balance(&self, debit: &BigDecimal, credit: &BigDecimal) -> BigDecimal {
        match self.normal_balance() {
            EntryType::Debit => debit - credit,
            EntryType::Credit => credit - debit,
        }
    }

    /// True for types reported on the balance sheet
    pub fn is_balance_sheet(&self) -> bool {
        matches!(
            self,
            AccountType::Asset | AccountType::Liability | AccountType::Equity
        )
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Persisted account type row created at bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTypeDefinition {
    pub account_type: AccountType,
    pub name: String,
    pub description: String,
}

impl AccountTypeDefinition {
    /// The five standard account types
    pub fn standard() -> Vec<Self> {
        let rows = [
            (AccountType::Asset, "Activo", "Activos de la empresa"),
            (AccountType::Liability, "Pasivo", "Pasivos de la empresa"),
            (AccountType::Equity, "Patrimonio", "Patrimonio de la empresa"),
            (AccountType::Revenue, "Ingresos", "Ingresos de la empresa"),
            (AccountType::Expense, "Gastos", "Gastos de la empresa"),
        ];
        rows.into_iter()
            .map(|(account_type, name, description)| Self {
                account_type,
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect()
    }
}

/// Sides of a double-entry line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Increases assets and expenses, decreases liabilities, equity and income
    Debit,
    /// Increases liabilities, equity and income, decreases assets and expenses
    Credit,
}

impl EntryType {
    pub fn opposite(&self) -> Self {
        match self {
            EntryType::Debit => EntryType::Credit,
            EntryType::Credit => EntryType::Debit,
        }
    }
}

/// An account in a company's chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub company_id: CompanyId,
    /// Hierarchical code, unique within the company (e.g. "111000")
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
    /// Depth in the account tree, 1 for top-level groups
    pub level: u8,
    /// Group accounts never receive direct postings
    pub is_parent: bool,
    pub allow_transactions: bool,
    /// Reporting group, e.g. "ACTIVO"
    pub category: String,
    /// Reporting subgroup, e.g. "Corriente"
    pub subcategory: Option<String>,
    /// Running balance, signed by the normal balance convention
    pub balance: BigDecimal,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Account {
    /// Create a new top-level leaf account
    pub fn new(
        company_id: CompanyId,
        code: String,
        name: String,
        account_type: AccountType,
        parent_id: Option<Uuid>,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            company_id,
            code,
            name,
            account_type,
            parent_id,
            level: 1,
            is_parent: false,
            allow_transactions: true,
            category: account_type.code().to_string(),
            subcategory: None,
            balance: BigDecimal::from(0),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Turn this account into a group account that cannot take postings
    pub fn as_parent(mut self) -> Self {
        self.is_parent = true;
        self.allow_transactions = false;
        self
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_category(mut self, category: &str, subcategory: Option<&str>) -> Self {
        self.category = category.to_string();
        self.subcategory = subcategory.map(str::to_string);
        self
    }

    /// Only active leaf accounts that allow transactions can be posted to
    pub fn is_postable(&self) -> bool {
        self.is_active && self.allow_transactions && !self.is_parent
    }

    /// Update the running balance with one line's debit and credit amounts
    pub fn apply_line(&mut self, debit: &BigDecimal, credit: &BigDecimal) {
        let movement = self.account_type.signed_balance(debit, credit);
        self.balance = round_currency(&(&self.balance + movement));
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// A named ledger book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl Journal {
    pub fn new(
        company_id: CompanyId,
        code: String,
        name: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            code,
            name,
            description,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Lifecycle state of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
}

/// Business module that originated an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceModule {
    #[serde(rename = "POS")]
    Pos,
    #[serde(rename = "payments")]
    Payments,
    #[serde(rename = "expenses")]
    Expenses,
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "invoice_payments")]
    InvoicePayments,
}

impl SourceModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceModule::Pos => "POS",
            SourceModule::Payments => "payments",
            SourceModule::Expenses => "expenses",
            SourceModule::Manual => "manual",
            SourceModule::InvoicePayments => "invoice_payments",
        }
    }
}

impl fmt::Display for SourceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single debit or credit line of a posted entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntryLine {
    pub account_id: Uuid,
    pub account_code: String,
    /// 1-based position within the entry
    pub line_number: u32,
    pub description: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
}

impl JournalEntryLine {
    pub fn entry_type(&self) -> EntryType {
        if self.debit_amount > BigDecimal::from(0) {
            EntryType::Debit
        } else {
            EntryType::Credit
        }
    }

    /// The non-zero side of the line
    pub fn amount(&self) -> &BigDecimal {
        match self.entry_type() {
            EntryType::Debit => &self.debit_amount,
            EntryType::Credit => &self.credit_amount,
        }
    }
}

/// Journal entry header plus its lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub journal_id: Uuid,
    /// Sequential human-readable number, assigned at commit time
    pub entry_number: String,
    pub reference: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub total_amount: BigDecimal,
    pub status: EntryStatus,
    pub source_module: SourceModule,
    /// Back-reference to the originating business record
    pub source_id: Option<i64>,
    pub created_by: String,
    /// Entry this one reverses, if it is a correction
    pub reverses: Option<Uuid>,
    pub lines: Vec<JournalEntryLine>,
    pub created_at: NaiveDateTime,
}

impl JournalEntry {
    /// Sum of the debit column of the lines
    pub fn line_debits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.debit_amount).sum()
    }

    /// Sum of the credit column of the lines
    pub fn line_credits(&self) -> BigDecimal {
        self.lines.iter().map(|l| &l.credit_amount).sum()
    }

    /// Header totals agree with each other and with the lines
    pub fn is_balanced(&self) -> bool {
        amounts_match(&self.total_debit, &self.total_credit)
            && amounts_match(&self.total_debit, &self.line_debits())
            && amounts_match(&self.total_credit, &self.line_credits())
    }

    pub fn is_posted(&self) -> bool {
        self.status == EntryStatus::Posted
    }

    pub fn touches_account(&self, account_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.account_id == account_id)
    }
}

/// Numbering scheme for entry numbers: `{prefix}-{counter}` zero padded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryNumbering {
    pub prefix: String,
    pub width: usize,
}

impl EntryNumbering {
    pub fn new(prefix: impl Into<String>, width: usize) -> Self {
        Self {
            prefix: prefix.into(),
            width,
        }
    }

    pub fn format(&self, counter: u64) -> String {
        format!("{}-{:0width$}", self.prefix, counter, width = self.width)
    }
}

/// What the storage layer enforces while committing an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingRules {
    pub numbering: EntryNumbering,
    /// Reject the entry unless its date falls in an open fiscal period
    pub enforce_fiscal_periods: bool,
}

impl PostingRules {
    pub fn new(numbering: EntryNumbering) -> Self {
        Self {
            numbering,
            enforce_fiscal_periods: false,
        }
    }

    pub fn enforce_fiscal_periods(mut self, enforce: bool) -> Self {
        self.enforce_fiscal_periods = enforce;
        self
    }
}

/// Accounting period during which a company may post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_closed: bool,
    pub created_at: NaiveDateTime,
}

impl FiscalPeriod {
    pub fn new(
        company_id: CompanyId,
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> LedgerResult<Self> {
        if end_date < start_date {
            return Err(LedgerError::Validation(format!(
                "Fiscal period ends ({}) before it starts ({})",
                end_date, start_date
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            company_id,
            name,
            start_date,
            end_date,
            is_closed: false,
            created_at: chrono::Utc::now().naive_utc(),
        })
    }

    /// Calendar-year period (January 1st to December 31st)
    pub fn calendar_year(company_id: CompanyId, year: i32) -> LedgerResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1);
        let end = NaiveDate::from_ymd_opt(year, 12, 31);
        match (start, end) {
            (Some(start), Some(end)) => {
                Self::new(company_id, format!("Período Fiscal {}", year), start, end)
            }
            _ => Err(LedgerError::Validation(format!("Invalid fiscal year {}", year))),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    pub fn accepts_postings_on(&self, date: NaiveDate) -> bool {
        !self.is_closed && self.contains(date)
    }

    /// Whether a company with these periods may post on `date`. A company
    /// without periods is unrestricted.
    pub fn posting_allowed<'a>(
        periods: impl IntoIterator<Item = &'a FiscalPeriod>,
        date: NaiveDate,
    ) -> bool {
        let mut has_periods = false;
        for period in periods {
            if period.accepts_postings_on(date) {
                return true;
            }
            has_periods = true;
        }
        !has_periods
    }
}

/// Coarse classification of ledger errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any write; retry after fixing the input
    Validation,
    /// A referenced record does not exist
    Lookup,
    /// Terminal for the resource (NCF range used up or expired)
    ResourceExhaustion,
    /// A write was interrupted and rolled back
    Consistency,
    Storage,
}

/// Errors that can occur in the ledger system
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Malformed line {line_number}: {reason}")]
    MalformedLine { line_number: u32, reason: String },
    #[error("Entry is not balanced: debits = {total_debit}, credits = {total_credit}")]
    UnbalancedEntry {
        total_debit: BigDecimal,
        total_credit: BigDecimal,
    },
    #[error("Unknown template placeholder: {0}")]
    UnknownPlaceholder(String),
    #[error("Invalid amount: '{0}'")]
    InvalidAmount(String),
    #[error("Date {0} is not inside an open fiscal period")]
    OutsideFiscalPeriod(NaiveDate),
    #[error("No active journal template for trigger '{0}'")]
    TemplateNotFound(String),
    #[error("Journal not found: {0}")]
    JournalNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),
    #[error("No active NCF sequence configured for {0}")]
    SequenceNotFound(NcfType),
    #[error("NCF sequence {ncf_type} is exhausted (max {max_sequence}); request a new range")]
    SequenceExhausted { ncf_type: NcfType, max_sequence: u64 },
    #[error("NCF sequence {ncf_type} expired on {expiration_date}; request a new range")]
    SequenceExpired {
        ncf_type: NcfType,
        expiration_date: NaiveDate,
    },
    #[error("Consistency error: {0}")]
    Consistency(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::MalformedLine { .. }
            | LedgerError::UnbalancedEntry { .. }
            | LedgerError::UnknownPlaceholder(_)
            | LedgerError::InvalidAmount(_)
            | LedgerError::OutsideFiscalPeriod(_) => ErrorKind::Validation,
            LedgerError::TemplateNotFound(_)
            | LedgerError::JournalNotFound(_)
            | LedgerError::AccountNotFound(_)
            | LedgerError::EntryNotFound(_)
            | LedgerError::SequenceNotFound(_) => ErrorKind::Lookup,
            LedgerError::SequenceExhausted { .. } | LedgerError::SequenceExpired { .. } => {
                ErrorKind::ResourceExhaustion
            }
            LedgerError::Consistency(_) => ErrorKind::Consistency,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
