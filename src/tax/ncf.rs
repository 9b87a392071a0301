//! NCF (Número de Comprobante Fiscal) sequences and allocation
//!
//! Every fiscal document type has a finite range of numbers authorised by the
//! DGII. Numbers are handed out exactly once, in order, and never reused.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::traits::LedgerStorage;
use crate::types::*;

/// Number of digits of the sequential part of an NCF
pub const NCF_SEQUENCE_DIGITS: usize = 11;

/// Largest sequential value that fits in an NCF
pub const NCF_MAX_SEQUENCE: u64 = 99_999_999_999;

static NCF_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d{2}\d{11}$").expect("static NCF pattern"));

/// Fiscal document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NcfType {
    /// Crédito fiscal
    B01,
    /// Consumidor final
    B02,
    /// Regímenes especiales / gubernamental
    B14,
    /// Exportaciones
    B15,
    E31,
    E32,
    E33,
    E34,
    E41,
    E43,
    E44,
    E45,
}

/// Catalogue entry describing an NCF type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NcfTypeInfo {
    pub ncf_type: NcfType,
    pub description: &'static str,
    /// Document gives the buyer an ITBIS tax credit
    pub applies_tax_credit: bool,
    /// Document is issued to final consumers
    pub applies_final_consumer: bool,
}

impl NcfType {
    pub const ALL: [NcfType; 12] = [
        NcfType::B01,
        NcfType::B02,
        NcfType::B14,
        NcfType::B15,
        NcfType::E31,
        NcfType::E32,
        NcfType::E33,
        NcfType::E34,
        NcfType::E41,
        NcfType::E43,
        NcfType::E44,
        NcfType::E45,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            NcfType::B01 => "B01",
            NcfType::B02 => "B02",
            NcfType::B14 => "B14",
            NcfType::B15 => "B15",
            NcfType::E31 => "E31",
            NcfType::E32 => "E32",
            NcfType::E33 => "E33",
            NcfType::E34 => "E34",
            NcfType::E41 => "E41",
            NcfType::E43 => "E43",
            NcfType::E44 => "E44",
            NcfType::E45 => "E45",
        }
    }

    pub fn info(&self) -> NcfTypeInfo {
        let (description, applies_tax_credit, applies_final_consumer) = match self {
            NcfType::B01 => ("Facturas con Valor Fiscal", true, false),
            NcfType::B02 => ("Facturas Consumidor Final", false, true),
            NcfType::B14 => ("Facturas Gubernamentales", true, false),
            NcfType::B15 => ("Facturas para Exportaciones", true, false),
            NcfType::E31 => ("Factura de Crédito Fiscal Electrónica", true, false),
            NcfType::E32 => ("Factura de Consumo Electrónica", false, true),
            NcfType::E33 => ("Nota de Débito Electrónica", true, false),
            NcfType::E34 => ("Nota de Crédito Electrónica", true, false),
            NcfType::E41 => ("Comprobante Electrónico de Compras", false, false),
            NcfType::E43 => ("Comprobante Electrónico para Gastos Menores", false, false),
            NcfType::E44 => ("Comprobante Electrónico para Regímenes Especiales", true, false),
            NcfType::E45 => ("Comprobante Electrónico Gubernamental", true, false),
        };
        NcfTypeInfo {
            ncf_type: *self,
            description,
            applies_tax_credit,
            applies_final_consumer,
        }
    }

    /// Format a sequential value as a full NCF, e.g. `B0200000000123`
    pub fn format_number(&self, sequence: u64) -> String {
        format!("{}{:0width$}", self.code(), sequence, width = NCF_SEQUENCE_DIGITS)
    }

    /// Full catalogue of supported types
    pub fn catalogue() -> Vec<NcfTypeInfo> {
        Self::ALL.iter().map(NcfType::info).collect()
    }
}

impl fmt::Display for NcfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for NcfType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|t| t.code() == wanted)
            .ok_or_else(|| LedgerError::Validation(format!("Unknown NCF type '{}'", s)))
    }
}

/// Check the fixed NCF layout and that it belongs to the expected type
pub fn validate_format(ncf: &str, expected_type: NcfType) -> bool {
    NCF_PATTERN.is_match(ncf) && ncf.starts_with(expected_type.code())
}

/// An authorised range of fiscal numbers for one document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NcfSequence {
    pub id: Uuid,
    pub company_id: CompanyId,
    pub ncf_type: NcfType,
    pub series: String,
    pub description: Option<String>,
    pub start_sequence: u64,
    /// Next number to issue
    pub current_sequence: u64,
    pub max_sequence: u64,
    pub expiration_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NcfSequence {
    /// Issue the current number and advance the counter.
    ///
    /// The counter is untouched when the range is exhausted or expired.
    pub fn issue(&mut self, as_of: NaiveDate) -> LedgerResult<u64> {
        if self.current_sequence > self.max_sequence {
            return Err(LedgerError::SequenceExhausted {
                ncf_type: self.ncf_type,
                max_sequence: self.max_sequence,
            });
        }
        if let Some(expiration_date) = self.expiration_date {
            if as_of > expiration_date {
                return Err(LedgerError::SequenceExpired {
                    ncf_type: self.ncf_type,
                    expiration_date,
                });
            }
        }

        let issued = self.current_sequence;
        self.current_sequence += 1;
        self.updated_at = chrono::Utc::now().naive_utc();
        Ok(issued)
    }

    /// Numbers still available
    pub fn remaining(&self) -> u64 {
        self.max_sequence
            .saturating_add(1)
            .saturating_sub(self.current_sequence)
    }

    /// Numbers already issued
    pub fn issued(&self) -> u64 {
        self.current_sequence.saturating_sub(self.start_sequence)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_sequence > self.max_sequence
    }

    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiration_date.is_some_and(|d| as_of > d)
    }

    /// Every NCF in the authorised range, in order
    pub fn numbers(&self) -> impl Iterator<Item = String> + '_ {
        (self.start_sequence..=self.max_sequence).map(|n| self.ncf_type.format_number(n))
    }

    pub fn usage(&self, as_of: NaiveDate) -> NcfUsage {
        let size = self
            .max_sequence
            .saturating_add(1)
            .saturating_sub(self.start_sequence);
        let issued = self.issued();
        let percent_used = if size == 0 {
            100
        } else {
            (issued.saturating_mul(100) / size).min(100) as u8
        };
        NcfUsage {
            ncf_type: self.ncf_type,
            series: self.series.clone(),
            issued,
            remaining: self.remaining(),
            percent_used,
            last_issued: (issued > 0)
                .then(|| self.ncf_type.format_number(self.current_sequence - 1)),
            expired: self.is_expired(as_of),
            is_active: self.is_active,
        }
    }
}

/// Usage statistics for one sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NcfUsage {
    pub ncf_type: NcfType,
    pub series: String,
    pub issued: u64,
    pub remaining: u64,
    pub percent_used: u8,
    pub last_issued: Option<String>,
    pub expired: bool,
    pub is_active: bool,
}

/// Request to register a new authorised range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNcfSequence {
    pub ncf_type: NcfType,
    pub series: Option<String>,
    pub description: Option<String>,
    pub range_start: u64,
    pub range_end: u64,
    /// Resume point when migrating a partially used range
    pub current_number: Option<u64>,
    pub expiration_date: Option<NaiveDate>,
}

/// Result of a storage-level issue: the number and the sequence after the increment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NcfIssue {
    pub number: u64,
    pub sequence: NcfSequence,
}

/// A fiscal number handed to a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NcfAllocation {
    pub ncf: String,
    pub ncf_type: NcfType,
    pub sequence_number: u64,
    pub remaining: u64,
    /// The range is close to running out and a new one should be requested
    pub running_low: bool,
}

/// Allocates fiscal numbers from a company's sequences
pub struct NcfAllocator<S: LedgerStorage> {
    storage: S,
    low_threshold: u64,
}

impl<S: LedgerStorage> NcfAllocator<S> {
    pub fn new(storage: S, config: &LedgerConfig) -> Self {
        Self {
            storage,
            low_threshold: config.ncf_low_threshold,
        }
    }

    /// Register a new authorised range for a document type
    pub async fn register_sequence(
        &mut self,
        company_id: CompanyId,
        request: NewNcfSequence,
    ) -> LedgerResult<NcfSequence> {
        if request.range_start == 0 {
            return Err(LedgerError::Validation(
                "NCF ranges start at 1".to_string(),
            ));
        }
        if request.range_end < request.range_start {
            return Err(LedgerError::Validation(format!(
                "NCF range end {} is before start {}",
                request.range_end, request.range_start
            )));
        }
        if request.range_end > NCF_MAX_SEQUENCE {
            return Err(LedgerError::Validation(format!(
                "NCF range end {} does not fit in {} digits",
                request.range_end, NCF_SEQUENCE_DIGITS
            )));
        }
        let current = request.current_number.unwrap_or(request.range_start);
        if current < request.range_start || current > request.range_end + 1 {
            return Err(LedgerError::Validation(format!(
                "Current number {} is outside the range {}..={}",
                current, request.range_start, request.range_end
            )));
        }

        let existing = self.storage.list_ncf_sequences(company_id).await?;
        if existing
            .iter()
            .any(|s| s.ncf_type == request.ncf_type && s.is_active)
        {
            return Err(LedgerError::Validation(format!(
                "An active {} sequence already exists; deactivate it first",
                request.ncf_type
            )));
        }

        let now = chrono::Utc::now().naive_utc();
        let sequence = NcfSequence {
            id: Uuid::new_v4(),
            company_id,
            ncf_type: request.ncf_type,
            series: request.series.unwrap_or_else(|| "001".to_string()),
            description: request.description,
            start_sequence: request.range_start,
            current_sequence: current,
            max_sequence: request.range_end,
            expiration_date: request.expiration_date,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.storage.save_ncf_sequence(&sequence).await?;

        info!(
            company_id,
            ncf_type = %sequence.ncf_type,
            start = sequence.start_sequence,
            end = sequence.max_sequence,
            "registered NCF sequence"
        );
        Ok(sequence)
    }

    /// Allocate the next fiscal number for a document type
    pub async fn allocate_next(
        &mut self,
        company_id: CompanyId,
        ncf_type: NcfType,
    ) -> LedgerResult<NcfAllocation> {
        let today = chrono::Utc::now().date_naive();
        self.allocate_next_as_of(company_id, ncf_type, today).await
    }

    /// Allocate the next fiscal number, checking expiry against `as_of`
    pub async fn allocate_next_as_of(
        &mut self,
        company_id: CompanyId,
        ncf_type: NcfType,
        as_of: NaiveDate,
    ) -> LedgerResult<NcfAllocation> {
        let issue = match self.storage.issue_ncf(company_id, ncf_type, as_of).await {
            Ok(issue) => issue,
            Err(err) => {
                warn!(company_id, ncf_type = %ncf_type, error = %err, "NCF allocation refused");
                return Err(err);
            }
        };

        let remaining = issue.sequence.remaining();
        let running_low = remaining <= self.low_threshold;
        let ncf = ncf_type.format_number(issue.number);

        if running_low {
            warn!(company_id, ncf_type = %ncf_type, remaining, "NCF sequence running low");
        }
        info!(company_id, ncf = %ncf, "allocated NCF");

        Ok(NcfAllocation {
            ncf,
            ncf_type,
            sequence_number: issue.number,
            remaining,
            running_low,
        })
    }

    /// Deactivate a sequence; it stays stored for audit
    pub async fn deactivate_sequence(&mut self, sequence_id: Uuid) -> LedgerResult<NcfSequence> {
        let mut sequence = self
            .storage
            .get_ncf_sequence(sequence_id)
            .await?
            .ok_or_else(|| {
                LedgerError::Validation(format!("NCF sequence {} not found", sequence_id))
            })?;
        sequence.is_active = false;
        sequence.updated_at = chrono::Utc::now().naive_utc();
        self.storage.update_ncf_sequence(&sequence).await?;
        Ok(sequence)
    }

    pub async fn list_sequences(&self, company_id: CompanyId) -> LedgerResult<Vec<NcfSequence>> {
        self.storage.list_ncf_sequences(company_id).await
    }

    /// Usage statistics for every sequence of the company
    pub async fn usage(
        &self,
        company_id: CompanyId,
        as_of: NaiveDate,
    ) -> LedgerResult<Vec<NcfUsage>> {
        Ok(self
            .storage
            .list_ncf_sequences(company_id)
            .await?
            .iter()
            .map(|s| s.usage(as_of))
            .collect())
    }
}
