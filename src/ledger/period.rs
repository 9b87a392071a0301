//! Fiscal periods

use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// Reject a posting date that falls outside every open period.
///
/// Companies that have not registered any period are unrestricted.
pub(crate) async fn ensure_posting_allowed<S: LedgerStorage>(
    storage: &S,
    company_id: CompanyId,
    date: NaiveDate,
) -> LedgerResult<()> {
    let periods = storage.list_fiscal_periods(company_id).await?;
    if FiscalPeriod::posting_allowed(&periods, date) {
        Ok(())
    } else {
        Err(LedgerError::OutsideFiscalPeriod(date))
    }
}

pub struct FiscalPeriodRegistry<S: LedgerStorage> {
    pub(crate) storage: S,
}

impl<S: LedgerStorage> FiscalPeriodRegistry<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a period; returns `false` when the same date range already exists
    pub async fn register_period(&mut self, period: FiscalPeriod) -> LedgerResult<bool> {
        let existing = self.storage.list_fiscal_periods(period.company_id).await?;
        let overlaps = existing.iter().any(|p| {
            !(p.start_date == period.start_date && p.end_date == period.end_date)
                && p.start_date <= period.end_date
                && period.start_date <= p.end_date
        });
        if overlaps {
            return Err(LedgerError::Validation(format!(
                "Fiscal period '{}' overlaps an existing period",
                period.name
            )));
        }

        let created = self.storage.save_fiscal_period_if_absent(&period).await?;
        if created {
            info!(
                company_id = period.company_id,
                period = %period.name,
                "registered fiscal period"
            );
        }
        Ok(created)
    }

    pub async fn list_periods(&self, company_id: CompanyId) -> LedgerResult<Vec<FiscalPeriod>> {
        self.storage.list_fiscal_periods(company_id).await
    }

    /// The open period containing a date
    pub async fn find_open_period(
        &self,
        company_id: CompanyId,
        date: NaiveDate,
    ) -> LedgerResult<Option<FiscalPeriod>> {
        Ok(self
            .storage
            .list_fiscal_periods(company_id)
            .await?
            .into_iter()
            .find(|p| p.accepts_postings_on(date)))
    }

    /// Close a period so no further entries can be dated inside it
    pub async fn close_period(
        &mut self,
        company_id: CompanyId,
        period_id: Uuid,
    ) -> LedgerResult<FiscalPeriod> {
        let mut period = self
            .storage
            .list_fiscal_periods(company_id)
            .await?
            .into_iter()
            .find(|p| p.id == period_id)
            .ok_or_else(|| {
                LedgerError::Validation(format!("Fiscal period {} not found", period_id))
            })?;

        if period.is_closed {
            return Err(LedgerError::Validation(format!(
                "Fiscal period '{}' is already closed",
                period.name
            )));
        }
        period.is_closed = true;
        self.storage.update_fiscal_period(&period).await?;
        info!(company_id, period = %period.name, "closed fiscal period");
        Ok(period)
    }

    pub async fn check_posting_date(
        &self,
        company_id: CompanyId,
        date: NaiveDate,
    ) -> LedgerResult<()> {
        ensure_posting_allowed(&self.storage, company_id, date).await
    }
}
