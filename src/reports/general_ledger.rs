use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedgerLine {
    pub date: NaiveDate,
    pub entry_id: Uuid,
    pub entry_number: String,
    pub line_number: u32,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub debit_amount: BigDecimal,
    pub credit_amount: BigDecimal,
    /// Cumulative `debit - credit` within the report range
    pub running_balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralLedger {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub lines: Vec<GeneralLedgerLine>,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    pub closing_balance: BigDecimal,
}

/// Every posted line of one account in posting order
pub fn build_general_ledger(
    account: &Account,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    entries: &[JournalEntry],
) -> GeneralLedger {
    let mut postings: Vec<(&JournalEntry, &JournalEntryLine)> = entries
        .iter()
        .filter(|e| e.is_posted() && e.company_id == account.company_id)
        .filter(|e| start_date.map_or(true, |start| e.date >= start))
        .filter(|e| end_date.map_or(true, |end| e.date <= end))
        .flat_map(|e| {
            e.lines
                .iter()
                .filter(|l| l.account_id == account.id)
                .map(move |l| (e, l))
        })
        .collect();
    postings.sort_by(|(ea, la), (eb, lb)| {
        ea.date
            .cmp(&eb.date)
            .then_with(|| ea.created_at.cmp(&eb.created_at))
            .then_with(|| ea.entry_number.cmp(&eb.entry_number))
            .then_with(|| la.line_number.cmp(&lb.line_number))
    });

    let mut running = BigDecimal::from(0);
    let mut total_debit = BigDecimal::from(0);
    let mut total_credit = BigDecimal::from(0);
    let lines = postings
        .into_iter()
        .map(|(entry, line)| {
            running += &line.debit_amount - &line.credit_amount;
            total_debit += &line.debit_amount;
            total_credit += &line.credit_amount;
            GeneralLedgerLine {
                date: entry.date,
                entry_id: entry.id,
                entry_number: entry.entry_number.clone(),
                line_number: line.line_number,
                reference: entry.reference.clone(),
                description: line.description.clone(),
                debit_amount: line.debit_amount.clone(),
                credit_amount: line.credit_amount.clone(),
                running_balance: running.clone(),
            }
        })
        .collect();

    GeneralLedger {
        account_id: account.id,
        account_code: account.code.clone(),
        account_name: account.name.clone(),
        start_date,
        end_date,
        lines,
        total_debit,
        total_credit,
        closing_balance: running,
    }
}
