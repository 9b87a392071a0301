use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{activity_by_account, AccountActivity};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub total_debit: BigDecimal,
    pub total_credit: BigDecimal,
    /// Balance on the normal side; negative when the account runs against it
    pub balance: BigDecimal,
    pub debit_balance: BigDecimal,
    pub credit_balance: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    pub total_debits: BigDecimal,
    pub total_credits: BigDecimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of_date: NaiveDate,
    pub accounts: Vec<TrialBalanceRow>,
    pub totals: TrialBalanceTotals,
}

/// Trial balance over every postable account.
///
/// A positive balance lands in the account's normal column; a negative one
/// is shown as a positive amount in the opposite column.
pub fn build_trial_balance(
    as_of_date: NaiveDate,
    accounts: &[Account],
    entries: &[JournalEntry],
) -> TrialBalance {
    let zero = BigDecimal::from(0);
    let activity = activity_by_account(entries);

    let mut rows: Vec<TrialBalanceRow> = accounts
        .iter()
        .filter(|a| !a.is_parent && a.allow_transactions)
        .map(|account| {
            let totals = activity.get(&account.id).cloned().unwrap_or_default();
            let balance = round_currency(&totals.balance_for(account.account_type));

            let on_normal_side = balance >= zero;
            let side = if on_normal_side {
                account.account_type.normal_balance()
            } else {
                account.account_type.normal_balance().opposite()
            };
            let (debit_balance, credit_balance) = match side {
                EntryType::Debit => (balance.abs(), zero.clone()),
                EntryType::Credit => (zero.clone(), balance.abs()),
            };

            let AccountActivity {
                total_debit,
                total_credit,
            } = totals;
            TrialBalanceRow {
                account_id: account.id,
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                account_type: account.account_type,
                total_debit,
                total_credit,
                balance,
                debit_balance,
                credit_balance,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.account_code.cmp(&b.account_code));

    let total_debits: BigDecimal = rows.iter().map(|r| &r.debit_balance).sum();
    let total_credits: BigDecimal = rows.iter().map(|r| &r.credit_balance).sum();
    let is_balanced = amounts_match(&total_debits, &total_credits);

    TrialBalance {
        as_of_date,
        accounts: rows,
        totals: TrialBalanceTotals {
            total_debits,
            total_credits,
            is_balanced,
        },
    }
}
