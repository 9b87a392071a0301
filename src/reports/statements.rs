use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::{activity_by_account, AccountActivity};
use crate::types::*;

/// Name of the equity row carrying earnings not yet closed to retained earnings
pub const CURRENT_EARNINGS_NAME: &str = "Resultado del Ejercicio (no cerrado)";

/// One account's amount on a financial statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// `None` for computed rows such as current earnings
    pub account_id: Option<Uuid>,
    pub account_code: Option<String>,
    pub account_name: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub amount: BigDecimal,
}

impl StatementLine {
    fn for_account(account: &Account, amount: BigDecimal) -> Self {
        Self {
            account_id: Some(account.id),
            account_code: Some(account.code.clone()),
            account_name: account.name.clone(),
            category: Some(account.category.clone()),
            subcategory: account.subcategory.clone(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revenues: Vec<StatementLine>,
    pub expenses: Vec<StatementLine>,
    pub total_revenues: BigDecimal,
    pub total_expenses: BigDecimal,
    pub net_income: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of_date: NaiveDate,
    pub assets: Vec<StatementLine>,
    pub liabilities: Vec<StatementLine>,
    pub equity: Vec<StatementLine>,
    /// Revenues minus expenses not yet closed, included in `equity`
    pub current_earnings: BigDecimal,
    pub total_assets: BigDecimal,
    pub total_liabilities: BigDecimal,
    pub total_equity: BigDecimal,
    pub is_balanced: bool,
}

/// Where balance sheet amounts come from
#[derive(Debug, Clone)]
pub enum BalanceSource {
    /// Totals of posted lines up to the report date
    Activity(HashMap<Uuid, AccountActivity>),
    /// Each account's running balance
    Cached,
}

impl BalanceSource {
    fn balance_of(&self, account: &Account) -> BigDecimal {
        match self {
            BalanceSource::Activity(activity) => activity
                .get(&account.id)
                .map(|a| a.balance_for(account.account_type))
                .unwrap_or_else(|| BigDecimal::from(0)),
            BalanceSource::Cached => account.balance.clone(),
        }
    }
}

/// Revenues (`credit - debit`) and expenses (`debit - credit`) with
/// activity in the range. `entries` must already be limited to the range.
pub fn build_income_statement(
    start_date: NaiveDate,
    end_date: NaiveDate,
    accounts: &[Account],
    entries: &[JournalEntry],
) -> IncomeStatement {
    let activity = activity_by_account(entries);

    let lines_of = |account_type: AccountType| -> Vec<StatementLine> {
        accounts
            .iter()
            .filter(|a| a.account_type == account_type)
            .filter_map(|account| {
                let totals = activity.get(&account.id).filter(|t| !t.is_empty())?;
                Some(StatementLine::for_account(
                    account,
                    round_currency(&totals.balance_for(account_type)),
                ))
            })
            .collect()
    };

    let revenues = lines_of(AccountType::Revenue);
    let expenses = lines_of(AccountType::Expense);
    let total_revenues: BigDecimal = revenues.iter().map(|l| &l.amount).sum();
    let total_expenses: BigDecimal = expenses.iter().map(|l| &l.amount).sum();
    let net_income = &total_revenues - &total_expenses;

    IncomeStatement {
        start_date,
        end_date,
        revenues,
        expenses,
        total_revenues,
        total_expenses,
        net_income,
    }
}

/// Assets, liabilities and equity of every postable account, plus a computed
/// equity row for current earnings so the statement closes without a
/// closing entry.
pub fn build_balance_sheet(
    as_of_date: NaiveDate,
    accounts: &[Account],
    source: &BalanceSource,
) -> BalanceSheet {
    let zero = BigDecimal::from(0);
    let postable: Vec<&Account> = accounts
        .iter()
        .filter(|a| !a.is_parent && a.allow_transactions)
        .collect();

    let lines_of = |account_type: AccountType| -> Vec<StatementLine> {
        postable
            .iter()
            .filter(|a| a.account_type == account_type)
            .map(|account| {
                StatementLine::for_account(account, round_currency(&source.balance_of(account)))
            })
            .collect()
    };
    let sum_of = |account_type: AccountType| -> BigDecimal {
        postable
            .iter()
            .filter(|a| a.account_type == account_type)
            .map(|account| source.balance_of(account))
            .sum()
    };

    let assets = lines_of(AccountType::Asset);
    let liabilities = lines_of(AccountType::Liability);
    let mut equity = lines_of(AccountType::Equity);

    let current_earnings =
        round_currency(&(sum_of(AccountType::Revenue) - sum_of(AccountType::Expense)));
    if current_earnings != zero {
        equity.push(StatementLine {
            account_id: None,
            account_code: None,
            account_name: CURRENT_EARNINGS_NAME.to_string(),
            category: Some(AccountType::Equity.code().to_string()),
            subcategory: None,
            amount: current_earnings.clone(),
        });
    }

    let total_assets: BigDecimal = assets.iter().map(|l| &l.amount).sum();
    let total_liabilities: BigDecimal = liabilities.iter().map(|l| &l.amount).sum();
    let total_equity: BigDecimal = equity.iter().map(|l| &l.amount).sum();
    let is_balanced = amounts_match(&total_assets, &(&total_liabilities + &total_equity));

    BalanceSheet {
        as_of_date,
        assets,
        liabilities,
        equity,
        current_earnings,
        total_assets,
        total_liabilities,
        total_equity,
        is_balanced,
    }
}
