//! Validation utilities

use std::collections::HashSet;

use crate::ledger::journal::{EntryHeader, JournalLineDraft};
use crate::traits::*;
use crate::types::*;

/// Validate an account code: digits only, 1 to 20 characters
pub fn validate_account_code(code: &str) -> LedgerResult<()> {
    if code.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account code cannot be empty".to_string(),
        ));
    }

    if code.len() > 20 {
        return Err(LedgerError::Validation(
            "Account code cannot exceed 20 characters".to_string(),
        ));
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(LedgerError::Validation(format!(
            "Account code '{}' can only contain digits",
            code
        )));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> LedgerResult<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > 100 {
        return Err(LedgerError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an entry description is valid
pub fn validate_entry_description(description: &str) -> LedgerResult<()> {
    if description.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Entry description cannot be empty".to_string(),
        ));
    }

    if description.chars().count() > 500 {
        return Err(LedgerError::Validation(
            "Entry description cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Stricter entry checks on top of the double-entry rules
pub struct EnhancedEntryValidator;

impl EntryValidator for EnhancedEntryValidator {
    fn validate_entry(&self, header: &EntryHeader, lines: &[JournalLineDraft]) -> LedgerResult<()> {
        validate_entry_description(&header.description)?;

        if let Some(reference) = &header.reference {
            if reference.chars().count() > 100 {
                return Err(LedgerError::Validation(
                    "Entry reference cannot exceed 100 characters".to_string(),
                ));
            }
        }

        // The same account cannot appear twice on the same side
        let mut seen = HashSet::new();
        for (index, line) in lines.iter().enumerate() {
            let side = line.debit_amount > bigdecimal::BigDecimal::from(0);
            if !seen.insert((line.account_id, side)) {
                return Err(LedgerError::MalformedLine {
                    line_number: index as u32 + 1,
                    reason: "account repeated on the same side of the entry".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Enhanced account validator with detailed checks
pub struct EnhancedAccountValidator;

impl AccountValidator for EnhancedAccountValidator {
    fn validate_account(&self, account: &Account) -> LedgerResult<()> {
        DefaultAccountValidator.validate_account(account)?;
        validate_account_code(&account.code)?;
        validate_account_name(&account.name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn test_account_code_rules() {
        assert!(validate_account_code("111000").is_ok());
        assert!(validate_account_code("").is_err());
        assert!(validate_account_code("11A000").is_err());
        assert!(validate_account_code(&"1".repeat(21)).is_err());
    }

    #[test]
    fn test_repeated_account_on_same_side() {
        let on = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let header = EntryHeader::new("Venta", on, "user");
        let cash = Uuid::new_v4();
        let sales = Uuid::new_v4();
        let lines = vec![
            JournalLineDraft::debit(cash, BigDecimal::from(5), None),
            JournalLineDraft::debit(cash, BigDecimal::from(5), None),
            JournalLineDraft::credit(sales, BigDecimal::from(10), None),
        ];
        assert!(matches!(
            EnhancedEntryValidator.validate_entry(&header, &lines),
            Err(LedgerError::MalformedLine { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_enhanced_account_validator() {
        let account =
            Account::new(1, "111000".into(), "Caja General".into(), AccountType::Asset, None);
        assert!(EnhancedAccountValidator.validate_account(&account).is_ok());

        let bad = Account::new(1, "CAJA".into(), "Caja".into(), AccountType::Asset, None);
        assert!(EnhancedAccountValidator.validate_account(&bad).is_err());
    }
}
