//! In-memory storage implementation for testing

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::ledger::template::AutoJournalTemplate;
use crate::tax::ncf::{NcfIssue, NcfSequence, NcfType};
use crate::traits::*;
use crate::types::*;

fn read<T>(lock: &RwLock<T>) -> LedgerResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> LedgerResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| LedgerError::Storage("memory storage lock poisoned".to_string()))
}

/// In-memory storage implementation for testing and development.
///
/// Clones share the same data. Entry commits take the account, entry,
/// counter and fiscal period locks in that order; NCF issuing holds only the
/// sequence lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    account_types: Arc<RwLock<HashMap<AccountType, AccountTypeDefinition>>>,
    accounts: Arc<RwLock<HashMap<Uuid, Account>>>,
    journals: Arc<RwLock<HashMap<Uuid, Journal>>>,
    fiscal_periods: Arc<RwLock<HashMap<Uuid, FiscalPeriod>>>,
    templates: Arc<RwLock<HashMap<Uuid, AutoJournalTemplate>>>,
    entries: Arc<RwLock<HashMap<Uuid, JournalEntry>>>,
    entry_counters: Arc<RwLock<HashMap<(CompanyId, Uuid), u64>>>,
    ncf_sequences: Arc<RwLock<HashMap<Uuid, NcfSequence>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries committed for a company, across journals
    pub fn entry_count(&self, company_id: CompanyId) -> LedgerResult<usize> {
        Ok(read(&self.entries)?
            .values()
            .filter(|e| e.company_id == company_id)
            .count())
    }

    /// Overwrite an account's running balance, bypassing the posting rules
    pub fn set_balance_unchecked(
        &self,
        account_id: Uuid,
        balance: bigdecimal::BigDecimal,
    ) -> LedgerResult<()> {
        let mut accounts = write(&self.accounts)?;
        let account = accounts
            .get_mut(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        account.balance = balance;
        Ok(())
    }

    /// Remove an account without any checks, leaving references dangling
    pub fn remove_account_unchecked(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        Ok(write(&self.accounts)?.remove(&account_id))
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn save_account_type_if_absent(
        &mut self,
        definition: &AccountTypeDefinition,
    ) -> LedgerResult<bool> {
        let mut types = write(&self.account_types)?;
        if types.contains_key(&definition.account_type) {
            return Ok(false);
        }
        types.insert(definition.account_type, definition.clone());
        Ok(true)
    }

    async fn list_account_types(&self) -> LedgerResult<Vec<AccountTypeDefinition>> {
        let mut types: Vec<AccountTypeDefinition> =
            read(&self.account_types)?.values().cloned().collect();
        types.sort_by_key(|t| t.account_type);
        Ok(types)
    }

    async fn save_account_if_absent(&mut self, account: &Account) -> LedgerResult<bool> {
        let mut accounts = write(&self.accounts)?;
        let taken = accounts
            .values()
            .any(|a| a.company_id == account.company_id && a.code == account.code);
        if taken || accounts.contains_key(&account.id) {
            return Ok(false);
        }
        accounts.insert(account.id, account.clone());
        Ok(true)
    }

    async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        Ok(read(&self.accounts)?.get(&account_id).cloned())
    }

    async fn get_account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        Ok(read(&self.accounts)?
            .values()
            .find(|a| a.company_id == company_id && a.code == code)
            .cloned())
    }

    async fn list_accounts(
        &self,
        company_id: CompanyId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        let mut accounts: Vec<Account> = read(&self.accounts)?
            .values()
            .filter(|a| a.company_id == company_id)
            .filter(|a| account_type.map_or(true, |t| a.account_type == t))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn deactivate_account(&mut self, account_id: Uuid) -> LedgerResult<Account> {
        let mut accounts = write(&self.accounts)?;
        let account = accounts
            .get_mut(&account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        if !amounts_match(&account.balance, &bigdecimal::BigDecimal::from(0)) {
            return Err(LedgerError::Validation(format!(
                "Account '{}' has a balance of {}",
                account.code, account.balance
            )));
        }
        account.is_active = false;
        account.updated_at = chrono::Utc::now().naive_utc();
        Ok(account.clone())
    }

    async fn save_journal_if_absent(&mut self, journal: &Journal) -> LedgerResult<bool> {
        let mut journals = write(&self.journals)?;
        if journals
            .values()
            .any(|j| j.company_id == journal.company_id && j.code == journal.code)
        {
            return Ok(false);
        }
        journals.insert(journal.id, journal.clone());
        Ok(true)
    }

    async fn get_journal(&self, journal_id: Uuid) -> LedgerResult<Option<Journal>> {
        Ok(read(&self.journals)?.get(&journal_id).cloned())
    }

    async fn get_journal_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Journal>> {
        Ok(read(&self.journals)?
            .values()
            .find(|j| j.company_id == company_id && j.code == code)
            .cloned())
    }

    async fn save_fiscal_period_if_absent(&mut self, period: &FiscalPeriod) -> LedgerResult<bool> {
        let mut periods = write(&self.fiscal_periods)?;
        if periods.values().any(|p| {
            p.company_id == period.company_id
                && p.start_date == period.start_date
                && p.end_date == period.end_date
        }) {
            return Ok(false);
        }
        periods.insert(period.id, period.clone());
        Ok(true)
    }

    async fn list_fiscal_periods(&self, company_id: CompanyId) -> LedgerResult<Vec<FiscalPeriod>> {
        let mut periods: Vec<FiscalPeriod> = read(&self.fiscal_periods)?
            .values()
            .filter(|p| p.company_id == company_id)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.start_date);
        Ok(periods)
    }

    async fn update_fiscal_period(&mut self, period: &FiscalPeriod) -> LedgerResult<()> {
        let mut periods = write(&self.fiscal_periods)?;
        match periods.get_mut(&period.id) {
            Some(stored) => {
                *stored = period.clone();
                Ok(())
            }
            None => Err(LedgerError::Validation(format!(
                "Fiscal period {} not found",
                period.id
            ))),
        }
    }

    async fn save_template_if_absent(
        &mut self,
        template: &AutoJournalTemplate,
    ) -> LedgerResult<bool> {
        let mut templates = write(&self.templates)?;
        if templates.values().any(|t| {
            t.company_id == template.company_id
                && t.trigger_event == template.trigger_event
                && t.is_active
        }) {
            return Ok(false);
        }
        templates.insert(template.id, template.clone());
        Ok(true)
    }

    async fn get_active_template(
        &self,
        company_id: CompanyId,
        trigger_event: &str,
    ) -> LedgerResult<Option<AutoJournalTemplate>> {
        Ok(read(&self.templates)?
            .values()
            .find(|t| t.company_id == company_id && t.trigger_event == trigger_event && t.is_active)
            .cloned())
    }

    async fn update_template(&mut self, template: &AutoJournalTemplate) -> LedgerResult<()> {
        let mut templates = write(&self.templates)?;
        match templates.get_mut(&template.id) {
            Some(stored) => {
                *stored = template.clone();
                Ok(())
            }
            None => Err(LedgerError::TemplateNotFound(template.trigger_event.clone())),
        }
    }

    async fn commit_journal_entry(
        &mut self,
        mut entry: JournalEntry,
        rules: &PostingRules,
    ) -> LedgerResult<JournalEntry> {
        let mut accounts = write(&self.accounts)?;
        let mut entries = write(&self.entries)?;
        let mut counters = write(&self.entry_counters)?;
        let periods = read(&self.fiscal_periods)?;

        // Every check happens before the first write.
        if rules.enforce_fiscal_periods {
            let company_periods = periods.values().filter(|p| p.company_id == entry.company_id);
            if !FiscalPeriod::posting_allowed(company_periods, entry.date) {
                return Err(LedgerError::OutsideFiscalPeriod(entry.date));
            }
        }
        for line in &entry.lines {
            match accounts.get(&line.account_id) {
                Some(account)
                    if account.company_id == entry.company_id && account.is_postable() => {}
                Some(account) => {
                    return Err(LedgerError::Consistency(format!(
                        "Account '{}' cannot take postings for this entry",
                        account.code
                    )))
                }
                None => return Err(LedgerError::AccountNotFound(line.account_code.clone())),
            }
        }
        if let Some(reversed) = entry.reverses {
            if entries.values().any(|e| e.reverses == Some(reversed)) {
                return Err(LedgerError::Validation(format!(
                    "Entry {} has already been reversed",
                    reversed
                )));
            }
        }

        let key = (entry.company_id, entry.journal_id);
        let next = counters.get(&key).copied().unwrap_or(0) + 1;
        entry.entry_number = rules.numbering.format(next);

        for line in &entry.lines {
            if let Some(account) = accounts.get_mut(&line.account_id) {
                account.apply_line(&line.debit_amount, &line.credit_amount);
            }
        }
        counters.insert(key, next);
        entries.insert(entry.id, entry.clone());

        Ok(entry)
    }

    async fn get_journal_entry(&self, entry_id: Uuid) -> LedgerResult<Option<JournalEntry>> {
        Ok(read(&self.entries)?.get(&entry_id).cloned())
    }

    async fn list_journal_entries(
        &self,
        company_id: CompanyId,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> LedgerResult<Vec<JournalEntry>> {
        let mut entries: Vec<JournalEntry> = read(&self.entries)?
            .values()
            .filter(|e| e.company_id == company_id)
            .filter(|e| start_date.map_or(true, |start| e.date >= start))
            .filter(|e| end_date.map_or(true, |end| e.date <= end))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.entry_number.cmp(&b.entry_number))
        });
        Ok(entries)
    }

    async fn save_ncf_sequence(&mut self, sequence: &NcfSequence) -> LedgerResult<()> {
        let mut sequences = write(&self.ncf_sequences)?;
        if sequence.is_active
            && sequences.values().any(|s| {
                s.id != sequence.id
                    && s.company_id == sequence.company_id
                    && s.ncf_type == sequence.ncf_type
                    && s.is_active
            })
        {
            return Err(LedgerError::Validation(format!(
                "An active {} sequence already exists",
                sequence.ncf_type
            )));
        }
        sequences.insert(sequence.id, sequence.clone());
        Ok(())
    }

    async fn get_ncf_sequence(&self, sequence_id: Uuid) -> LedgerResult<Option<NcfSequence>> {
        Ok(read(&self.ncf_sequences)?.get(&sequence_id).cloned())
    }

    async fn list_ncf_sequences(&self, company_id: CompanyId) -> LedgerResult<Vec<NcfSequence>> {
        let mut sequences: Vec<NcfSequence> = read(&self.ncf_sequences)?
            .values()
            .filter(|s| s.company_id == company_id)
            .cloned()
            .collect();
        sequences.sort_by(|a, b| {
            a.ncf_type
                .code()
                .cmp(b.ncf_type.code())
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(sequences)
    }

    async fn update_ncf_sequence(&mut self, sequence: &NcfSequence) -> LedgerResult<()> {
        let mut sequences = write(&self.ncf_sequences)?;
        match sequences.get_mut(&sequence.id) {
            Some(stored) => {
                *stored = sequence.clone();
                Ok(())
            }
            None => Err(LedgerError::SequenceNotFound(sequence.ncf_type)),
        }
    }

    async fn issue_ncf(
        &mut self,
        company_id: CompanyId,
        ncf_type: NcfType,
        as_of: NaiveDate,
    ) -> LedgerResult<NcfIssue> {
        let mut sequences = write(&self.ncf_sequences)?;
        let sequence = sequences
            .values_mut()
            .find(|s| s.company_id == company_id && s.ncf_type == ncf_type && s.is_active)
            .ok_or(LedgerError::SequenceNotFound(ncf_type))?;

        let number = sequence.issue(as_of)?;
        Ok(NcfIssue {
            number,
            sequence: sequence.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn entry_for(
        company_id: CompanyId,
        journal_id: Uuid,
        lines: Vec<JournalEntryLine>,
    ) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            company_id,
            journal_id,
            entry_number: String::new(),
            reference: None,
            description: "test".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            total_debit: BigDecimal::from(10),
            total_credit: BigDecimal::from(10),
            total_amount: BigDecimal::from(10),
            status: EntryStatus::Posted,
            source_module: SourceModule::Manual,
            source_id: None,
            created_by: "tester".into(),
            reverses: None,
            lines,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn line(account: &Account, debit: i32, credit: i32) -> JournalEntryLine {
        JournalEntryLine {
            account_id: account.id,
            account_code: account.code.clone(),
            line_number: 1,
            description: None,
            debit_amount: BigDecimal::from(debit),
            credit_amount: BigDecimal::from(credit),
        }
    }

    #[tokio::test]
    async fn test_commit_numbers_per_journal() {
        let mut storage = MemoryStorage::new();
        let cash = Account::new(1, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let sales = Account::new(1, "411000".into(), "Ventas".into(), AccountType::Revenue, None);
        storage.save_account_if_absent(&cash).await.unwrap();
        storage.save_account_if_absent(&sales).await.unwrap();

        let journal = Uuid::new_v4();
        let rules = PostingRules::new(EntryNumbering::new("GJ", 6));
        let first = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&sales, 0, 10)]),
                &rules,
            )
            .await
            .unwrap();
        let second = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&sales, 0, 10)]),
                &rules,
            )
            .await
            .unwrap();
        assert_eq!(first.entry_number, "GJ-000001");
        assert_eq!(second.entry_number, "GJ-000002");

        let cash = storage.get_account(cash.id).await.unwrap().unwrap();
        assert_eq!(cash.balance, BigDecimal::from(20));
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let mut storage = MemoryStorage::new();
        let cash = Account::new(1, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let ghost = Account::new(1, "999000".into(), "Fantasma".into(), AccountType::Revenue, None);
        storage.save_account_if_absent(&cash).await.unwrap();

        let journal = Uuid::new_v4();
        let rules = PostingRules::new(EntryNumbering::new("GJ", 6));
        let result = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&ghost, 0, 10)]),
                &rules,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
        assert_eq!(storage.entry_count(1).unwrap(), 0);
        let cash = storage.get_account(cash.id).await.unwrap().unwrap();
        assert_eq!(cash.balance, BigDecimal::from(0));

        storage.save_account_if_absent(&ghost).await.unwrap();
        let posted = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&ghost, 0, 10)]),
                &rules,
            )
            .await
            .unwrap();
        assert_eq!(posted.entry_number, "GJ-000001");
    }

    #[tokio::test]
    async fn test_deactivate_rechecks_balance_after_posting() {
        let mut storage = MemoryStorage::new();
        let mut other_handle = storage.clone();
        let cash = Account::new(1, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let sales = Account::new(1, "411000".into(), "Ventas".into(), AccountType::Revenue, None);
        storage.save_account_if_absent(&cash).await.unwrap();
        storage.save_account_if_absent(&sales).await.unwrap();

        // Stale read: the caller saw a zero balance before the posting landed.
        let seen = storage.get_account(cash.id).await.unwrap().unwrap();
        assert_eq!(seen.balance, BigDecimal::from(0));
        let rules = PostingRules::new(EntryNumbering::new("GJ", 6));
        other_handle
            .commit_journal_entry(
                entry_for(1, Uuid::new_v4(), vec![line(&cash, 10, 0), line(&sales, 0, 10)]),
                &rules,
            )
            .await
            .unwrap();

        let result = storage.deactivate_account(seen.id).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        let cash = storage.get_account(cash.id).await.unwrap().unwrap();
        assert!(cash.is_active);
        assert_eq!(cash.balance, BigDecimal::from(10));
    }

    #[tokio::test]
    async fn test_deactivate_keeps_balance_column() {
        let mut storage = MemoryStorage::new();
        let petty = Account::new(1, "113000".into(), "Caja Chica".into(), AccountType::Asset, None);
        storage.save_account_if_absent(&petty).await.unwrap();

        let deactivated = storage.deactivate_account(petty.id).await.unwrap();
        assert!(!deactivated.is_active);
        let stored = storage.get_account(petty.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.balance, BigDecimal::from(0));
        assert!(matches!(
            storage.deactivate_account(Uuid::new_v4()).await,
            Err(LedgerError::AccountNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_commit_checks_periods_under_lock() {
        let mut storage = MemoryStorage::new();
        let cash = Account::new(1, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let sales = Account::new(1, "411000".into(), "Ventas".into(), AccountType::Revenue, None);
        storage.save_account_if_absent(&cash).await.unwrap();
        storage.save_account_if_absent(&sales).await.unwrap();
        let mut period = FiscalPeriod::calendar_year(1, 2025).unwrap();
        period.is_closed = true;
        storage.save_fiscal_period_if_absent(&period).await.unwrap();

        let journal = Uuid::new_v4();
        let enforced = PostingRules::new(EntryNumbering::new("GJ", 6)).enforce_fiscal_periods(true);
        let result = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&sales, 0, 10)]),
                &enforced,
            )
            .await;
        assert!(matches!(result, Err(LedgerError::OutsideFiscalPeriod(_))));
        assert_eq!(storage.entry_count(1).unwrap(), 0);
        let cash_after = storage.get_account(cash.id).await.unwrap().unwrap();
        assert_eq!(cash_after.balance, BigDecimal::from(0));

        // Another company has no periods and is unrestricted.
        let other_cash = Account::new(2, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let other_sales =
            Account::new(2, "411000".into(), "Ventas".into(), AccountType::Revenue, None);
        storage.save_account_if_absent(&other_cash).await.unwrap();
        storage.save_account_if_absent(&other_sales).await.unwrap();
        let posted = storage
            .commit_journal_entry(
                entry_for(2, journal, vec![line(&other_cash, 10, 0), line(&other_sales, 0, 10)]),
                &enforced,
            )
            .await
            .unwrap();
        assert_eq!(posted.entry_number, "GJ-000001");

        let relaxed = PostingRules::new(EntryNumbering::new("GJ", 6));
        let posted = storage
            .commit_journal_entry(
                entry_for(1, journal, vec![line(&cash, 10, 0), line(&sales, 0, 10)]),
                &relaxed,
            )
            .await
            .unwrap();
        assert_eq!(posted.entry_number, "GJ-000001");
    }

    #[tokio::test]
    async fn test_account_codes_unique_per_company() {
        let mut storage = MemoryStorage::new();
        let a = Account::new(1, "111000".into(), "Caja".into(), AccountType::Asset, None);
        let b = Account::new(1, "111000".into(), "Caja 2".into(), AccountType::Asset, None);
        let c = Account::new(2, "111000".into(), "Caja".into(), AccountType::Asset, None);
        assert!(storage.save_account_if_absent(&a).await.unwrap());
        assert!(!storage.save_account_if_absent(&b).await.unwrap());
        assert!(storage.save_account_if_absent(&c).await.unwrap());
    }
}
