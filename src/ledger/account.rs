//! Chart of accounts: bootstrap, search and hierarchy

use chrono::Datelike;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::ledger::seed::{self, STANDARD_CHART};
use crate::traits::*;
use crate::types::*;

/// Request to create a custom account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    /// Code of the group account this one hangs from
    pub parent_code: Option<String>,
    /// Defaults to the parent's category, or the type code at the top level
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub is_parent: bool,
}

impl NewAccount {
    pub fn leaf(code: &str, name: &str, account_type: AccountType) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            parent_code: None,
            category: None,
            subcategory: None,
            is_parent: false,
        }
    }

    pub fn under(mut self, parent_code: &str) -> Self {
        self.parent_code = Some(parent_code.to_string());
        self
    }
}

/// What a bootstrap run created versus what was already there
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub account_types_created: usize,
    pub accounts_created: usize,
    pub accounts_existing: usize,
    pub journal_created: bool,
    pub fiscal_period_created: bool,
    pub templates_created: usize,
    pub templates_existing: usize,
}

impl BootstrapReport {
    /// True when the run changed nothing
    pub fn is_noop(&self) -> bool {
        self.account_types_created == 0
            && self.accounts_created == 0
            && !self.journal_created
            && !self.fiscal_period_created
            && self.templates_created == 0
    }
}

/// Account manager for handling chart of accounts operations
pub struct AccountManager<S: LedgerStorage> {
    pub(crate) storage: S,
    validator: Box<dyn AccountValidator>,
    journal_code: String,
}

impl<S: LedgerStorage> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
            journal_code: "GJ".to_string(),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self {
            storage,
            validator,
            journal_code: "GJ".to_string(),
        }
    }

    /// Code of the journal created at bootstrap
    pub fn default_journal_code(mut self, code: &str) -> Self {
        self.journal_code = code.to_string();
        self
    }

    /// Set up the books of a company for the current calendar year
    pub async fn initialize_chart_of_accounts(
        &mut self,
        company_id: CompanyId,
        created_by: &str,
    ) -> LedgerResult<BootstrapReport> {
        let year = chrono::Utc::now().year();
        self.initialize_chart_of_accounts_for_year(company_id, created_by, year)
            .await
    }

    /// Create account types, the standard chart, the default journal, the
    /// fiscal year and the POS templates. Running it again is harmless:
    /// anything that already exists is left untouched.
    pub async fn initialize_chart_of_accounts_for_year(
        &mut self,
        company_id: CompanyId,
        created_by: &str,
        year: i32,
    ) -> LedgerResult<BootstrapReport> {
        let mut report = BootstrapReport::default();

        for definition in AccountTypeDefinition::standard() {
            if self.storage.save_account_type_if_absent(&definition).await? {
                report.account_types_created += 1;
            }
        }

        let mut ids: HashMap<&str, Uuid> = HashMap::new();
        for seed_account in STANDARD_CHART {
            if let Some(existing) = self
                .storage
                .get_account_by_code(company_id, seed_account.code)
                .await?
            {
                ids.insert(seed_account.code, existing.id);
                report.accounts_existing += 1;
                continue;
            }

            let parent_id = seed_account
                .parent_code()
                .and_then(|code| ids.get(code.as_str()).copied());
            let mut account = Account::new(
                company_id,
                seed_account.code.to_string(),
                seed_account.name.to_string(),
                seed_account.account_type,
                parent_id,
            )
            .with_level(seed_account.level())
            .with_category(seed_account.category, seed_account.subcategory);
            if seed_account.is_parent {
                account = account.as_parent();
            }

            if self.storage.save_account_if_absent(&account).await? {
                ids.insert(seed_account.code, account.id);
                report.accounts_created += 1;
            } else if let Some(existing) = self
                .storage
                .get_account_by_code(company_id, seed_account.code)
                .await?
            {
                ids.insert(seed_account.code, existing.id);
                report.accounts_existing += 1;
            }
        }

        let journal = Journal::new(
            company_id,
            self.journal_code.clone(),
            seed::DEFAULT_JOURNAL_NAME.to_string(),
            Some(seed::DEFAULT_JOURNAL_DESCRIPTION.to_string()),
        );
        report.journal_created = self.storage.save_journal_if_absent(&journal).await?;

        let period = FiscalPeriod::calendar_year(company_id, year)?;
        report.fiscal_period_created = self.storage.save_fiscal_period_if_absent(&period).await?;

        for template in seed::standard_templates(company_id, created_by) {
            if self.storage.save_template_if_absent(&template).await? {
                report.templates_created += 1;
            } else {
                report.templates_existing += 1;
            }
        }

        info!(
            company_id,
            year,
            accounts_created = report.accounts_created,
            accounts_existing = report.accounts_existing,
            templates_created = report.templates_created,
            "initialized chart of accounts"
        );
        Ok(report)
    }

    /// Create a custom account
    pub async fn create_account(
        &mut self,
        company_id: CompanyId,
        new_account: NewAccount,
    ) -> LedgerResult<Account> {
        if self
            .storage
            .get_account_by_code(company_id, &new_account.code)
            .await?
            .is_some()
        {
            return Err(LedgerError::Validation(format!(
                "Account with code '{}' already exists",
                new_account.code
            )));
        }

        let parent = match &new_account.parent_code {
            Some(parent_code) => {
                let parent = self
                    .storage
                    .get_account_by_code(company_id, parent_code)
                    .await?
                    .ok_or_else(|| {
                        LedgerError::Validation(format!(
                            "Parent account '{}' does not exist",
                            parent_code
                        ))
                    })?;
                if !parent.is_parent {
                    return Err(LedgerError::Validation(format!(
                        "Account '{}' is not a group account",
                        parent_code
                    )));
                }
                if parent.account_type != new_account.account_type {
                    return Err(LedgerError::Validation(format!(
                        "Account type {} does not match parent type {}",
                        new_account.account_type, parent.account_type
                    )));
                }
                Some(parent)
            }
            None => None,
        };

        let category = new_account
            .category
            .clone()
            .or_else(|| parent.as_ref().map(|p| p.category.clone()))
            .unwrap_or_else(|| new_account.account_type.code().to_string());
        let mut account = Account::new(
            company_id,
            new_account.code,
            new_account.name,
            new_account.account_type,
            parent.as_ref().map(|p| p.id),
        )
        .with_level(parent.as_ref().map_or(1, |p| p.level.saturating_add(1)))
        .with_category(&category, new_account.subcategory.as_deref());
        if new_account.is_parent {
            account = account.as_parent();
        }

        self.validator.validate_account(&account)?;

        if !self.storage.save_account_if_absent(&account).await? {
            return Err(LedgerError::Validation(format!(
                "Account with code '{}' already exists",
                account.code
            )));
        }
        info!(company_id, code = %account.code, "created account");
        Ok(account)
    }

    /// Get an account by ID
    pub async fn get_account(&self, account_id: Uuid) -> LedgerResult<Option<Account>> {
        self.storage.get_account(account_id).await
    }

    /// Get an account by ID, returning an error if not found
    pub async fn get_account_required(&self, account_id: Uuid) -> LedgerResult<Account> {
        self.storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))
    }

    pub async fn get_account_by_code(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> LedgerResult<Option<Account>> {
        self.storage.get_account_by_code(company_id, code).await
    }

    /// List a company's accounts, optionally of one type, ordered by code
    pub async fn list_accounts(
        &self,
        company_id: CompanyId,
        account_type: Option<AccountType>,
    ) -> LedgerResult<Vec<Account>> {
        self.storage.list_accounts(company_id, account_type).await
    }

    /// Case-insensitive search over code and name, optionally within a category
    pub async fn search_accounts(
        &self,
        company_id: CompanyId,
        query: &str,
        category: Option<&str>,
    ) -> LedgerResult<Vec<Account>> {
        let needle = query.trim().to_lowercase();
        let category = category.map(str::to_lowercase);

        let mut accounts: Vec<Account> = self
            .storage
            .list_accounts(company_id, None)
            .await?
            .into_iter()
            .filter(|account| {
                account.code.to_lowercase().contains(&needle)
                    || account.name.to_lowercase().contains(&needle)
            })
            .filter(|account| {
                category
                    .as_ref()
                    .map_or(true, |c| account.category.to_lowercase() == *c)
            })
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    pub async fn get_child_accounts(&self, parent_id: Uuid) -> LedgerResult<Vec<Account>> {
        let parent = self.get_account_required(parent_id).await?;
        Ok(self
            .storage
            .list_accounts(parent.company_id, None)
            .await?
            .into_iter()
            .filter(|account| account.parent_id == Some(parent_id))
            .collect())
    }

    /// Accounts from the top-level group down to the given account
    pub async fn get_account_path(&self, account_id: Uuid) -> LedgerResult<Vec<Account>> {
        let mut path: Vec<Account> = Vec::new();
        let mut current_account_id = Some(account_id);

        while let Some(id) = current_account_id {
            if path.iter().any(|a| a.id == id) {
                return Err(LedgerError::Consistency(format!(
                    "Account hierarchy loops at {}",
                    id
                )));
            }
            let account = self.get_account_required(id).await?;
            current_account_id = account.parent_id;
            path.insert(0, account);
        }

        Ok(path)
    }

    /// Deactivate an account. Accounts are never deleted; an account that
    /// still carries a balance must be emptied first.
    pub async fn deactivate_account(&mut self, account_id: Uuid) -> LedgerResult<Account> {
        let account = self.storage.deactivate_account(account_id).await?;
        info!(company_id = account.company_id, code = %account.code, "deactivated account");
        Ok(account)
    }
}
