//! Auto-journal templates: turning business events into journal lines

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ledger::journal::JournalLineDraft;
use crate::tax::itbis::ItbisCalculation;
use crate::traits::*;
use crate::types::*;

/// Trigger of the template used for cash POS sales
pub const POS_SALE_CASH: &str = "pos_sale_cash";
/// Trigger of the template used for card (and any non-cash) POS sales
pub const POS_SALE_CARD: &str = "pos_sale_card";

/// Pick the POS trigger for a payment method
pub fn trigger_for_payment_method(payment_method: &str) -> &'static str {
    if payment_method.trim().eq_ignore_ascii_case("cash") {
        POS_SALE_CASH
    } else {
        POS_SALE_CARD
    }
}

/// One line of a template, stored as data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLine {
    pub account_code: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// `${total}`, `${subtotal}`, `${itbis}` or a literal decimal
    pub amount: String,
    /// Free text; `${saleNumber}` and `${paymentMethod}` are substituted
    pub description: String,
}

impl TemplateLine {
    pub fn new(account_code: &str, entry_type: EntryType, amount: &str, description: &str) -> Self {
        Self {
            account_code: account_code.to_string(),
            entry_type,
            amount: amount.to_string(),
            description: description.to_string(),
        }
    }
}

/// Recipe mapping a trigger event to journal lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoJournalTemplate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub company_id: CompanyId,
    pub name: String,
    pub trigger_event: String,
    #[serde(default)]
    pub description: Option<String>,
    pub lines: Vec<TemplateLine>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_by: String,
}

fn default_active() -> bool {
    true
}

impl AutoJournalTemplate {
    pub fn new(
        company_id: CompanyId,
        name: &str,
        trigger_event: &str,
        description: Option<&str>,
        lines: Vec<TemplateLine>,
        created_by: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            name: name.to_string(),
            trigger_event: trigger_event.to_string(),
            description: description.map(str::to_string),
            lines,
            is_active: true,
            created_by: created_by.to_string(),
        }
    }

    /// Parse a template from its JSON form and validate it
    pub fn from_json(json: &str) -> LedgerResult<Self> {
        let template: Self = serde_json::from_str(json)
            .map_err(|e| LedgerError::Validation(format!("Invalid template JSON: {}", e)))?;
        template.validate()?;
        Ok(template)
    }

    pub fn to_json(&self) -> LedgerResult<String> {
        serde_json::to_string(self).map_err(|e| LedgerError::Storage(e.to_string()))
    }

    /// Check the template data without touching any account
    pub fn validate(&self) -> LedgerResult<()> {
        if self.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Template name cannot be empty".to_string(),
            ));
        }
        if self.trigger_event.trim().is_empty() {
            return Err(LedgerError::Validation(
                "Template trigger event cannot be empty".to_string(),
            ));
        }
        if self.lines.len() < 2 {
            return Err(LedgerError::Validation(format!(
                "Template '{}' needs at least two lines",
                self.name
            )));
        }

        for line in &self.lines {
            if line.account_code.trim().is_empty() {
                return Err(LedgerError::Validation(format!(
                    "Template '{}' has a line without account code",
                    self.name
                )));
            }
            if let TemplateAmount::Literal(value) = TemplateAmount::parse(&line.amount)? {
                if value < BigDecimal::from(0) {
                    return Err(LedgerError::InvalidAmount(line.amount.clone()));
                }
            }
        }

        let has_side = |side: EntryType| self.lines.iter().any(|l| l.entry_type == side);
        if !has_side(EntryType::Debit) || !has_side(EntryType::Credit) {
            return Err(LedgerError::Validation(format!(
                "Template '{}' needs debit and credit lines",
                self.name
            )));
        }

        Ok(())
    }
}

/// Amount tokens a template line may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPlaceholder {
    Total,
    Subtotal,
    Itbis,
}

impl AmountPlaceholder {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "${total}" => Some(AmountPlaceholder::Total),
            "${subtotal}" => Some(AmountPlaceholder::Subtotal),
            "${itbis}" => Some(AmountPlaceholder::Itbis),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            AmountPlaceholder::Total => "${total}",
            AmountPlaceholder::Subtotal => "${subtotal}",
            AmountPlaceholder::Itbis => "${itbis}",
        }
    }

    fn value<'a>(&self, context: &'a EventContext) -> &'a BigDecimal {
        match self {
            AmountPlaceholder::Total => &context.total,
            AmountPlaceholder::Subtotal => &context.subtotal,
            AmountPlaceholder::Itbis => &context.itbis,
        }
    }
}

/// Parsed `amount` field of a template line
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateAmount {
    Placeholder(AmountPlaceholder),
    Literal(BigDecimal),
}

impl TemplateAmount {
    pub fn parse(raw: &str) -> LedgerResult<Self> {
        let token = raw.trim();
        if let Some(placeholder) = AmountPlaceholder::from_token(token) {
            return Ok(TemplateAmount::Placeholder(placeholder));
        }
        if token.contains("${") {
            return Err(LedgerError::UnknownPlaceholder(token.to_string()));
        }
        BigDecimal::from_str(token)
            .map(TemplateAmount::Literal)
            .map_err(|_| LedgerError::InvalidAmount(raw.to_string()))
    }

    pub fn evaluate(&self, context: &EventContext) -> BigDecimal {
        match self {
            TemplateAmount::Placeholder(placeholder) => placeholder.value(context).clone(),
            TemplateAmount::Literal(value) => value.clone(),
        }
    }
}

/// Substitute the whitelisted text tokens of a line description
pub fn render_description(description: &str, context: &EventContext) -> String {
    description
        .replace("${saleNumber}", &context.sale_number)
        .replace("${paymentMethod}", &context.payment_method)
}

/// Values of the business event a template is resolved against
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub total: BigDecimal,
    pub subtotal: BigDecimal,
    pub itbis: BigDecimal,
    pub sale_number: String,
    pub payment_method: String,
    pub date: NaiveDate,
    pub source_module: SourceModule,
    pub source_id: Option<i64>,
}

impl EventContext {
    /// POS sale context from an ITBIS breakdown
    pub fn from_itbis(
        calculation: &ItbisCalculation,
        sale_number: impl Into<String>,
        payment_method: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            total: calculation.total.clone(),
            subtotal: calculation.subtotal.clone(),
            itbis: calculation.itbis.clone(),
            sale_number: sale_number.into(),
            payment_method: payment_method.into(),
            date,
            source_module: SourceModule::Pos,
            source_id: None,
        }
    }

    pub fn with_source_id(mut self, source_id: i64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    /// Entry reference, e.g. `POS-0042`
    pub fn reference(&self) -> String {
        format!("POS-{}", self.sale_number)
    }

    /// Entry description, e.g. `Venta POS #0042 - cash`
    pub fn entry_description(&self) -> String {
        format!("Venta POS #{} - {}", self.sale_number, self.payment_method)
    }
}

/// Why a template line produced no journal line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No active account with the line's code
    AccountNotFound,
    /// The amount resolved to zero (e.g. an exempt sale's ITBIS)
    ZeroAmount,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineResolution {
    Resolved(JournalLineDraft),
    Skipped {
        line_index: usize,
        account_code: String,
        reason: SkipReason,
    },
}

/// Outcome of resolving a template against an event
#[derive(Debug, Clone)]
pub struct TemplateResolution {
    pub template: AutoJournalTemplate,
    pub lines: Vec<LineResolution>,
}

impl TemplateResolution {
    pub fn drafts(&self) -> Vec<JournalLineDraft> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                LineResolution::Resolved(draft) => Some(draft.clone()),
                LineResolution::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<(usize, &str, SkipReason)> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                LineResolution::Skipped {
                    line_index,
                    account_code,
                    reason,
                } => Some((*line_index, account_code.as_str(), *reason)),
                LineResolution::Resolved(_) => None,
            })
            .collect()
    }
}

/// Looks up templates and resolves them into journal lines
pub struct TemplateEngine<S: LedgerStorage> {
    pub(crate) storage: S,
}

impl<S: LedgerStorage> TemplateEngine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Resolve the active template for a trigger into journal lines.
    ///
    /// Lines whose account cannot be found are skipped and logged rather
    /// than failing the event; the poster later rejects the entry if the
    /// remaining lines do not balance.
    pub async fn resolve(
        &self,
        company_id: CompanyId,
        trigger_event: &str,
        context: &EventContext,
    ) -> LedgerResult<TemplateResolution> {
        let template = self
            .storage
            .get_active_template(company_id, trigger_event)
            .await?
            .ok_or_else(|| LedgerError::TemplateNotFound(trigger_event.to_string()))?;

        let zero = BigDecimal::from(0);
        let mut lines = Vec::with_capacity(template.lines.len());
        for (line_index, line) in template.lines.iter().enumerate() {
            let amount = round_currency(&TemplateAmount::parse(&line.amount)?.evaluate(context));
            let account = self
                .storage
                .get_account_by_code(company_id, &line.account_code)
                .await?
                .filter(|a| a.is_active);

            let resolution = match account {
                None => {
                    warn!(
                        company_id,
                        trigger = trigger_event,
                        account_code = %line.account_code,
                        "template account not found, skipping line"
                    );
                    LineResolution::Skipped {
                        line_index,
                        account_code: line.account_code.clone(),
                        reason: SkipReason::AccountNotFound,
                    }
                }
                Some(_) if amount == zero => {
                    debug!(
                        company_id,
                        trigger = trigger_event,
                        account_code = %line.account_code,
                        "zero amount template line skipped"
                    );
                    LineResolution::Skipped {
                        line_index,
                        account_code: line.account_code.clone(),
                        reason: SkipReason::ZeroAmount,
                    }
                }
                Some(account) => LineResolution::Resolved(JournalLineDraft::new(
                    account.id,
                    line.entry_type,
                    amount,
                    Some(render_description(&line.description, context)),
                )),
            };
            lines.push(resolution);
        }

        Ok(TemplateResolution { template, lines })
    }

    /// Store a template unless the company already has an active one for its trigger
    pub async fn register_template(&mut self, template: AutoJournalTemplate) -> LedgerResult<bool> {
        template.validate()?;
        let created = self.storage.save_template_if_absent(&template).await?;
        if created {
            info!(
                company_id = template.company_id,
                trigger = %template.trigger_event,
                "registered journal template"
            );
        }
        Ok(created)
    }

    pub async fn get_template(
        &self,
        company_id: CompanyId,
        trigger_event: &str,
    ) -> LedgerResult<Option<AutoJournalTemplate>> {
        self.storage.get_active_template(company_id, trigger_event).await
    }

    /// Deactivate the active template of a trigger
    pub async fn deactivate_template(
        &mut self,
        company_id: CompanyId,
        trigger_event: &str,
    ) -> LedgerResult<AutoJournalTemplate> {
        let mut template = self
            .storage
            .get_active_template(company_id, trigger_event)
            .await?
            .ok_or_else(|| LedgerError::TemplateNotFound(trigger_event.to_string()))?;
        template.is_active = false;
        self.storage.update_template(&template).await?;
        info!(company_id, trigger = trigger_event, "deactivated journal template");
        Ok(template)
    }
}
