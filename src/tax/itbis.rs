//! ITBIS (Impuesto sobre Transferencias de Bienes Industrializados y Servicios)
//!
//! Only the fixed Dominican rates are modelled; the results feed the
//! `${subtotal}`/`${itbis}`/`${total}` amounts of auto-journal templates.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::round_currency;

/// Fixed ITBIS rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItbisRate {
    /// General rate - 18%
    Standard,
    /// Reduced rate for selected goods - 16%
    Reduced,
    /// Exempt goods and services - 0%
    Exempt,
}

impl ItbisRate {
    /// Rate as a percentage
    pub fn percentage(&self) -> BigDecimal {
        match self {
            ItbisRate::Standard => BigDecimal::from(18),
            ItbisRate::Reduced => BigDecimal::from(16),
            ItbisRate::Exempt => BigDecimal::from(0),
        }
    }
}

/// Breakdown of an amount into subtotal, ITBIS and total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItbisCalculation {
    pub rate: ItbisRate,
    /// Amount before tax
    pub subtotal: BigDecimal,
    pub itbis: BigDecimal,
    /// Amount including tax
    pub total: BigDecimal,
}

impl ItbisCalculation {
    /// Calculate ITBIS on top of a pre-tax amount
    pub fn calculate(subtotal: BigDecimal, rate: ItbisRate) -> Result<Self, ItbisError> {
        if subtotal < BigDecimal::from(0) {
            return Err(ItbisError::NegativeAmount(subtotal.to_string()));
        }
        let subtotal = round_currency(&subtotal);
        let itbis = round_currency(&(&subtotal * rate.percentage() / BigDecimal::from(100)));
        let total = &subtotal + &itbis;

        Ok(Self {
            rate,
            subtotal,
            itbis,
            total,
        })
    }

    /// Split a tax-inclusive amount (shelf price) into subtotal and ITBIS.
    /// The ITBIS absorbs the rounding so the parts always add up to the total.
    pub fn reverse_calculate(total: BigDecimal, rate: ItbisRate) -> Result<Self, ItbisError> {
        if total < BigDecimal::from(0) {
            return Err(ItbisError::NegativeAmount(total.to_string()));
        }
        let total = round_currency(&total);
        let divisor = BigDecimal::from(100) + rate.percentage();
        let subtotal = round_currency(&(&total * BigDecimal::from(100) / divisor));
        let itbis = &total - &subtotal;

        Ok(Self {
            rate,
            subtotal,
            itbis,
            total,
        })
    }
}

/// Sale line with its ITBIS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItbisLineItem {
    pub description: String,
    pub quantity: BigDecimal,
    /// Unit price before ITBIS
    pub unit_price: BigDecimal,
    pub calculation: ItbisCalculation,
}

impl ItbisLineItem {
    pub fn new(
        description: String,
        quantity: BigDecimal,
        unit_price: BigDecimal,
        rate: ItbisRate,
    ) -> Result<Self, ItbisError> {
        if quantity <= BigDecimal::from(0) {
            return Err(ItbisError::InvalidQuantity(quantity.to_string()));
        }
        let calculation = ItbisCalculation::calculate(&quantity * &unit_price, rate)?;
        Ok(Self {
            description,
            quantity,
            unit_price,
            calculation,
        })
    }
}

/// Totals of a multi-line sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub line_items: Vec<ItbisLineItem>,
    pub subtotal: BigDecimal,
    pub itbis: BigDecimal,
    pub total: BigDecimal,
}

impl SaleTotals {
    pub fn new(line_items: Vec<ItbisLineItem>) -> Self {
        let subtotal: BigDecimal = line_items.iter().map(|i| &i.calculation.subtotal).sum();
        let itbis: BigDecimal = line_items.iter().map(|i| &i.calculation.itbis).sum();
        let total = &subtotal + &itbis;
        Self {
            line_items,
            subtotal,
            itbis,
            total,
        }
    }
}

/// ITBIS calculation errors
#[derive(Debug, thiserror::Error)]
pub enum ItbisError {
    #[error("Amount cannot be negative: {0}")]
    NegativeAmount(String),
    #[error("Quantity must be positive: {0}")]
    InvalidQuantity(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn test_standard_rate() {
        let calc = ItbisCalculation::calculate(dec("100.00"), ItbisRate::Standard).unwrap();
        assert_eq!(calc.itbis, dec("18.00"));
        assert_eq!(calc.total, dec("118.00"));
    }

    #[test]
    fn test_reverse_calculation_adds_up() {
        let calc = ItbisCalculation::reverse_calculate(dec("118.00"), ItbisRate::Standard).unwrap();
        assert_eq!(calc.subtotal, dec("100.00"));
        assert_eq!(calc.itbis, dec("18.00"));

        let odd = ItbisCalculation::reverse_calculate(dec("99.99"), ItbisRate::Standard).unwrap();
        assert_eq!(&odd.subtotal + &odd.itbis, dec("99.99"));
        assert_eq!(odd.subtotal, dec("84.74"));
    }

    #[test]
    fn test_exempt_and_reduced() {
        let exempt = ItbisCalculation::calculate(dec("50"), ItbisRate::Exempt).unwrap();
        assert_eq!(exempt.itbis, dec("0"));
        assert_eq!(exempt.total, dec("50.00"));

        let reduced = ItbisCalculation::calculate(dec("200"), ItbisRate::Reduced).unwrap();
        assert_eq!(reduced.itbis, dec("32.00"));
    }

    #[test]
    fn test_negative_amount_rejected() {
        assert!(ItbisCalculation::calculate(dec("-1"), ItbisRate::Standard).is_err());
    }

    #[test]
    fn test_sale_totals() {
        let a =
            ItbisLineItem::new("Café".into(), dec("2"), dec("25.00"), ItbisRate::Standard).unwrap();
        let b =
            ItbisLineItem::new("Pan".into(), dec("1"), dec("50.00"), ItbisRate::Exempt).unwrap();
        let totals = SaleTotals::new(vec![a, b]);
        assert_eq!(totals.subtotal, dec("100.00"));
        assert_eq!(totals.itbis, dec("9.00"));
        assert_eq!(totals.total, dec("109.00"));
    }
}
