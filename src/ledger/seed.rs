//! Seed data created when a company's books are initialized

use crate::ledger::template::{AutoJournalTemplate, TemplateLine, POS_SALE_CARD, POS_SALE_CASH};
use crate::types::AccountType::{Asset, Equity, Expense, Liability, Revenue};
use crate::types::*;

/// One row of the standard Dominican chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedAccount {
    pub code: &'static str,
    pub name: &'static str,
    pub account_type: AccountType,
    pub category: &'static str,
    pub subcategory: Option<&'static str>,
    pub is_parent: bool,
}

impl SeedAccount {
    /// Code of the group this account belongs to (`111000` -> `110000`)
    pub fn parent_code(&self) -> Option<String> {
        if self.is_parent {
            None
        } else {
            Some(format!("{}0000", &self.code[..2]))
        }
    }

    pub fn level(&self) -> u8 {
        if self.is_parent {
            1
        } else {
            2
        }
    }
}

const fn group(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    category: &'static str,
    subcategory: Option<&'static str>,
) -> SeedAccount {
    SeedAccount {
        code,
        name,
        account_type,
        category,
        subcategory,
        is_parent: true,
    }
}

const fn leaf(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    category: &'static str,
    subcategory: Option<&'static str>,
) -> SeedAccount {
    SeedAccount {
        code,
        name,
        account_type,
        category,
        subcategory,
        is_parent: false,
    }
}

const CURRENT: Option<&str> = Some("Corriente");
const NON_CURRENT: Option<&str> = Some("No Corriente");
const OPERATING: Option<&str> = Some("Operacional");
const NON_OPERATING: Option<&str> = Some("No Operacional");

/// Standard chart, groups listed before their children
pub const STANDARD_CHART: &[SeedAccount] = &[
    group("110000", "EFECTIVO Y EQUIVALENTES", Asset, "ACTIVO", CURRENT),
    leaf("111000", "Caja General", Asset, "ACTIVO", CURRENT),
    leaf("112000", "Bancos", Asset, "ACTIVO", CURRENT),
    leaf("113000", "Caja Chica", Asset, "ACTIVO", CURRENT),
    group("120000", "CUENTAS POR COBRAR", Asset, "ACTIVO", CURRENT),
    leaf("121000", "Clientes", Asset, "ACTIVO", CURRENT),
    leaf("122000", "Documentos por Cobrar", Asset, "ACTIVO", CURRENT),
    leaf("123000", "Deudores Diversos", Asset, "ACTIVO", CURRENT),
    group("130000", "INVENTARIOS", Asset, "ACTIVO", CURRENT),
    leaf("131000", "Mercancías en Inventario", Asset, "ACTIVO", CURRENT),
    leaf("132000", "Materia Prima", Asset, "ACTIVO", CURRENT),
    leaf("133000", "Productos en Proceso", Asset, "ACTIVO", CURRENT),
    group("150000", "PROPIEDAD PLANTA Y EQUIPO", Asset, "ACTIVO", NON_CURRENT),
    leaf("151000", "Terrenos", Asset, "ACTIVO", NON_CURRENT),
    leaf("152000", "Edificios", Asset, "ACTIVO", NON_CURRENT),
    leaf("153000", "Mobiliario y Equipo", Asset, "ACTIVO", NON_CURRENT),
    leaf("154000", "Vehículos", Asset, "ACTIVO", NON_CURRENT),
    leaf("155000", "Equipo de Cómputo", Asset, "ACTIVO", NON_CURRENT),
    group("210000", "CUENTAS POR PAGAR", Liability, "PASIVO", CURRENT),
    leaf("211000", "Proveedores", Liability, "PASIVO", CURRENT),
    leaf("212000", "Documentos por Pagar", Liability, "PASIVO", CURRENT),
    leaf("213000", "Acreedores Diversos", Liability, "PASIVO", CURRENT),
    group("220000", "IMPUESTOS POR PAGAR", Liability, "PASIVO", CURRENT),
    leaf("221000", "ITBIS por Pagar", Liability, "PASIVO", CURRENT),
    leaf("222000", "ISR por Pagar", Liability, "PASIVO", CURRENT),
    leaf("223000", "Retenciones por Pagar", Liability, "PASIVO", CURRENT),
    group("310000", "CAPITAL SOCIAL", Equity, "PATRIMONIO", None),
    leaf("311000", "Capital Autorizado", Equity, "PATRIMONIO", None),
    leaf("312000", "Utilidades Retenidas", Equity, "PATRIMONIO", None),
    leaf("313000", "Utilidad del Ejercicio", Equity, "PATRIMONIO", None),
    group("410000", "INGRESOS OPERACIONALES", Revenue, "INGRESO", OPERATING),
    leaf("411000", "Ventas", Revenue, "INGRESO", OPERATING),
    leaf("412000", "Prestación de Servicios", Revenue, "INGRESO", OPERATING),
    leaf("413000", "Ingresos por Comisiones", Revenue, "INGRESO", OPERATING),
    group("420000", "INGRESOS NO OPERACIONALES", Revenue, "INGRESO", NON_OPERATING),
    leaf("421000", "Ingresos Financieros", Revenue, "INGRESO", NON_OPERATING),
    leaf("422000", "Otros Ingresos", Revenue, "INGRESO", NON_OPERATING),
    group("510000", "COSTO DE VENTAS", Expense, "GASTO", Some("Costo de Ventas")),
    leaf("511000", "Costo de Mercancías Vendidas", Expense, "GASTO", Some("Costo de Ventas")),
    leaf("512000", "Mano de Obra Directa", Expense, "GASTO", Some("Costo de Ventas")),
    leaf("513000", "Gastos Indirectos de Fabricación", Expense, "GASTO", Some("Costo de Ventas")),
    group("520000", "GASTOS DE ADMINISTRACIÓN", Expense, "GASTO", Some("Administración")),
    leaf("521000", "Sueldos y Salarios", Expense, "GASTO", Some("Administración")),
    leaf("522000", "Prestaciones Sociales", Expense, "GASTO", Some("Administración")),
    leaf("523000", "Alquiler", Expense, "GASTO", Some("Administración")),
    leaf("524000", "Servicios Públicos", Expense, "GASTO", Some("Administración")),
    leaf("525000", "Depreciación", Expense, "GASTO", Some("Administración")),
    leaf("526000", "Seguros", Expense, "GASTO", Some("Administración")),
    leaf("527000", "Mantenimiento", Expense, "GASTO", Some("Administración")),
    group("530000", "GASTOS DE VENTAS", Expense, "GASTO", Some("Ventas")),
    leaf("531000", "Comisiones sobre Ventas", Expense, "GASTO", Some("Ventas")),
    leaf("532000", "Publicidad y Marketing", Expense, "GASTO", Some("Ventas")),
    leaf("533000", "Gastos de Distribución", Expense, "GASTO", Some("Ventas")),
    group("540000", "GASTOS FINANCIEROS", Expense, "GASTO", Some("Financieros")),
    leaf("541000", "Intereses sobre Préstamos", Expense, "GASTO", Some("Financieros")),
    leaf("542000", "Comisiones Bancarias", Expense, "GASTO", Some("Financieros")),
];

pub const DEFAULT_JOURNAL_NAME: &str = "Diario General";
pub const DEFAULT_JOURNAL_DESCRIPTION: &str = "Diario general de transacciones";

const CASH_ACCOUNT: &str = "111000";
const CARD_ACCOUNT: &str = "112000";
const SALES_ACCOUNT: &str = "411000";
const ITBIS_PAYABLE_ACCOUNT: &str = "221000";

/// POS sale templates for cash and card payments
pub fn standard_templates(company_id: CompanyId, created_by: &str) -> Vec<AutoJournalTemplate> {
    let sale_lines = |receiving_account: &str, debit_description: &str| {
        vec![
            TemplateLine::new(receiving_account, EntryType::Debit, "${total}", debit_description),
            TemplateLine::new(
                SALES_ACCOUNT,
                EntryType::Credit,
                "${subtotal}",
                "Venta POS #${saleNumber}",
            ),
            TemplateLine::new(
                ITBIS_PAYABLE_ACCOUNT,
                EntryType::Credit,
                "${itbis}",
                "ITBIS venta POS #${saleNumber}",
            ),
        ]
    };

    vec![
        AutoJournalTemplate::new(
            company_id,
            "Venta POS - Efectivo",
            POS_SALE_CASH,
            Some("Asiento automático para ventas POS en efectivo"),
            sale_lines(CASH_ACCOUNT, "Venta en efectivo POS #${saleNumber}"),
            created_by,
        ),
        AutoJournalTemplate::new(
            company_id,
            "Venta POS - Tarjeta",
            POS_SALE_CARD,
            Some("Asiento automático para ventas POS con tarjeta"),
            sale_lines(CARD_ACCOUNT, "Venta con tarjeta POS #${saleNumber}"),
            created_by,
        ),
    ]
}
