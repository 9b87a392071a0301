//! A day at a Dominican shop: bootstrap, POS sales, NCF numbers, expenses, reports

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use fiscal_ledger::{
    observability, trigger_for_payment_method, CashMovement, EventContext, InvoiceCollection,
    ItbisCalculation, ItbisRate, JournalEntryBuilder, Ledger, LedgerConfig, MemoryStorage, NcfType,
    NewNcfSequence,
};

const COMPANY: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init();
    let config = LedgerConfig::load().unwrap_or_default();
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::with_config(storage.clone(), config);
    let day = NaiveDate::from_ymd_opt(2025, 3, 14).ok_or("invalid date")?;

    // 1. Chart of accounts, default journal, fiscal year and POS templates
    println!("Setting up company {}...", COMPANY);
    let report = ledger
        .accounts()
        .initialize_chart_of_accounts_for_year(COMPANY, "admin", 2025)
        .await?;
    println!(
        "  {} accounts, {} templates, journal created: {}",
        report.accounts_created, report.templates_created, report.journal_created
    );

    ledger
        .register_ncf_sequence(
            COMPANY,
            NewNcfSequence {
                ncf_type: NcfType::B02,
                series: None,
                description: Some("Consumidor final".to_string()),
                range_start: 1,
                range_end: 500,
                current_number: None,
                expiration_date: None,
            },
        )
        .await?;

    // 2. Opening capital
    let cash = ledger
        .get_account_by_code(COMPANY, "111000")
        .await?
        .ok_or("cash account missing")?;
    let capital = ledger
        .get_account_by_code(COMPANY, "311000")
        .await?
        .ok_or("capital account missing")?;
    let (header, lines) = JournalEntryBuilder::new("Aporte inicial de capital", day, "owner")
        .debit(cash.id, BigDecimal::from(25_000), None)
        .credit(capital.id, BigDecimal::from(25_000), None)
        .build()?;
    let opening = ledger.post_entry(COMPANY, "GJ", header, lines).await?;
    println!("\nPosted {}: {}", opening.entry_number, opening.description);

    // 3. POS sales, each with a consumer NCF
    println!("\nProcessing POS sales...");
    let sales = [("0001", 1_000, "cash"), ("0002", 2_350, "card"), ("0003", 480, "cash")];
    for (number, subtotal, method) in sales {
        let calc = ItbisCalculation::calculate(BigDecimal::from(subtotal), ItbisRate::Standard)?;
        let ncf = ledger.allocate_ncf(COMPANY, NcfType::B02).await?;
        let context = EventContext::from_itbis(&calc, number, method, day);
        let posting = ledger
            .post_from_event(COMPANY, trigger_for_payment_method(method), &context, "cashier")
            .await?;
        println!(
            "  {} {} total {} (ITBIS {}) -> {}",
            ncf.ncf, posting.entry.description, calc.total, calc.itbis, posting.entry.entry_number
        );
    }

    // 4. Expenses, supplier payment and a collected invoice
    let rent = ledger
        .post_expense(
            COMPANY,
            CashMovement {
                account_code: "523000".to_string(),
                amount: BigDecimal::from(6_000),
                description: "Alquiler de marzo".to_string(),
                reference: Some("REC-0315".to_string()),
                date: day,
                source_id: None,
                created_by: "admin".to_string(),
            },
        )
        .await?;
    println!("\nPosted {}: {}", rent.entry_number, rent.description);

    let supplier = ledger
        .post_payment(
            COMPANY,
            CashMovement {
                account_code: "211000".to_string(),
                amount: BigDecimal::from(1_200),
                description: "Distribuidora del Cibao".to_string(),
                reference: None,
                date: day,
                source_id: Some(88),
                created_by: "admin".to_string(),
            },
        )
        .await?;
    println!("Posted {}: {}", supplier.entry_number, supplier.description);

    let collection = ledger
        .post_invoice_payment(
            COMPANY,
            InvoiceCollection {
                invoice_id: 17,
                amount: BigDecimal::from(900),
                payment_method: "transferencia".to_string(),
                payment_account_code: "112000".to_string(),
                date: day,
                created_by: "admin".to_string(),
            },
        )
        .await?;
    println!("Posted {}: {}", collection.entry_number, collection.description);

    // 5. Reports
    println!("\nTrial balance as of {}:", day);
    let trial = ledger.trial_balance(COMPANY, day).await?;
    for row in trial.accounts.iter().filter(|r| r.balance != BigDecimal::from(0)) {
        println!(
            "  {} {:<28} {:>12} {:>12}",
            row.account_code, row.account_name, row.debit_balance, row.credit_balance
        );
    }
    println!(
        "  {:<35} {:>12} {:>12}  balanced: {}",
        "TOTAL", trial.totals.total_debits, trial.totals.total_credits, trial.totals.is_balanced
    );

    let month_start = NaiveDate::from_ymd_opt(2025, 3, 1).ok_or("invalid date")?;
    let income = ledger.income_statement(COMPANY, month_start, day).await?;
    println!(
        "\nIncome statement: revenues {} expenses {} net {}",
        income.total_revenues, income.total_expenses, income.net_income
    );

    let sheet = ledger.balance_sheet(COMPANY, day).await?;
    println!(
        "Balance sheet: assets {} = liabilities {} + equity {} ({})",
        sheet.total_assets,
        sheet.total_liabilities,
        sheet.total_equity,
        if sheet.is_balanced { "balanced" } else { "NOT balanced" }
    );

    let cash_ledger = ledger.general_ledger(COMPANY, cash.id, None, None).await?;
    println!("\nCaja General movements:");
    for line in &cash_ledger.lines {
        println!(
            "  {} {:<14} {:>10} {:>10} {:>12}",
            line.date,
            line.entry_number,
            line.debit_amount,
            line.credit_amount,
            line.running_balance
        );
    }

    for usage in ledger.ncf().usage(COMPANY, day).await? {
        println!(
            "\nNCF {}: {} issued, {} remaining ({}% used)",
            usage.ncf_type, usage.issued, usage.remaining, usage.percent_used
        );
    }

    let integrity = ledger.validate_integrity(COMPANY, day).await?;
    println!("Integrity check: {}", if integrity.is_valid { "ok" } else { "issues found" });
    for issue in integrity.issues {
        println!("  - {}", issue);
    }

    Ok(())
}
