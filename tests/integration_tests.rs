//! Integration tests for fiscal-ledger

use std::collections::HashSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use fiscal_ledger::{
    AutoJournalTemplate, CashMovement, EntryHeader, EventContext, InvoiceCollection,
    ItbisCalculation, ItbisRate, JournalLineDraft, JournalPoster, Ledger, LedgerConfig, LedgerError,
    LedgerStorage, LineResolution, MemoryStorage, NcfAllocator, NcfType, NewNcfSequence, SkipReason,
    SourceModule, POS_SALE_CASH,
};
use uuid::Uuid;

const COMPANY: i64 = 1;

fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn cash_sale(sale_number: &str, total: &str, subtotal: &str, itbis: &str) -> EventContext {
    EventContext {
        total: dec(total),
        subtotal: dec(subtotal),
        itbis: dec(itbis),
        sale_number: sale_number.to_string(),
        payment_method: "cash".to_string(),
        date: date(2025, 3, 14),
        source_module: SourceModule::Pos,
        source_id: Some(42),
    }
}

async fn bootstrapped() -> (Ledger<MemoryStorage>, MemoryStorage) {
    let storage = MemoryStorage::new();
    let mut ledger = Ledger::new(storage.clone());
    ledger
        .accounts()
        .initialize_chart_of_accounts_for_year(COMPANY, "admin", 2025)
        .await
        .unwrap();
    (ledger, storage)
}

async fn balance_of(storage: &MemoryStorage, code: &str) -> BigDecimal {
    storage
        .get_account_by_code(COMPANY, code)
        .await
        .unwrap()
        .unwrap()
        .balance
}

async fn account_id(storage: &MemoryStorage, code: &str) -> Uuid {
    storage
        .get_account_by_code(COMPANY, code)
        .await
        .unwrap()
        .unwrap()
        .id
}

fn movement(account_code: &str, amount: &str, description: &str, on: NaiveDate) -> CashMovement {
    CashMovement {
        account_code: account_code.to_string(),
        amount: dec(amount),
        description: description.to_string(),
        reference: None,
        date: on,
        source_id: None,
        created_by: "user-1".to_string(),
    }
}

#[tokio::test]
async fn test_cash_pos_sale_posts_three_lines() {
    let (mut ledger, storage) = bootstrapped().await;

    let posting = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0042", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await
        .unwrap();
    let entry = posting.entry;

    assert!(posting.skipped_lines.is_empty());
    assert_eq!(entry.entry_number, "GJ-000001");
    assert_eq!(entry.reference.as_deref(), Some("POS-0042"));
    assert_eq!(entry.description, "Venta POS #0042 - cash");
    assert_eq!(entry.source_module, SourceModule::Pos);
    assert_eq!(entry.total_debit, dec("118.00"));
    assert_eq!(entry.total_credit, dec("118.00"));

    let summary: Vec<(&str, BigDecimal, BigDecimal)> = entry
        .lines
        .iter()
        .map(|l| (l.account_code.as_str(), l.debit_amount.clone(), l.credit_amount.clone()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("111000", dec("118.00"), dec("0")),
            ("411000", dec("0"), dec("100.00")),
            ("221000", dec("0"), dec("18.00")),
        ]
    );
    assert_eq!(
        entry.lines[0].description.as_deref(),
        Some("Venta en efectivo POS #0042")
    );

    assert_eq!(balance_of(&storage, "111000").await, dec("118.00"));
    assert_eq!(balance_of(&storage, "411000").await, dec("100.00"));
    assert_eq!(balance_of(&storage, "221000").await, dec("18.00"));
}

#[tokio::test]
async fn test_card_sale_uses_bank_account() {
    let (mut ledger, storage) = bootstrapped().await;
    let calc = ItbisCalculation::calculate(dec("250"), ItbisRate::Standard).unwrap();
    let context = EventContext::from_itbis(&calc, "0007", "card", date(2025, 3, 15));

    let posting = ledger
        .post_from_event(
            COMPANY,
            fiscal_ledger::trigger_for_payment_method("card"),
            &context,
            "cashier",
        )
        .await
        .unwrap();
    assert_eq!(posting.entry.lines[0].account_code, "112000");
    assert_eq!(balance_of(&storage, "112000").await, dec("295.00"));
    assert_eq!(balance_of(&storage, "111000").await, dec("0"));
}

#[tokio::test]
async fn test_missing_template_accounts_are_skipped_when_rest_balances() {
    let (mut ledger, _storage) = bootstrapped().await;

    let json = r#"{
        "companyId": 1,
        "name": "Venta con propina",
        "triggerEvent": "pos_sale_tip",
        "lines": [
            {"accountCode": "111000", "type": "debit",
             "amount": "${total}", "description": "Venta #${saleNumber}"},
            {"accountCode": "411000", "type": "credit",
             "amount": "${subtotal}", "description": "Venta"},
            {"accountCode": "221000", "type": "credit",
             "amount": "${itbis}", "description": "ITBIS"},
            {"accountCode": "999001", "type": "debit", "amount": "5.00", "description": "Propina"},
            {"accountCode": "999002", "type": "credit", "amount": "5.00", "description": "Propina"}
        ],
        "createdBy": "admin"
    }"#;
    let template = AutoJournalTemplate::from_json(json).unwrap();
    assert!(ledger.templates().register_template(template).await.unwrap());

    let posting = ledger
        .post_from_event(
            COMPANY,
            "pos_sale_tip",
            &cash_sale("0100", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await
        .unwrap();

    assert_eq!(posting.entry.lines.len(), 3);
    assert_eq!(posting.skipped_lines.len(), 2);
    for skipped in &posting.skipped_lines {
        assert!(matches!(
            skipped,
            LineResolution::Skipped {
                reason: SkipReason::AccountNotFound,
                ..
            }
        ));
    }
}

#[tokio::test]
async fn test_missing_account_that_unbalances_posts_nothing() {
    let (mut ledger, storage) = bootstrapped().await;
    let itbis = account_id(&storage, "221000").await;
    storage.remove_account_unchecked(itbis).unwrap();

    let result = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0043", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await;

    match result {
        Err(LedgerError::UnbalancedEntry {
            total_debit,
            total_credit,
        }) => {
            assert_eq!(total_debit, dec("118.00"));
            assert_eq!(total_credit, dec("100.00"));
        }
        other => panic!("expected UnbalancedEntry, got {:?}", other),
    }
    assert_eq!(storage.entry_count(COMPANY).unwrap(), 0);
    assert_eq!(balance_of(&storage, "111000").await, dec("0"));
    assert_eq!(balance_of(&storage, "411000").await, dec("0"));
}

#[tokio::test]
async fn test_only_debit_line_left_is_unbalanced() {
    let (mut ledger, storage) = bootstrapped().await;
    for code in ["411000", "221000"] {
        let id = account_id(&storage, code).await;
        storage.remove_account_unchecked(id).unwrap();
    }

    let result = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0044", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await;

    match result {
        Err(LedgerError::UnbalancedEntry {
            total_debit,
            total_credit,
        }) => {
            assert_eq!(total_debit, dec("118.00"));
            assert_eq!(total_credit, dec("0"));
        }
        other => panic!("expected UnbalancedEntry, got {:?}", other),
    }
    assert_eq!(storage.entry_count(COMPANY).unwrap(), 0);
    assert_eq!(balance_of(&storage, "111000").await, dec("0"));
}

#[tokio::test]
async fn test_rejected_entry_does_not_consume_a_number() {
    let (mut ledger, storage) = bootstrapped().await;
    let cash = account_id(&storage, "111000").await;
    let sales = account_id(&storage, "411000").await;

    let unknown = ledger
        .post_entry(
            COMPANY,
            "GJ",
            EntryHeader::new("Venta manual", date(2025, 2, 1), "user-1"),
            vec![
                JournalLineDraft::debit(cash, dec("10"), None),
                JournalLineDraft::credit(Uuid::new_v4(), dec("10"), None),
            ],
        )
        .await;
    assert!(matches!(unknown, Err(LedgerError::AccountNotFound(_))));

    let group = account_id(&storage, "110000").await;
    let to_group = ledger
        .post_entry(
            COMPANY,
            "GJ",
            EntryHeader::new("Venta manual", date(2025, 2, 1), "user-1"),
            vec![
                JournalLineDraft::debit(group, dec("10"), None),
                JournalLineDraft::credit(sales, dec("10"), None),
            ],
        )
        .await;
    assert!(matches!(to_group, Err(LedgerError::Validation(_))));

    let no_journal = ledger
        .post_entry(
            COMPANY,
            "XX",
            EntryHeader::new("Venta manual", date(2025, 2, 1), "user-1"),
            vec![
                JournalLineDraft::debit(cash, dec("10"), None),
                JournalLineDraft::credit(sales, dec("10"), None),
            ],
        )
        .await;
    assert!(matches!(no_journal, Err(LedgerError::JournalNotFound(_))));

    let posted = ledger
        .post_entry(
            COMPANY,
            "GJ",
            EntryHeader::new("Venta manual", date(2025, 2, 1), "user-1"),
            vec![
                JournalLineDraft::debit(cash, dec("10"), None),
                JournalLineDraft::credit(sales, dec("10"), None),
            ],
        )
        .await
        .unwrap();
    assert_eq!(posted.entry_number, "GJ-000001");
    assert_eq!(balance_of(&storage, "111000").await, dec("10.00"));
}

#[tokio::test]
async fn test_business_patterns_share_the_journal_counter() {
    let (mut ledger, storage) = bootstrapped().await;
    ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0001", "1180.00", "1000.00", "180.00"),
            "cashier",
        )
        .await
        .unwrap();

    let payment = ledger
        .post_payment(COMPANY, movement("211000", "300", "Proveedor ABC", date(2025, 3, 16)))
        .await
        .unwrap();
    assert_eq!(payment.entry_number, "PAY-000002");
    assert_eq!(payment.description, "Pago: Proveedor ABC");
    assert_eq!(payment.source_module, SourceModule::Payments);

    let expense = ledger
        .post_expense(COMPANY, movement("523000", "200", "Alquiler marzo", date(2025, 3, 17)))
        .await
        .unwrap();
    assert_eq!(expense.entry_number, "EXP-000003");
    assert_eq!(expense.description, "Gasto: Alquiler marzo");

    let collection = ledger
        .post_invoice_payment(
            COMPANY,
            InvoiceCollection {
                invoice_id: 15,
                amount: dec("500"),
                payment_method: "transferencia".into(),
                payment_account_code: "112000".into(),
                date: date(2025, 3, 18),
                created_by: "user-1".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(collection.entry_number, "INV-PAY-000004");
    assert_eq!(collection.source_id, Some(15));

    assert_eq!(balance_of(&storage, "111000").await, dec("680.00"));
    assert_eq!(balance_of(&storage, "211000").await, dec("-300.00"));
    assert_eq!(balance_of(&storage, "523000").await, dec("200.00"));
    assert_eq!(balance_of(&storage, "112000").await, dec("500.00"));
    assert_eq!(balance_of(&storage, "121000").await, dec("-500.00"));
}

#[tokio::test]
async fn test_ncf_last_number_then_exhausted() {
    let (mut ledger, _storage) = bootstrapped().await;
    ledger
        .register_ncf_sequence(
            COMPANY,
            NewNcfSequence {
                ncf_type: NcfType::B02,
                series: None,
                description: Some("Consumidor final".into()),
                range_start: 1,
                range_end: 1000,
                current_number: Some(1000),
                expiration_date: None,
            },
        )
        .await
        .unwrap();

    let allocation = ledger
        .ncf()
        .allocate_next_as_of(COMPANY, NcfType::B02, date(2025, 3, 1))
        .await
        .unwrap();
    assert_eq!(allocation.ncf, "B0200000001000");
    assert_eq!(allocation.remaining, 0);
    assert!(allocation.running_low);
    assert!(fiscal_ledger::validate_format(&allocation.ncf, NcfType::B02));

    let err = ledger
        .ncf()
        .allocate_next_as_of(COMPANY, NcfType::B02, date(2025, 3, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::SequenceExhausted {
            ncf_type: NcfType::B02,
            max_sequence: 1000
        }
    ));

    let sequences = ledger.ncf().list_sequences(COMPANY).await.unwrap();
    assert_eq!(sequences[0].current_sequence, 1001);

    let missing = ledger
        .ncf()
        .allocate_next_as_of(COMPANY, NcfType::B01, date(2025, 3, 1))
        .await
        .unwrap_err();
    assert!(matches!(missing, LedgerError::SequenceNotFound(NcfType::B01)));
}

#[tokio::test]
async fn test_expired_ncf_sequence() {
    let storage = MemoryStorage::new();
    let mut allocator = NcfAllocator::new(storage, &LedgerConfig::default());
    allocator
        .register_sequence(
            COMPANY,
            NewNcfSequence {
                ncf_type: NcfType::B01,
                series: None,
                description: None,
                range_start: 1,
                range_end: 100,
                current_number: None,
                expiration_date: Some(date(2025, 12, 31)),
            },
        )
        .await
        .unwrap();

    let first = allocator
        .allocate_next_as_of(COMPANY, NcfType::B01, date(2025, 12, 31))
        .await
        .unwrap();
    assert_eq!(first.ncf, "B0100000000001");

    let err = allocator
        .allocate_next_as_of(COMPANY, NcfType::B01, date(2026, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SequenceExpired { .. }));

    let usage = allocator.usage(COMPANY, date(2026, 1, 1)).await.unwrap();
    assert_eq!(usage[0].issued, 1);
    assert!(usage[0].expired);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ncf_allocations_are_unique() {
    let storage = MemoryStorage::new();
    let config = LedgerConfig::default();
    let mut allocator = NcfAllocator::new(storage.clone(), &config);
    allocator
        .register_sequence(
            COMPANY,
            NewNcfSequence {
                ncf_type: NcfType::B01,
                series: None,
                description: None,
                range_start: 1,
                range_end: 400,
                current_number: None,
                expiration_date: None,
            },
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..40 {
        let mut worker = NcfAllocator::new(storage.clone(), &config);
        handles.push(tokio::spawn(async move {
            let mut issued = Vec::new();
            for _ in 0..10 {
                let allocation = worker
                    .allocate_next_as_of(COMPANY, NcfType::B01, date(2025, 1, 1))
                    .await
                    .unwrap();
                issued.push(allocation.ncf);
            }
            issued
        }));
    }

    let mut all = HashSet::new();
    for handle in handles {
        let issued = handle.await.unwrap();
        assert!(issued.windows(2).all(|pair| pair[0] < pair[1]), "numbers went backwards");
        for ncf in issued {
            assert!(all.insert(ncf), "duplicate NCF issued");
        }
    }
    assert_eq!(all.len(), 400);
    assert!(all.contains("B0100000000001"));
    assert!(all.contains("B0100000000400"));

    let err = allocator
        .allocate_next_as_of(COMPANY, NcfType::B01, date(2025, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::SequenceExhausted { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_postings_get_consecutive_numbers() {
    let (_ledger, storage) = bootstrapped().await;
    let cash = account_id(&storage, "111000").await;
    let sales = account_id(&storage, "411000").await;
    let config = LedgerConfig::default();

    let mut handles = Vec::new();
    for task in 0..20 {
        let mut poster = JournalPoster::new(storage.clone(), &config);
        handles.push(tokio::spawn(async move {
            let mut numbers = Vec::new();
            for i in 0..5 {
                let entry = poster
                    .post(
                        COMPANY,
                        "GJ",
                        EntryHeader::new(format!("Venta {}-{}", task, i), date(2025, 4, 1), "user"),
                        vec![
                            JournalLineDraft::debit(cash, dec("1.00"), None),
                            JournalLineDraft::credit(sales, dec("1.00"), None),
                        ],
                    )
                    .await
                    .unwrap();
                numbers.push(entry.entry_number);
            }
            numbers
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        numbers.extend(handle.await.unwrap());
    }
    let expected: HashSet<String> = (1..=100).map(|n| format!("GJ-{:06}", n)).collect();
    assert_eq!(numbers, expected);
    assert_eq!(balance_of(&storage, "111000").await, dec("100.00"));
}

#[tokio::test]
async fn test_bootstrap_twice_changes_nothing() {
    let (mut ledger, storage) = bootstrapped().await;
    let before = storage.list_accounts(COMPANY, None).await.unwrap();

    let report = ledger
        .accounts()
        .initialize_chart_of_accounts_for_year(COMPANY, "admin", 2025)
        .await
        .unwrap();
    assert!(report.is_noop());

    let after = storage.list_accounts(COMPANY, None).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(storage.list_account_types().await.unwrap().len(), 5);
    assert_eq!(storage.list_fiscal_periods(COMPANY).await.unwrap().len(), 1);

    let other = ledger
        .accounts()
        .initialize_chart_of_accounts_for_year(2, "admin", 2025)
        .await
        .unwrap();
    assert_eq!(other.account_types_created, 0);
    assert_eq!(other.accounts_created, after.len());
}

#[tokio::test]
async fn test_reports_on_empty_books() {
    let ledger = Ledger::new(MemoryStorage::new());
    let as_of = date(2025, 12, 31);

    let trial = ledger.trial_balance(COMPANY, as_of).await.unwrap();
    assert!(trial.accounts.is_empty());
    assert!(trial.totals.is_balanced);

    let income = ledger
        .income_statement(COMPANY, date(2025, 1, 1), as_of)
        .await
        .unwrap();
    assert_eq!(income.net_income, dec("0"));

    let sheet = ledger.balance_sheet(COMPANY, as_of).await.unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.total_assets, dec("0"));

    let ledger_report = ledger
        .general_ledger(COMPANY, Uuid::new_v4(), None, None)
        .await;
    assert!(matches!(ledger_report, Err(LedgerError::AccountNotFound(_))));
}

#[tokio::test]
async fn test_reports_after_a_day_of_business() {
    let (mut ledger, storage) = bootstrapped().await;
    let cash = account_id(&storage, "111000").await;
    let capital = account_id(&storage, "311000").await;

    ledger
        .post_entry(
            COMPANY,
            "GJ",
            EntryHeader::new("Aporte de capital", date(2025, 3, 1), "owner"),
            vec![
                JournalLineDraft::debit(cash, dec("10000"), None),
                JournalLineDraft::credit(capital, dec("10000"), None),
            ],
        )
        .await
        .unwrap();
    ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0001", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await
        .unwrap();
    ledger
        .post_expense(COMPANY, movement("524000", "40", "Luz", date(2025, 3, 20)))
        .await
        .unwrap();

    let trial = ledger.trial_balance(COMPANY, date(2025, 3, 31)).await.unwrap();
    assert!(trial.totals.is_balanced);
    assert_eq!(trial.totals.total_debits, dec("10118.00"));
    assert!(trial.accounts.iter().all(|row| row.account_code != "110000"));

    let income = ledger
        .income_statement(COMPANY, date(2025, 3, 1), date(2025, 3, 31))
        .await
        .unwrap();
    assert_eq!(income.total_revenues, dec("100.00"));
    assert_eq!(income.total_expenses, dec("40.00"));
    assert_eq!(income.net_income, dec("60.00"));

    let sheet = ledger.balance_sheet(COMPANY, date(2025, 3, 31)).await.unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.total_assets, dec("10078.00"));
    assert_eq!(sheet.total_liabilities, dec("18.00"));
    assert_eq!(sheet.current_earnings, dec("60.00"));
    assert_eq!(sheet.total_assets, &sheet.total_liabilities + &sheet.total_equity);

    let before_sale = ledger.balance_sheet(COMPANY, date(2025, 3, 10)).await.unwrap();
    assert_eq!(before_sale.total_assets, dec("10000.00"));

    let general = ledger
        .general_ledger(COMPANY, cash, None, None)
        .await
        .unwrap();
    let running: Vec<BigDecimal> =
        general.lines.iter().map(|l| l.running_balance.clone()).collect();
    assert_eq!(running, vec![dec("10000.00"), dec("10118.00"), dec("10078.00")]);
    assert_eq!(general.closing_balance, dec("10078.00"));

    let march_second_half = ledger
        .general_ledger(COMPANY, cash, Some(date(2025, 3, 15)), Some(date(2025, 3, 31)))
        .await
        .unwrap();
    assert_eq!(march_second_half.lines.len(), 1);
    assert_eq!(march_second_half.closing_balance, dec("-40.00"));

    let integrity = ledger.validate_integrity(COMPANY, date(2025, 3, 31)).await.unwrap();
    assert!(integrity.is_valid, "{:?}", integrity.issues);
}

#[tokio::test]
async fn test_reversal_restores_balances_once() {
    let (mut ledger, storage) = bootstrapped().await;
    let posting = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0009", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await
        .unwrap();

    let reversal = ledger
        .reverse_entry(COMPANY, posting.entry.id, date(2025, 3, 20), "supervisor")
        .await
        .unwrap();
    assert_eq!(reversal.reverses, Some(posting.entry.id));
    assert_eq!(reversal.entry_number, "GJ-000002");
    assert_eq!(reversal.reference.as_deref(), Some("GJ-000001"));
    assert_eq!(balance_of(&storage, "111000").await, dec("0.00"));
    assert_eq!(balance_of(&storage, "221000").await, dec("0.00"));

    let again = ledger
        .reverse_entry(COMPANY, posting.entry.id, date(2025, 3, 21), "supervisor")
        .await;
    assert!(matches!(again, Err(LedgerError::Validation(_))));

    let original = ledger.get_entry(COMPANY, posting.entry.id).await.unwrap().unwrap();
    assert_eq!(original, posting.entry);
}

#[tokio::test]
async fn test_fiscal_periods_gate_postings() {
    let (mut ledger, storage) = bootstrapped().await;
    let cash = account_id(&storage, "111000").await;
    let sales = account_id(&storage, "411000").await;
    let lines = || {
        vec![
            JournalLineDraft::debit(cash, dec("5"), None),
            JournalLineDraft::credit(sales, dec("5"), None),
        ]
    };

    let next_year = ledger
        .post_entry(COMPANY, "GJ", EntryHeader::new("Venta", date(2026, 1, 5), "user"), lines())
        .await;
    assert!(matches!(next_year, Err(LedgerError::OutsideFiscalPeriod(_))));

    let period = ledger
        .periods()
        .find_open_period(COMPANY, date(2025, 6, 1))
        .await
        .unwrap()
        .unwrap();
    ledger.periods().close_period(COMPANY, period.id).await.unwrap();

    let closed = ledger
        .post_entry(COMPANY, "GJ", EntryHeader::new("Venta", date(2025, 6, 1), "user"), lines())
        .await;
    assert!(matches!(closed, Err(LedgerError::OutsideFiscalPeriod(_))));

    let relaxed = LedgerConfig {
        enforce_fiscal_periods: false,
        ..LedgerConfig::default()
    };
    let mut relaxed_ledger = Ledger::with_config(storage.clone(), relaxed);
    relaxed_ledger
        .post_entry(COMPANY, "GJ", EntryHeader::new("Venta", date(2026, 1, 5), "user"), lines())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_template_lifecycle() {
    let (mut ledger, _storage) = bootstrapped().await;

    let template = ledger
        .templates()
        .deactivate_template(COMPANY, POS_SALE_CASH)
        .await
        .unwrap();
    assert!(!template.is_active);

    let missing = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0001", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await;
    assert!(matches!(missing, Err(LedgerError::TemplateNotFound(_))));

    let mut replacement = template.clone();
    replacement.id = Uuid::new_v4();
    replacement.is_active = true;
    replacement.lines[0].account_code = "113000".into();
    assert!(ledger.templates().register_template(replacement).await.unwrap());

    let posting = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0002", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await
        .unwrap();
    assert_eq!(posting.entry.lines[0].account_code, "113000");
}

#[tokio::test]
async fn test_unknown_placeholder_in_stored_template_fails_event() {
    let (mut ledger, mut storage) = bootstrapped().await;
    let mut template = ledger
        .templates()
        .deactivate_template(COMPANY, POS_SALE_CASH)
        .await
        .unwrap();
    template.id = Uuid::new_v4();
    template.is_active = true;
    template.lines[2].amount = "${propina}".into();
    storage.save_template_if_absent(&template).await.unwrap();

    let result = ledger
        .post_from_event(
            COMPANY,
            POS_SALE_CASH,
            &cash_sale("0003", "118.00", "100.00", "18.00"),
            "cashier",
        )
        .await;
    assert!(matches!(result, Err(LedgerError::UnknownPlaceholder(_))));
    assert_eq!(storage.entry_count(COMPANY).unwrap(), 0);
}
