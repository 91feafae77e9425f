use std::{collections::BTreeMap, fs, path::Path};

use engine::{Engine, EngineError, Money, Stage, StageStatus};
use tempfile::TempDir;

fn ledger_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

fn engine_for(source: &Path, output: &Path) -> Engine {
    Engine::builder().source_dir(source).output_dir(output).build()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn statement_end_to_end() {
    let source = ledger_dir(&[
        ("j1.csv", "2024-03-01,Sales Revenue,,0,500"),
        ("j2.csv", "2024-03-02,Rent Expense,,200,0"),
    ]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let summary = engine.run_all().await.unwrap();

    let text = read(&out.path().join("fs.csv"));
    assert_eq!(text, summary.statement.text);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.contains(&"Sales Revenue,500.00"));
    assert!(lines.contains(&"Rent Expense,200.00"));
    assert!(lines.contains(&"Net Income,300.00"));
    assert!(lines.contains(&"Retained Earnings (Net Income),300.00"));
    assert!(lines.contains(&"Total Equity,300.00"));
    assert_eq!(summary.statement.totals.net_income, Money::from(300));
}

#[tokio::test]
async fn yearly_cash_flow_nets_debits_and_credits() {
    let source = ledger_dir(&[
        ("a.csv", "2023-01-01,Cash,,100,0\n2022-12-31,Cash,,10,0"),
        ("b.csv", "2023-06-01,Cash,,0,30\n2023-06-01,Inventory,,30,0\nlater,Cash,,1,0"),
    ]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let summary = engine.run_all().await.unwrap();

    assert_eq!(summary.yearly.cash_by_year["2023"], Money::from(70));
    assert_eq!(
        read(&out.path().join("yearly.csv")),
        "Financial Year,Cash Balance\n2022,10.00\n2023,70.00\nNaN,1.00"
    );
}

#[tokio::test]
async fn accounts_report_lists_every_account() {
    let source = ledger_dir(&[
        ("a.csv", "2024-01-01,Cash,opening,1000,0\n2024-01-02,Common Stock,,0,1000"),
        ("b.csv", "2024-02-01,Inventory,,250.5,0\n2024-02-01,Cash,,0,250.5\nstray"),
    ]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let summary = engine.run_all().await.unwrap();

    assert_eq!(
        read(&out.path().join("accounts.csv")),
        "Account,Balance\nCash,749.50\nCommon Stock,-1000.00\nInventory,250.50"
    );
    assert_eq!(summary.accounts.balances.len(), 3);
}

#[tokio::test]
async fn files_without_csv_suffix_are_ignored() {
    let source = ledger_dir(&[
        ("a.csv", "2024-01-01,Cash,,10,0"),
        ("notes.txt", "2024-01-01,Cash,,1000,0"),
        ("LOUD.CSV", "2024-01-01,Cash,,1000,0"),
        ("backup.csv.bak", "2024-01-01,Cash,,1000,0"),
    ]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let summary = engine.run_all().await.unwrap();

    assert_eq!(summary.accounts.balances.get("Cash"), Some(Money::from(10)));
    assert_eq!(summary.yearly.cash_by_year["2024"], Money::from(10));
    assert_eq!(summary.statement.balances.get("Cash"), Some(Money::from(10)));
}

#[tokio::test]
async fn balances_do_not_depend_on_file_order() {
    let rows = [
        "2024-01-01,Cash,,100,0",
        "2024-01-02,Rent Expense,,40,0",
        "2024-01-02,Cash,,0,40",
        "2024-01-03,Sales Revenue,,0,75.25",
        "2024-01-03,Cash,,75.25,0",
        "2024-01-04,Inventory,,12.125,0",
        "2024-01-04,Cash,,0,12.125",
    ];

    let mut tables = Vec::new();
    for names in [["a.csv", "b.csv", "c.csv"], ["c.csv", "a.csv", "b.csv"], ["b.csv", "c.csv", "a.csv"]] {
        let source = tempfile::tempdir().unwrap();
        for (i, row) in rows.iter().enumerate() {
            let path = source.path().join(names[i % names.len()]);
            let mut contents = fs::read_to_string(&path).unwrap_or_default();
            contents.push_str(row);
            contents.push('\n');
            fs::write(path, contents).unwrap();
        }
        let out = tempfile::tempdir().unwrap();
        let summary = engine_for(source.path(), out.path()).run_all().await.unwrap();
        let table: BTreeMap<String, Money> = summary
            .accounts
            .balances
            .iter()
            .map(|(account, amount)| (account.to_string(), amount))
            .collect();
        tables.push(table);
    }

    assert_eq!(tables[0], tables[1]);
    assert_eq!(tables[1], tables[2]);
    assert_eq!(tables[0]["Cash"], Money::new(123125, 3));
}

#[tokio::test]
async fn missing_source_directory_fails_the_run() {
    let root = tempfile::tempdir().unwrap();
    let engine = engine_for(&root.path().join("missing"), &root.path().join("out"));

    let err = engine.run_all().await.unwrap_err();
    assert!(matches!(err, EngineError::ReadDir { .. }));

    for stage in Stage::ALL {
        assert_eq!(engine.stage_state(stage).await, StageStatus::Error);
    }
    let record = engine.error_record().await.unwrap();
    assert!(record.message.starts_with("Error: failed to list ledger directory"));
    assert!(!record.timestamp.is_empty());
    assert!(!record.stack.is_empty());
    assert!(!root.path().join("out").join("accounts.csv").exists());
}

#[tokio::test]
async fn failure_after_first_stage_keeps_its_report() {
    let source = ledger_dir(&[("a.csv", "2024-01-01,Cash,,10,0")]);
    let out = tempfile::tempdir().unwrap();
    // A directory where the yearly report should go makes that stage fail.
    fs::create_dir(out.path().join("yearly.csv")).unwrap();
    let engine = engine_for(source.path(), out.path());

    let err = engine.run_all().await.unwrap_err();
    assert!(matches!(err, EngineError::WriteReport { .. }));

    let state = engine.state().await;
    for stage in Stage::ALL {
        assert_eq!(state.stage(stage), StageStatus::Error);
    }
    assert!(state.error().unwrap().message.starts_with("Error: failed to write report"));
    assert_eq!(read(&out.path().join("accounts.csv")), "Account,Balance\nCash,10.00");
    assert!(!out.path().join("fs.csv").exists());
}

#[tokio::test]
async fn balance_overflow_across_ledgers_fails_the_run() {
    let row = "2024-01-01,Cash,,50000000000000000000000000000,0";
    let source = ledger_dir(&[("a.csv", row), ("b.csv", row)]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let err = engine.run_all().await.unwrap_err();
    assert_eq!(err, EngineError::Overflow("Cash".to_string()));

    for stage in Stage::ALL {
        assert_eq!(engine.stage_state(stage).await, StageStatus::Error);
    }
    let record = engine.error_record().await.unwrap();
    assert_eq!(record.message, "Error: balance of \"Cash\" overflowed");
    assert!(!out.path().join("accounts.csv").exists());
}

#[tokio::test]
async fn balance_overflow_within_one_ledger_fails_the_run() {
    let row = "2024-01-01,Cash,,50000000000000000000000000000,0";
    let contents = format!("{row}\n{row}");
    let source = ledger_dir(&[("a.csv", contents.as_str())]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let err = engine.run_all().await.unwrap_err();
    assert_eq!(err, EngineError::Overflow("Cash".to_string()));
    assert_eq!(engine.stage_state(Stage::Accounts).await, StageStatus::Error);
}

#[tokio::test]
async fn out_of_range_amount_fails_the_run() {
    let source = ledger_dir(&[("a.csv", "2024-01-01,Cash,,1e40,0")]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let err = engine.run_all().await.unwrap_err();
    assert_eq!(err, EngineError::AmountOutOfRange("1e40".to_string()));
    let record = engine.error_record().await.unwrap();
    assert_eq!(record.message, "Error: amount \"1e40\" is out of range");
}

#[tokio::test]
async fn successful_run_clears_previous_error() {
    let root = tempfile::tempdir().unwrap();
    let source = root.path().join("ledgers");
    let engine = engine_for(&source, &root.path().join("out"));

    assert!(engine.run_all().await.is_err());
    assert!(engine.error_record().await.is_some());

    fs::create_dir(&source).unwrap();
    fs::write(source.join("a.csv"), "2024-01-01,Cash,,10,0").unwrap();
    engine.run_all().await.unwrap();

    assert!(engine.error_record().await.is_none());
    for stage in Stage::ALL {
        let status = engine.stage_state(stage).await;
        assert!(matches!(status, StageStatus::Finished(_)));
        let shown = status.to_string();
        assert!(shown.starts_with("finished in "), "{shown}");
        assert!(shown.ends_with('s'), "{shown}");
    }
}

#[tokio::test]
async fn fresh_engine_is_idle() {
    let engine = Engine::builder().build();
    for stage in Stage::ALL {
        assert_eq!(engine.stage_state(stage).await, StageStatus::Idle);
    }
    assert!(engine.error_record().await.is_none());
}

#[tokio::test]
async fn each_ledger_is_read_once_per_run() {
    let source = ledger_dir(&[
        ("a.csv", "2024-01-01,Cash,,10,0"),
        ("b.csv", "2024-01-01,Cash,,5,0"),
    ]);
    let out = tempfile::tempdir().unwrap();
    let engine = engine_for(source.path(), out.path());

    let summary = engine.run_all().await.unwrap();
    assert_eq!(summary.cache.misses, 2);
    assert_eq!(summary.cache.hits, 4);

    // A new run gets a new cache and sees the edited ledger.
    fs::write(source.path().join("b.csv"), "2024-01-01,Cash,,50,0").unwrap();
    let summary = engine.run_all().await.unwrap();
    assert_eq!(summary.accounts.balances.get("Cash"), Some(Money::from(60)));
    assert_eq!(summary.cache.misses, 2);
}

#[tokio::test]
async fn reports_written_next_to_ledgers_do_not_feed_back() {
    let dir = ledger_dir(&[
        ("j1.csv", "2024-03-01,Sales Revenue,,0,500\n2024-03-01,Cash,,500,0"),
        ("j2.csv", "2024-03-02,Rent Expense,,200,0\n2024-03-02,Cash,,0,200"),
    ]);
    let engine = engine_for(dir.path(), dir.path());

    let first = engine.run_all().await.unwrap();
    let second = engine.run_all().await.unwrap();

    assert_eq!(first.yearly.cash_by_year, second.yearly.cash_by_year);
    assert_eq!(first.statement.text, second.statement.text);
    assert!(
        second
            .statement
            .text
            .ends_with("Assets = Liabilities + Equity, 300.00 = 300.00")
    );
}

#[tokio::test]
async fn custom_taxonomy_drives_the_statement() {
    let mut taxonomy = engine::Taxonomy::default();
    taxonomy.income_statement.revenues.accounts = vec!["Consulting Revenue".to_string()];
    let source = ledger_dir(&[(
        "a.csv",
        "2024-01-01,Consulting Revenue,,0,900\n2024-01-01,Sales Revenue,,0,100",
    )]);
    let out = tempfile::tempdir().unwrap();
    let engine = Engine::builder()
        .source_dir(source.path())
        .output_dir(out.path())
        .taxonomy(taxonomy)
        .build();

    let summary = engine.run_all().await.unwrap();
    let text = &summary.statement.text;
    assert!(text.contains("\nConsulting Revenue,900.00\n"));
    assert!(!text.contains("Sales Revenue"));
    assert_eq!(summary.statement.totals.revenue, Money::from(900));
}
