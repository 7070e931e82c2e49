//! Rebuild and query behaviour of the invoice index

mod common;

use chrono::NaiveDate;
use common::{invoice, reference_invoices, Fixture};
use invoice_vault::crypto::Key;
use invoice_vault::search::*;
use invoice_vault::store::EncryptedDocumentStore;
use std::sync::atomic::AtomicBool;

fn date(raw: &str) -> NaiveDate {
    parse_query_date(raw).unwrap()
}

/// Reference workspace sealed and indexed
fn indexed_fixture() -> (Fixture, QueryEngine) {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    let engine = QueryEngine::new(fixture.search_config()).unwrap();
    let report = engine
        .index_manager()
        .rebuild(&fixture.store, &fixture.key, None)
        .unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped, 0);
    (fixture, engine)
}

fn numbers(response: &SearchResponse) -> Vec<&str> {
    response.entries.iter().map(|hit| hit.number.as_str()).collect()
}

fn count(engine: &QueryEngine, query: &InvoiceQuery) -> usize {
    engine.search(query).unwrap().total_hits
}

#[test]
fn test_date_range_scenario() {
    let (_fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new().with_date_range(Some(date("2016-01-01")), Some(date("2016-12-31")));

    let response = engine.search(&query).unwrap();
    assert_eq!(numbers(&response), vec!["0000002", "0000001"]);
    assert_eq!(response.total_hits, 2);
    assert_eq!(response.total_amount, 600.0);
}

#[test]
fn test_amount_scenario() {
    let (_fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new().with_amount_range(Some(1000.0), None);

    let response = engine.search(&query).unwrap();
    assert_eq!(numbers(&response), vec!["0000003"]);
    assert_eq!(response.entries[0].amount, 2000.0);
    assert_eq!(response.entries[0].customer, "Brauerei Hecht");
}

#[test]
fn test_unconstrained_query_returns_everything_newest_first() {
    let (_fixture, engine) = indexed_fixture();
    let response = engine.search(&InvoiceQuery::new()).unwrap();

    assert_eq!(numbers(&response), vec!["0000003", "0000002", "0000001"]);
    assert_eq!(response.total_amount, 2600.0);
    assert_eq!(
        response.entries[0].date.date_naive(),
        NaiveDate::from_ymd_opt(2017, 1, 5).unwrap()
    );
}

#[test]
fn test_range_bounds_are_inclusive() {
    let (_fixture, engine) = indexed_fixture();

    let day = InvoiceQuery::new().with_date_range(Some(date("2016-09-01")), Some(date("2016-09-01")));
    assert_eq!(numbers(&engine.search(&day).unwrap()), vec!["0000002"]);

    let amount = InvoiceQuery::new().with_amount_range(Some(500.0), Some(500.0));
    assert_eq!(numbers(&engine.search(&amount).unwrap()), vec!["0000002"]);
}

#[test]
fn test_fuzzy_customer_match() {
    let (_fixture, engine) = indexed_fixture();
    let response = engine
        .search(&InvoiceQuery::new().with_customer("brauerei hekt"))
        .unwrap();
    assert_eq!(numbers(&response), vec!["0000003", "0000001"]);
}

#[test]
fn test_free_text_match() {
    let (_fixture, engine) = indexed_fixture();

    let web = engine.search(&InvoiceQuery::new().with_text("Web")).unwrap();
    assert_eq!(numbers(&web), vec!["0000003", "0000001"]);

    let typo = engine.search(&InvoiceQuery::new().with_text("maintenanse")).unwrap();
    assert_eq!(numbers(&typo), vec!["0000002"]);
}

#[test]
fn test_free_text_tolerates_three_edits() {
    let (_fixture, engine) = indexed_fixture();
    let response = engine.search(&InvoiceQuery::new().with_text("devlpmnt")).unwrap();
    assert_eq!(numbers(&response), vec!["0000001"]);
}

#[test]
fn test_customer_fuzziness_stays_narrow() {
    let (_fixture, engine) = indexed_fixture();
    // three edits away from "hecht"
    assert_eq!(count(&engine, &InvoiceQuery::new().with_customer("hkt")), 0);
}

#[test]
fn test_dimensions_are_combined_with_and() {
    let (_fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new()
        .with_customer("hecht")
        .with_date_range(Some(date("2016-01-01")), Some(date("2016-12-31")));
    assert_eq!(numbers(&engine.search(&query).unwrap()), vec!["0000001"]);
}

#[test]
fn test_results_are_capped_at_page_size() {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    let config = SearchConfigBuilder::new()
        .index_path(fixture.index_path())
        .page_size(2)
        .build();
    let engine = QueryEngine::new(config).unwrap();
    engine
        .index_manager()
        .rebuild(&fixture.store, &fixture.key, None)
        .unwrap();

    let response = engine.search(&InvoiceQuery::new()).unwrap();
    assert_eq!(numbers(&response), vec!["0000003", "0000002"]);
    assert_eq!(response.total_hits, 3);
    // only the returned page is summed
    assert_eq!(response.total_amount, 2500.0);
}

#[test]
fn test_widening_ranges_never_loses_hits() {
    let (_fixture, engine) = indexed_fixture();

    let mut previous = 0;
    for lower in [3000.0, 2000.0, 1000.0, 500.0, 0.0] {
        let hits = count(&engine, &InvoiceQuery::new().with_amount_range(Some(lower), None));
        assert!(hits >= previous);
        previous = hits;
    }
    assert_eq!(previous, 3);

    let mut previous = 0;
    for from in ["2017-06-01", "2017-01-01", "2016-07-01", "2016-01-01"] {
        let query = InvoiceQuery::new().with_date_range(Some(date(from)), Some(date("2017-12-31")));
        let hits = count(&engine, &query);
        assert!(hits >= previous);
        previous = hits;
    }
    assert_eq!(previous, 3);
}

#[test]
fn test_last_months_shorthand() {
    let (_fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new()
        .with_date_range(Some(date("2000-01-01")), Some(date("2000-01-02")))
        .last_months(6, date("2017-01-31"));
    assert_eq!(numbers(&engine.search(&query).unwrap()), vec!["0000003", "0000002"]);
}

#[test]
fn test_rebuild_skips_undecryptable_documents() {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    let other = Key::derive("rotated password").unwrap();
    fixture
        .store
        .seal(&invoice("0000004", "Acme", "2017-02-01", 10.0, "Hosting"), &other)
        .unwrap();

    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();
    let report = manager.rebuild(&fixture.store, &fixture.key, None).unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_rebuild_skips_unparseable_dates() {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    let mut broken = invoice("0000004", "Acme", "01.02.2017", 10.0, "Hosting");
    broken.settings.date_format = "%y-%m-%d".into();
    fixture.seal(&broken);

    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();
    let report = manager.rebuild(&fixture.store, &fixture.key, None).unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_rebuild_reads_legacy_descriptors() {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    fixture.write_legacy();

    let engine = QueryEngine::new(fixture.search_config()).unwrap();
    let report = engine
        .index_manager()
        .rebuild(&fixture.store, &fixture.key, None)
        .unwrap();
    assert_eq!(report.documents, 4);
    assert_eq!(report.skipped, 0);

    let response = engine
        .search(&InvoiceQuery::new().with_date_range(Some(date("2016-10-10")), Some(date("2016-10-10"))))
        .unwrap();
    assert_eq!(numbers(&response), vec!["0000009"]);
    assert_eq!(response.total_amount, 90.0);
}

#[test]
fn test_rebuild_commits_across_batches() {
    let fixture = Fixture::new();
    for n in 1..=7 {
        let day = format!("2016-03-{:02}", n);
        fixture.seal(&invoice(&format!("{:07}", n), "Acme", &day, n as f64, "Support"));
    }
    let config = SearchConfigBuilder::new()
        .index_path(fixture.index_path())
        .batch_size(3)
        .build();
    let manager = SearchIndexManager::new(config).unwrap();
    let report = manager.rebuild(&fixture.store, &fixture.key, None).unwrap();
    assert_eq!(report.documents, 7);
}

#[test]
fn test_rebuild_is_idempotent() {
    let (fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new().with_text("web");
    let before = engine.search(&query).unwrap();

    let report = engine
        .index_manager()
        .rebuild(&fixture.store, &fixture.key, None)
        .unwrap();
    assert_eq!(report.documents, 3);

    let after = engine.search(&query).unwrap();
    assert_eq!(before.entries, after.entries);
    assert_eq!(engine.index_manager().stats().unwrap().total_documents, 3);
}

#[test]
fn test_rebuild_depends_only_on_workspace_contents() {
    let (fixture, engine) = indexed_fixture();

    let copy = EncryptedDocumentStore::new(fixture.dir.path().join("copy"));
    std::fs::create_dir_all(copy.workspace()).unwrap();
    for path in fixture.store.list().unwrap() {
        std::fs::copy(&path, copy.workspace().join(path.file_name().unwrap())).unwrap();
    }

    let config = SearchConfigBuilder::new()
        .index_path(fixture.dir.path().join("copy-index"))
        .build();
    let copy_engine = QueryEngine::new(config).unwrap();
    copy_engine
        .index_manager()
        .rebuild(&copy, &fixture.key, None)
        .unwrap();

    let all = InvoiceQuery::new();
    assert_eq!(
        engine.search(&all).unwrap().entries,
        copy_engine.search(&all).unwrap().entries
    );
}

#[test]
fn test_rebuild_keeps_index_when_workspace_is_missing() {
    let (fixture, engine) = indexed_fixture();
    let missing = EncryptedDocumentStore::new(fixture.dir.path().join("absent"));

    let err = engine
        .index_manager()
        .rebuild(&missing, &fixture.key, None)
        .unwrap_err();
    assert!(matches!(err, SearchError::Workspace(_)));
    assert_eq!(engine.index_manager().state(), IndexState::Ready);
    assert_eq!(count(&engine, &InvoiceQuery::new()), 3);
}

#[test]
fn test_cancelled_rebuild() {
    let fixture = Fixture::new();
    for invoice in reference_invoices() {
        fixture.seal(&invoice);
    }
    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();
    let cancel = AtomicBool::new(true);

    let err = manager
        .rebuild(&fixture.store, &fixture.key, Some(&cancel))
        .unwrap_err();
    assert!(matches!(err, SearchError::Cancelled { indexed: 0 }));
    assert_eq!(manager.state(), IndexState::Building);

    // a partial index is still searchable
    let engine = QueryEngine::with_manager(manager);
    assert_eq!(count(&engine, &InvoiceQuery::new()), 0);

    // running again recovers
    let report = engine
        .index_manager()
        .rebuild(&fixture.store, &fixture.key, None)
        .unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(engine.index_manager().state(), IndexState::Ready);
    assert_eq!(count(&engine, &InvoiceQuery::new()), 3);
}

#[test]
fn test_add_replaces_same_number() {
    let (_fixture, engine) = indexed_fixture();
    let manager = engine.index_manager();

    manager
        .add(&invoice("0000002", "Acme Corporation", "2016-09-01", 700.0, "Server maintenance"))
        .unwrap();
    manager
        .add(&invoice("0000004", "Globex", "2017-03-01", 50.0, "Hosting"))
        .unwrap();

    let response = engine.search(&InvoiceQuery::new()).unwrap();
    assert_eq!(numbers(&response), vec!["0000004", "0000003", "0000002", "0000001"]);
    assert_eq!(response.entries[2].amount, 700.0);
}

#[test]
fn test_add_requires_existing_index() {
    let fixture = Fixture::new();
    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();
    let err = manager
        .add(&invoice("0000001", "Acme", "2016-06-27", 1.0, "x"))
        .unwrap_err();
    assert!(matches!(err, SearchError::IndexMissing(_)));
    assert!(err.to_string().contains("invoice-vault index"));

    manager.ensure_exists().unwrap();
    manager
        .add(&invoice("0000001", "Acme", "2016-06-27", 1.0, "x"))
        .unwrap();
    assert_eq!(manager.stats().unwrap().total_documents, 1);
}

#[test]
fn test_seal_rejects_bad_date_before_writing() {
    let fixture = Fixture::new();
    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();
    manager.ensure_exists().unwrap();

    let broken = invoice("0000004", "Acme", "01.02.2017", 10.0, "Hosting");
    let err = manager.seal(&fixture.store, &fixture.key, &broken).unwrap_err();
    assert!(matches!(err, SearchError::DateParse { .. }));
    assert!(!fixture.store.path_for("0000004").exists());
    assert_eq!(manager.stats().unwrap().total_documents, 0);
}

#[test]
fn test_seal_without_index_only_writes() {
    let fixture = Fixture::new();
    let manager = SearchIndexManager::new(fixture.search_config()).unwrap();

    let invoice = invoice("0000004", "Acme", "2017-02-01", 10.0, "Hosting");
    let report = manager.seal(&fixture.store, &fixture.key, &invoice).unwrap();
    assert!(!report.indexed);
    assert_eq!(report.path, fixture.store.path_for("0000004"));
    assert!(report.path.exists());
    assert_eq!(manager.state(), IndexState::Absent);
}

#[test]
fn test_seal_indexes_into_existing_index() {
    let (fixture, engine) = indexed_fixture();

    let hosting = invoice("0000004", "Globex", "2017-03-01", 50.0, "Hosting");
    let report = engine
        .index_manager()
        .seal(&fixture.store, &fixture.key, &hosting)
        .unwrap();
    assert!(report.indexed);
    assert!(report.path.exists());

    let response = engine.search(&InvoiceQuery::new().with_text("hosting")).unwrap();
    assert_eq!(numbers(&response), vec!["0000004"]);
}

#[test]
fn test_search_requires_built_index() {
    let fixture = Fixture::new();
    let engine = QueryEngine::new(fixture.search_config()).unwrap();
    let err = engine.search(&InvoiceQuery::new()).unwrap_err();
    assert!(matches!(err, SearchError::IndexNotFound(_)));
}

#[test]
fn test_invalid_query_is_rejected_before_execution() {
    let (_fixture, engine) = indexed_fixture();
    let query = InvoiceQuery::new().with_amount_range(Some(2000.0), Some(100.0));
    assert!(matches!(
        engine.search(&query),
        Err(SearchError::InvalidQuery(_))
    ));
}
