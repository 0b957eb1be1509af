//! Incremental update runs: ledger fallback, scripted harvests, and one
//! run against a local OAI-PMH server over HTTP.

mod common;

use axum::extract::Query;
use axum::http::header;
use axum::routing::get;
use axum::Router;
use chrono::{TimeZone, Utc};
use common::{counts, list_records_page, memory_store, no_records_match, paper, OaiRecord};
use paperweave::harvest::{HarvestError, HttpTransport, RetryPolicy, ScriptedTransport, DATE_FORMAT};
use paperweave::update::{UpdateOptions, WatermarkSource};
use paperweave::{GraphStore, OaiClient, UpdateError, UpdateLedger, UpsertEngine, Updater};
use std::collections::HashMap;
use std::time::Duration;

fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

fn bounded_options(max_failures: u32) -> UpdateOptions {
    UpdateOptions {
        retry: RetryPolicy::bounded(Duration::from_secs(60), max_failures),
        ..UpdateOptions::default()
    }
}

#[test]
fn watermark_falls_back_from_ledger_to_paper_dates_to_window() {
    let store = memory_store();
    let ledger = UpdateLedger::new(&store);
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

    let empty = ledger.last_update_timestamp(now).unwrap();
    assert_eq!(empty.source, WatermarkSource::Fallback);
    assert_eq!(empty.timestamp, Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap());

    let engine = UpsertEngine::new(&store, 10);
    engine.upsert_batch(&[
        paper("2401.00001", &["A B"], &[]).with_update_date(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
        paper("2401.00002", &["A B"], &[]).with_update_date(Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap()),
    ]);
    let dated = ledger.last_update_timestamp(now).unwrap();
    assert_eq!(dated.source, WatermarkSource::PaperDates);
    assert_eq!(dated.timestamp, Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap());

    let recorded = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
    ledger.record(recorded).unwrap();
    let marked = ledger.last_update_timestamp(now).unwrap();
    assert_eq!(marked.source, WatermarkSource::Ledger);
    assert_eq!(marked.timestamp, recorded);
}

#[tokio::test(start_paused = true)]
async fn update_applies_pages_and_advances_ledger() {
    let store = memory_store();
    UpsertEngine::new(&store, 10).upsert_batch(&[paper("1001.0002", &["Old Author"], &["cs.DL"])]);

    let transport = ScriptedTransport::new()
        .with_body(list_records_page(
            &[OaiRecord::active("1001.0001", "A", &["Jane Q. Doe"], &["cs"])],
            Some("token-1"),
        ))
        .with_body(list_records_page(&[OaiRecord::deleted("1001.0002")], None))
        .with_body(no_records_match());
    let client = OaiClient::new(transport);
    let updater = Updater::new(&store, &client, bounded_options(3));

    // The ledger keeps whole seconds
    let before = Utc::now() - chrono::Duration::seconds(1);
    let summary = updater.run_incremental_update().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.harvested, 2);
    assert_eq!(summary.pages, 2);

    assert!(store.has_paper("1001.0001").unwrap());
    assert!(!store.has_paper("1001.0002").unwrap());
    assert_eq!(store.authors_of("1001.0001").unwrap(), vec!["Jane Q. Doe"]);
    assert_eq!(store.categories_of("1001.0001").unwrap(), vec!["cs"]);

    let entry = store.load_ledger().unwrap().unwrap();
    assert_eq!(entry.update_count, 1);
    assert!(entry.last_update_time >= before);

    // The next run starts from the recorded run start; nothing new is fine.
    let second = updater.run_incremental_update().await.unwrap();
    assert_eq!(second.processed(), 0);
    assert_eq!(store.load_ledger().unwrap().unwrap().update_count, 2);

    let requests = client.transport().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(param(&requests[1], "resumptionToken"), Some("token-1"));
    assert_eq!(param(&requests[1], "from"), None);
    let expected_from = entry.last_update_time.date_naive().format(DATE_FORMAT).to_string();
    assert_eq!(param(&requests[2], "from"), Some(expected_from.as_str()));
    assert_eq!(param(&requests[2], "metadataPrefix"), Some("oai_dc"));
}

#[tokio::test(start_paused = true)]
async fn failed_harvest_leaves_ledger_untouched() {
    let store = memory_store();
    let busy = || HarvestError::Http {
        status: 503,
        body: "busy".to_string(),
    };
    let transport = ScriptedTransport::new()
        .with_body(list_records_page(
            &[OaiRecord::active("1001.0001", "A", &["Jane Q. Doe"], &[])],
            Some("token-1"),
        ))
        .with_failure(busy())
        .with_failure(busy());
    let client = OaiClient::new(transport);
    let updater = Updater::new(&store, &client, bounded_options(2));

    let err = updater.run_incremental_update().await.unwrap_err();
    assert!(matches!(
        err,
        UpdateError::Harvest(HarvestError::RetriesExhausted { attempts: 2, .. })
    ));

    // Pages already applied stay; the ledger does not move.
    assert!(store.has_paper("1001.0001").unwrap());
    assert!(store.load_ledger().unwrap().is_none());
    assert_eq!(
        updater.watermark().unwrap().source,
        WatermarkSource::PaperDates
    );
}

fn identify_body() -> String {
    "<?xml version=\"1.0\"?><OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\">\
     <Identify><repositoryName>Fixture Archive</repositoryName>\
     <protocolVersion>2.0</protocolVersion><granularity>YYYY-MM-DD</granularity></Identify></OAI-PMH>"
        .to_string()
}

async fn oai_endpoint(Query(params): Query<HashMap<String, String>>) -> ([(header::HeaderName, &'static str); 1], String) {
    let body = match (params.get("verb").map(String::as_str), params.get("resumptionToken")) {
        (Some("Identify"), _) => identify_body(),
        (Some("ListRecords"), None) => list_records_page(
            &[
                OaiRecord::active("2403.00001", "First", &["Ada Lovelace"], &["cs"]),
                OaiRecord::active("2403.00002", "Second", &["Alan Turing", "Ada Lovelace"], &["math"]),
            ],
            Some("page-2"),
        ),
        (Some("ListRecords"), Some(token)) if token == "page-2" => list_records_page(
            &[OaiRecord::active("2403.00003", "Third", &["Grace Hopper"], &["cs"])],
            None,
        ),
        _ => "<OAI-PMH xmlns=\"http://www.openarchives.org/OAI/2.0/\"><error code=\"badVerb\">Illegal verb</error></OAI-PMH>"
            .to_string(),
    };
    ([(header::CONTENT_TYPE, "text/xml")], body)
}

#[tokio::test]
async fn harvests_from_local_server_over_http() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, Router::new().route("/oai", get(oai_endpoint)))
            .with_graceful_shutdown(async {
                stopped.await.ok();
            })
            .await
            .unwrap();
    });

    let transport = HttpTransport::new(format!("http://{}/oai", addr), "tests@example.org").unwrap();
    let client = OaiClient::new(transport);

    let info = client.identify().await.unwrap();
    assert_eq!(info.get("repositoryName").map(String::as_str), Some("Fixture Archive"));

    let store = memory_store();
    let summary = Updater::new(&store, &client, bounded_options(1))
        .run_incremental_update()
        .await
        .unwrap();
    assert_eq!(summary.updated, 3);
    assert_eq!(summary.pages, 2);

    let c = counts(&store);
    assert_eq!(c.papers, 3);
    assert_eq!(c.authors, 3);
    assert_eq!(c.categories, 2);
    assert_eq!(c.wrote, 4);
    assert_eq!(
        store.authors_of("2403.00002").unwrap(),
        vec!["Ada Lovelace", "Alan Turing"]
    );
    assert_eq!(store.load_ledger().unwrap().unwrap().update_count, 1);

    stop.send(()).ok();
    server.await.unwrap();
}
