#![allow(dead_code)]

use std::path::PathBuf;

use diesel::prelude::*;
use quote_ingest::config::IngestConfig;
use quote_ingest::credentials::StaticCredentials;
use quote_ingest::db::{connection, migrate};
use quote_ingest::ingest::Ingestor;
use quote_ingest::sink::sqlite::SqliteConnector;
use quote_ingest::schema::{weekly_sector_quotes, weekly_stock_quotes};
use serde_json::{Value, json};
use tempfile::TempDir;

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/quotes.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("quotes.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

/// Credentials resolving the default parameter paths, database -> `database`.
pub fn credentials_for(database: &str) -> StaticCredentials {
    StaticCredentials::new()
        .with("/rrg-creator/rds-endpoint", "localhost")
        .with("/rrg-creator/rds-user", "ingest")
        .with("/rrg-creator/rds-password", "secret")
        .with("/rrg-creator/rds-database", database)
}

pub fn sqlite_ingestor(
    db: &TestDb,
    config: IngestConfig,
) -> Ingestor<StaticCredentials, SqliteConnector> {
    Ingestor::new(credentials_for(&db.path), SqliteConnector, config)
}

pub fn stock(code: &str, date: &str) -> Value {
    json!({
        "stock_code": code, "quote_date": date,
        "open": 10.5, "high": 11.25, "low": 10.0, "close": 11.0, "volume": 150000
    })
}

pub fn sector(code: &str, date: &str) -> Value {
    json!({
        "sector_code": code, "quote_date": date,
        "open": 200.0, "high": 210.0, "low": 195.5, "close": 205.25, "volume": 9000000
    })
}

/// One SQS-style record with the given kind tag and quotes.
pub fn record(id: &str, tag: &str, quotes: Vec<Value>) -> Value {
    json!({
        "messageId": id,
        "receiptHandle": "AQEB...",
        "body": json!({ "quoteObject": quotes }).to_string(),
        "attributes": { "ApproximateReceiveCount": "1" },
        "messageAttributes": {
            "QuoteType": { "stringValue": tag, "stringListValues": [], "dataType": "String" }
        },
        "eventSource": "aws:sqs"
    })
}

pub fn batch(records: Vec<Value>) -> Value {
    json!({ "Records": records })
}

pub fn stock_rows(conn: &mut SqliteConnection) -> i64 {
    weekly_stock_quotes::table
        .count()
        .get_result(conn)
        .expect("count stock rows")
}

pub fn sector_rows(conn: &mut SqliteConnection) -> i64 {
    weekly_sector_quotes::table
        .count()
        .get_result(conn)
        .expect("count sector rows")
}
