#![allow(dead_code)]

use gtmetrix::{Account, ClientConfig, Requestor, Wait};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "aaa";
/// `Basic base64("aaa:")`
pub const AUTHORIZATION: &str = "Basic YWFhOg==";

/// Records every requested delay instead of sleeping.
#[derive(Default)]
pub struct RecordingWait {
    calls: Mutex<Vec<u64>>,
}

impl RecordingWait {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

impl Wait for RecordingWait {
    fn wait(&self, units: u64) {
        self.calls.lock().unwrap().push(units);
    }
}

pub fn config(server: &mockito::ServerGuard) -> ClientConfig {
    ClientConfig::new(API_KEY).with_base_url(server.url())
}

pub fn requestor(server: &mockito::ServerGuard, wait: Arc<RecordingWait>) -> Requestor {
    Requestor::with_wait(&config(server), wait).unwrap()
}

pub fn account(server: &mockito::ServerGuard, wait: Arc<RecordingWait>) -> Account {
    Account::with_wait(config(server), wait).unwrap()
}

pub fn envelope(data: Value) -> String {
    json!({ "data": data }).to_string()
}

pub fn error_envelope(status: &str, code: &str, title: &str) -> String {
    json!({"errors": [{"status": status, "code": code, "title": title}]}).to_string()
}

pub fn test_data(id: &str, state: &str) -> Value {
    json!({
        "type": "test",
        "id": id,
        "attributes": {"state": state, "url": "https://example.com"}
    })
}

pub fn completed_test_data(server: &mockito::ServerGuard, id: &str, report_id: &str) -> Value {
    json!({
        "type": "test",
        "id": id,
        "attributes": {"state": "completed", "url": "https://example.com"},
        "links": {"report": format!("{}/reports/{}", server.url(), report_id)}
    })
}

pub fn report_data(server: &mockito::ServerGuard, id: &str) -> Value {
    json!({
        "type": "report",
        "id": id,
        "attributes": {"gtmetrix_grade": "A", "performance_score": 99},
        "links": {
            "report_pdf": format!("{}/reports/{}/resources/report.pdf", server.url(), id),
            "har": format!("{}/reports/{}/resources/net.har", server.url(), id)
        }
    })
}
