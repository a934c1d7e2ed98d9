// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use mockito::{Matcher, Mock, Server, ServerGuard};
pub use predicates::prelude::*;
pub use serde_json::{json, Value};
pub use tempfile::TempDir;

pub fn turno() -> Command {
    cargo_bin_cmd!("turno")
}

/// A config file pointing at a mock server, with push and periodic
/// refresh off.
pub struct Setup {
    _temp: TempDir,
    pub config: PathBuf,
}

impl Setup {
    pub fn new(base_url: &str) -> Setup {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "base_url = \"{}\"\nrequest_timeout_secs = 5\nrefresh_interval_secs = 0\n\n[push]\nenabled = false\n",
                base_url
            ),
        )
        .unwrap();
        Setup {
            _temp: temp,
            config,
        }
    }

    /// `turno --config <file>` isolated from the caller's environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = turno();
        cmd.arg("--config")
            .arg(&self.config)
            .env_remove("TURNO_BASE_URL")
            .env_remove("TURNO_TOKEN")
            .env_remove("RUST_LOG");
        cmd
    }
}

fn sector_info(sector: u64) -> (&'static str, &'static str) {
    match sector {
        1 => ("INT", "Intendencia"),
        _ => ("REN", "Rentas"),
    }
}

fn now() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Ticket `id` as the server would send it, created just now.
pub fn ticket(id: u64, state: &str, sector: u64) -> Value {
    let (code, name) = sector_info(sector);
    let created = now();
    let mut value = json!({
        "id": id,
        "code": format!("{}{:03}", code, id),
        "state": state,
        "sector": {"id": sector, "code": code, "name": name},
        "citizen": {"nationalId": format!("30{:06}", id)},
        "createdAt": created,
    });
    if state != "GENERATED" && state != "REDIRECTED" {
        value["calledAt"] = json!(created);
    }
    value
}

pub fn sectors_body() -> String {
    json!([
        {"id": 1, "code": "INT", "name": "Intendencia"},
        {"id": 2, "code": "REN", "name": "Rentas"},
    ])
    .to_string()
}

/// Mocks the four view endpoints of `sector` with `waiting` as its queue.
pub fn mock_views(server: &mut ServerGuard, sector: u64, waiting: &[Value]) -> Vec<Mock> {
    let queue = Value::Array(waiting.to_vec()).to_string();
    let next = waiting
        .first()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "null".to_string());
    vec![
        json_mock(server, "GET", &format!("/sectors/{}/queue", sector), &queue),
        json_mock(server, "GET", &format!("/sectors/{}/next", sector), &next),
        json_mock(server, "GET", &format!("/sectors/{}/pending", sector), &queue),
        server
            .mock("GET", format!("/sectors/{}/tickets", sector).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(&queue)
            .create(),
    ]
}

pub fn json_mock(server: &mut ServerGuard, method: &str, path: &str, body: &str) -> Mock {
    server
        .mock(method, path)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}
