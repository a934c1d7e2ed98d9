// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;
use crate::test_helpers::{test_engine, Endpoint, FakeApi};

#[tokio::test]
async fn lists_sectors_as_text() {
    let engine = test_engine(&FakeApi::new());
    let mut out = Vec::new();

    run(&engine, OutputFormat::Text, &mut out).await.unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "   1  INT    Intendencia\n   2  REN    Rentas\n"
    );
}

#[tokio::test]
async fn lists_sectors_as_json() {
    let engine = test_engine(&FakeApi::new());
    let mut out = Vec::new();

    run(&engine, OutputFormat::Json, &mut out).await.unwrap();

    let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(parsed[0]["code"], "INT");
    assert_eq!(parsed[1]["id"], 2);
}

#[tokio::test]
async fn server_error_is_returned() {
    let fake = FakeApi::new();
    fake.fail(
        Endpoint::Sectors,
        turno_core::Error::Forbidden("bad token".into()),
    );
    let engine = test_engine(&fake);

    let err = run(&engine, OutputFormat::Text, &mut Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(turno_core::ErrorKind::Forbidden));
}
