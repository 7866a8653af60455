//! Integration tests for `bindery plan` and `bindery preview --dump`.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

fn page_number_align(page: &serde_json::Value) -> String {
    page["plan"]["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["role"] == "page_number")
        .map(|b| b["align"].as_str().unwrap().to_string())
        .unwrap()
}

// === plan ===

#[test]
fn test_plan_outputs_every_page() {
    let env = TestEnv::new();
    env.fixture("book.json");

    let output = env.bindery().args(["plan", "book.json"]).output().unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    let pages = json["pages"].as_array().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0]["plan"]["variant"], "cover");
    assert_eq!(pages[1]["plan"]["variant"], "standard");
    assert_eq!(pages[2]["plan"]["variant"], "end");
    assert_eq!(pages[1]["plan"]["page"]["width_mm"], 152.0);
    assert_eq!(pages[1]["plan"]["page"]["height_mm"], 229.0);
}

#[test]
fn test_page_numbers_alternate_sides() {
    let env = TestEnv::new();
    let pages: Vec<_> = (0..4)
        .map(|i| serde_json::json!({ "page_type": "content", "content": format!("page {i}") }))
        .collect();
    env.write(
        "four.json",
        &serde_json::json!({ "title": "Four", "pages": pages }).to_string(),
    );

    let output = env.bindery().args(["plan", "four.json"]).output().unwrap();
    let json = parse_json(&output.stdout);
    let aligns: Vec<String> = json["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(page_number_align)
        .collect();
    assert_eq!(aligns, vec!["right", "left", "right", "left"]);
}

#[test]
fn test_plan_unknown_page_fails() {
    let env = TestEnv::new();
    env.fixture("book.json");
    env.bindery()
        .args(["plan", "book.json", "--page", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page 9"));
}

#[test]
fn test_plan_human_marks_truncation() {
    let env = TestEnv::new();
    let long = "word ".repeat(4000);
    env.write(
        "long.json",
        &serde_json::json!({
            "title": "Long",
            "pages": [{ "page_type": "content", "content": long }]
        })
        .to_string(),
    );
    env.bindery()
        .args(["-H", "plan", "long.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(truncated)"));
}

// === preview --dump ===

#[test]
fn test_preview_dump_single_page() {
    let env = TestEnv::new();
    env.fixture("book.json");

    let output = env
        .bindery()
        .args(["preview", "book.json", "--dump", "--page", "2"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = parse_json(&output.stdout);
    assert_eq!(json["pages"].as_array().unwrap().len(), 1);
    assert_eq!(json["pages"][0]["page_number"], 2);
    assert!(json["pages"][0]["text"].as_str().unwrap().contains("Chapter One"));
    assert_eq!(json["trace"][0]["variant"], "standard");
}

#[test]
fn test_preview_dump_spread() {
    let env = TestEnv::new();
    env.fixture("book.json");

    let output = env
        .bindery()
        .args(["preview", "book.json", "--dump", "--spread", "--page", "3"])
        .output()
        .unwrap();
    let json = parse_json(&output.stdout);
    assert_eq!(json["spread"], true);
    let numbers: Vec<u64> = json["pages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["page_number"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![2, 3]);
}

#[test]
fn test_preview_dump_human() {
    let env = TestEnv::new();
    env.fixture("book.json");
    env.bindery()
        .args(["-H", "preview", "book.json", "--dump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--- page 1 ---"));
}
