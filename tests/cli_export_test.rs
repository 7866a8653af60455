//! Integration tests for `bindery export`.

mod common;

use bindery::print::count_pages;
use common::{TestEnv, parse_json};
use predicates::prelude::*;

// === Basic export ===

#[test]
fn test_export_writes_pdf_named_after_title() {
    let env = TestEnv::new();
    env.fixture("book.json");
    env.fixture("themes.json");

    let output = env
        .bindery()
        .args(["--themes", "themes.json", "export", "book.json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = parse_json(&output.stdout);
    assert_eq!(json["filename"], "the_little_lighthouse.pdf");
    assert_eq!(json["content_type"], "application/pdf");
    assert_eq!(json["pages"].as_array().unwrap().len(), 3);

    let bytes = std::fs::read(env.path().join("the_little_lighthouse.pdf")).unwrap();
    assert_eq!(bytes.len() as u64, json["content_length"].as_u64().unwrap());
    assert_eq!(count_pages(&bytes), 3);
}

#[test]
fn test_export_human_output() {
    let env = TestEnv::new();
    env.fixture("book.json");

    env.bindery()
        .args(["-H", "export", "book.json", "-o", "out.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 pages to out.pdf"))
        .stdout(predicate::str::contains("sha256"));
    assert!(env.path().join("out.pdf").exists());
}

// === Validation ===

#[test]
fn test_export_without_title_fails_without_artifact() {
    let env = TestEnv::new();
    env.write(
        "untitled.json",
        r#"{"author_name": "A", "pages": [{"page_type": "content", "content": "x"}]}"#,
    );

    env.bindery()
        .args(["export", "untitled.json", "-o", "untitled.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Book title is required"));
    assert!(!env.path().join("untitled.pdf").exists());
}

#[test]
fn test_export_without_pages_fails() {
    let env = TestEnv::new();
    env.write("empty.json", r#"{"title": "Empty", "pages": []}"#);

    env.bindery()
        .args(["-H", "export", "empty.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one page"));
}

// === Images ===

fn picture_book(env: &TestEnv, image: &str) {
    let book = serde_json::json!({
        "title": "Pictures",
        "author_name": "A",
        "pages": [{
            "page_type": "content",
            "content": "A red square.",
            "layout": "image-top",
            "images": [image]
        }]
    });
    env.write("pictures.json", &book.to_string());
}

#[test]
fn test_export_embeds_book_relative_image() {
    let env = TestEnv::new();
    std::fs::create_dir(env.path().join("art")).unwrap();
    image::RgbImage::from_pixel(4, 4, image::Rgb([220, 0, 0]))
        .save(env.path().join("art").join("red.png"))
        .unwrap();
    picture_book(&env, "art/red.png");

    let output = env.bindery().args(["export", "pictures.json"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = parse_json(&output.stdout);
    assert_eq!(json["pages"][0]["images"], 1);
    assert!(json["pages"][0].get("missing_images").is_none());
}

#[test]
fn test_missing_image_fails_unless_isolated() {
    let env = TestEnv::new();
    picture_book(&env, "art/missing.png");

    env.bindery()
        .args(["export", "pictures.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("art/missing.png"));

    let output = env
        .bindery()
        .args(["export", "pictures.json", "--isolate"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);
    assert_eq!(json["pages"][0]["missing_images"][0], "art/missing.png");
}

// === Metadata ===

#[test]
fn test_export_appends_metadata_record() {
    let env = TestEnv::new();
    env.fixture("book.json");

    env.bindery()
        .args([
            "export",
            "book.json",
            "--owner",
            "ada",
            "--story-id",
            "story-7",
            "--metadata-log",
            "exports.jsonl",
        ])
        .assert()
        .success();

    let log = std::fs::read_to_string(env.path().join("exports.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 1);
    let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(record["status"], "exported");
    assert_eq!(record["owner"], "ada");
    assert_eq!(record["story_id"], "story-7");
    assert_eq!(record["page_count"], 3);
    assert_eq!(record["theme_ids"], serde_json::json!(["ocean", "night"]));
}

#[test]
fn test_parallel_export_matches_serial() {
    let env = TestEnv::new();
    env.fixture("book.json");

    let serial = env
        .bindery()
        .args(["export", "book.json", "-o", "serial.pdf"])
        .output()
        .unwrap();
    let parallel = env
        .bindery()
        .args(["export", "book.json", "-o", "parallel.pdf", "--parallel"])
        .output()
        .unwrap();
    assert!(serial.status.success() && parallel.status.success());
    assert_eq!(
        parse_json(&serial.stdout)["sha256"],
        parse_json(&parallel.stdout)["sha256"]
    );
}
