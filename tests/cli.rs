use assert_cmd::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn view_prints_layout_summary() {
    let dir = TempDir::new().expect("temp dir");
    let manifest = write(
        &dir,
        "gallery.json",
        r#"{
  "items": [
    {"text": "Business Cards", "image": "images/cards.png"},
    {"text": "Banners", "image": "https://cdn.example.com/banner.jpg"}
  ],
  "bend": 1,
  "cardSize": "large"
}"#,
    );

    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("view")
        .arg(&manifest)
        .arg("--bend")
        .arg("-2")
        .arg("--card-size")
        .arg("normal")
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Gallery with 2 items (4 planes), desktop profile at 1280x720"))
        .stdout(contains("card size normal, bend -2.00"))
        .stdout(contains(" - [0] Business Cards ("))
        .stdout(contains("cards.png) x=0.00 "))
        .stdout(contains(" - [3] Banners (https://cdn.example.com/banner.jpg)"));
}

#[test]
fn view_reports_narrow_windows_as_mobile() {
    let dir = TempDir::new().expect("temp dir");
    let manifest = write(&dir, "items.json", r#"[{"text": "A", "image": "a.png"}]"#);

    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("view")
        .arg(&manifest)
        .arg("--size")
        .arg("390x844")
        .arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Gallery with 1 items (2 planes), mobile profile at 390x844"));
}

#[test]
fn view_rejects_missing_manifest() {
    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("view")
        .arg("does-not-exist.json")
        .arg("--summary-only");
    cmd.assert()
        .failure()
        .stderr(contains("failed to load manifest"));
}

#[test]
fn catalog_filters_services() {
    let dir = TempDir::new().expect("temp dir");
    let services = write(
        &dir,
        "services.json",
        r#"[
  {"id": "cards", "title": "Business Cards", "category": "print", "features": ["Spot UV"]},
  {"id": "site", "title": "Landing Page", "category": "web", "technologies": ["WebGL"]}
]"#,
    );

    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("catalog").arg(&services).arg("--query").arg("webgl");
    cmd.assert()
        .success()
        .stdout(contains("1 of 2 services match"))
        .stdout(contains(" - site [web] Landing Page"));
}

#[test]
fn contact_prints_mailto_and_request() {
    let dir = TempDir::new().expect("temp dir");
    let submission = write(
        &dir,
        "contact.json",
        r#"{"name": "Ada", "email": "ada@example.com", "message": "Please quote 500 flyers."}"#,
    );

    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("contact")
        .arg(&submission)
        .arg("--recipient")
        .arg("hello@studio.test");
    cmd.assert()
        .success()
        .stdout(contains("mailto:hello@studio.test?subject=Project%20inquiry%20from%20Ada"))
        .stdout(contains(r#"POST /api/contact {"name":"Ada""#));
}

#[test]
fn contact_reports_field_errors() {
    let dir = TempDir::new().expect("temp dir");
    let submission = write(
        &dir,
        "contact.json",
        r#"{"name": "Ada", "email": "not-an-email", "message": "short"}"#,
    );

    let mut cmd = Command::cargo_bin("circular-gallery").expect("binary exists");
    cmd.arg("contact").arg(&submission);
    cmd.assert()
        .code(1)
        .stderr(contains("invalid email"))
        .stderr(contains("invalid message"));
}
