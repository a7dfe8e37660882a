use assert_cmd::Command;
use lopdf::content::Content;
use lopdf::{dictionary, Document, Object};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_bytes(page_sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = page_sizes
        .iter()
        .map(|(width, height)| {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), (*width).into(), (*height).into()],
            });
            Object::Reference(page_id)
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture should serialize");
    bytes
}

fn encrypted_fixture_bytes() -> Vec<u8> {
    let mut doc =
        Document::load_mem(&fixture_bytes(&[(600.0, 800.0)])).expect("fixture should reload");
    let encrypt_id = doc.add_object(dictionary! { "Filter" => "Standard" });
    doc.trailer.set("Encrypt", Object::Reference(encrypt_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture should serialize");
    bytes
}

fn write_fixture(dir: &Path, name: &str, page_sizes: &[(f32, f32)]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, fixture_bytes(page_sizes)).expect("fixture should be written");
    path
}

fn fieldstamp() -> Command {
    Command::cargo_bin("fieldstamp").expect("binary should be locatable")
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn info_emits_json_contract() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    let output = fieldstamp()
        .arg("info")
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: Value = serde_json::from_slice(&output).expect("stdout should contain valid json");
    assert_eq!(value["page_count"], 1);
    assert_eq!(value["pages"][0]["page"], 1);
    assert_eq!(value["pages"][0]["width_pt"], 600.0);
    assert_eq!(value["pages"][0]["height_pt"], 800.0);
}

#[test]
fn info_fails_for_missing_file() {
    let temp = tempfile::tempdir().expect("temp dir should be created");

    fieldstamp()
        .arg("info")
        .arg(temp.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn info_fails_for_invalid_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("invalid.pdf");
    fs::write(&path, b"not a pdf").expect("fixture should be written");

    fieldstamp()
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to open PDF"));
}

#[test]
fn info_fails_for_encrypted_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let path = temp.path().join("encrypted.pdf");
    fs::write(&path, encrypted_fixture_bytes()).expect("fixture should be written");

    fieldstamp()
        .arg("info")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("encrypted PDFs are not supported"));
}

#[test]
fn stamp_writes_modified_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);
    let output_path = temp.path().join("out.pdf");

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("signature:1:50,50")
        .arg("--field")
        .arg("text:1:120,40:120x30:Approved")
        .arg("-o")
        .arg(&output_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("out.pdf"));

    let bytes = fs::read(&output_path).expect("stamped output should exist");
    assert!(contains_bytes(&bytes, b"(Approved) Tj"));
    assert!(contains_bytes(&bytes, b"/FsHelv"));

    let doc = Document::load_mem(&bytes).expect("stamped output should stay parseable");
    assert_eq!(doc.get_pages().len(), 1);
}

#[test]
fn stamp_honors_explicit_field_size() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);
    let output_path = temp.path().join("out.pdf");

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("signature:1:50,50:120x30")
        .arg("-o")
        .arg(&output_path)
        .assert()
        .success();

    let bytes = fs::read(&output_path).expect("stamped output should exist");
    let doc = Document::load_mem(&bytes).expect("stamped output should stay parseable");
    let page_id = *doc.get_pages().get(&1).expect("page 1 expected");
    let data = doc.get_page_content(page_id).expect("page content should concatenate");
    let content = Content::decode(&data).expect("content should decode");

    let rect = content
        .operations
        .iter()
        .find(|op| op.operator == "re")
        .expect("the signature box should draw one rectangle");
    let operands: Vec<f32> =
        rect.operands.iter().map(|obj| obj.as_float().expect("numeric operand")).collect();
    assert_eq!(operands, vec![50.0, 720.0, 120.0, 30.0]);
}

#[test]
fn stamp_defaults_to_modified_pdf() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("signature:1:50,50")
        .assert()
        .success()
        .stdout(predicate::str::contains("modified.pdf"));

    assert!(temp.path().join("modified.pdf").exists());
}

#[test]
fn stamp_places_fields_across_pages() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "two-pages.pdf", &[(600.0, 800.0), (300.0, 400.0)]);
    let output_path = temp.path().join("out.pdf");

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("text:1:50,50::Page one")
        .arg("--field")
        .arg("text:2:10,10::Page two")
        .arg("-o")
        .arg(&output_path)
        .assert()
        .success();

    let bytes = fs::read(&output_path).expect("stamped output should exist");
    assert!(contains_bytes(&bytes, b"(Page one) Tj"));
    assert!(contains_bytes(&bytes, b"(Page two) Tj"));

    let doc = Document::load_mem(&bytes).expect("stamped output should stay parseable");
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn stamp_rejects_out_of_range_page() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("text:5:10,10")
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn stamp_rejects_blank_field_text() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("text:1:10,10:20x20: ")
        .assert()
        .failure()
        .stderr(predicate::str::contains("was not placed"));
}

#[test]
fn stamp_requires_at_least_one_field() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one --field"));
}

#[test]
fn stamp_rejects_unknown_field_kind() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);

    fieldstamp()
        .arg("stamp")
        .arg(&input)
        .arg("--field")
        .arg("bogus:1:0,0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field kind"));
}

#[test]
fn preview_writes_png() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let input = write_fixture(temp.path(), "small.pdf", &[(600.0, 800.0)]);
    let output_path = temp.path().join("page.png");

    fieldstamp()
        .arg("preview")
        .arg(&input)
        .arg("--page")
        .arg("1")
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    let image = image::open(&output_path).expect("preview should be a readable image");
    assert_eq!(image.width(), 600);
    assert_eq!(image.height(), 800);
}

#[test]
fn version_prints_crate_version() {
    fieldstamp()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
