use std::fs::File;
use std::io::Write;

use armpick_config::{load_slots_csv, load_toml};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).expect("create csv");
    f.write_all(content.as_bytes()).expect("write csv");
    path
}

#[rstest]
fn loads_slot_table() {
    let dir = tempdir().unwrap();
    let path = write_csv(
        &dir,
        "pyramid.csv",
        "x,y,z\n-60.0,250.0,50.0\n0.0,250.0,50.0\n60.0,250.0,50.0\n-30.0,250.0,170.0\n",
    );
    let slots = load_slots_csv(&path).expect("loads");
    assert_eq!(slots.len(), 4);
    assert_eq!(slots[0], [-60.0, 250.0, 50.0]);
    assert_eq!(slots[3], [-30.0, 250.0, 170.0]);
}

#[rstest]
fn rejects_wrong_headers() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "bad.csv", "a,b,c\n1.0,2.0,3.0\n");
    let err = load_slots_csv(&path).expect_err("headers enforced");
    assert!(err.to_string().contains("x,y,z"));
}

#[rstest]
fn rejects_empty_table() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "empty.csv", "x,y,z\n");
    assert!(load_slots_csv(&path).is_err());
}

#[rstest]
fn rejects_malformed_row() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "bad_row.csv", "x,y,z\n1.0,2.0\n");
    let err = load_slots_csv(&path).expect_err("row rejected");
    assert!(err.to_string().contains("row 2"));
}

#[rstest]
fn config_resolves_csv_slots() {
    let dir = tempdir().unwrap();
    let path = write_csv(&dir, "slots.csv", "x,y,z\n0.0,250.0,50.0\n60.0,250.0,50.0\n");
    let toml = format!(
        "[placement]\nmode = \"slots\"\ncsv = \"{}\"\n",
        path.display()
    );
    let cfg = load_toml(&toml).expect("parses");
    cfg.validate().expect("valid");
    let slots = cfg.resolved_slots().expect("resolves").expect("slot mode");
    assert_eq!(slots.len(), 2);
}
