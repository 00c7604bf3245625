use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn folio(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("folio").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--root")
        .arg(root);
    cmd
}

#[test]
fn test_cli_put_get_update_rm() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();

    folio(root)
        .args(["put", "posts", r#"{"title":"MyTitle","body":"MyContent"}"#])
        .assert()
        .success()
        .stdout("1\n");
    folio(root)
        .args(["put", "posts", r#"{"title":"Second","body":"..."}"#])
        .assert()
        .success()
        .stdout("2\n");

    folio(root)
        .args(["get", "posts", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("MyContent"))
        .stdout(predicate::str::contains("created_at"));

    folio(root)
        .args(["update", "posts", "1", r#"{"title":"MyTitle","body":"Updated"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));
    folio(root)
        .args(["get", "posts", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"body\": \"Updated\""));

    folio(root).args(["rm", "posts", "2"]).assert().success();
    assert!(!root.join("posts").join("2.json").exists());
    folio(root)
        .args(["get", "posts", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    folio(root).args(["rm", "posts"]).assert().success();
    assert!(!root.join("posts").exists());
    folio(root)
        .args(["list", "posts"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_list_is_sorted_by_id() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();

    for i in 1..=11 {
        folio(root)
            .args(["put", "nums", &format!(r#"{{"n":{}}}"#, i)])
            .assert()
            .success();
    }

    let output = folio(root).args(["list", "nums"]).output().unwrap();
    assert!(output.status.success());
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let ns: Vec<i64> = listed.iter().map(|e| e["data"]["n"].as_i64().unwrap()).collect();
    assert_eq!(ns, (1..=11).collect::<Vec<_>>());
}

#[test]
fn test_cli_rejects_bad_input() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();

    folio(root)
        .args(["put", "posts", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: invalid JSON payload"));
    folio(root)
        .args(["put", "posts", "{}"])
        .assert()
        .success();
    folio(root)
        .args(["update", "posts", "1", "[1,"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON payload"));
    assert!(!root.join("posts").join("2.json").exists());
    folio(root)
        .args(["get", "..", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid name"));
}

#[test]
fn test_cli_doctor() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();

    folio(root).args(["put", "posts", "{}"]).assert().success();
    std::fs::write(root.join("posts").join("7.json.tmp"), "{").unwrap();

    folio(root)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 leftover temp file"))
        .stdout(predicate::str::contains("No corrupt records"));
    assert!(!root.join("posts").join("7.json.tmp").exists());
}
