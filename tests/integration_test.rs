use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn notelog_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_notelog"))
}

fn init_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();
    assert!(output.status.success());
    tmp
}

fn save(tmp: &TempDir, device: &str, content: &str, author: &str) -> std::process::Output {
    notelog_cmd()
        .current_dir(tmp.path())
        .args(["save", "--device", device, "--author", author, content])
        .output()
        .unwrap()
}

#[test]
fn test_init_creates_notelog_directory() {
    let tmp = init_project();
    assert!(tmp.path().join(".notelog").exists());
    assert!(tmp.path().join(".notelog/events.db").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = init_project();

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_show_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["show", "--device", "123456"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not in a notelog project"));
}

#[test]
fn test_show_without_device_fails() {
    let tmp = init_project();

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["show"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to init context"));
}

#[test]
fn test_show_empty_device() {
    let tmp = init_project();

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["show", "--device", "123456"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No note for device 123456"));
}

#[test]
fn test_full_note_workflow() {
    let tmp = init_project();

    let output = save(&tmp, "123456", "Note 1", "test@example.com");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Saved note for device 123456"));

    let output = save(&tmp, "123456", "Note 2", "other@example.com");
    assert!(output.status.success());

    // Current note is the latest save
    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["show", "--device", "123456", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let note: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(note["content"], "Note 2");
    assert_eq!(note["author"], "other@example.com");

    // History lists both, newest first
    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["history", "--device", "123456", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["c8y_NoteLogEvent"]["content"], "Note 2");
    assert_eq!(entries[1]["c8y_NoteLogEvent"]["content"], "Note 1");
    assert_eq!(entries[0]["text"], "Note updated");
    assert_eq!(entries[0]["source"]["id"], "123456");
}

#[test]
fn test_saving_same_content_is_a_no_op() {
    let tmp = init_project();
    assert!(save(&tmp, "1", "unchanged", "a@example.com").status.success());

    let output = save(&tmp, "1", "unchanged", "a@example.com");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("unchanged"));

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["history", "--device", "1", "--json"])
        .output()
        .unwrap();
    let history: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn test_save_from_stdin() {
    let tmp = init_project();

    let mut child = notelog_cmd()
        .current_dir(tmp.path())
        .args(["save", "--device", "7", "--author", "ops@example.com", "--stdin"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"line one\nline two")
        .unwrap();
    assert!(child.wait_with_output().unwrap().status.success());

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["history", "--device", "7"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ops@example.com"));
    assert!(stdout.contains("    line one"));
    assert!(stdout.contains("    line two"));
}

#[test]
fn test_notes_are_scoped_per_device() {
    let tmp = init_project();
    assert!(save(&tmp, "a", "for a", "x@example.com").status.success());

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["history", "--device", "b"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No note history for device b"));
}

#[test]
fn test_config_file_target() {
    let tmp = init_project();
    let config = tmp.path().join("widget.json");
    std::fs::write(&config, r#"{"device":{"id":"42","name":"Pump 7"}}"#).unwrap();
    assert!(save(&tmp, "42", "via flag", "x@example.com").status.success());

    let output = notelog_cmd()
        .current_dir(tmp.path())
        .args(["show", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("via flag"));
}
