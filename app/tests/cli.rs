use assert_cmd::Command;
use mocks::{
    backend, expect_delete, expect_health, expect_login, expect_me, expect_photos, expect_upload, photo_json,
    request_log, unreachable_url,
};
use predicates::prelude::*;
use tempfile::TempDir;

fn photoapp(home: &std::path::Path, base_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("photoapp").unwrap();
    cmd.env("HOME", home)
        .env_remove("PHOTOAPP_PASSWORD")
        .env_remove("PHOTOAPP_BASE_URL")
        .env_remove("PHOTOAPP_TOKEN_STORE")
        .args(["--use-file-store", "--base-url", base_url]);
    cmd
}

fn remember_token(home: &std::path::Path, token: &str) {
    let dir = home.join(".photoapp");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("token.json"), format!("{{\"token\":\"{}\"}}", token)).unwrap();
}

#[test]
fn photoapp_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("photoapp")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Personal photo-sharing client"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn ping_prints_backend_message() {
    let home = TempDir::new().unwrap();
    let server = backend().await;
    expect_health(&server, "Hello from the backend").await;

    photoapp(home.path(), &server.uri())
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backend says: Hello from the backend"));
}

#[test]
fn ping_unreachable_backend() {
    let home = TempDir::new().unwrap();
    photoapp(home.path(), &unreachable_url())
        .arg("ping")
        .assert()
        .success()
        .stdout(predicate::str::contains("Error connecting to backend"));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_list_logout_workflow() {
    let home = TempDir::new().unwrap();
    let token_path = home.path().join(".photoapp").join("token.json");
    let server = backend().await;
    expect_login(&server, Some("tok1")).await;
    expect_me(&server, "tok1").await;
    expect_photos(
        &server,
        "tok1",
        vec![
            photo_json("1", "https://x/1.jpg", Some("Sunset")),
            photo_json("2", "https://x/2.jpg", None),
        ],
    )
    .await;

    photoapp(home.path(), &server.uri())
        .args(["login", "a", "--password", "b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as a"))
        .stdout(predicate::str::contains("Photos: 2"));
    assert!(token_path.exists());

    photoapp(home.path(), &server.uri())
        .args(["list", "--limit", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1\tSunset\t2023-01-01\thttps://x/1.jpg"))
        .stdout(predicate::str::contains("https://x/2.jpg").not());

    photoapp(home.path(), &server.uri())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authenticated: yes"));

    photoapp(home.path(), &server.uri())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out"));
    assert!(!token_path.exists());

    photoapp(home.path(), &server.uri())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn login_with_bad_credentials() {
    let home = TempDir::new().unwrap();
    let server = backend().await;
    expect_login(&server, None).await;

    photoapp(home.path(), &server.uri())
        .args(["login", "a"])
        .env("PHOTOAPP_PASSWORD", "wrong")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid username or password"));
    assert!(!home.path().join(".photoapp").join("token.json").exists());
}

#[test]
fn upload_without_file_asks_for_one() {
    let home = TempDir::new().unwrap();
    photoapp(home.path(), &unreachable_url())
        .args(["upload", "--title", "Sunset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please select a file"));
}

#[test]
fn status_without_token() {
    let home = TempDir::new().unwrap();
    photoapp(home.path(), &unreachable_url())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Authenticated: no"));
}

#[test]
fn init_config_writes_file() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("photoapp.toml");
    photoapp(home.path(), "http://localhost:8000")
        .arg("--config")
        .arg(&config_path)
        .arg("init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config written"));
    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("base_url = \"http://localhost:8000\""));
    assert!(written.contains("token_store = \"file\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_with_file_reports_success() {
    let home = TempDir::new().unwrap();
    remember_token(home.path(), "tok1");
    let image = home.path().join("sunset.jpg");
    std::fs::write(&image, b"\xff\xd8\xff\xe0fake-jpeg").unwrap();
    let server = backend().await;
    expect_me(&server, "tok1").await;
    expect_upload(&server, Some("https://x/new.jpg")).await;
    expect_photos(&server, "tok1", vec![photo_json("1", "https://x/new.jpg", Some("Sunset"))]).await;

    photoapp(home.path(), &server.uri())
        .arg("upload")
        .arg(&image)
        .args(["--title", "Sunset", "--date", "2024-05-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload successful!"))
        .stdout(predicate::str::contains("https://x/new.jpg"))
        .stdout(predicate::str::contains("Photos: 1"));

    let uploads = request_log(&server)
        .await
        .into_iter()
        .filter(|(m, p)| m == "POST" && p == "/upload")
        .count();
    assert_eq!(uploads, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_of_missing_file_reports_unreadable() {
    let home = TempDir::new().unwrap();
    remember_token(home.path(), "tok1");
    let server = backend().await;
    expect_me(&server, "tok1").await;
    expect_photos(&server, "tok1", vec![]).await;

    photoapp(home.path(), &server.uri())
        .arg("upload")
        .arg(home.path().join("missing.jpg"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Upload failed: could not read the file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_sends_request_and_refreshes() {
    let home = TempDir::new().unwrap();
    remember_token(home.path(), "tok1");
    let server = backend().await;
    expect_me(&server, "tok1").await;
    expect_delete(&server, "42", 200).await;
    expect_photos(&server, "tok1", vec![photo_json("7", "https://x/7.jpg", None)]).await;

    photoapp(home.path(), &server.uri())
        .args(["delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 42"))
        .stdout(predicate::str::contains("Photos: 1"));

    let log = request_log(&server).await;
    let deletes: Vec<_> = log.iter().filter(|(m, _)| m == "DELETE").collect();
    assert_eq!(deletes, vec![&("DELETE".to_string(), "/photo/42".to_string())]);
}

#[test]
fn delete_without_token_is_refused() {
    let home = TempDir::new().unwrap();
    photoapp(home.path(), &unreachable_url())
        .args(["delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}
