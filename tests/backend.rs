use std::io::Read;
use std::thread::{self, JoinHandle};

use assert_cmd::Command;
use predicates::prelude::*;
use repost_check::api::{ApiError, Client, ClientConfig, ImagePayload, Submission};
use repost_check::report::{ReportReason, ReportRequest};
use tiny_http::{Header, Response, Server};

struct Captured {
    path: String,
    content_type: String,
    body: String,
}

/// Serves exactly one request with the given status and JSON body.
fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<Captured>) {
    let server = Server::http("127.0.0.1:0").expect("bind fake backend");
    let port = server
        .server_addr()
        .to_ip()
        .expect("tcp listener")
        .port();
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("receive request");
        let content_type = request
            .headers()
            .iter()
            .find(|h| h.field.equiv("Content-Type"))
            .map(|h| h.value.as_str().to_string())
            .unwrap_or_default();
        let mut received = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut received)
            .expect("read body");
        let path = request.url().to_string();
        let header = Header::from_bytes("Content-Type", "application/json").expect("header");
        request
            .respond(
                Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header),
            )
            .expect("respond");
        Captured {
            path,
            content_type,
            body: String::from_utf8_lossy(&received).into_owned(),
        }
    });
    (format!("http://127.0.0.1:{port}"), handle)
}

fn client(base_url: String) -> Client {
    Client::new(ClientConfig {
        base_url,
        user_agent: "repost-check-test".into(),
        ..ClientConfig::default()
    })
    .expect("client")
}

const TWO_RESULTS: &str = r#"{"results":[
  {"id":"t3_b","title":"Repost","date":"2024-03-02T10:00:00","author":"late","image_url":"https://i.redd.it/a.png","reddit_url":"https://reddit.com/r/funny/comments/b/"},
  {"id":"t3_a","title":"Original","date":"2024-03-01T10:00:00","author":"early","image_url":"https://i.redd.it/a.png","reddit_url":"https://reddit.com/r/pics/comments/a/"}
]}"#;

#[test]
fn check_posts_multipart_form_and_decodes_results() {
    let (base, handle) = serve_once(200, TWO_RESULTS);
    let results = client(base)
        .check_duplicates(Submission {
            image: ImagePayload::Url("https://i.imgur.com/abc.png".into()),
            subreddits: vec!["pics".into(), "funny".into()],
        })
        .expect("check succeeds");
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].author, "early");

    let captured = handle.join().expect("server thread");
    assert_eq!(captured.path, "/api/check-duplicates");
    assert!(captured.content_type.starts_with("multipart/form-data"));
    assert!(captured.body.contains("name=\"image_url\""));
    assert!(captured.body.contains("https://i.imgur.com/abc.png"));
    assert_eq!(captured.body.matches("name=\"subreddit[]\"").count(), 2);
}

#[test]
fn uploaded_file_is_sent_as_image_part() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cat.png");
    image::RgbImage::new(2, 2).save(&path).expect("write png");

    let (base, handle) = serve_once(200, r#"{"results":[]}"#);
    let results = client(base)
        .check_duplicates(Submission {
            image: ImagePayload::File(path),
            subreddits: vec!["pics".into()],
        })
        .expect("check succeeds");
    assert!(results.is_empty());

    let captured = handle.join().expect("server thread");
    assert!(captured.body.contains("name=\"image\"; filename=\"cat.png\""));
    assert!(captured
        .body
        .to_ascii_lowercase()
        .contains("content-type: image/png"));
}

#[test]
fn server_error_keeps_message_and_details() {
    let (base, handle) = serve_once(
        400,
        r#"{"error":"Subreddit r/nope not found or is private","details":"404 from reddit"}"#,
    );
    let err = client(base)
        .check_duplicates(Submission {
            image: ImagePayload::Url("https://i.imgur.com/abc.png".into()),
            subreddits: vec!["nope".into()],
        })
        .unwrap_err();
    handle.join().expect("server thread");

    assert_eq!(err.to_string(), "Subreddit r/nope not found or is private");
    assert_eq!(err.details(), Some("404 from reddit"));
    assert!(matches!(err, ApiError::Server { status: 400, .. }));
}

#[test]
fn error_without_body_uses_fallback_message() {
    let (base, handle) = serve_once(500, "");
    let err = client(base)
        .check_duplicates(Submission {
            image: ImagePayload::Url("https://i.imgur.com/abc.png".into()),
            subreddits: vec!["pics".into()],
        })
        .unwrap_err();
    handle.join().expect("server thread");
    assert_eq!(err.to_string(), "Failed to check duplicates");
}

#[test]
fn report_is_form_encoded() {
    let (base, handle) = serve_once(200, r#"{"success":true,"message":"Post reported"}"#);
    let ack = client(base)
        .report(&ReportRequest {
            post_id: "t3_a".into(),
            reason: ReportReason::Other,
            details: Some("same photo".into()),
        })
        .expect("report succeeds");
    assert_eq!(ack.message.as_deref(), Some("Post reported"));

    let captured = handle.join().expect("server thread");
    assert_eq!(captured.path, "/api/report");
    assert!(captured
        .content_type
        .starts_with("application/x-www-form-urlencoded"));
    assert!(captured.body.contains("post_id=t3_a"));
    assert!(captured.body.contains("reason=other"));
    assert!(captured.body.contains("details=same+photo"));
}

#[test]
fn report_with_success_false_is_rejected() {
    let (base, handle) = serve_once(200, r#"{"success":false,"error":"Already reported"}"#);
    let err = client(base)
        .report(&ReportRequest {
            post_id: "t3_a".into(),
            reason: ReportReason::Spam,
            details: None,
        })
        .unwrap_err();
    handle.join().expect("server thread");
    assert!(matches!(err, ApiError::Rejected(ref message) if message == "Already reported"));
}

fn headless(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("repost-check").expect("binary");
    cmd.arg("--config")
        .arg(dir.path().join("config.yaml"))
        .env("REPOST_CHECK_LOGGING__FILE", dir.path().join("test.log"))
        .env("REPOST_CHECK_PROGRESS__IMAGE_STEP_DELAY", "10ms")
        .env("REPOST_CHECK_PROGRESS__REDDIT_STEP_DELAY", "10ms");
    cmd
}

#[test]
fn headless_check_prints_original_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = serve_once(200, TWO_RESULTS);
    headless(&dir)
        .args(["--api-url", &base, "-s", "pics", "-s", "funny"])
        .args(["--url", "https://i.imgur.com/abc.png"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Original Post"))
        .stdout(predicate::str::contains("Posted by u/early"))
        .stdout(predicate::str::contains("Duplicates (1)"));
    handle.join().expect("server thread");
}

#[test]
fn headless_check_rejects_unsupported_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    headless(&dir)
        .args(["--api-url", "http://127.0.0.1:9", "-s", "pics"])
        .args(["--url", "https://example.com/file.pdf"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Please provide a valid image URL",
        ));
}

#[test]
fn headless_check_requires_subreddits() {
    let dir = tempfile::tempdir().expect("tempdir");
    headless(&dir)
        .args(["--demo", "--url", "https://i.imgur.com/abc.png"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Please add and confirm at least one subreddit",
        ));
}

#[test]
fn headless_backend_error_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = serve_once(400, r#"{"error":"Subreddit r/nope not found or is private"}"#);
    headless(&dir)
        .args(["--api-url", &base, "-s", "nope"])
        .args(["--url", "https://i.redd.it/xyz.jpg"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "Error: Subreddit r/nope not found or is private",
        ));
    handle.join().expect("server thread");
}
