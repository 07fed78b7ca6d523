mod test_support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use curriculumd::api::CALLER_HEADER;
use sha2::{Digest, Sha256};
use test_support::{app_on, date, seed_school_with_teacher, TestApp};

const BOUNDARY: &str = "curriculumd-boundary";

fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
            b = BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(caller: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/file-upload/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(user_id) = caller {
        builder = builder.header(CALLER_HEADER, user_id);
    }
    builder.body(Body::from(body)).expect("request")
}

fn seeded() -> TestApp {
    let app = app_on(date(2024, 3, 5));
    app.with_db(|conn| {
        seed_school_with_teacher(conn);
    });
    app
}

#[tokio::test]
async fn stores_file_under_dated_folder_and_reports_digest() {
    let app = seeded();
    let content = b"unit plan, week 1".to_vec();
    let (status, body) = app
        .send(upload_request(
            Some("u-teacher"),
            multipart_body("file", "plan.pdf", "application/pdf", &content),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let url = body["url"].as_str().expect("url");
    assert!(url.starts_with("/media/uploads/2024/3/"), "{}", url);
    assert!(url.ends_with(".pdf"), "{}", url);
    assert_eq!(body["name"], "plan.pdf");
    assert_eq!(body["size"], content.len() as u64);
    assert_eq!(body["type"], "application/pdf");

    let mut hasher = Sha256::new();
    hasher.update(&content);
    assert_eq!(body["sha256"], hex::encode(hasher.finalize()));

    let relative = url.trim_start_matches("/media/");
    let on_disk = std::fs::read(app.config().media_root.join(relative)).expect("stored file");
    assert_eq!(on_disk, content);
}

#[tokio::test]
async fn missing_file_field_is_rejected() {
    let app = seeded();
    let (status, body) = app
        .send(upload_request(
            Some("u-teacher"),
            multipart_body("attachment", "plan.pdf", "application/pdf", b"x"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn file_over_ten_megabytes_is_rejected() {
    let app = seeded();
    let content = vec![b'a'; 10 * 1024 * 1024 + 1];
    let (status, body) = app
        .send(upload_request(
            Some("u-teacher"),
            multipart_body("file", "big.bin", "application/octet-stream", &content),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File too large. Maximum size is 10MB.");
    assert!(!app.config().media_root.join("uploads").exists());
}

#[tokio::test]
async fn upload_requires_a_caller() {
    let app = seeded();
    let (status, _) = app
        .send(upload_request(
            None,
            multipart_body("file", "plan.pdf", "application/pdf", b"x"),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn truncated_body_is_not_reported_as_too_large() {
    let app = seeded();
    let mut body = multipart_body("file", "plan.pdf", "application/pdf", b"unit plan");
    // Cut off the closing boundary.
    body.truncate(body.len() - BOUNDARY.len() - 8);
    let (status, response) = app.send(upload_request(Some("u-teacher"), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", response);
    let message = response["error"].as_str().unwrap_or_default();
    assert!(!message.is_empty(), "{}", response);
    assert_ne!(message, "File too large. Maximum size is 10MB.");
    assert!(!app.config().media_root.join("uploads").exists());
}
