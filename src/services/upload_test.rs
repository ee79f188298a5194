use std::collections::HashSet;

use axum::body::Body;
use axum::extract::FromRequest;
use axum::http::Request;

use super::*;

const BOUNDARY: &str = "X-HOMESTAY-BOUNDARY";

fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(f) => {
                body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n"));
                body.push_str("Content-Type: application/octet-stream\r\n\r\n");
            }
            None => body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/host/homes")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Multipart {
    Multipart::from_request(multipart_request(parts), &()).await.unwrap()
}

fn is_stored_name_for(name: &str, original: &str) -> bool {
    let Some((token, rest)) = name.split_once('-') else {
        return false;
    };
    token.len() == TOKEN_LEN && token.chars().all(|c| c.is_ascii_alphanumeric()) && rest == original
}

// =============================================================================
// naming
// =============================================================================

#[test]
fn file_token_shape() {
    let token = generate_file_token();
    assert_eq!(token.len(), TOKEN_LEN);
    assert!(token.bytes().all(|b| TOKEN_ALPHABET.contains(&b)));
}

#[test]
fn stored_filename_keeps_original_suffix() {
    let name = stored_filename("cat.png");
    assert!(is_stored_name_for(&name, "cat.png"), "unexpected name {name}");
}

#[test]
fn stored_filenames_do_not_collide() {
    let names: HashSet<String> = (0..1000).map(|_| stored_filename("cat.png")).collect();
    assert_eq!(names.len(), 1000);
}

#[test]
fn sanitize_strips_directories() {
    assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_filename("C:\\photos\\beach.jpg"), "beach.jpg");
    assert_eq!(sanitize_filename("  villa.png "), "villa.png");
}

#[test]
fn sanitize_falls_back_for_empty_names() {
    assert_eq!(sanitize_filename(""), "upload");
    assert_eq!(sanitize_filename("photos/"), "upload");
    assert_eq!(sanitize_filename(".."), "upload");
}

#[test]
fn public_url_uses_canonical_prefix() {
    assert_eq!(UploadStore::public_url("abc-cat.png"), "/uploads/abc-cat.png");
}

// =============================================================================
// accept
// =============================================================================

#[tokio::test]
async fn accept_stores_named_field_and_collects_text() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path().join("uploads"), "photo");

    let parts = store
        .accept(multipart(&[("house_name", None, "Seaside"), ("photo", Some("cat.png"), "PNGDATA")]).await)
        .await
        .unwrap();

    assert_eq!(parts.fields.get("house_name").map(String::as_str), Some("Seaside"));
    let file = parts.file.unwrap();
    assert!(is_stored_name_for(&file.filename, "cat.png"));
    assert_eq!(file.original_name, "cat.png");
    assert_eq!(file.url, format!("/uploads/{}", file.filename));
    assert_eq!(file.bytes, 7);
    assert_eq!(std::fs::read(&file.path).unwrap(), b"PNGDATA");
}

#[tokio::test]
async fn accept_without_field_yields_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path(), "photo");

    let parts = store.accept(multipart(&[("house_name", None, "Cabin")]).await).await.unwrap();

    assert!(parts.file.is_none());
    assert_eq!(parts.fields.len(), 1);
}

#[tokio::test]
async fn accept_ignores_other_file_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path(), "photo");

    let parts = store
        .accept(multipart(&[("avatar", Some("me.png"), "AVATAR")]).await)
        .await
        .unwrap();

    assert!(parts.file.is_none());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn accept_treats_empty_filename_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path(), "photo");

    let parts = store.accept(multipart(&[("photo", Some(""), "")]).await).await.unwrap();

    assert!(parts.file.is_none());
}

#[tokio::test]
async fn accept_sanitizes_traversal_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path(), "photo");

    let parts = store
        .accept(multipart(&[("photo", Some("../../evil.sh"), "x")]).await)
        .await
        .unwrap();

    let file = parts.file.unwrap();
    assert_eq!(file.path.parent().unwrap(), dir.path());
    assert!(is_stored_name_for(&file.filename, "evil.sh"));
}

// =============================================================================
// remove
// =============================================================================

#[tokio::test]
async fn remove_deletes_stored_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = UploadStore::new(dir.path(), "photo");
    let parts = store
        .accept(multipart(&[("photo", Some("cat.png"), "x")]).await)
        .await
        .unwrap();
    let file = parts.file.unwrap();

    store.remove(&file.url).await;
    assert!(!file.path.exists());
}

#[tokio::test]
async fn remove_ignores_foreign_urls() {
    let dir = tempfile::tempdir().unwrap();
    let outside = dir.path().join("keep.txt");
    std::fs::write(&outside, "keep").unwrap();
    let store = UploadStore::new(dir.path().join("uploads"), "photo");

    store.remove("/static/keep.txt").await;
    store.remove("/uploads/missing.png").await;
    assert!(outside.exists());
}
