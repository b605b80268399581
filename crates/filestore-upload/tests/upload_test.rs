use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use filestore_core::StorageIdentity;
use filestore_storage::{FileStorage, LocalStorage};
use filestore_upload::{
    routes, FileFilter, StaticDestination, StorageEngineExt, UploadMode, UploadState, UploadType,
};
use std::sync::Arc;
use tempfile::TempDir;

struct TestApp {
    _dir: TempDir,
    storage: Arc<FileStorage>,
    server: TestServer,
}

async fn setup(mode: UploadMode, filter: Option<FileFilter>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let backend = LocalStorage::new(dir.path().to_path_buf(), None)
        .await
        .unwrap();
    let storage = Arc::new(FileStorage::with_backend(
        StorageIdentity::new("test-project", "test-bucket"),
        Arc::new(backend),
    ));

    let mut state = UploadState::new(storage.storage_engine(StaticDestination::new("uploads")), mode);
    if let Some(filter) = filter {
        state = state.with_filter(filter);
    }

    let server = TestServer::new(routes(state, "/upload").into_make_service())
        .expect("Failed to create test server");

    TestApp {
        _dir: dir,
        storage,
        server,
    }
}

fn text_part(content: &str, name: &str, mimetype: &str) -> Part {
    Part::bytes(content.as_bytes().to_vec())
        .file_name(name)
        .mime_type(mimetype)
}

#[tokio::test]
async fn test_single_upload_stores_file() {
    let app = setup(UploadMode::single("file"), None).await;

    let form = MultipartForm::new()
        .add_text("description", "a note")
        .add_part("file", text_part("hello upload", "note.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["fields"]["description"], "a note");

    let files = body["files"].as_array().expect("Expected files array");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["bucket"], "test-bucket");
    assert_eq!(files[0]["original_name"], "note.txt");
    assert_eq!(files[0]["size"], 12);

    let path = files[0]["path"].as_str().unwrap();
    assert!(path.starts_with("uploads/"));
    assert!(path.ends_with(".txt"));
    assert_eq!(app.storage.read_file(path).await.unwrap(), "hello upload");
}

#[tokio::test]
async fn test_single_upload_rejects_second_file() {
    let app = setup(UploadMode::single("file"), None).await;

    let form = MultipartForm::new()
        .add_part("file", text_part("one", "one.txt", "text/plain"))
        .add_part("file", text_part("two", "two.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "bad upload");
}

#[tokio::test]
async fn test_unexpected_field_is_bad_upload() {
    let app = setup(UploadMode::single("file"), None).await;

    let form = MultipartForm::new().add_part("avatar", text_part("x", "x.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "bad upload");
    assert!(body["details"].as_str().unwrap().contains("avatar"));
}

#[tokio::test]
async fn test_array_upload_respects_max_count() {
    let app = setup(UploadMode::array("photos", 2), None).await;

    let form = MultipartForm::new()
        .add_part("photos", text_part("a", "a.txt", "text/plain"))
        .add_part("photos", text_part("b", "b.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["files"].as_array().unwrap().len(), 2);

    let form = MultipartForm::new()
        .add_part("photos", text_part("a", "a.txt", "text/plain"))
        .add_part("photos", text_part("b", "b.txt", "text/plain"))
        .add_part("photos", text_part("c", "c.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_any_upload_accepts_multiple_fields() {
    let app = setup(UploadMode::Any, None).await;

    let form = MultipartForm::new()
        .add_part("first", text_part("1", "1.txt", "text/plain"))
        .add_part("second", text_part("2", "2.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["field_name"], "first");
    assert_eq!(files[1]["field_name"], "second");

    let listed = app.storage.list_files(Some("uploads/")).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_filter_skips_rejected_files() {
    let app = setup(UploadMode::Any, Some(FileFilter::new(UploadType::Image))).await;

    let png = Part::bytes(vec![0x89, 0x50, 0x4E, 0x47])
        .file_name("pixel.png")
        .mime_type("image/png");
    let form = MultipartForm::new()
        .add_part("image", png)
        .add_part("doc", text_part("not an image", "notes.txt", "text/plain"));
    let response = app.server.post("/upload").multipart(form).await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["original_name"], "pixel.png");
    assert_eq!(files[0]["mimetype"], "image/png");
}
