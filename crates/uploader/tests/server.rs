use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;
use sha2::{Digest, Sha256};
use signed_image_uploader::signing::{POSTING_ROLE, SIGNING_CHALLENGE, recover_public_key};
use signed_image_uploader::{
    ImageFile, ImageUploader, PostingKey, ProgressEvent, StaticIdentity, UploadError,
    UploaderConfig,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Image host that accepts an upload only if the signature recovers `posting_key`.
#[derive(Clone)]
struct ImageHost {
    posting_key: Vec<u8>,
}

async fn upload_handler(
    State(host): State<ImageHost>,
    Path((user, signature)): Path<(String, String)>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut image = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            image = Some((name, content_type, field.bytes().await.unwrap()));
        }
    }
    let Some((name, content_type, data)) = image else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "missing file field" })));
    };

    let mut payload = SIGNING_CHALLENGE.as_bytes().to_vec();
    payload.extend_from_slice(&data);
    let digest = Sha256::digest(&payload);

    let recovered = hex::decode(&signature)
        .ok()
        .and_then(|sig| recover_public_key(&digest, &sig).ok());

    match recovered {
        Some(key) if key == host.posting_key => (
            StatusCode::OK,
            Json(json!({
                "url": format!("https://images.example.com/{user}/{name}"),
                "size": data.len(),
                "type": content_type,
            })),
        ),
        _ => (StatusCode::OK, Json(json!({ "error": "invalid signature" }))),
    }
}

async fn spawn_host(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/upload")
}

async fn spawn_image_host(posting_key: &PostingKey) -> String {
    let router = Router::new()
        .route("/upload/{user}/{signature}", post(upload_handler))
        .with_state(ImageHost {
            posting_key: posting_key.public_key_bytes(),
        });
    spawn_host(router).await
}

fn alice_key() -> PostingKey {
    PostingKey::from_login("alice", "correct horse battery staple", POSTING_ROLE).unwrap()
}

fn http_uploader(endpoint: &str) -> ImageUploader {
    ImageUploader::new(UploaderConfig::new(endpoint).unwrap()).unwrap()
}

async fn collect(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn signed_upload_is_accepted() {
    let endpoint = spawn_image_host(&alice_key()).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());
    let image = ImageFile::from_bytes("cat.png", b"\x89PNG\r\n\x1a\nmeow".to_vec());
    let (tx, rx) = mpsc::unbounded_channel();

    let url = uploader.upload(&identity, &image, &tx).await.unwrap();
    drop(tx);

    assert_eq!(url, "https://images.example.com/alice/cat.png");
    let events = collect(rx).await;
    assert_eq!(events.first(), Some(&ProgressEvent::Message("Preparing image...".into())));
    assert!(events.contains(&ProgressEvent::Message("Uploading 100%".into())), "events: {events:?}");
    assert_eq!(events.last(), Some(&ProgressEvent::Url(url)));
}

#[tokio::test]
async fn large_upload_reports_incremental_progress() {
    let endpoint = spawn_image_host(&alice_key()).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());
    let image = ImageFile::from_bytes("big.jpg", vec![0xabu8; 200 * 1024]);
    let (tx, rx) = mpsc::unbounded_channel();

    uploader.upload(&identity, &image, &tx).await.unwrap();
    drop(tx);

    let events = collect(rx).await;
    let uploading: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Message(m) if m.starts_with("Uploading ") => Some(m.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(uploading, ["Uploading 32%", "Uploading 64%", "Uploading 96%", "Uploading 100%"]);
    assert!(matches!(events.last(), Some(ProgressEvent::Url(_))));
}

#[tokio::test]
async fn image_read_from_disk_is_uploaded() {
    let endpoint = spawn_image_host(&alice_key()).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dog.webp");
    std::fs::write(&path, b"RIFF....WEBP").unwrap();

    let url = uploader
        .upload(&identity, &ImageFile::from_path(&path), &signed_image_uploader::NoProgress)
        .await
        .unwrap();

    assert_eq!(url, "https://images.example.com/alice/dog.webp");
}

#[tokio::test]
async fn signature_from_another_key_is_rejected_by_server() {
    let endpoint = spawn_image_host(&alice_key()).await;
    let uploader = http_uploader(&endpoint);
    let mallory = PostingKey::from_login("mallory", "guess", POSTING_ROLE).unwrap();
    let identity = StaticIdentity::new("alice", mallory.to_wif());
    let (tx, rx) = mpsc::unbounded_channel();

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &tx)
        .await
        .unwrap_err();
    drop(tx);

    assert!(matches!(&err, UploadError::ServerError(m) if m == "invalid signature"));
    assert_eq!(collect(rx).await.last(), Some(&ProgressEvent::Error("invalid signature".into())));
}

#[tokio::test]
async fn server_failure_status_is_reported() {
    let router = Router::new().route(
        "/upload/{user}/{signature}",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let endpoint = spawn_host(router).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &signed_image_uploader::NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::HttpFailure { status: 500, .. }));
    assert!(err.to_string().contains("Upload failed: Internal Server Error"));
}

#[tokio::test]
async fn nonstandard_status_is_reported_by_code() {
    let router = Router::new().route(
        "/upload/{user}/{signature}",
        post(|| async { (StatusCode::from_u16(599).unwrap(), "upstream gone") }),
    );
    let endpoint = spawn_host(router).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &signed_image_uploader::NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::HttpFailure { status: 599, .. }));
    assert_eq!(err.to_string(), "Upload failed: 599");
}

#[tokio::test]
async fn unknown_route_is_http_failure() {
    let endpoint = spawn_image_host(&alice_key()).await;
    let uploader = http_uploader(&format!("{endpoint}/nested/too/deep"));
    let identity = StaticIdentity::new("alice", alice_key().to_wif());

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &signed_image_uploader::NoProgress)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Upload failed: Not Found");
}

#[tokio::test]
async fn non_json_success_body_is_invalid_response() {
    let router = Router::new().route(
        "/upload/{user}/{signature}",
        post(|| async { (StatusCode::OK, "<html>stored</html>") }),
    );
    let endpoint = spawn_host(router).await;
    let uploader = http_uploader(&endpoint);
    let identity = StaticIdentity::new("alice", alice_key().to_wif());

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &signed_image_uploader::NoProgress)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::MalformedResponse));
}

#[tokio::test]
async fn refused_connection_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let uploader = http_uploader(&format!("http://{addr}/upload"));
    let identity = StaticIdentity::new("alice", alice_key().to_wif());
    let (tx, rx) = mpsc::unbounded_channel();

    let err = uploader
        .upload(&identity, &ImageFile::from_bytes("cat.png", b"meow".to_vec()), &tx)
        .await
        .unwrap_err();
    drop(tx);

    assert!(matches!(err, UploadError::NetworkFailure(_)));
    assert!(err.to_string().contains("Network error"));
    assert_eq!(
        collect(rx).await.last(),
        Some(&ProgressEvent::Error("Network error during upload.".into()))
    );
}
