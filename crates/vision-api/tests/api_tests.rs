//! Router tests against in-memory backends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vision_api::{create_router, AdminCredentials, ApiConfig, AppState};
use vision_firestore::{FirestoreError, FirestoreResult, MediaCatalog};
use vision_models::{
    AnalysisReset, ImageCounts, ImageDocument, ImageId, ProcessingStatus, VideoDocument, VideoId,
};
use vision_storage::{Attachment, AttachmentStore, StorageError, StorageResult};

// "admin:secret"
const ADMIN_BASIC: &str = "Basic YWRtaW46c2VjcmV0";

#[derive(Default)]
struct FakeCatalog {
    videos: Vec<VideoId>,
    images: Mutex<Vec<ImageDocument>>,
    status_unavailable: bool,
    images_unavailable: bool,
}

impl FakeCatalog {
    fn with_images(videos: &[&str], images: Vec<Value>) -> Self {
        Self {
            videos: videos.iter().map(|v| VideoId::from(*v)).collect(),
            images: Mutex::new(
                images
                    .into_iter()
                    .map(|v| serde_json::from_value(v).unwrap())
                    .collect(),
            ),
            status_unavailable: false,
            images_unavailable: false,
        }
    }
}

#[async_trait]
impl MediaCatalog for FakeCatalog {
    async fn get_video(&self, video_id: &VideoId) -> FirestoreResult<Option<VideoDocument>> {
        Ok(self
            .videos
            .contains(video_id)
            .then(|| VideoDocument::new(video_id.clone())))
    }

    async fn images_for_video(&self, video_id: &VideoId) -> FirestoreResult<Vec<ImageDocument>> {
        if self.images_unavailable {
            return Err(FirestoreError::request_failed("runQuery timed out"));
        }
        let images = self.images.lock().unwrap();
        Ok(images
            .iter()
            .filter(|i| i.video_id.as_ref() == Some(video_id))
            .cloned()
            .collect())
    }

    async fn standalone_images(&self) -> FirestoreResult<Vec<ImageDocument>> {
        let images = self.images.lock().unwrap();
        Ok(images.iter().filter(|i| i.is_standalone()).cloned().collect())
    }

    async fn reset_analysis(&self, image_id: &ImageId) -> FirestoreResult<Option<AnalysisReset>> {
        let mut images = self.images.lock().unwrap();
        Ok(images.iter_mut().find(|i| &i.id == image_id).map(|image| {
            image.analysis = None;
            AnalysisReset {
                id: image_id.clone(),
                update_time: Some("2024-05-01T10:00:00Z".to_string()),
            }
        }))
    }

    async fn delete_image(&self, image_id: &ImageId) -> FirestoreResult<bool> {
        let mut images = self.images.lock().unwrap();
        let before = images.len();
        images.retain(|i| &i.id != image_id);
        Ok(images.len() < before)
    }

    async fn processing_status(&self) -> ProcessingStatus {
        if self.status_unavailable {
            return ProcessingStatus::default();
        }
        let images = self.images.lock().unwrap();
        ProcessingStatus::new(
            images.len() as u64,
            images.iter().filter(|i| i.needs_analysis()).count() as u64,
        )
    }

    async fn check_connectivity(&self) -> FirestoreResult<()> {
        if self.status_unavailable {
            return Err(FirestoreError::request_failed("connection refused"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeAttachments {
    objects: HashMap<String, Attachment>,
    deleted: Mutex<Vec<String>>,
}

impl FakeAttachments {
    fn with(doc_id: &str, name: &str, bytes: &[u8]) -> Self {
        let mut objects = HashMap::new();
        objects.insert(
            format!("{}/{}", doc_id, name),
            Attachment {
                bytes: bytes.to_vec(),
                content_type: "image/jpeg".to_string(),
            },
        );
        Self {
            objects,
            deleted: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AttachmentStore for FakeAttachments {
    async fn get_attachment(&self, doc_id: &str, name: &str) -> StorageResult<Attachment> {
        let key = format!("{}/{}", doc_id, name);
        self.objects
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn delete_attachments(&self, doc_id: &str) -> StorageResult<u32> {
        self.deleted.lock().unwrap().push(doc_id.to_string());
        let prefix = format!("{}/", doc_id);
        Ok(self.objects.keys().filter(|k| k.starts_with(&prefix)).count() as u32)
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}

fn app(config: ApiConfig, catalog: FakeCatalog, attachments: FakeAttachments) -> Router {
    let state = AppState::with_backends(config, Arc::new(catalog), Arc::new(attachments));
    create_router(state, None)
}

fn admin_config() -> ApiConfig {
    ApiConfig {
        admin: Some(AdminCredentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        }),
        ..ApiConfig::default()
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri)
        .header(header::HOST, "vision.local")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn face(name: &str, score: f64) -> Value {
    json!({"identity": {"name": name}, "score": score})
}

fn keyword(class: &str, score: f64) -> Value {
    json!({"class": class, "score": score})
}

fn frame(id: &str, video: &str, timecode: f64, faces: Vec<Value>, keywords: Vec<Value>) -> Value {
    json!({
        "id": id,
        "video_id": video,
        "frame_timecode": timecode,
        "analysis": {"face_detection": faces, "image_keywords": keywords}
    })
}

fn video_catalog() -> FakeCatalog {
    FakeCatalog::with_images(
        &["video-1"],
        vec![
            frame("f1", "video-1", 1.0, vec![face("Alice", 0.9), face("Bob", 0.9)], vec![keyword("cat", 0.7)]),
            frame("f2", "video-1", 2.0, vec![face("Alice", 0.86), face("Bob", 0.9)], vec![keyword("dog", 0.65)]),
            frame("f3", "video-1", 3.0, vec![face("Alice", 0.5)], vec![keyword("bird", 0.5)]),
            frame("other", "video-2", 1.0, vec![face("Alice", 0.99)], vec![]),
            json!({"id": "upload-1", "name": "beach.jpg"}),
        ],
    )
}

#[tokio::test]
async fn test_video_summary_keeps_recurring_people_and_keywords() {
    let mut config = ApiConfig::default();
    config.summary.keywords.maximum_occurrence_count = Some(2);

    let (status, body) = get_json(
        app(config, video_catalog(), FakeAttachments::default()),
        "/api/videos/video-1/summary",
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let faces = body["face_detection"].as_array().unwrap();
    assert_eq!(faces.len(), 1);
    let alice = &faces[0]["occurrences"];
    assert_eq!(alice.as_array().unwrap().len(), 1);
    assert_eq!(alice[0]["identity"]["name"], "Alice");
    assert_eq!(alice[0]["score"], 0.9);
    assert_eq!(alice[0]["image_id"], "f1");
    assert_eq!(alice[0]["timecode"], 1.0);
    assert_eq!(alice[0]["image_url"], "http://vision.local/images/image/f1.jpg");

    let classes: Vec<_> = body["image_keywords"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["occurrences"][0]["class"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(classes, vec!["cat", "dog"]);
}

#[tokio::test]
async fn test_video_summary_is_stable() {
    let router = app(ApiConfig::default(), video_catalog(), FakeAttachments::default());

    let (_, first) = get_json(router.clone(), "/api/videos/video-1/summary").await;
    let (_, second) = get_json(router, "/api/videos/video-1/summary").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_video_summary_uses_public_base_url() {
    let config = ApiConfig {
        public_base_url: Some("https://cdn.example.com".to_string()),
        ..ApiConfig::default()
    };

    let (_, body) = get_json(
        app(config, video_catalog(), FakeAttachments::default()),
        "/api/videos/video-1/summary",
    )
    .await;

    assert_eq!(
        body["image_keywords"][0]["occurrences"][0]["image_url"],
        "https://cdn.example.com/images/image/f1.jpg"
    );
}

#[tokio::test]
async fn test_unknown_video_summary_is_an_error() {
    let (status, body) = get_json(
        app(ApiConfig::default(), video_catalog(), FakeAttachments::default()),
        "/api/videos/missing/summary",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_video_summary_fails_when_frames_cannot_be_loaded() {
    let catalog = FakeCatalog {
        images_unavailable: true,
        ..video_catalog()
    };

    let (status, body) = get_json(
        app(ApiConfig::default(), catalog, FakeAttachments::default()),
        "/api/videos/video-1/summary",
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("runQuery timed out"));
    assert!(body.get("face_detection").is_none());
    assert!(body.get("image_keywords").is_none());
}

#[tokio::test]
async fn test_video_summary_tolerates_loose_frame_fields() {
    let catalog = FakeCatalog::with_images(
        &["video-1"],
        vec![
            json!({
                "id": "f1",
                "video_id": "video-1",
                "frame_timecode": "00:00:12.000",
                "analysis": {"image_keywords": [{"class": "cat", "score": 0.8}]}
            }),
            json!({
                "id": "f2",
                "video_id": "video-1",
                "frame_timecode": null,
                "analysis": {"image_keywords": [{"class": "dog", "score": null}, {"score": 0.9}]}
            }),
        ],
    );

    let (status, body) = get_json(
        app(ApiConfig::default(), catalog, FakeAttachments::default()),
        "/api/videos/video-1/summary",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let keywords = body["image_keywords"].as_array().unwrap();
    assert_eq!(keywords.len(), 1);
    assert_eq!(keywords[0]["occurrences"][0]["class"], "cat");
    assert_eq!(keywords[0]["occurrences"][0]["timecode"], "00:00:12.000");
}

#[tokio::test]
async fn test_list_standalone_images() {
    let (status, body) = get_json(
        app(ApiConfig::default(), video_catalog(), FakeAttachments::default()),
        "/api/images",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": "upload-1", "name": "beach.jpg"}]));
}

#[tokio::test]
async fn test_reset_requires_credentials() {
    let (status, headers, _) = send(
        app(admin_config(), video_catalog(), FakeAttachments::default()),
        Request::get("/api/images/f1/reset").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        headers.get(header::WWW_AUTHENTICATE).unwrap(),
        "Basic realm=\"Administrative Area\""
    );
}

#[tokio::test]
async fn test_reset_rejects_wrong_password() {
    let (status, _, _) = send(
        app(admin_config(), video_catalog(), FakeAttachments::default()),
        Request::get("/api/images/f1/reset")
            // "admin:wrong"
            .header(header::AUTHORIZATION, "Basic YWRtaW46d3Jvbmc=")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_image_analysis() {
    let router = app(admin_config(), video_catalog(), FakeAttachments::default());

    let (status, _, body) = send(
        router.clone(),
        Request::get("/api/images/f1/reset")
            .header(header::AUTHORIZATION, ADMIN_BASIC)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"id": "f1", "update_time": "2024-05-01T10:00:00Z"}));

    let (_, status) = get_json(router, "/api/status").await;
    assert_eq!(status["images"]["to_be_analyzed"], 2);
}

#[tokio::test]
async fn test_reset_unknown_image() {
    let (status, body) = get_json(
        app(ApiConfig::default(), video_catalog(), FakeAttachments::default()),
        "/api/images/nope/reset",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_delete_image_and_attachments() {
    let attachments = FakeAttachments::with("upload-1", "image.jpg", b"jpeg");
    let router = app(admin_config(), video_catalog(), attachments);

    let (status, _, body) = send(
        router.clone(),
        Request::delete("/api/images/upload-1")
            .header(header::AUTHORIZATION, ADMIN_BASIC)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"id": "upload-1", "deleted": true, "attachments_deleted": 1}));

    let (_, images) = get_json(router, "/api/images").await;
    assert_eq!(images, json!([]));
}

#[tokio::test]
async fn test_delete_unknown_image() {
    let (status, _, _) = send(
        app(ApiConfig::default(), video_catalog(), FakeAttachments::default()),
        Request::delete("/api/images/nope").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_counts_and_headers() {
    let request = Request::get("/api/status").body(Body::empty()).unwrap();
    let (status, headers, body) = send(
        app(ApiConfig::default(), video_catalog(), FakeAttachments::default()),
        request,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"images": {"count": 5, "to_be_analyzed": 1}}));
}

#[tokio::test]
async fn test_status_omits_unavailable_counts() {
    let catalog = FakeCatalog {
        status_unavailable: true,
        ..FakeCatalog::default()
    };

    let (status, body) = get_json(app(ApiConfig::default(), catalog, FakeAttachments::default()), "/api/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"images": {}}));
    assert_eq!(
        serde_json::from_value::<ProcessingStatus>(body).unwrap().images,
        ImageCounts::default()
    );
}

#[tokio::test]
async fn test_get_attachment() {
    let attachments = FakeAttachments::with("upload-1", "image.jpg", b"\xff\xd8jpeg");

    let (status, headers, body) = send(
        app(ApiConfig::default(), video_catalog(), attachments),
        Request::get("/images/image/upload-1.jpg").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(body, b"\xff\xd8jpeg");
}

#[tokio::test]
async fn test_missing_attachment() {
    let router = app(ApiConfig::default(), video_catalog(), FakeAttachments::default());

    let (status, _, _) = send(
        router.clone(),
        Request::get("/images/thumbnail/video-1.jpg").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(
        router,
        Request::get("/images/image/upload-1.png").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_start_session() {
    let router = app(ApiConfig::default(), FakeCatalog::default(), FakeAttachments::default());

    let (status, _, body) = send(
        router.clone(),
        post_json("/api/sessions/start", json!({"strategy": "follow", "sessionId": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"command": "startSession", "sessionId": 42, "strategy": "follow"}));

    let (_, _, body) = send(router, post_json("/api/sessions/start", json!({"strategy": "patrol"}))).await;
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["sessionId"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_start_session_requires_strategy() {
    let (status, _, body) = send(
        app(ApiConfig::default(), FakeCatalog::default(), FakeAttachments::default()),
        post_json("/api/sessions/start", json!({"sessionId": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("strategy"));
}

#[tokio::test]
async fn test_stop_session() {
    let router = app(ApiConfig::default(), FakeCatalog::default(), FakeAttachments::default());

    let (status, _, body) = send(router.clone(), post_json("/api/sessions/stop", json!({"sessionId": 7}))).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"command": "stopSession", "sessionId": 7}));

    let (status, _, _) = send(router, post_json("/api/sessions/stop", json!({}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_health_and_readiness() {
    let (status, body) = get_json(
        app(ApiConfig::default(), FakeCatalog::default(), FakeAttachments::default()),
        "/health",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let catalog = FakeCatalog {
        status_unavailable: true,
        ..FakeCatalog::default()
    };
    let (status, body) = get_json(app(ApiConfig::default(), catalog, FakeAttachments::default()), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["firestore"]["status"], "error");
    assert_eq!(body["checks"]["storage"]["status"], "ok");
}

#[tokio::test]
async fn test_serves_static_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>vision</h1>").unwrap();

    let config = ApiConfig {
        static_dir: dir.path().to_path_buf(),
        ..ApiConfig::default()
    };
    let router = app(config, FakeCatalog::default(), FakeAttachments::default());

    let (status, _, body) = send(router.clone(), Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<h1>vision</h1>");

    let (status, _, _) = send(router, Request::get("/missing.js").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
