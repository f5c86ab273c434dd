mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use chaptrack::cache::CacheService;
use chaptrack::infra::http::{self, ApiRateLimiter, ApiState, REQUEST_ID_HEADER};

use support::{InMemoryChapters, chapter_json, memory_backend, memory_cache, physics, services};

const TOKEN: &str = "test-admin-token";
const BODY_LIMIT: usize = 5 * 1024 * 1024;

struct TestApp {
    router: Router,
    store: Arc<InMemoryChapters>,
}

fn app_with(cache: CacheService, admin_token: Option<&str>, max_requests: u32) -> TestApp {
    let store = InMemoryChapters::new();
    let (chapters, analytics) = services(store.clone(), cache.clone());
    let state = ApiState {
        chapters,
        analytics,
        store: store.clone(),
        cache,
        admin_token: admin_token.map(Arc::from),
        rate_limiter: Arc::new(ApiRateLimiter::new(Duration::from_secs(60), max_requests)),
        started_at: Instant::now(),
    };
    TestApp {
        router: http::build_router(state, BODY_LIMIT),
        store,
    }
}

fn app() -> TestApp {
    app_with(memory_cache(memory_backend()), Some(TOKEN), 10_000)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn admin_json(method: Method, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn admin_empty(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .expect("request should build")
}

fn multipart_upload(field: &str, content_type: &str, contents: &str) -> Request<Body> {
    let boundary = "chaptrack-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"chapters.json\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {contents}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chapters")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}

async fn create(app: &TestApp, payload: Value) -> Value {
    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters/single", &payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn banner_lists_the_endpoints() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chapter Performance API v1.0.0");
    assert_eq!(body["endpoints"]["analytics"], "/api/v1/chapters/analytics");
}

#[tokio::test]
async fn health_reports_store_and_cache() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], "connected");

    app.store.fail_reads(true);
    let (status, body) = send(&app.router, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["store"], "unavailable");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(get("/api/v1/chapters"))
        .await
        .expect("router should respond");
    assert!(response.headers().contains_key(REQUEST_ID_HEADER));
}

#[tokio::test]
async fn admin_routes_require_a_bearer_token() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chapters/single")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(physics("Kinematics").to_string()))
        .expect("request should build");
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Access denied. No token provided. Use Bearer token in Authorization header."
    );

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/v1/chapters/{}", uuid::Uuid::new_v4()))
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .expect("request should build");
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied. Invalid admin token.");
}

#[tokio::test]
async fn admin_routes_are_closed_without_a_configured_token() {
    let app = app_with(memory_cache(memory_backend()), None, 10_000);
    let (status, _) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters/single", &physics("Optics")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn single_create_then_fetch() {
    let app = app();
    let created = create(&app, physics("Kinematics")).await;
    assert_eq!(created["totalQuestions"], 10);
    assert_eq!(created["completionPercentage"], 50);

    let id = created["id"].as_str().expect("id");
    let (status, body) = send(&app.router, get(&format!("/api/v1/chapters/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["chapter"], "Kinematics");
}

#[tokio::test]
async fn invalid_payload_lists_every_problem() {
    let app = app();
    let payload = json!({ "subject": "Biology", "class": "Class 13" });
    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters/single", &payload),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert!(fields.contains(&"subject"));
    assert!(fields.contains(&"chapter"));
    assert!(fields.contains(&"class"));
    assert!(fields.contains(&"unit"));
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let app = app();
    let (status, body) = send(
        &app.router,
        get(&format!("/api/v1/chapters/{}", uuid::Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Chapter not found");

    let (status, body) = send(&app.router, get("/api/v1/chapters/not-an-id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "id");
    assert_eq!(body["details"][0]["message"], "Invalid chapter ID format");
}

#[tokio::test]
async fn update_and_delete_round() {
    let app = app();
    let created = create(&app, physics("Kinematics")).await;
    let id = created["id"].as_str().expect("id").to_string();

    let mut changed = physics("Kinematics");
    changed["status"] = json!("Completed");
    let (status, body) = send(
        &app.router,
        admin_json(Method::PUT, &format!("/api/v1/chapters/{id}"), &changed),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Completed");

    let (status, body) = send(
        &app.router,
        admin_empty(Method::DELETE, &format!("/api/v1/chapters/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chapter deleted successfully");

    let (status, _) = send(
        &app.router,
        admin_empty(Method::DELETE, &format!("/api/v1/chapters/{id}")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        admin_json(Method::PUT, &format!("/api/v1/chapters/{id}"), &changed),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_upload_status_reflects_outcome() {
    let app = app();

    let all_good = json!([physics("Kinematics"), physics("Optics")]);
    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &all_good),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "2 chapters created successfully, 0 failed");

    let mixed = json!([
        physics("Waves"),
        chapter_json("Biology", "Cells", "Not Started", false),
        physics("Thermodynamics"),
        chapter_json("Astronomy", "Stars", "Completed", true),
        physics("Gravitation"),
    ]);
    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &mixed),
    )
    .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "3 chapters created successfully, 2 failed");
    assert_eq!(body["data"]["failed"][0]["index"], 1);
    assert_eq!(body["data"]["failed"][1]["index"], 3);
    assert_eq!(body["data"]["failed"][1]["chapter"]["subject"], "Astronomy");

    let all_bad = json!([chapter_json("Biology", "Cells", "Not Started", false)]);
    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &all_bad),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    assert_eq!(app.store.len().await, 5);
}

#[tokio::test]
async fn bulk_upload_rejects_malformed_input() {
    let app = app();

    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &json!([])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Chapters array cannot be empty");

    let (status, body) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &physics("Kinematics")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Please provide chapters data as JSON array in request body or upload a JSON file"
    );
}

#[tokio::test]
async fn bulk_body_failures_are_classified() {
    let app = app();

    let oversized = format!("[\"{}\"]", "x".repeat(BODY_LIMIT + 1));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chapters")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(oversized))
        .expect("request should build");
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "Request payload exceeds the size limit");

    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(b"[{")),
        Err(std::io::Error::other("connection reset")),
    ];
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chapters")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .expect("request should build");
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Please provide chapters data as JSON array in request body or upload a JSON file"
    );
    assert_eq!(app.store.len().await, 0);
}

#[tokio::test]
async fn bulk_upload_accepts_a_json_file() {
    let app = app();
    let contents = json!([physics("Kinematics"), physics("Optics")]).to_string();

    let (status, body) = send(
        &app.router,
        multipart_upload("chapters", "application/json", &contents),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["successful"][1]["index"], 1);
}

#[tokio::test]
async fn bulk_upload_rejects_bad_files() {
    let app = app();

    let (status, body) = send(
        &app.router,
        multipart_upload("chapters", "text/plain", "[]"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only JSON files are allowed");

    let (status, body) = send(
        &app.router,
        multipart_upload("chapters", "application/json", "{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON file format");

    let (status, body) = send(
        &app.router,
        multipart_upload("chapters", "application/json", "{\"subject\":\"Physics\"}"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Chapters data must be an array");
}

#[tokio::test]
async fn list_validates_query_and_paginates() {
    let app = app();
    let records = Value::Array((0..25).map(|n| physics(&format!("Chapter {n}"))).collect());
    let (status, _) = send(
        &app.router,
        admin_json(Method::POST, "/api/v1/chapters", &records),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app.router, get("/api/v1/chapters?page=3&limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["chapters"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["data"]["pagination"]["totalPages"], 3);
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
    assert_eq!(body["data"]["pagination"]["hasPrevPage"], true);

    let (status, body) = send(
        &app.router,
        get("/api/v1/chapters?limit=500&weakChapters=sometimes"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"].as_array().map(Vec::len), Some(2));

    let (status, body) = send(
        &app.router,
        get("/api/v1/chapters?subject=Physics&class=Class%2011&weakChapters=false"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["totalChapters"], 25);
}

#[tokio::test]
async fn aggregate_routes_are_not_treated_as_ids() {
    let app = app();
    create(&app, chapter_json("Chemistry", "Mole Concept", "Completed", true)).await;

    let (status, body) = send(&app.router, get("/api/v1/chapters/analytics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["overview"]["totalChapters"], 1);
    assert_eq!(body["data"]["overview"]["completionPercentage"], 100);

    let (status, body) = send(&app.router, get("/api/v1/chapters/filters")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subjects"], json!(["Chemistry"]));
}

#[tokio::test]
async fn store_failures_are_reported_generically() {
    let app = app();
    app.store.fail_reads(true);

    let (status, body) = send(&app.router, get("/api/v1/chapters")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Database operation failed");
}

#[tokio::test]
async fn rate_limit_rejects_excess_requests_per_client() {
    let app = app_with(memory_cache(memory_backend()), Some(TOKEN), 2);
    let from = |ip: &str| {
        Request::builder()
            .uri("/api/v1/chapters")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .expect("request should build")
    };

    for _ in 0..2 {
        let (status, _) = send(&app.router, from("198.51.100.1")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = app
        .router
        .clone()
        .oneshot(from("198.51.100.1"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(
        body["error"],
        "Too many requests from this IP, please try again later."
    );
    assert!(body["retryAfter"].as_u64().is_some_and(|secs| secs >= 1));

    let (status, _) = send(&app.router, from("198.51.100.2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_routes_use_the_envelope() {
    let app = app();
    let (status, body) = send(&app.router, get("/api/v2/chapters")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
