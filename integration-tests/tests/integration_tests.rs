use axum::http::StatusCode;
use axum_test::TestServer;
use common::{
    storage::{
        memory::MemoryJobStore,
        store::{create_job_store, DynJobStore, JobStore},
        types::job_record::JobStatus,
    },
    utils::config::{AppConfig, DispatchKind, JobStoreKind},
};
use search_pipeline::run_worker_loop;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::{
    sync::Notify,
    time::{sleep, Duration},
};

use test_utils::*;

// End-to-end tests for the search job API: submission, background work and polling.

async fn poll(server: &TestServer, job_id: &str) -> (StatusCode, Value) {
    let response = server
        .get("/api/v1/search-status")
        .add_query_param("jobId", job_id)
        .await;
    (response.status_code(), response.json::<Value>())
}

async fn poll_until_terminal(server: &TestServer, job_id: &str) -> Vec<Value> {
    let mut seen = Vec::new();
    for _ in 0..200 {
        let (status, body) = poll(server, job_id).await;
        assert_eq!(status, StatusCode::OK);
        let terminal = body["status"] == "complete" || body["status"] == "error";
        seen.push(body);
        if terminal {
            return seen;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached a terminal state: {seen:?}");
}

fn stage(body: &Value) -> u8 {
    match body["status"].as_str() {
        Some("pending") => 0,
        Some("searching") => 1,
        Some("complete" | "error") => 2,
        other => panic!("unexpected status {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_poll_and_complete() {
    let gate = Arc::new(Notify::new());
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::gated(AUSTIN_RESULTS, gate.clone()),
    );
    let server = TestServer::new(app.router).expect("test server");

    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "abc123", "location": "Austin, TX", "preference": "both" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert_eq!(
        response.json::<Value>(),
        json!({ "jobId": "abc123", "status": "pending" })
    );

    // No worker is running yet, so the job must still read as pending.
    let (status, body) = poll(&server, "abc123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(body["createdAt"].is_i64());
    assert_eq!(body["params"]["preference"], "both");

    tokio::spawn(run_worker_loop(app.queue, app.worker, 2));

    let mut searching_seen = false;
    for _ in 0..200 {
        let (_, body) = poll(&server, "abc123").await;
        if body["status"] == "searching" {
            assert!(body["createdAt"].is_i64());
            searching_seen = true;
            break;
        }
        sleep(Duration::from_millis(5)).await;
    }
    assert!(searching_seen, "worker never reported searching");
    gate.notify_one();

    let seen = poll_until_terminal(&server, "abc123").await;
    assert!(seen.windows(2).all(|pair| stage(&pair[0]) <= stage(&pair[1])));

    let done = seen.last().expect("terminal record");
    assert_eq!(done["status"], "complete");
    assert!(done["completedAt"].is_i64());
    assert_eq!(done["results"]["categories"][0]["name"], "Treatment Centers");
    assert_eq!(
        done["results"]["categories"][0]["resources"][0]["phone"],
        "555-0100"
    );

    // Terminal records do not change on re-read.
    let (_, again) = poll(&server, "abc123").await;
    assert_eq!(&again, done);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );
    let server = TestServer::new(app.router).expect("test server");

    let (status, body) = poll(&server, "nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn test_invalid_submissions_leave_no_record() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );
    let server = TestServer::new(app.router).expect("test server");

    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "no-location" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
    assert_eq!(poll(&server, "no-location").await.0, StatusCode::NOT_FOUND);

    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/api/v1/search-start")
        .text(r#"{"jobId": "truncated", "location": "#)
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(poll(&server, "truncated").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_submission_reports_existing_job() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );
    let server = TestServer::new(app.router).expect("test server");
    tokio::spawn(run_worker_loop(app.queue, app.worker, 1));

    let body = json!({ "jobId": "dup", "location": "Austin, TX" });
    let first = server.post("/api/v1/search-start").json(&body).await;
    assert_eq!(first.status_code(), StatusCode::ACCEPTED);

    poll_until_terminal(&server, "dup").await;

    let second = server.post("/api/v1/search-start").json(&body).await;
    assert_eq!(second.status_code(), StatusCode::OK);
    assert_eq!(
        second.json::<Value>(),
        json!({ "jobId": "dup", "status": "complete" })
    );

    // The completed record was not reset by the resubmission.
    let (_, record) = poll(&server, "dup").await;
    assert_eq!(record["status"], "complete");
}

#[tokio::test]
async fn test_failed_search_is_reported_as_error_record() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::failing("model quota exhausted"),
    );
    let server = TestServer::new(app.router).expect("test server");
    tokio::spawn(run_worker_loop(app.queue, app.worker, 1));

    server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "broken", "location": "Reno, NV" }))
        .await;

    let seen = poll_until_terminal(&server, "broken").await;
    let last = seen.last().expect("terminal record");
    assert_eq!(last["status"], "error");
    assert!(last["completedAt"].is_i64());
    assert!(last["error"]
        .as_str()
        .is_some_and(|e| e.contains("model quota exhausted")));
}

#[tokio::test]
async fn test_unstructured_results_fall_back() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding("Try calling the ANAD helpline for local referrals."),
    );
    let server = TestServer::new(app.router).expect("test server");
    tokio::spawn(run_worker_loop(app.queue, app.worker, 1));

    server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "prose", "location": "Boise, ID" }))
        .await;

    let seen = poll_until_terminal(&server, "prose").await;
    let last = seen.last().expect("terminal record");
    assert_eq!(last["status"], "complete");
    assert_eq!(last["results"]["fallback"], true);
    assert!(last["results"]["categories"][0]["name"].is_string());
}

#[tokio::test]
async fn test_records_expire_after_ttl() {
    let (app, clock) = build_clocked_app(StubSearcher::responding(AUSTIN_RESULTS));
    let server = TestServer::new(app.router).expect("test server");

    server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "short-lived", "location": "Austin, TX" }))
        .await;
    assert_eq!(poll(&server, "short-lived").await.0, StatusCode::OK);

    clock.advance(chrono::Duration::seconds(599));
    assert_eq!(poll(&server, "short-lived").await.0, StatusCode::OK);

    clock.advance(chrono::Duration::seconds(2));
    let (status, body) = poll(&server, "short-lived").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "not_found");

    // An expired identifier can be submitted again.
    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "short-lived", "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_each_write_restarts_the_ttl() {
    let (app, clock) = build_clocked_app(StubSearcher::responding(AUSTIN_RESULTS));
    let store = app.store.clone();
    let server = TestServer::new(app.router).expect("test server");

    server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "late-worker", "location": "Austin, TX" }))
        .await;

    // The worker picks the job up five minutes in and finishes immediately.
    clock.advance(chrono::Duration::seconds(300));
    tokio::spawn(run_worker_loop(app.queue, app.worker, 1));
    poll_until_terminal(&server, "late-worker").await;

    // Past the submission's original window, inside the completion's window.
    clock.advance(chrono::Duration::seconds(400));
    let (status, body) = poll(&server, "late-worker").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "complete");

    clock.advance(chrono::Duration::seconds(201));
    assert_eq!(poll(&server, "late-worker").await.0, StatusCode::NOT_FOUND);
    assert!(store.get("late-worker").await.expect("get").is_none());
}

#[tokio::test]
async fn test_http_dispatch_triggers_background_worker() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");

    let config = AppConfig {
        dispatch: DispatchKind::Http,
        callback_base_url: Some(format!("http://{addr}")),
        worker_secret: Some("s3cret".to_string()),
        ..create_test_config()
    };
    let app = build_test_app(
        &config,
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );

    let served = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, served).await.ok();
    });
    tokio::spawn(run_worker_loop(app.queue, app.worker, 2));

    let server = TestServer::new(app.router).expect("test server");

    // Without the secret the trigger is refused.
    let response = server
        .post("/api/v1/search-resources-background")
        .json(&json!({ "jobId": "sneaky", "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "via-http", "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let seen = poll_until_terminal(&server, "via-http").await;
    assert_eq!(seen.last().expect("terminal")["status"], "complete");
    assert_eq!(poll(&server, "sneaky").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stalled_trigger_host_does_not_delay_submission() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let stalled = axum::Router::new().route(
        "/api/v1/search-resources-background",
        axum::routing::post(|| async {
            sleep(Duration::from_secs(5)).await;
            StatusCode::SERVICE_UNAVAILABLE
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, stalled).await.ok();
    });

    let config = AppConfig {
        dispatch: DispatchKind::Http,
        callback_base_url: Some(format!("http://{addr}")),
        worker_secret: Some("s3cret".to_string()),
        ..create_test_config()
    };
    let app = build_test_app(
        &config,
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );
    let server = TestServer::new(app.router).expect("test server");

    let response = tokio::time::timeout(Duration::from_secs(2), async {
        server
            .post("/api/v1/search-start")
            .json(&json!({ "jobId": "stalled-host", "location": "Austin, TX" }))
            .await
    })
    .await
    .expect("search-start answered while the trigger host was stalled");
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let (status, body) = poll(&server, "stalled-host").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn test_retriggering_a_finished_job_keeps_its_record() {
    let app = build_test_app(
        &create_test_config(),
        Arc::new(MemoryJobStore::new()),
        StubSearcher::responding(AUSTIN_RESULTS),
    );
    let server = TestServer::new(app.router).expect("test server");
    tokio::spawn(run_worker_loop(app.queue, app.worker, 1));

    let body = json!({ "jobId": "done", "location": "Austin, TX" });
    server.post("/api/v1/search-start").json(&body).await;
    let finished = poll_until_terminal(&server, "done")
        .await
        .pop()
        .expect("terminal record");
    assert_eq!(finished["status"], "complete");

    let response = server
        .post("/api/v1/search-resources-background")
        .json(&body)
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    // A trigger for an identifier nobody submitted writes nothing either.
    let response = server
        .post("/api/v1/search-resources-background")
        .json(&json!({ "jobId": "ghost", "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    for _ in 0..20 {
        let (status, record) = poll(&server, "done").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record, finished);
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(poll(&server, "ghost").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_flow_on_surrealdb_store() {
    let config = AppConfig {
        job_store: JobStoreKind::Surrealdb,
        surrealdb_address: "mem://".to_string(),
        ..create_test_config()
    };
    let store: DynJobStore = create_job_store(&config).await.expect("surreal store");
    let app = build_test_app(&config, store.clone(), StubSearcher::responding(AUSTIN_RESULTS));
    let server = TestServer::new(app.router).expect("test server");
    tokio::spawn(run_worker_loop(app.queue, app.worker, 2));

    let response = server
        .post("/api/v1/search-start")
        .json(&json!({ "jobId": "surreal-job", "location": "Austin, TX" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);

    let seen = poll_until_terminal(&server, "surreal-job").await;
    assert_eq!(seen.last().expect("terminal")["status"], "complete");

    let stored = store
        .get("surreal-job")
        .await
        .expect("get")
        .expect("record");
    assert_eq!(stored.status(), JobStatus::Complete);

    let response = server.get("/api/v1/ready").await;
    assert_eq!(response.status_code(), StatusCode::OK);
}
