//! End-to-end HTTP tests: a real server on a free port, driven with `ureq`

use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tasktrack::config::AppConfig;
use tasktrack::http::{serve, App};
use tasktrack::metrics::Metrics;
use tasktrack::migration::{run_startup_migrations, StartupOutcome};
use tasktrack::tasks::PgTaskRepository;
use tasktrack::test_helpers::TestDatabase;
use tasktrack::DbPool;

/// A running server and the database behind it
struct TestServer {
    base: String,
    _db: TestDatabase,
}

impl TestServer {
    fn start(configure: impl FnOnce(&mut AppConfig)) -> Option<Self> {
        let db = TestDatabase::available()?;

        let mut config = AppConfig::default();
        config.database.url = Some(db.url().to_string());
        config.database.max_connections = 2;
        configure(&mut config);

        let outcome = run_startup_migrations(&config).expect("startup migrations");
        assert!(matches!(outcome, StartupOutcome::Migrated { .. }));

        let metrics = Arc::new(Metrics::new().expect("metrics"));
        let pool = DbPool::connect(db.url(), 2, Some(Arc::clone(&metrics.queries))).expect("pool");
        let repo = Arc::new(PgTaskRepository::new(Arc::new(pool)));
        let app = Arc::new(App::new(repo, metrics, &config));

        let port = free_port();
        let addr = format!("127.0.0.1:{port}");
        // The server runs until the test process exits.
        let _handle = serve(app, &addr).expect("bind");

        let server = Self {
            base: format!("http://{addr}"),
            _db: db,
        };
        server.wait_ready();
        Some(server)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn wait_ready(&self) {
        for _ in 0..50 {
            if ureq::get(&self.url("/health")).call().is_ok() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        panic!("server at {} never became ready", self.base);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("free port")
}

/// Status and response for any outcome, including 4xx/5xx
fn respond(result: Result<ureq::Response, ureq::Error>) -> ureq::Response {
    match result {
        Ok(resp) | Err(ureq::Error::Status(_, resp)) => resp,
        Err(e) => panic!("transport error: {e}"),
    }
}

fn body(resp: ureq::Response) -> Value {
    resp.into_json().expect("json body")
}

#[test]
fn test_task_crud_round_trip() {
    let Some(server) = TestServer::start(|_| {}) else {
        return;
    };

    let created = respond(
        ureq::post(&server.url("/tasks/"))
            .send_json(json!({ "title": "Buy milk", "description": "2 litres", "tag": "home" })),
    );
    assert_eq!(created.status(), 201);
    assert_eq!(created.header("x-frame-options"), Some("DENY"));
    let task = body(created);
    assert_eq!(task["title"], "Buy milk");
    assert_eq!(task["completed"], false);
    let id = task["id"].as_i64().expect("id");

    let fetched = body(respond(ureq::get(&server.url(&format!("/tasks/{id}"))).call()));
    assert_eq!(fetched, task);

    let completed = respond(ureq::patch(&server.url(&format!("/tasks/{id}/complete"))).call());
    assert_eq!(completed.status(), 200);
    assert_eq!(body(completed)["completed"], true);

    let replaced = respond(
        ureq::put(&server.url(&format!("/tasks/{id}")))
            .send_json(json!({ "title": "Buy bread" })),
    );
    assert_eq!(replaced.status(), 200);
    let replaced = body(replaced);
    assert_eq!(replaced["title"], "Buy bread");
    assert_eq!(replaced["description"], Value::Null);
    assert_eq!(replaced["completed"], true);

    let deleted = respond(ureq::delete(&server.url(&format!("/tasks/{id}"))).call());
    assert_eq!(deleted.status(), 204);

    let missing = respond(ureq::get(&server.url(&format!("/tasks/{id}"))).call());
    assert_eq!(missing.status(), 404);
    assert_eq!(body(missing)["detail"], "Task not found");
}

#[test]
fn test_list_filters_against_postgres() {
    let Some(server) = TestServer::start(|_| {}) else {
        return;
    };
    for (title, tag) in [("Buy milk", "home"), ("File 100% of taxes", "admin"), ("Walk", "home")] {
        let resp = respond(
            ureq::post(&server.url("/tasks/")).send_json(json!({ "title": title, "tag": tag })),
        );
        assert_eq!(resp.status(), 201);
    }

    let home = body(respond(ureq::get(&server.url("/tasks/?tag=home")).call()));
    assert_eq!(home.as_array().map(Vec::len), Some(2));

    // `%` is matched literally, not as a wildcard.
    let percent = body(respond(
        ureq::get(&server.url("/tasks/")).query("search", "100%").call(),
    ));
    assert_eq!(percent.as_array().map(Vec::len), Some(1));
    assert_eq!(percent[0]["title"], "File 100% of taxes");

    let page = body(respond(
        ureq::get(&server.url("/tasks/?limit=1&offset=1")).call(),
    ));
    assert_eq!(page.as_array().map(Vec::len), Some(1));
    assert_eq!(page[0]["title"], "File 100% of taxes");

    let bad = respond(ureq::get(&server.url("/tasks/?limit=0")).call());
    assert_eq!(bad.status(), 422);
}

#[test]
fn test_error_responses() {
    let Some(server) = TestServer::start(|config| config.limits.max_body_bytes = 64) else {
        return;
    };

    let invalid = respond(
        ureq::post(&server.url("/tasks/"))
            .set("X-Request-Id", "it-1")
            .send_json(json!({ "title": "" })),
    );
    assert_eq!(invalid.status(), 422);
    assert_eq!(body(invalid)["request_id"], "it-1");

    let too_large = respond(
        ureq::post(&server.url("/tasks/"))
            .send_json(json!({ "title": "x".repeat(100) })),
    );
    assert_eq!(too_large.status(), 413);

    let wrong_method = respond(ureq::delete(&server.url("/tasks/")).call());
    assert_eq!(wrong_method.status(), 405);

    let unknown = respond(ureq::get(&server.url("/nowhere")).call());
    assert_eq!(unknown.status(), 404);
}

#[test]
fn test_metrics_after_traffic() {
    let Some(server) = TestServer::start(|_| {}) else {
        return;
    };
    respond(ureq::get(&server.url("/tasks/")).call());

    let metrics = respond(ureq::get(&server.url("/metrics")).call());
    assert_eq!(metrics.status(), 200);
    let text = metrics.into_string().expect("text body");
    assert!(text.contains(r#"http_requests_total{handler="/tasks/",method="GET",status="2xx"} 1"#));
    assert!(text.contains("db_queries_total"));
}
