use std::net::SocketAddr;

use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{Value, json};

use rollcall_server::config::{
    AppConfig, CheckinConfig, CorsConfig, DatabaseConfig, ServerConfig, StoreConfig,
};
use rollcall_server::state::AppState;

pub mod routes {
    pub const SESSIONS: &str = "/api/v1/sessions";
    pub const SESSIONS_DEACTIVATE: &str = "/api/v1/sessions/deactivate";
    pub const CHECK_IN: &str = "/api/v1/check-in";
    pub const ATTENDANCE: &str = "/api/v1/attendance";
    pub const DASHBOARD: &str = "/api/v1/summary/dashboard";
    pub const GRID: &str = "/api/v1/summary/grid";
    pub const CLASSROOM_COUNTS: &str = "/api/v1/maintenance/classroom-counts";
    pub const TERMS: &str = "/api/v1/terms";
    pub const ACTIVE_TERM: &str = "/api/v1/terms/active";
    pub const CLASSROOMS: &str = "/api/v1/classrooms";
    pub const SUBJECTS: &str = "/api/v1/subjects";
    pub const STUDENTS: &str = "/api/v1/students";
    pub const HEALTH: &str = "/api/health";

    pub fn session(token: &str) -> String {
        format!("/api/v1/sessions/{token}")
    }

    pub fn session_cancel(token: &str) -> String {
        format!("/api/v1/sessions/{token}/cancel")
    }

    pub fn session_feed(token: &str) -> String {
        format!("/api/v1/sessions/{token}/feed")
    }

    pub fn active_sessions(subject_id: &str) -> String {
        format!("/api/v1/subjects/{subject_id}/sessions/active")
    }

    pub fn attendance_record(id: &str) -> String {
        format!("/api/v1/attendance/{id}")
    }

    pub fn term(id: &str) -> String {
        format!("/api/v1/terms/{id}")
    }

    pub fn term_activate(id: &str) -> String {
        format!("/api/v1/terms/{id}/activate")
    }

    pub fn student(id: &str) -> String {
        format!("/api/v1/students/{id}")
    }
}

/// A running test server backed by a private in-memory SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub state: AppState,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Ids of a seeded school: one active term, two classrooms, one subject
/// taught to the first classroom only, and students in both.
pub struct School {
    pub term_id: String,
    /// Targeted by `subject_id`.
    pub classroom_a: String,
    /// Not targeted by `subject_id`.
    pub classroom_b: String,
    pub subject_id: String,
    /// Students of `classroom_a`, in creation order.
    pub students_a: Vec<String>,
    /// Students of `classroom_b`.
    pub students_b: Vec<String>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        checkin: CheckinConfig::default(),
        store: StoreConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration, e.g. a small `store.batch_size`.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = test_config();
        configure(&mut config);
        // One connection: every transaction runs strictly after the previous one.
        Self::start(config, 1).await
    }

    /// Spawn over a named shared-cache in-memory database with `connections`
    /// pooled connections, so concurrent requests interleave in the store.
    pub async fn spawn_pooled(connections: u32) -> Self {
        let mut config = test_config();
        config.database.url = format!(
            "sqlite:file:rollcall-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        Self::start(config, connections).await
    }

    async fn start(config: AppConfig, connections: u32) -> Self {
        // `min_connections(1)` keeps the in-memory database alive between requests.
        let mut opts = ConnectOptions::new(config.database.url.clone());
        opts.max_connections(connections)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open in-memory database");
        rollcall_server::database::create_schema(&db)
            .await
            .expect("Failed to create schema");
        rollcall_server::database::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");

        let state = AppState::new(db.clone(), config);
        let app = rollcall_server::build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Create a term via the API and return its `id`.
    pub async fn create_term(&self, name: &str, activate: bool) -> String {
        let res = self.post(routes::TERMS, &json!({ "name": name })).await;
        assert_eq!(res.status, 201, "create_term failed: {}", res.text);
        let id = res.id();
        if activate {
            let res = self.post(&routes::term_activate(&id), &json!({})).await;
            assert_eq!(res.status, 200, "activate_term failed: {}", res.text);
        }
        id
    }

    /// Create a classroom in the given term and return its `id`.
    pub async fn create_classroom(&self, term_id: &str, name: &str) -> String {
        let res = self
            .post(
                routes::CLASSROOMS,
                &json!({ "name": name, "level": "M1", "term_id": term_id }),
            )
            .await;
        assert_eq!(res.status, 201, "create_classroom failed: {}", res.text);
        res.id()
    }

    /// Create a subject taught to `classrooms` and return its `id`.
    pub async fn create_subject(&self, term_id: &str, code: &str, classrooms: &[&str]) -> String {
        let res = self
            .post(
                routes::SUBJECTS,
                &json!({
                    "code": code,
                    "name": format!("{code} course"),
                    "classrooms": classrooms,
                    "schedules": [
                        { "day_of_week": 1, "period": 2, "start_time": "09:00", "end_time": "09:50" }
                    ],
                    "term_id": term_id,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "create_subject failed: {}", res.text);
        res.id()
    }

    /// Create a student with a fixed id and return it.
    pub async fn create_student(&self, id: &str, code: &str, classroom_id: &str) -> String {
        let res = self
            .post(
                routes::STUDENTS,
                &json!({
                    "id": id,
                    "student_code": code,
                    "first_name": "Student",
                    "last_name": id,
                    "classroom_id": classroom_id,
                }),
            )
            .await;
        assert_eq!(res.status, 201, "create_student failed: {}", res.text);
        res.id()
    }

    /// Seed a [`School`] with `per_room` students in each classroom.
    pub async fn seed_school(&self, per_room: usize) -> School {
        let term_id = self.create_term("2024/1", true).await;
        let classroom_a = self.create_classroom(&term_id, "M.1/1").await;
        let classroom_b = self.create_classroom(&term_id, "M.1/2").await;
        let subject_id = self
            .create_subject(&term_id, "MATH101", &[&classroom_a])
            .await;

        let mut students_a = Vec::new();
        let mut students_b = Vec::new();
        for i in 1..=per_room {
            students_a.push(
                self.create_student(&format!("A{i}"), &format!("66{i:03}"), &classroom_a)
                    .await,
            );
            students_b.push(
                self.create_student(&format!("B{i}"), &format!("67{i:03}"), &classroom_b)
                    .await,
            );
        }

        School {
            term_id,
            classroom_a,
            classroom_b,
            subject_id,
            students_a,
            students_b,
        }
    }

    /// Open a session for `subject_id` and return the response body.
    pub async fn open_session(&self, subject_id: &str, date: &str, period: i32) -> Value {
        let res = self
            .post(
                routes::SESSIONS,
                &json!({ "subject_id": subject_id, "date": date, "period": period }),
            )
            .await;
        assert_eq!(res.status, 201, "open_session failed: {}", res.text);
        res.body
    }

    /// Submit a scan.
    pub async fn scan(&self, token: &str, student_id: &str, classroom_id: &str) -> TestResponse {
        self.post(
            routes::CHECK_IN,
            &json!({
                "token": token,
                "student_id": student_id,
                "classroom_id": classroom_id,
                "device_fingerprint": format!("device-{student_id}"),
            }),
        )
        .await
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
