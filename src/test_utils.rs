//! Fixtures shared by the unit tests: seeded users, a sample course and an
//! in-process router driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, header},
    response::Response,
};
use chrono::NaiveDate;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::{
    AppState,
    config::Config,
    db::{DBClient, NewCourse, ProfileExt, UserExt},
    models::{StudentProfile, TeacherProfile, User, UserRole},
    routes::create_router,
    scoring::RandomSpeechScorer,
    uploads::UploadStore,
    utils::token,
};

async fn user_with_profile(db: &DBClient, username: &str, role: UserRole) -> User {
    db.create_user_with_profile(
        username,
        &format!("{username}@example.com"),
        "not-a-real-hash",
        role,
        &format!("{username} full name"),
    )
    .await
    .unwrap()
}

pub async fn teacher(db: &DBClient, username: &str) -> (User, TeacherProfile) {
    let user = user_with_profile(db, username, UserRole::Teacher).await;
    let profile = db.get_teacher_profile_by_user(user.id).await.unwrap().unwrap();
    (user, profile)
}

pub async fn student(db: &DBClient, username: &str) -> (User, StudentProfile) {
    let user = user_with_profile(db, username, UserRole::Student).await;
    let profile = db.get_student_profile_by_user(user.id).await.unwrap().unwrap();
    (user, profile)
}

/// Two-seat course, handy for capacity checks.
pub fn new_course(teacher_id: i64) -> NewCourse<'static> {
    NewCourse {
        name: "HSK2 Evening",
        description: Some("Evening class"),
        level: "HSK2",
        teacher_id,
        start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        schedule: Some("Tue/Thu 19:00"),
        max_students: 2,
        price: Some(1200.0),
    }
}

fn test_config(upload_dir: &TempDir) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_maxage: 60 * 60,
        port: 8088,
        upload_dir: upload_dir.path().to_path_buf(),
        max_body_bytes: 1024 * 1024,
        cookie_secure: false,
        frontend_url: "http://localhost:8088".to_string(),
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    _uploads: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let uploads_dir = TempDir::new().unwrap();
        let env = test_config(&uploads_dir);
        let uploads = UploadStore::new(env.upload_dir.clone(), 64 * 1024)
            .await
            .unwrap();

        let state = AppState {
            env: Arc::new(env),
            db_client: DBClient::in_memory().await,
            uploads,
            scorer: Arc::new(RandomSpeechScorer),
        };
        let router = create_router(state.clone());

        TestApp {
            state,
            router,
            _uploads: uploads_dir,
        }
    }

    /// App with the first-run data (admin, teacher1, student1, showcase rows).
    pub async fn seeded() -> Self {
        let app = Self::new().await;
        app.db().bootstrap().await.unwrap();
        app
    }

    pub fn db(&self) -> &DBClient {
        &self.state.db_client
    }

    pub fn session_cookie(&self, user_id: i64) -> String {
        let token = token::create_token(
            user_id,
            self.state.env.jwt_secret.as_bytes(),
            self.state.env.jwt_maxage,
        )
        .unwrap();
        format!("access_token={token}")
    }

    /// Session cookie for an existing username.
    pub async fn login_as(&self, username: &str) -> String {
        let user = self
            .db()
            .get_user(None, Some(username), None)
            .await
            .unwrap()
            .unwrap();
        self.session_cookie(user.id)
    }

    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> Response {
        let mut builder =
            Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: serde_json::Value,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        content_type: String,
        body: Vec<u8>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(body)).unwrap()).await
    }
}

const BOUNDARY: &str = "qimeng-test-boundary";

/// Build a `multipart/form-data` body from text fields and at most one file
/// given as `(field, file name, bytes)`.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_owned)
        .collect()
}
