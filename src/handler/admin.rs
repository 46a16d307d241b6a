use axum::{Extension, Router, extract::State, response::IntoResponse, routing::get};
use tracing::instrument;

use crate::{
    AppState,
    db::{CourseExt, UserExt},
    dtos::{AdminDashboardData, AdminUsersData, FilterUserDto},
    handler::or_empty,
    middleware::{AdminPrincipal, Session},
    models::UserRole,
    view::Page,
};

pub fn admin_handler() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(users))
}

#[instrument(skip_all, fields(admin_id = %admin.user.id))]
pub async fn dashboard(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AdminPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;

    let data = AdminDashboardData {
        total_students: or_empty(
            db.count_users_by_role(UserRole::Student).await,
            "admin student count",
        ),
        total_teachers: or_empty(
            db.count_users_by_role(UserRole::Teacher).await,
            "admin teacher count",
        ),
        total_courses: or_empty(db.count_courses(false).await, "admin course count"),
        active_courses: or_empty(db.count_courses(true).await, "admin active course count"),
    };

    Page::new(&session, data)
}

#[instrument(skip_all, fields(admin_id = %admin.user.id))]
pub async fn users(
    State(app_state): State<AppState>,
    Extension(admin): Extension<AdminPrincipal>,
    session: Session,
) -> impl IntoResponse {
    let users = or_empty(app_state.db_client.get_users().await, "admin users");

    Page::new(
        &session,
        AdminUsersData {
            users: FilterUserDto::filter_users(&users),
        },
    )
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TestApp, body_json, set_cookies};
    use axum::http::{StatusCode, header};

    #[tokio::test]
    async fn dashboard_counts_seeded_rows() {
        let app = TestApp::seeded().await;
        let cookie = app.login_as("admin").await;

        let response = app.get("/admin/dashboard", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total_students"], 1);
        assert_eq!(body["data"]["total_teachers"], 1);
        assert_eq!(body["data"]["total_courses"], 1);
        assert_eq!(body["data"]["active_courses"], 1);
    }

    #[tokio::test]
    async fn user_list_hides_password_hash() {
        let app = TestApp::seeded().await;
        let cookie = app.login_as("admin").await;

        let body = body_json(app.get("/admin/users", Some(&cookie)).await).await;
        let users = body["data"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 3);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn teacher_is_turned_away() {
        let app = TestApp::seeded().await;
        let cookie = app.login_as("teacher1").await;

        let response = app.get("/admin/users", Some(&cookie)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("flash=error.permission_denied")));
    }
}
