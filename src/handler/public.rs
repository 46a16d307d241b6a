use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;

use crate::{
    AppState,
    db::{CourseExt, ProfileExt, ShowcaseExt},
    dtos::{
        CampPageData, ChineseCoursesPageData, CourseCard, CoursesPageData, HomePageData,
        StudyAbroadPageData,
    },
    handler::or_empty,
    i18n::Lang,
    middleware::Session,
    view::{LANG_COOKIE, Page},
};

/// Pages anyone can open, signed in or not
pub fn public_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/set_language/{language}", get(set_language))
        .route("/courses", get(courses))
        .route("/chinese_courses", get(chinese_courses))
        .route("/study_abroad", get(study_abroad))
        .route("/study_abroad/cases", get(study_abroad))
        .route("/camp", get(camp))
}

#[instrument(skip_all)]
pub async fn index(State(app_state): State<AppState>, session: Session) -> impl IntoResponse {
    let db = &app_state.db_client;

    let featured_courses = or_empty(db.get_active_courses(Some(3)).await, "index courses");
    let featured_cases = or_empty(db.get_study_abroad_cases(true, Some(3)).await, "index cases");
    let camp_programs = or_empty(db.get_active_camp_programs(Some(3)).await, "index camps");

    Page::new(
        &session,
        HomePageData {
            featured_courses: CourseCard::from_courses(featured_courses),
            featured_cases,
            camp_programs,
        },
    )
}

/// Store the language choice and go back where the visitor came from.
///
/// Unknown codes leave the cookie alone. Only the path of the `Referer` is
/// used, so the redirect never leaves this site.
#[instrument(skip(jar, headers))]
pub async fn set_language(
    Path(language): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let jar = match Lang::from_code(&language) {
        Some(lang) => jar.add(
            Cookie::build((LANG_COOKIE, lang.code()))
                .path("/")
                .max_age(time::Duration::days(365))
                .same_site(SameSite::Lax)
                .build(),
        ),
        None => jar,
    };

    let back = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.to_string()))
        .filter(|path| path.starts_with('/'))
        .unwrap_or_else(|| "/".to_string());

    (jar, Redirect::to(&back))
}

#[instrument(skip_all)]
pub async fn courses(State(app_state): State<AppState>, session: Session) -> impl IntoResponse {
    let courses = or_empty(
        app_state.db_client.get_active_courses(None).await,
        "courses page",
    );

    Page::new(
        &session,
        CoursesPageData {
            courses: CourseCard::from_courses(courses),
        },
    )
}

#[instrument(skip_all)]
pub async fn chinese_courses(
    State(app_state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let db = &app_state.db_client;
    let courses = or_empty(db.get_active_courses(None).await, "chinese courses");
    let teachers = or_empty(db.get_teachers().await, "chinese courses teachers");

    Page::new(
        &session,
        ChineseCoursesPageData {
            courses: CourseCard::from_courses(courses),
            teachers,
        },
    )
}

#[instrument(skip_all)]
pub async fn study_abroad(
    State(app_state): State<AppState>,
    session: Session,
) -> impl IntoResponse {
    let cases = or_empty(
        app_state.db_client.get_study_abroad_cases(false, None).await,
        "study abroad cases",
    );

    Page::new(&session, StudyAbroadPageData { cases })
}

#[instrument(skip_all)]
pub async fn camp(State(app_state): State<AppState>, session: Session) -> impl IntoResponse {
    let programs = or_empty(
        app_state.db_client.get_active_camp_programs(None).await,
        "camp programs",
    );

    Page::new(&session, CampPageData { programs })
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{TestApp, body_json, set_cookies};
    use axum::http::{StatusCode, header};

    #[tokio::test]
    async fn home_page_lists_seeded_content() {
        let app = TestApp::seeded().await;
        let response = app.get("/", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["lang"], "zh");
        assert!(body["user"].is_null());
        assert_eq!(body["data"]["featured_courses"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["featured_courses"][0]["color"], "#28a745");
        assert_eq!(body["data"]["featured_cases"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["camp_programs"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn language_switch_sets_cookie_and_returns() {
        let app = TestApp::new().await;
        let response = app
            .request(
                axum::http::Request::get("/set_language/vi")
                    .header(header::REFERER, "http://localhost:8088/camp?x=1")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/camp?x=1");
        assert!(set_cookies(&response).iter().any(|c| c.starts_with("lang=vi")));

        let response = app.get("/camp", Some("lang=vi")).await;
        let body = body_json(response).await;
        assert_eq!(body["lang"], "vi");
        assert_eq!(body["nav"]["home"], "Trang chủ");
    }

    #[tokio::test]
    async fn unknown_language_is_ignored() {
        let app = TestApp::new().await;
        let response = app.get("/set_language/fr", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(set_cookies(&response).is_empty());
    }

    #[tokio::test]
    async fn unknown_path_is_json_404() {
        let app = TestApp::new().await;
        let response = app.get("/no/such/page", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], "fail");
    }
}
