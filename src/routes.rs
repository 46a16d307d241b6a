use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    AppState,
    error::{ErrorMessage, HttpError},
    handler::{
        admin::admin_handler, api::api_handler, auth::auth_handler, public::public_handler,
        student::student_handler, teacher::teacher_handler,
    },
    middleware::{admin_area, student_api, student_area, teacher_area},
    uploads::PUBLIC_PREFIX,
};

async fn not_found() -> HttpError {
    HttpError::not_found(ErrorMessage::PageNotFound.to_string())
}

fn cors_layer(app_state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = app_state
        .env
        .frontend_url
        .split(',')
        .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
}

pub fn create_router(app_state: AppState) -> Router {
    // Each area router sits behind the guard for its role; the guard hands
    // the verified principal to the handlers through request extensions.
    let student_routes = student_handler().layer(middleware::from_fn_with_state(
        app_state.clone(),
        student_area,
    ));
    let teacher_routes = teacher_handler().layer(middleware::from_fn_with_state(
        app_state.clone(),
        teacher_area,
    ));
    let admin_routes = admin_handler().layer(middleware::from_fn_with_state(
        app_state.clone(),
        admin_area,
    ));
    let api_routes =
        api_handler().layer(middleware::from_fn_with_state(app_state.clone(), student_api));

    Router::new()
        .merge(public_handler())
        .merge(auth_handler())
        .nest("/student", student_routes)
        .nest("/teacher", teacher_routes)
        .nest("/admin", admin_routes)
        .nest("/api", api_routes)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(app_state.uploads.root()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&app_state))
                .layer(DefaultBodyLimit::max(app_state.env.max_body_bytes)),
        )
        .with_state(app_state)
}
