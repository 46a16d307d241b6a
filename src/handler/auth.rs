use crate::{
    AppState,
    db::UserExt,
    dtos::{LoginForm, RegisterForm, RegisterPageData},
    error::{ErrorMessage, HttpError},
    i18n::FlashMessage,
    middleware::Session,
    models::{User, UserRole},
    utils::{password, token},
    view::{FlashRedirect, Page, SESSION_COOKIE, expired_cookie},
};
use axum::{
    Form, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::instrument;
use validator::Validate;

/// Router for login, registration and logout
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/register", get(register_page).post(register))
        .route("/logout", get(logout))
}

pub async fn login_page(session: Session) -> impl IntoResponse {
    Page::new(&session, ())
}

pub async fn register_page(session: Session) -> impl IntoResponse {
    Page::new(
        &session,
        RegisterPageData {
            roles: [UserRole::Student, UserRole::Teacher],
        },
    )
}

/// Look the account up by username, then by email when the identifier looks
/// like one, and check the password. `Ok(None)` means the credentials do not
/// match.
async fn authenticate(app_state: &AppState, body: &LoginForm) -> Result<Option<User>, HttpError> {
    let db = &app_state.db_client;
    let db_error = |e: sqlx::Error| {
        tracing::error!("DB error, getting user: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    };

    let mut user = db
        .get_user(None, Some(&body.username), None)
        .await
        .map_err(db_error)?;
    if user.is_none() && body.username.contains('@') {
        user = db
            .get_user(None, None, Some(&body.username))
            .await
            .map_err(db_error)?;
    }

    let Some(user) = user else {
        tracing::info!("Login for unknown user");
        return Ok(None);
    };

    match password::compare(&body.password, &user.password_hash) {
        Ok(true) => Ok(Some(user)),
        Ok(false) => {
            tracing::info!(user_id = %user.id, "Password mismatch");
            Ok(None)
        }
        Err(e) => {
            tracing::error!(user_id = %user.id, "Password error: {}", e);
            Ok(None)
        }
    }
}

/// Sign in and land on the dashboard of the user's role.
///
/// Any failure goes back to `/login` with a flash message and sets no
/// session cookie.
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn login(
    State(app_state): State<AppState>,
    Form(body): Form<LoginForm>,
) -> Result<Response, HttpError> {
    if let Err(e) = body.validate() {
        tracing::info!("Invalid login input: {}", e);
        return Ok(FlashRedirect::error("/login", FlashMessage::InvalidCredentials).into_response());
    }

    let Some(user) = authenticate(&app_state, &body).await? else {
        return Ok(FlashRedirect::error("/login", FlashMessage::InvalidCredentials).into_response());
    };

    let access_token = token::create_token(
        user.id,
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| {
        tracing::error!("Access token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build((SESSION_COOKIE, access_token))
        .path("/")
        .max_age(time::Duration::seconds(app_state.env.jwt_maxage))
        .http_only(true)
        .secure(app_state.env.cookie_secure)
        .same_site(SameSite::Lax)
        .build();

    tracing::info!(user_id = %user.id, role = user.role.to_str(), "Login successful");
    Ok((
        CookieJar::new().add(access_cookie),
        FlashRedirect::success(user.role.dashboard_path(), FlashMessage::LoginSucceeded),
    )
        .into_response())
}

/// Create a student or teacher account together with its profile.
#[instrument(skip(app_state, body), fields(username = %body.username, email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Form(body): Form<RegisterForm>,
) -> FlashRedirect {
    if let Err(e) = body.validate() {
        tracing::info!("Invalid register input: {}", e);
        return FlashRedirect::error("/register", FlashMessage::InvalidForm);
    }

    let role = match UserRole::parse(&body.role) {
        Some(role @ (UserRole::Student | UserRole::Teacher)) => role,
        _ => {
            tracing::info!(role = %body.role, "Rejected registration role");
            return FlashRedirect::error("/register", FlashMessage::InvalidRole);
        }
    };

    let db = &app_state.db_client;
    match db.get_user(None, Some(&body.username), None).await {
        Ok(Some(_)) => return FlashRedirect::error("/register", FlashMessage::UsernameTaken),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("DB error, checking username: {}", e);
            return FlashRedirect::error("/register", FlashMessage::RegistrationFailed);
        }
    }
    match db.get_user(None, None, Some(&body.email)).await {
        Ok(Some(_)) => return FlashRedirect::error("/register", FlashMessage::EmailTaken),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("DB error, checking email: {}", e);
            return FlashRedirect::error("/register", FlashMessage::RegistrationFailed);
        }
    }

    let hash_password = match password::hash(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Password hashing error: {}", e);
            return FlashRedirect::error("/register", FlashMessage::RegistrationFailed);
        }
    };

    let result = db
        .create_user_with_profile(
            &body.username,
            &body.email,
            &hash_password,
            role,
            body.display_name(),
        )
        .await;

    match result {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Register Successful");
            FlashRedirect::success("/login", FlashMessage::RegistrationSucceeded)
        }
        // Lost a race with another registration for the same name or email
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique_violation: {}", db_err);
            let message = if db_err.message().contains("users.email") {
                FlashMessage::EmailTaken
            } else {
                FlashMessage::UsernameTaken
            };
            FlashRedirect::error("/register", message)
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            FlashRedirect::error("/register", FlashMessage::RegistrationFailed)
        }
    }
}

/// Drop the session cookie.
pub async fn logout() -> impl IntoResponse {
    (
        CookieJar::new().add(expired_cookie(SESSION_COOKIE)),
        FlashRedirect::success("/", FlashMessage::LoggedOut),
    )
}
