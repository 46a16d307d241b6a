use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    db::{DBClient, ProfileExt, UserExt},
    error::{ErrorMessage, HttpError},
    i18n::{FlashMessage, Lang},
    models::{StudentProfile, TeacherProfile, User, UserRole},
    utils::token,
    view::{FLASH_COOKIE, Flash, FlashRedirect, LANG_COOKIE, SESSION_COOKIE},
};

/// Everything a request knows about its caller.
///
/// Resolved once per request from cookies (or a `Bearer` header for API
/// clients) and cached in the request extensions, so guards and handlers
/// share the same lookup.
///
/// ```
/// async fn my_page(session: Session) -> impl IntoResponse {
///     Page::new(&session, ())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub lang: Lang,
    pub flash: Option<Flash>,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }

        let session = load_session(&parts.headers, state).await?;
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

/// Token lookup order:
/// - `access_token` cookie (browser)
/// - `Authorization: Bearer <token>` header (API clients)
fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| auth_value.strip_prefix("Bearer "))
                .map(str::to_owned)
        })
}

async fn load_session(headers: &HeaderMap, state: &AppState) -> Result<Session, HttpError> {
    let jar = CookieJar::from_headers(headers);

    let lang = jar
        .get(LANG_COOKIE)
        .and_then(|cookie| Lang::from_code(cookie.value()))
        .unwrap_or_default();
    let flash = jar
        .get(FLASH_COOKIE)
        .and_then(|cookie| Flash::decode(cookie.value()));

    // A bad or expired token is an anonymous visitor, not an error.
    let user_id = session_token(&jar, headers)
        .and_then(|token| token::decode_token(token, state.env.jwt_secret.as_bytes()).ok());

    let user = match user_id {
        Some(user_id) => state
            .db_client
            .get_user(Some(user_id), None, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load session user {}: {}", user_id, e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            })?,
        None => None,
    };

    Ok(Session { user, lang, flash })
}

#[derive(Debug, Clone)]
pub struct StudentPrincipal {
    pub user: User,
    pub profile: StudentProfile,
}

#[derive(Debug, Clone)]
pub struct TeacherPrincipal {
    pub user: User,
    pub profile: TeacherProfile,
}

#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub user: User,
}

/// An authenticated caller whose role and profile have been verified.
#[derive(Debug, Clone)]
pub enum Principal {
    Student(StudentPrincipal),
    Teacher(TeacherPrincipal),
    Admin(AdminPrincipal),
}

#[derive(Debug, Clone)]
pub enum Access {
    Authorized(Principal),
    Unauthenticated,
    Forbidden,
    /// Role matches but the profile row is missing.
    NoProfile,
}

/// Single authorization rule for every guarded area.
///
/// Students and teachers must also own a profile row; admins have none.
pub async fn authorize(
    db: &DBClient,
    user: Option<&User>,
    required_role: UserRole,
) -> Result<Access, sqlx::Error> {
    let Some(user) = user else {
        return Ok(Access::Unauthenticated);
    };

    if user.role != required_role {
        return Ok(Access::Forbidden);
    }

    let access = match required_role {
        UserRole::Student => match db.get_student_profile_by_user(user.id).await? {
            Some(profile) => Access::Authorized(Principal::Student(StudentPrincipal {
                user: user.clone(),
                profile,
            })),
            None => Access::NoProfile,
        },
        UserRole::Teacher => match db.get_teacher_profile_by_user(user.id).await? {
            Some(profile) => Access::Authorized(Principal::Teacher(TeacherPrincipal {
                user: user.clone(),
                profile,
            })),
            None => Access::NoProfile,
        },
        UserRole::Admin => Access::Authorized(Principal::Admin(AdminPrincipal {
            user: user.clone(),
        })),
    };

    Ok(access)
}

#[derive(Debug, Clone, Copy)]
enum GuardMode {
    /// Browser pages: failures become a flash message and a redirect.
    Page,
    /// JSON endpoints: failures become an `HttpError`.
    Api,
}

fn deny(access: Access, required_role: UserRole, mode: GuardMode) -> Response {
    let missing_profile = match required_role {
        UserRole::Teacher => FlashMessage::TeacherProfileMissing,
        _ => FlashMessage::StudentProfileMissing,
    };

    match (mode, access) {
        (GuardMode::Page, Access::Unauthenticated) => {
            FlashRedirect::error("/login", FlashMessage::LoginRequired).into_response()
        }
        (GuardMode::Page, Access::NoProfile) => {
            FlashRedirect::error("/", missing_profile).into_response()
        }
        (GuardMode::Page, _) => {
            FlashRedirect::error("/", FlashMessage::PermissionDenied).into_response()
        }
        (GuardMode::Api, Access::Unauthenticated) => {
            HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()).into_response()
        }
        (GuardMode::Api, Access::NoProfile) => {
            let message = match required_role {
                UserRole::Teacher => ErrorMessage::TeacherProfileMissing,
                _ => ErrorMessage::StudentProfileMissing,
            };
            HttpError::bad_request(message.to_string()).into_response()
        }
        (GuardMode::Api, _) => {
            HttpError::forbidden(ErrorMessage::PermissionDenied.to_string()).into_response()
        }
    }
}

async fn guard(
    app_state: AppState,
    session: Session,
    mut req: Request,
    next: Next,
    required_role: UserRole,
    mode: GuardMode,
) -> Response {
    let access = match authorize(&app_state.db_client, session.user.as_ref(), required_role).await
    {
        Ok(access) => access,
        Err(e) => {
            tracing::error!("Authorization lookup failed: {}", e);
            return HttpError::server_error(ErrorMessage::ServerError.to_string()).into_response();
        }
    };

    let principal = match access {
        Access::Authorized(principal) => principal,
        denied => {
            tracing::debug!(?required_role, ?denied, "Access denied");
            return deny(denied, required_role, mode);
        }
    };

    // Handlers pull the concrete principal with `Extension<...>`.
    match principal {
        Principal::Student(student) => {
            req.extensions_mut().insert(student);
        }
        Principal::Teacher(teacher) => {
            req.extensions_mut().insert(teacher);
        }
        Principal::Admin(admin) => {
            req.extensions_mut().insert(admin);
        }
    }
    req.extensions_mut().insert(session);

    next.run(req).await
}

pub async fn student_area(
    State(app_state): State<AppState>,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    guard(app_state, session, req, next, UserRole::Student, GuardMode::Page).await
}

pub async fn teacher_area(
    State(app_state): State<AppState>,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    guard(app_state, session, req, next, UserRole::Teacher, GuardMode::Page).await
}

pub async fn admin_area(
    State(app_state): State<AppState>,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    guard(app_state, session, req, next, UserRole::Admin, GuardMode::Page).await
}

/// Same rule as `student_area`, answering with JSON errors.
pub async fn student_api(
    State(app_state): State<AppState>,
    session: Session,
    req: Request,
    next: Next,
) -> Response {
    guard(app_state, session, req, next, UserRole::Student, GuardMode::Api).await
}
