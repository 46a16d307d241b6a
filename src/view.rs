//! Response shapes shared by every page handler.
//!
//! GET pages answer with a [`Page`] envelope; form posts answer with a
//! [`FlashRedirect`] that carries one message to the next page.

use std::collections::BTreeMap;

use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use crate::i18n::{self, FlashMessage, Lang};
use crate::middleware::Session;
use crate::models::UserRole;

pub const SESSION_COOKIE: &str = "access_token";
pub const LANG_COOKIE: &str = "lang";
pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

impl FlashLevel {
    fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: FlashMessage,
}

impl Flash {
    pub fn success(message: FlashMessage) -> Self {
        Flash {
            level: FlashLevel::Success,
            message,
        }
    }

    pub fn error(message: FlashMessage) -> Self {
        Flash {
            level: FlashLevel::Error,
            message,
        }
    }

    /// Cookie form: `<level>.<code>`, e.g. `error.permission_denied`
    pub fn encode(&self) -> String {
        format!("{}.{}", self.level.as_str(), self.message.code())
    }

    pub fn decode(raw: &str) -> Option<Self> {
        let (level, code) = raw.split_once('.')?;
        let level = match level {
            "success" => FlashLevel::Success,
            "error" => FlashLevel::Error,
            _ => return None,
        };
        Some(Flash {
            level,
            message: FlashMessage::from_code(code)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FlashView {
    pub level: FlashLevel,
    pub code: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SessionUserView {
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
struct PageBody<T> {
    status: &'static str,
    lang: Lang,
    nav: BTreeMap<&'static str, &'static str>,
    user: Option<SessionUserView>,
    flash: Option<FlashView>,
    data: T,
}

/// JSON view model of a page, wrapped with session-derived chrome.
///
/// Rendering a page consumes the pending flash message, so the response
/// also expires the flash cookie when one was shown.
pub struct Page<T> {
    lang: Lang,
    user: Option<SessionUserView>,
    flash: Option<Flash>,
    data: T,
}

impl<T: Serialize> Page<T> {
    pub fn new(session: &Session, data: T) -> Self {
        Page {
            lang: session.lang,
            user: session.user.as_ref().map(|user| SessionUserView {
                username: user.username.clone(),
                role: user.role,
            }),
            flash: session.flash,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let body = PageBody {
            status: "success",
            lang: self.lang,
            nav: i18n::nav_labels(self.lang),
            user: self.user,
            flash: self.flash.map(|flash| FlashView {
                level: flash.level,
                code: flash.message.code(),
                message: flash.message.text(self.lang),
            }),
            data: self.data,
        };

        if self.flash.is_some() {
            let jar = CookieJar::new().add(expired_cookie(FLASH_COOKIE));
            (jar, Json(body)).into_response()
        } else {
            Json(body).into_response()
        }
    }
}

/// 303 redirect that leaves one flash message for the target page.
#[derive(Debug)]
pub struct FlashRedirect {
    to: String,
    flash: Flash,
}

impl FlashRedirect {
    pub fn to(path: impl Into<String>, flash: Flash) -> Self {
        FlashRedirect {
            to: path.into(),
            flash,
        }
    }

    pub fn success(path: impl Into<String>, message: FlashMessage) -> Self {
        Self::to(path, Flash::success(message))
    }

    pub fn error(path: impl Into<String>, message: FlashMessage) -> Self {
        Self::to(path, Flash::error(message))
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let cookie = Cookie::build((FLASH_COOKIE, self.flash.encode()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        (CookieJar::new().add(cookie), Redirect::to(&self.to)).into_response()
    }
}

/// Cookie that tells the browser to drop `name` immediately.
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn flash_cookie_round_trip() {
        let flash = Flash::error(FlashMessage::PermissionDenied);
        assert_eq!(flash.encode(), "error.permission_denied");
        assert_eq!(Flash::decode(&flash.encode()), Some(flash));
    }

    #[test]
    fn malformed_flash_is_ignored() {
        assert_eq!(Flash::decode("permission_denied"), None);
        assert_eq!(Flash::decode("warning.permission_denied"), None);
        assert_eq!(Flash::decode("error.no_such_code"), None);
    }

    #[test]
    fn flash_redirect_sets_cookie_and_location() {
        let response =
            FlashRedirect::success("/login", FlashMessage::RegistrationSucceeded).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("flash=success.registration_succeeded"));
    }
}
