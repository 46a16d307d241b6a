use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_maxage: i64, // seconds
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_body_bytes: usize,
    pub cookie_secure: bool,
    pub frontend_url: String,
}

impl Config {
    pub fn init() -> Config {
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://qimeng_education.db".to_string());
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".to_string());
        let port = env_or("PORT", 8088);

        Config {
            database_url,
            jwt_secret,
            jwt_maxage: env_or("JWT_MAXAGE", 60 * 60 * 24),
            port,
            upload_dir: PathBuf::from(upload_dir),
            max_body_bytes: env_or("MAX_BODY_BYTES", 16 * 1024 * 1024),
            cookie_secure: env_or("COOKIE_SECURE", false),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset.
/// A value that is set but unparsable is a startup error.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .unwrap_or_else(|_| panic!("{} has an invalid value: {}", key, raw)),
        Err(_) => default,
    }
}
