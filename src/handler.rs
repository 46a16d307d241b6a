pub mod admin;
pub mod api;
pub mod auth;
pub mod public;
pub mod student;
pub mod teacher;

/// Read-side fallback for page data: a failed query is logged and the page
/// renders with an empty collection or a zero count instead.
pub fn or_empty<T: Default>(result: Result<T, sqlx::Error>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!("{}: {}", context, e);
        T::default()
    })
}
