// Database module
// SQLite-backed chunk storage consumed by the pipeline and the local
// similarity fallback

pub mod sqlite;

pub use sqlite::*;
