// Database module
// SQLite persistence for knowledge entries, the course catalogue and chat history

pub mod sqlite;

pub use sqlite::*;
