pub mod cache;
pub mod sql;
pub mod sqlite;
