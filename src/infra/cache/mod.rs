mod memory;
mod sqlite;

pub use memory::InMemoryCountCache;
pub use sqlite::SqliteCountCache;
