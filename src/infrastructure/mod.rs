pub mod memory_kv;
pub mod sqlite_kv;
