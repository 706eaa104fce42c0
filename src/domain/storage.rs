use async_trait::async_trait;

/// Persisted key holding the JSON array of item texts.
pub const TODOS_KEY: &str = "todos";
/// Persisted key holding the JSON array of completion flags.
pub const COMPLETED_KEY: &str = "completed";

/// Flat string key-value store, the sole durability mechanism.
///
/// `set_all` must apply every entry or none of them, in the order given.
#[async_trait]
pub trait KeyValueStorage: Send + Sync + 'static {
    async fn init(&self) -> anyhow::Result<()>;
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_all(&self, entries: &[(&str, String)]) -> anyhow::Result<()>;
    async fn remove_all(&self, keys: &[&str]) -> anyhow::Result<()>;
}
