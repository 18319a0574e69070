//! Flat JSON document store
//!
//! A tiny key-value store that keeps the whole table in one pretty printed
//! JSON document on disk. Every read parses the full document, every write
//! serializes the full map back.
//!
//! # Features
//! - `read_all` / `write_all` over the whole document
//! - Single key helpers (`select`, `upsert`)
//! - Read-modify-write cycles are serialized with a `tokio::sync::Mutex`
//! - Writes land in a temporary file that is renamed over the document
//!
//! # Examples
//! ```no_run
//! use jsondb::JsonDb;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let db = JsonDb::<String>::new("/tmp/data/users.json");
//!     db.upsert("user-123", |_| "hello".to_string()).await?;
//!     assert_eq!(db.select("user-123").await?.as_deref(), Some("hello"));
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::BTreeMap,
    io::{ErrorKind, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;

/// The in-memory form of the document.
pub type Table<V> = BTreeMap<String, V>;

pub struct JsonDb<V> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonDb<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    /// Create a store backed by the document at `path`.
    ///
    /// Nothing touches the disk until the first read or write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the whole document.
    ///
    /// A missing document is an empty table.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub async fn read_all(&self) -> Result<Table<V>> {
        read_table(&self.path).await
    }

    /// Replace the whole document with `table`.
    ///
    /// The containing directory is created when absent.
    pub async fn write_all(&self, table: Table<V>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_table(&self.path, table).await
    }

    /// Get the value stored under `key`.
    pub async fn select(&self, key: &str) -> Result<Option<V>> {
        Ok(self.read_all().await?.remove(key))
    }

    /// Read-modify-write a single key.
    ///
    /// `f` receives the current value (if any) and returns the value to
    /// store. Other `upsert` and `write_all` calls on the same
    /// store wait until this one has been persisted.
    pub async fn upsert<F>(&self, key: &str, f: F) -> Result<V>
    where
        F: FnOnce(Option<V>) -> V,
        V: Clone,
    {
        let _guard = self.write_lock.lock().await;

        let mut table = read_table(&self.path).await?;
        let value = f(table.remove(key));
        table.insert(key.to_string(), value.clone());
        write_table(&self.path, table).await?;

        Ok(value)
    }
}

async fn read_table<V: DeserializeOwned>(path: &Path) -> Result<Table<V>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => serde_json::from_str(&text)
            .with_context(|| format!("parse {} failed", path.display())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Table::new()),
        Err(e) => Err(e).with_context(|| format!("read {} failed", path.display())),
    }
}

async fn write_table<V>(path: &Path, table: Table<V>) -> Result<()>
where
    V: Serialize + Send + 'static,
{
    let text = serde_json::to_string_pretty(&table)?;
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create dir {} failed", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .with_context(|| format!("persist {} failed", path.display()))?;

        log::trace!("wrote {} ({} bytes)", path.display(), text.len());
        Ok(())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
    struct Entry {
        a: String,
        b: u32,
    }

    fn entry(a: &str, b: u32) -> Entry {
        Entry {
            a: a.to_string(),
            b,
        }
    }

    #[tokio::test]
    async fn test_read_missing_document() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = JsonDb::<Entry>::new(dir.path().join("users.json"));

        assert!(db.read_all().await?.is_empty());
        assert!(db.select("nobody").await?.is_none());
        assert!(!db.path().exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_creates_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("data").join("users.json");
        let db = JsonDb::<Entry>::new(&path);

        let mut table = Table::new();
        table.insert("k1".to_string(), entry("x", 1));
        db.write_all(table.clone()).await?;

        assert!(path.is_file());
        assert_eq!(db.read_all().await?, table);

        // pretty printed with two space indentation
        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("\n  \"k1\": {"));
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = JsonDb::<Entry>::new(dir.path().join("users.json"));

        db.upsert("k1", |old| {
            assert!(old.is_none());
            entry("first", 1)
        })
        .await?;

        let updated = db
            .upsert("k1", |old| {
                let mut e = old.expect("previous value");
                e.b += 1;
                e
            })
            .await?;
        assert_eq!(updated, entry("first", 2));
        assert_eq!(db.select("k1").await?, Some(entry("first", 2)));

        assert_eq!(db.read_all().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupted_document() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("users.json");
        std::fs::write(&path, "{ not json")?;

        let db = JsonDb::<Entry>::new(&path);
        assert!(db.read_all().await.is_err());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_are_not_lost() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let db = Arc::new(JsonDb::<Entry>::new(dir.path().join("users.json")));

        let mut handles = vec![];
        for i in 0..32u32 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.upsert(&format!("user-{i}"), |_| entry("v", i)).await
            }));
        }

        for handle in handles {
            handle.await??;
        }

        let table = db.read_all().await?;
        assert_eq!(table.len(), 32);
        for i in 0..32u32 {
            assert_eq!(table[&format!("user-{i}")], entry("v", i));
        }
        Ok(())
    }
}
