use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PickError;

/// The key-value storage collaborator the session persists through. Keys are
/// fixed string identifiers; values are opaque bytes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PickError>;
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), PickError>;
    fn delete(&mut self, key: &str) -> Result<(), PickError>;
}

pub fn get_json<T>(store: &impl KeyValueStore, key: &str) -> Result<Option<T>, PickError>
where
    T: DeserializeOwned,
{
    let Some(bytes) = store.get(key)? else {
        return Ok(None);
    };
    let parsed = serde_json::from_slice::<T>(&bytes)?;
    Ok(Some(parsed))
}

pub fn put_json<T>(store: &mut impl KeyValueStore, key: &str, value: &T) -> Result<(), PickError>
where
    T: Serialize,
{
    let body = serde_json::to_vec(value)?;
    store.put(key, &body)
}

/// In-memory store, for tests and throwaway sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PickError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), PickError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), PickError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One file per key under a root directory. Key characters outside
/// `[A-Za-z0-9._-]` are replaced so keys like `pdfpick:session:v1` map to
/// stable file names.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

fn file_name_for_key(key: &str) -> String {
    key.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PickError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(file_name_for_key(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PickError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(PickError::Storage(format!(
                "failed to read '{key}': {error}"
            ))),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), PickError> {
        fs::write(self.path_for(key), value)
            .map_err(|error| PickError::Storage(format!("failed to write '{key}': {error}")))
    }

    fn delete(&mut self, key: &str) -> Result<(), PickError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(PickError::Storage(format!(
                "failed to delete '{key}': {error}"
            ))),
        }
    }
}
