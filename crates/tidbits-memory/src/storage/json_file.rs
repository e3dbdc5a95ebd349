//! Single JSON document storage with atomic replace.

use super::MemoryAdapter;
use crate::error::StorageError;
use crate::schema::Memory;
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};

/// On-disk document: memory id -> memory.
type Document = BTreeMap<String, Memory>;

/// JSON-file-based memory storage.
///
/// Every write rewrites the whole document into a temporary file next to
/// the target and renames it into place, so readers see either the old or
/// the new document, never a partial one. There is no lock spanning a
/// read and the following write: two processes doing read-modify-write
/// on the same file can overwrite each other (last writer wins).
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    /// Path to the JSON document
    path: Utf8PathBuf,
}

impl JsonFileAdapter {
    /// Open (or prepare to create) the document at `path`.
    pub fn open(path: impl Into<Utf8PathBuf>) -> Result<Self, StorageError> {
        let adapter = Self { path: path.into() };
        adapter.ensure_dir()?;
        Ok(adapter)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Ensure storage directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        let dir = self.dir();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))
    }

    fn dir(&self) -> Utf8PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
            _ => Utf8PathBuf::from("."),
        }
    }

    /// Parse the document under a shared lock.
    fn read(&self) -> Result<Document, StorageError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        // Released when `file` is closed.
        FileExt::lock_shared(&file).map_err(|e| StorageError::io(&self.path, e))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| StorageError::io(&self.path, e))?;
        drop(file);

        if contents.trim().is_empty() {
            return Ok(Document::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the full document to a temp file, fsync it, rename over the target.
    fn write(&self, doc: &Document) -> Result<(), StorageError> {
        let dir = self.dir();
        let mut tmp = tempfile::Builder::new()
            .prefix(".tidbits-")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|e| StorageError::io(&dir, e))?;
        let tmp_path = tmp.path().display().to_string();

        FileExt::lock_exclusive(tmp.as_file()).map_err(|e| StorageError::io(&tmp_path, e))?;
        {
            let mut writer = BufWriter::new(&mut tmp);
            serde_json::to_writer_pretty(&mut writer, doc)?;
            writer
                .write_all(b"\n")
                .and_then(|_| writer.flush())
                .map_err(|e| StorageError::io(&tmp_path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StorageError::io(&tmp_path, e))?;

        tmp.persist(&self.path)
            .map_err(|e| StorageError::io(&self.path, e.error))?;
        sync_dir(&dir)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Utf8Path) -> Result<(), StorageError> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StorageError::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Utf8Path) -> Result<(), StorageError> {
    Ok(())
}

impl MemoryAdapter for JsonFileAdapter {
    fn save(&self, memory: &Memory) -> Result<(), StorageError> {
        let mut doc = self.read()?;
        doc.insert(memory.id.clone(), memory.clone());
        self.write(&doc)?;
        log::debug!("saved memory {} to {}", memory.id, self.path);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Memory>, StorageError> {
        Ok(self.read()?.remove(id))
    }

    fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut doc = self.read()?;
        if doc.remove(id).is_none() {
            return Ok(false);
        }
        self.write(&doc)?;
        Ok(true)
    }

    fn list_all(&self) -> Result<Vec<Memory>, StorageError> {
        Ok(self.read()?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn adapter_in(dir: &tempfile::TempDir) -> JsonFileAdapter {
        let path = dir.path().join("memories.json");
        JsonFileAdapter::open(Utf8PathBuf::from_path_buf(path).unwrap()).unwrap()
    }

    #[test]
    fn test_contract() {
        let dir = tempdir().unwrap();
        contract::save_and_get(&adapter_in(&dir));

        let dir = tempdir().unwrap();
        contract::get_missing(&adapter_in(&dir));

        let dir = tempdir().unwrap();
        contract::upsert_replaces(&adapter_in(&dir));

        let dir = tempdir().unwrap();
        contract::delete(&adapter_in(&dir));

        let dir = tempdir().unwrap();
        contract::list_all(&adapter_in(&dir));
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("m.json");
        let adapter = JsonFileAdapter::open(Utf8PathBuf::from_path_buf(path.clone()).unwrap()).unwrap();
        adapter.save(&Memory::new("x", Utc::now())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_no_lock_left_behind() {
        let dir = tempdir().unwrap();
        let adapter = adapter_in(&dir);
        let memory = Memory::new("x", Utc::now());
        adapter.save(&memory).unwrap();
        assert!(adapter.get(&memory.id).unwrap().is_some());

        let file = File::open(adapter.path()).unwrap();
        FileExt::try_lock_exclusive(&file).unwrap();
    }

    #[test]
    fn test_empty_file_is_empty_dataset() {
        let dir = tempdir().unwrap();
        let adapter = adapter_in(&dir);
        fs::write(adapter.path(), "").unwrap();
        assert!(adapter.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_document_is_keyed_by_id() {
        let dir = tempdir().unwrap();
        let adapter = adapter_in(&dir);
        let memory = Memory::new("fact", Utc::now());
        adapter.save(&memory).unwrap();

        let raw = fs::read_to_string(adapter.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[&memory.id]["content"], "fact");
        assert_eq!(value[&memory.id]["votes"], 1);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempdir().unwrap();
        let adapter = adapter_in(&dir);
        for i in 0..5 {
            adapter.save(&Memory::new(format!("m{i}"), Utc::now())).unwrap();
        }
        let first = adapter.list_all().unwrap()[0].id.clone();
        adapter.delete(&first).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["memories.json"]);
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = tempdir().unwrap();
        let adapter = adapter_in(&dir);
        fs::write(adapter.path(), "{not json").unwrap();
        assert!(matches!(adapter.list_all(), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_readers_never_see_partial_document() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(adapter_in(&dir));
        adapter.save(&Memory::new("seed", Utc::now())).unwrap();

        let writer = {
            let adapter = Arc::clone(&adapter);
            std::thread::spawn(move || {
                for i in 0..30 {
                    adapter
                        .save(&Memory::new("x".repeat(200 + i), Utc::now()))
                        .unwrap();
                }
            })
        };
        for _ in 0..60 {
            let all = adapter.list_all().unwrap();
            assert!(!all.is_empty());
        }
        writer.join().unwrap();
        assert_eq!(adapter.list_all().unwrap().len(), 31);
    }
}
