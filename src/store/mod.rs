//! Process-wide file-info store backed by a JSON map file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

/// One tracked upload/output file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub path: String,
    #[serde(default)]
    pub url: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`.
    pub upload_time: String,
    #[serde(default)]
    pub show_timeline: bool,
    #[serde(default)]
    pub subtitles: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Fields written by older versions survive round-trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, filename: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            path: path.into(),
            url: None,
            upload_time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            show_timeline: false,
            subtitles: None,
            status: "pending".to_string(),
            extra: BTreeMap::new(),
        }
    }
}

type RecordMap = BTreeMap<String, FileRecord>;

/// The `file_id -> record` map. Writers serialize through one mutex and
/// persist with temp-file-plus-rename; readers never take the write lock.
pub struct FileInfoStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileInfoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Load all records. A legacy list-format file is migrated to the map
    /// format in place (one shot, atomic rename).
    pub fn load(&self) -> RecordMap {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return RecordMap::new(),
        };

        match serde_json::from_str::<RecordMap>(&contents) {
            Ok(map) => map,
            Err(_) => match serde_json::from_str::<Vec<FileRecord>>(&contents) {
                Ok(list) => {
                    info!("Migrating file-info store from list to map format");
                    let map: RecordMap =
                        list.into_iter().map(|r| (r.id.clone(), r)).collect();
                    if let Err(e) = write_atomic(&self.path, &map) {
                        warn!("File-info migration write failed: {e}");
                    }
                    map
                }
                Err(e) => {
                    warn!("Unreadable file-info store, starting empty: {e}");
                    RecordMap::new()
                }
            },
        }
    }

    pub fn get(&self, file_id: &str) -> Option<FileRecord> {
        self.load().get(file_id).cloned()
    }

    pub async fn insert(&self, record: FileRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load();
        debug!("Storing file info {}", record.id);
        map.insert(record.id.clone(), record);
        write_atomic(&self.path, &map)
    }

    /// Apply a mutation to an existing record; missing ids are logged and
    /// ignored.
    pub async fn update(&self, file_id: &str, f: impl FnOnce(&mut FileRecord)) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load();
        match map.get_mut(file_id) {
            Some(record) => {
                f(record);
                write_atomic(&self.path, &map)
            }
            None => {
                warn!("Update for unknown file id {file_id}");
                Ok(())
            }
        }
    }

    pub async fn remove(&self, file_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load();
        if map.remove(file_id).is_none() {
            warn!("Remove for unknown file id {file_id}");
            return Ok(());
        }
        write_atomic(&self.path, &map)
    }
}

fn write_atomic(path: &Path, map: &RecordMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
    temp.flush()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
