//! File-backed record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gridfill_types::{RecordId, StoredRecord};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::{PutOutcome, RecordStore, Result, StoreError, StoreSummary};

/// Stores each record as a JSON document.
///
/// Records live in `<base>/records/<YYYY>/<id>.json`, partitioned by the year
/// of their period start. Writes go to a temporary file in the partition
/// directory which is then linked into place only if no document with the
/// same id exists, so concurrent writers of one id cannot both succeed.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Base directory for the store.
    base_path: PathBuf,
    /// Directory holding the year partitions.
    records_path: PathBuf,
}

/// Which end of the time axis a scan looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Earliest,
    Latest,
}

impl FileStore {
    /// Creates a store rooted at the given path.
    ///
    /// Creates the necessary subdirectories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let records_path = base_path.join("records");

        fs::create_dir_all(&records_path).map_err(|source| StoreError::Unavailable {
            path: records_path.clone(),
            source,
        })?;

        Ok(Self {
            base_path,
            records_path,
        })
    }

    /// Returns the base path of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path of the document for a record id.
    #[must_use]
    pub fn record_path(&self, id: &RecordId) -> PathBuf {
        let partition = id
            .period_start()
            .map_or_else(|| "unknown".to_string(), |t| t.format("%Y").to_string());
        self.records_path.join(partition).join(format!("{id}.json"))
    }

    /// Runs a blocking store operation off the async executor.
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Self) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || op(store))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn read_record(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        let path = self.record_path(id);

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Unavailable { path, source }),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Corrupt { path, source })
    }

    fn write_record(&self, record: &StoredRecord) -> Result<PutOutcome> {
        let path = self.record_path(record.id());
        if path.exists() {
            return Ok(PutOutcome::AlreadyPresent);
        }

        let partition = path.parent().unwrap_or(&self.records_path).to_path_buf();
        let unavailable = |source: io::Error| StoreError::Unavailable {
            path: partition.clone(),
            source,
        };

        fs::create_dir_all(&partition).map_err(unavailable)?;

        let json = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Serialize {
            id: record.id().clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&partition).map_err(unavailable)?;
        tmp.write_all(&json).map_err(unavailable)?;
        tmp.as_file().sync_all().map_err(unavailable)?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => Ok(PutOutcome::Inserted),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(PutOutcome::AlreadyPresent)
            }
            Err(e) => Err(StoreError::Unavailable {
                path,
                source: e.error,
            }),
        }
    }

    /// Lists year partitions in ascending order.
    fn partitions(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.records_path).map_err(|source| {
            StoreError::Unavailable {
                path: self.records_path.clone(),
                source,
            }
        })?;

        let mut partitions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Unavailable {
                path: self.records_path.clone(),
                source,
            })?;
            let path = entry.path();
            let is_year = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.parse::<i32>().is_ok());
            if is_year && path.is_dir() {
                partitions.push(path);
            }
        }

        partitions.sort_by_key(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.parse::<i32>().ok())
        });
        Ok(partitions)
    }

    /// Lists the record ids stored in one partition.
    fn ids_in(partition: &Path) -> Result<Vec<(DateTime<Utc>, RecordId)>> {
        let entries = fs::read_dir(partition).map_err(|source| StoreError::Unavailable {
            path: partition.to_path_buf(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Unavailable {
                path: partition.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match RecordId::parse(stem) {
                Ok(id) => {
                    if let Some(start) = id.period_start() {
                        ids.push((start, id));
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unrecognised file");
                }
            }
        }

        Ok(ids)
    }

    fn find_edge(&self, edge: Edge) -> Result<Option<StoredRecord>> {
        let mut partitions = self.partitions()?;
        if edge == Edge::Latest {
            partitions.reverse();
        }

        for partition in partitions {
            let mut ids = Self::ids_in(&partition)?;
            ids.sort();
            if edge == Edge::Latest {
                ids.reverse();
            }

            for (_, id) in ids {
                match self.read_record(&id) {
                    Ok(Some(record)) => return Ok(Some(record)),
                    // removed since the directory was listed
                    Ok(None) => {}
                    Err(StoreError::Corrupt { path, source }) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %source,
                            "skipping unreadable record"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Ok(None)
    }

    fn count(&self) -> Result<usize> {
        let mut count = 0;
        for partition in self.partitions()? {
            count += Self::ids_in(&partition)?.len();
        }
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        let id = id.clone();
        self.blocking(move |store| store.read_record(&id)).await
    }

    async fn put(&self, record: &StoredRecord) -> Result<PutOutcome> {
        let record = record.clone();
        let outcome = self
            .blocking(move |store| store.write_record(&record))
            .await?;
        Ok(outcome)
    }

    async fn earliest(&self) -> Result<Option<StoredRecord>> {
        self.blocking(|store| store.find_edge(Edge::Earliest)).await
    }

    async fn summary(&self) -> Result<StoreSummary> {
        self.blocking(|store| {
            Ok(StoreSummary {
                count: store.count()?,
                earliest: store.find_edge(Edge::Earliest)?,
                latest: store.find_edge(Edge::Latest)?,
            })
        })
        .await
    }
}
