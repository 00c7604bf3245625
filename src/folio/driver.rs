//! # Store Driver
//!
//! [`Driver`] is the public face of the store: it maps collection names to
//! directories, record ids to files, and composes the identity policy, the
//! lock registry and the atomic writer into CRUD operations.
//!
//! ## Consistency
//!
//! Mutations (`write`, `update`, `delete`) on the same collection are
//! serialized by that collection's lock; different collections never wait on
//! each other. Reads take no lock unless [`StoreConfig::lock_reads`] is set.
//! An unlocked reader racing an update sees either the old or the new record,
//! never a mix of both, because records are only ever replaced by rename.
//!
//! ## Choosing a Policy
//!
//! ```no_run
//! use folio::driver::AutoDriver;
//! use folio::model::Envelope;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Post {
//!     title: String,
//!     body: String,
//! }
//!
//! # fn main() -> folio::error::Result<()> {
//! let db = AutoDriver::open("data")?;
//! let id = db.write("posts", &Post { title: "MyTitle".into(), body: "MyContent".into() })?;
//! let post: Envelope<Post> = db.read("posts", &id)?;
//! # Ok(())
//! # }
//! ```
//!
//! With [`KeyedDriver`] the payload implements
//! [`Identified`](crate::model::Identified) and is stored without an envelope.

use crate::config::StoreConfig;
use crate::error::{FolioError, IoOp, Result};
use crate::identity::{AutoIncrement, ExplicitId, IdentityPolicy};
use crate::model::{Envelope, Identified, Record};
use crate::store::atomic::{self, is_temp_file, temp_path_for};
use crate::store::locks::{acquire, LockRegistry};
use crate::store::{validate_name, RECORD_EXT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

pub type AutoDriver = Driver<AutoIncrement>;
pub type KeyedDriver = Driver<ExplicitId>;

/// Report from the `doctor` operation.
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub removed_temp_files: usize,
    pub corrupt_records: Vec<PathBuf>,
}

/// What a `delete` call resolved to, before anything is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DeleteTarget {
    Record(PathBuf),
    Directory(PathBuf),
}

/// Only the metadata half of a stored envelope.
#[derive(Deserialize)]
struct StoredRecord {
    record: Record,
}

#[derive(Debug)]
pub struct Driver<P: IdentityPolicy> {
    root: PathBuf,
    config: StoreConfig,
    locks: LockRegistry,
    policy: P,
}

impl<P: IdentityPolicy> Driver<P> {
    /// Opens (creating if needed) a store at `root`, reading `folio.json` if
    /// present.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = ensure_root(root.as_ref())?;
        let config = StoreConfig::load(&root)?;
        Self::build(root, config)
    }

    /// Like [`open`](Self::open) but ignores any config file on disk.
    pub fn open_with_config(root: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let root = ensure_root(root.as_ref())?;
        Self::build(root, config)
    }

    fn build(root: PathBuf, config: StoreConfig) -> Result<Self> {
        let policy = P::recover(&root)?;
        debug!(root = %root.display(), lock_reads = config.lock_reads, "store opened");
        Ok(Self {
            root,
            config,
            locks: LockRegistry::new(),
            policy,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        validate_name(collection, FolioError::MissingCollection)?;
        Ok(self.root.join(collection))
    }

    /// Returns `(collection dir, record file)`.
    fn record_path(&self, collection: &str, id: &str) -> Result<(PathBuf, PathBuf)> {
        let dir = self.collection_dir(collection)?;
        validate_name(id, FolioError::MissingId)?;
        let path = dir.join(format!("{}{}", id, RECORD_EXT));
        Ok((dir, path))
    }

    /// Atomically places `value` at `<collection>/<id>.json` under the
    /// collection lock.
    fn write_locked<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        value: &T,
    ) -> Result<()> {
        let (dir, path) = self.record_path(collection, id)?;
        let tmp = temp_path_for(&path);

        let lock = self.locks.lock_for(collection);
        let _guard = acquire(&lock);
        atomic::write_atomic(&dir, &tmp, &path, value)
    }

    /// Reads one record into whatever shape the caller asks for.
    ///
    /// For auto-increment stores that is usually `Envelope<T>`; for explicit
    /// identity it is the stored type itself.
    pub fn read<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T> {
        let (_, path) = self.record_path(collection, id)?;

        let lock = self.config.lock_reads.then(|| self.locks.lock_for(collection));
        let _guard = lock.as_deref().map(acquire);

        trace!(collection, id, "read");
        atomic::read_json(&path)
    }

    /// Raw bytes of every record in `collection`, in directory order.
    ///
    /// Temp files and subdirectories are skipped. The result is not sorted;
    /// sort by id or timestamp after decoding if order matters.
    pub fn read_all(&self, collection: &str) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .read_all_with_paths(collection)?
            .into_iter()
            .map(|(_, bytes)| bytes)
            .collect())
    }

    /// [`read_all`](Self::read_all), decoded. Fails with `Corrupt` on the
    /// first record that does not match `T`.
    pub fn read_all_as<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        self.read_all_with_paths(collection)?
            .iter()
            .map(|(path, bytes)| atomic::decode(path, bytes))
            .collect()
    }

    fn read_all_with_paths(&self, collection: &str) -> Result<Vec<(PathBuf, Vec<u8>)>> {
        let dir = self.collection_dir(collection)?;

        let lock = self.config.lock_reads.then(|| self.locks.lock_for(collection));
        let _guard = lock.as_deref().map(acquire);

        let mut records = Vec::new();
        for path in list_record_files(&dir)? {
            match atomic::read_bytes(&path) {
                Ok(bytes) => records.push((path, bytes)),
                // deleted between listing and reading
                Err(FolioError::NotFound(_)) => trace!(path = %path.display(), "vanished"),
                Err(e) => return Err(e),
            }
        }
        debug!(collection, count = records.len(), "read all");
        Ok(records)
    }

    /// Removes one record, or a whole collection when `id` is empty.
    ///
    /// The target is resolved first: a record file `<id>.json`, then a
    /// directory `<id>` inside the collection. Nothing matching is `NotFound`.
    pub fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let dir = self.collection_dir(collection)?;

        let lock = self.locks.lock_for(collection);
        let _guard = acquire(&lock);

        match resolve_delete(&dir, id)? {
            DeleteTarget::Record(path) => {
                fs::remove_file(&path).map_err(FolioError::io(IoOp::Remove, &path))?;
                debug!(collection, id, "record deleted");
            }
            DeleteTarget::Directory(path) => {
                fs::remove_dir_all(&path).map_err(FolioError::io(IoOp::Remove, &path))?;
                debug!(collection, path = %path.display(), "directory deleted");
            }
        }
        Ok(())
    }

    pub fn delete_collection(&self, collection: &str) -> Result<()> {
        self.delete(collection, "")
    }

    /// Sweeps leftover temp files and lists records that no longer parse.
    ///
    /// Corrupt records are only reported; deciding what to do with them is up
    /// to the caller.
    pub fn doctor(&self) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();

        let entries =
            fs::read_dir(&self.root).map_err(FolioError::io(IoOp::ReadDir, &self.root))?;
        for entry in entries {
            let entry = entry.map_err(FolioError::io(IoOp::ReadDir, &self.root))?;
            let dir = entry.path();
            let Some(collection) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !dir.is_dir() || validate_name(&collection, FolioError::MissingCollection).is_err() {
                continue;
            }

            let lock = self.locks.lock_for(&collection);
            let _guard = acquire(&lock);

            for file in fs::read_dir(&dir).map_err(FolioError::io(IoOp::ReadDir, &dir))? {
                let path = file.map_err(FolioError::io(IoOp::ReadDir, &dir))?.path();
                if !path.is_file() {
                    continue;
                }
                let is_record = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(RECORD_EXT));
                if is_temp_file(&path) {
                    fs::remove_file(&path).map_err(FolioError::io(IoOp::Remove, &path))?;
                    report.removed_temp_files += 1;
                    continue;
                }
                if !is_record {
                    continue;
                }
                match atomic::read_json::<serde_json::Value>(&path) {
                    Ok(_) | Err(FolioError::NotFound(_)) => {}
                    Err(FolioError::Corrupt { path, source }) => {
                        warn!(path = %path.display(), error = %source, "corrupt record");
                        report.corrupt_records.push(path);
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        debug!(
            removed_temp_files = report.removed_temp_files,
            corrupt = report.corrupt_records.len(),
            "doctor finished"
        );
        Ok(report)
    }
}

impl Driver<AutoIncrement> {
    /// Stores `payload` under the next id of `collection` and returns that id.
    pub fn write<T: Serialize + ?Sized>(&self, collection: &str, payload: &T) -> Result<String> {
        validate_name(collection, FolioError::MissingCollection)?;

        let id = self.policy.next_id(collection)?.to_string();
        let envelope = Envelope {
            record: Record::new(id.clone()),
            data: payload,
        };
        self.write_locked(collection, &id, &envelope)?;

        debug!(collection, id = %id, "record written");
        Ok(id)
    }

    /// Replaces the payload of an existing record.
    ///
    /// The record must exist. Its id and `created_at` are carried over and
    /// `updated_at` moves strictly forward. Returns the new metadata.
    pub fn update<T: Serialize + ?Sized>(
        &self,
        collection: &str,
        id: &str,
        payload: &T,
    ) -> Result<Record> {
        let (dir, path) = self.record_path(collection, id)?;

        let lock = self.locks.lock_for(collection);
        let _guard = acquire(&lock);

        let stored: StoredRecord = atomic::read_json(&path)?;
        let envelope = Envelope {
            record: stored.record.touched(),
            data: payload,
        };
        atomic::write_atomic(&dir, &temp_path_for(&path), &path, &envelope)?;

        debug!(collection, id, "record updated");
        Ok(envelope.record)
    }
}

impl Driver<ExplicitId> {
    /// Stores `record` as-is under its own id. Timestamps, if the type carries
    /// any, are the caller's business.
    pub fn write<T: Serialize + Identified + ?Sized>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<String> {
        validate_name(collection, FolioError::MissingCollection)?;
        let id = record.id();
        validate_name(id, FolioError::MissingIdentity)?;

        self.write_locked(collection, id, record)?;

        debug!(collection, id, "record written");
        Ok(id.to_string())
    }

    /// Replaces an existing record; fails with `NotFound` if there is none.
    pub fn update<T: Serialize + Identified + ?Sized>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<String> {
        validate_name(collection, FolioError::MissingCollection)?;
        let id = record.id();
        validate_name(id, FolioError::MissingIdentity)?;
        let (dir, path) = self.record_path(collection, id)?;

        let lock = self.locks.lock_for(collection);
        let _guard = acquire(&lock);

        if !path.is_file() {
            return Err(FolioError::NotFound(path));
        }
        atomic::write_atomic(&dir, &temp_path_for(&path), &path, record)?;

        debug!(collection, id, "record updated");
        Ok(id.to_string())
    }
}

fn ensure_root(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root).map_err(FolioError::io(IoOp::CreateDir, root))?;
    Ok(root.to_path_buf())
}

fn resolve_delete(dir: &Path, id: &str) -> Result<DeleteTarget> {
    if id.is_empty() {
        return if dir.is_dir() {
            Ok(DeleteTarget::Directory(dir.to_path_buf()))
        } else {
            Err(FolioError::NotFound(dir.to_path_buf()))
        };
    }
    validate_name(id, FolioError::MissingId)?;

    let file = dir.join(format!("{}{}", id, RECORD_EXT));
    if file.is_file() {
        return Ok(DeleteTarget::Record(file));
    }
    let nested = dir.join(id);
    if nested.is_dir() {
        return Ok(DeleteTarget::Directory(nested));
    }
    Err(FolioError::NotFound(file))
}

fn list_record_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(FolioError::NotFound(dir.to_path_buf()))
        }
        Err(e) => return Err(FolioError::io(IoOp::ReadDir, dir)(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(FolioError::io(IoOp::ReadDir, dir))?.path();
        if path.is_file() && !is_temp_file(&path) {
            files.push(path);
        }
    }
    Ok(files)
}
