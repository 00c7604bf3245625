use crate::error::Result;
use crate::store::atomic;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_FILENAME: &str = "folio.json";

/// Store configuration, kept in `<root>/folio.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Take the collection lock for `read` and `read_all`.
    ///
    /// Off by default: readers never see a torn file anyway (records are
    /// replaced by rename), they may just observe the state from before a
    /// concurrent update. Turn on for linearizable reads at the cost of
    /// blocking behind writers.
    #[serde(default)]
    pub lock_reads: bool,
}

impl StoreConfig {
    /// Load config from the given root, or return defaults if not found
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let config_path = root.as_ref().join(CONFIG_FILENAME);
        if !config_path.is_file() {
            return Ok(Self::default());
        }
        atomic::read_json(&config_path)
    }

    /// Save config to the given root
    pub fn save<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let root = root.as_ref();
        let config_path = root.join(CONFIG_FILENAME);
        let tmp_path = atomic::temp_path_for(&config_path);
        atomic::write_atomic(root, &tmp_path, &config_path, self)
    }
}
