//! Device identity persistence.
//!
//! Pairing hands the device its credentials over the bus; this store keeps
//! them as one JSON object on disk. Updates merge field-by-field so a
//! partial refresh (say, a new token) keeps the rest intact.

use crate::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current identity map. A missing file means an empty identity; an
    /// unreadable one is logged and treated as empty.
    pub fn load(&self) -> Map<String, Value> {
        match fs::read_to_string(&self.path) {
            Ok(s) => match serde_json::from_str::<Map<String, Value>>(&s) {
                Ok(map) => map,
                Err(e) => {
                    warn!(target: "identity", error = %e, "identity file unreadable; starting empty");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        }
    }

    /// Merge `credentials` into the stored identity and persist.
    pub fn update(&self, credentials: &Map<String, Value>) -> Result<()> {
        let mut identity = self.load();
        for (key, value) in credentials {
            identity.insert(key.clone(), value.clone());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&Value::Object(identity))?;
        fs::write(&self.path, body)?;
        debug!(target: "identity", path = %self.path.display(), "identity updated");
        Ok(())
    }
}
