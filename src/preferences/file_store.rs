use super::{PreferenceError, PreferenceStore, PreferenceValue};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use std::io::Write;
use std::sync::{PoisonError, RwLock};

/// Preference store persisted as a flat YAML map.
///
/// The whole file is loaded once by [`open`](Self::open). Every `set` rewrites
/// the file through a temporary sibling and an atomic rename while holding the
/// write lock, so concurrent writers persist in the order they were applied.
#[derive(Debug)]
pub struct YamlPreferenceStore {
    path: Utf8PathBuf,
    values: RwLock<IndexMap<String, PreferenceValue>>,
}

impl YamlPreferenceStore {
    /// Load the store from `path`, starting empty if the file does not exist.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| PreferenceError::Io {
                path: path.clone(),
                source,
            })?;

            if contents.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_yaml_ng::from_str(&contents).map_err(|source| PreferenceError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            tracing::debug!("Preference file {} not found, starting empty", path);
            IndexMap::new()
        };

        tracing::info!("Loaded {} preferences from {}", values.len(), path);

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn persist(&self, values: &IndexMap<String, PreferenceValue>) -> Result<(), PreferenceError> {
        let io_err = |source: std::io::Error| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };

        let yaml = serde_yaml_ng::to_string(values).map_err(PreferenceError::Serialize)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = Utf8PathBuf::from(format!("{}.tmp", self.path));
        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(yaml.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        Ok(())
    }
}

impl PreferenceStore for YamlPreferenceStore {
    fn get(&self, key: &str) -> Option<PreferenceValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: PreferenceValue) -> Result<(), PreferenceError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let previous = values.insert(key.to_string(), value);

        if let Err(e) = self.persist(&values) {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => {
                    values.insert(key.to_string(), old);
                }
                None => {
                    values.shift_remove(key);
                }
            }
            return Err(e);
        }

        tracing::debug!("Preference {} written to {}", key, self.path);
        Ok(())
    }
}
