//! Durable collection of learned templates, keyed by layout signature.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::invoice::rules::CATALOG_VERSION;
use crate::models::config::StoreConfig;
use crate::models::template::{parse_timestamp, Template};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// On-disk layout of the store file.
///
/// Records are read one at a time so a single bad record does not take the
/// rest of the file down with it.
#[derive(Debug, Deserialize)]
struct StoreFile {
    #[serde(default)]
    templates: Vec<Value>,
    #[serde(default)]
    last_updated: Option<Value>,
    #[serde(default = "current_catalog_version")]
    catalog_version: u32,
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    templates: Vec<Record<'a>>,
    last_updated: DateTime<Utc>,
    catalog_version: u32,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Record<'a> {
    Learned(&'a Template),
    Retained(&'a Value),
}

fn current_catalog_version() -> u32 {
    CATALOG_VERSION
}

/// In-memory template table backed by a JSON file.
///
/// Templates are only ever added or updated, never removed. Every mutation
/// rewrites the whole file; a failed write is logged and retried on the
/// next mutation.
#[derive(Debug, Default)]
pub struct TemplateStore {
    path: Option<PathBuf>,
    pretty: bool,
    templates: Vec<Template>,
    /// Records read from the file that could not be loaded, written back as-is.
    retained: Vec<Value>,
    by_signature: HashMap<String, usize>,
    dirty: bool,
    last_updated: Option<DateTime<Utc>>,
}

impl TemplateStore {
    /// A store that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            pretty: true,
            ..Self::default()
        }
    }

    /// Load the store at `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            pretty: true,
            ..Self::default()
        };

        if !path.exists() {
            debug!("No template store at {}, starting empty", path.display());
            return Ok(store);
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let file: StoreFile = serde_json::from_str(&content).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        if file.catalog_version != CATALOG_VERSION {
            warn!(
                "Template store {} was written with catalog v{}, current is v{}",
                path.display(),
                file.catalog_version,
                CATALOG_VERSION
            );
        }

        for record in file.templates {
            let template = match Template::deserialize(&record) {
                Ok(template) => template,
                Err(e) => {
                    warn!("Keeping unreadable template record as-is: {}", e);
                    store.retained.push(record);
                    continue;
                }
            };
            if store.by_signature.contains_key(template.layout_signature()) {
                warn!(
                    "Not loading template {}: layout {} already loaded",
                    template.id(),
                    template.layout_signature()
                );
                store.retained.push(record);
                continue;
            }
            store.push(template);
        }
        store.last_updated = file
            .last_updated
            .as_ref()
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        info!(
            "Loaded {} templates ({} records kept unread)",
            store.len(),
            store.retained.len()
        );
        Ok(store)
    }

    /// Load the store at `path`, falling back to an empty store when the
    /// file cannot be read.
    ///
    /// The unreadable file is moved to a `.corrupt-<timestamp>` sibling first.
    /// If that fails too, the returned store is not persisted at all.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let e = match Self::load(&path) {
            Ok(store) => return store,
            Err(e) => e,
        };
        error!("Error loading templates: {}", e);

        let mut store = Self::in_memory();
        let backup = corrupt_sibling(&path);
        match fs::rename(&path, &backup) {
            Ok(()) => {
                warn!(
                    "Moved unreadable template store to {}, starting empty",
                    backup.display()
                );
                store.path = Some(path);
            }
            Err(e) => error!(
                "Could not move {} aside ({}); templates will not be saved",
                path.display(),
                e
            ),
        }
        store
    }

    /// Open the store described by `config`.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::open(&config.path).with_pretty(config.pretty)
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether in-memory state has changes the file does not have.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Time of the last successful write, as recorded in the file.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.iter()
    }

    pub fn get(&self, layout_signature: &str) -> Option<&Template> {
        self.by_signature
            .get(layout_signature)
            .map(|&idx| &self.templates[idx])
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id() == id)
    }

    pub fn contains(&self, layout_signature: &str) -> bool {
        self.by_signature.contains_key(layout_signature)
    }

    /// Records from the file that could not be loaded.
    pub fn retained_len(&self) -> usize {
        self.retained.len()
    }

    /// Ordinal for the next template identifier. Counts retained records so
    /// identifiers already on disk are not handed out again.
    pub fn next_ordinal(&self) -> usize {
        self.templates.len() + self.retained.len() + 1
    }

    /// Add a template for a layout not seen before, then persist.
    pub fn insert(&mut self, template: Template) -> Result<&Template> {
        if self.contains(template.layout_signature()) {
            return Err(StoreError::DuplicateSignature(
                template.layout_signature().to_string(),
            ));
        }

        let idx = self.push(template);
        self.flush();
        Ok(&self.templates[idx])
    }

    /// Mutate the template registered under `layout_signature`, then persist.
    pub fn update<F>(&mut self, layout_signature: &str, f: F) -> Result<&Template>
    where
        F: FnOnce(&mut Template),
    {
        let idx = *self
            .by_signature
            .get(layout_signature)
            .ok_or_else(|| StoreError::UnknownSignature(layout_signature.to_string()))?;

        f(&mut self.templates[idx]);
        self.flush();
        Ok(&self.templates[idx])
    }

    /// Write every template to the backing file.
    ///
    /// The file is written to a temporary sibling and renamed into place.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return Ok(());
        };

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(dir).map_err(io_err)?;

        let now = Utc::now();
        let file = StoreFileRef {
            templates: self
                .templates
                .iter()
                .map(Record::Learned)
                .chain(self.retained.iter().map(Record::Retained))
                .collect(),
            last_updated: now,
            catalog_version: CATALOG_VERSION,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut tmp, &file)
        } else {
            serde_json::to_writer(&mut tmp, &file)
        };
        written.map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        tmp.flush().map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        self.dirty = false;
        self.last_updated = Some(now);
        info!("Saved {} templates", self.templates.len());
        Ok(())
    }

    fn push(&mut self, template: Template) -> usize {
        let idx = self.templates.len();
        self.by_signature
            .insert(template.layout_signature().to_string(), idx);
        self.templates.push(template);
        idx
    }

    fn flush(&mut self) {
        self.dirty = true;
        if let Err(e) = self.save() {
            error!("Error saving templates: {}", e);
        }
    }
}

/// `<dir>/<name>.corrupt-<UTC timestamp>` next to `path`.
fn corrupt_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("templates.json");
    path.with_file_name(format!(
        "{}.corrupt-{}",
        name,
        Utc::now().format("%Y%m%dT%H%M%S%.f")
    ))
}
