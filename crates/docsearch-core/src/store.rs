//! Document sources consumed once at engine load time.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::Error;
use crate::traits::DocumentStore;
use crate::types::Document;

/// Reads every `*.json` file under a directory. A file holds either one
/// document object or an array of them.
pub struct JsonDirStore {
    root: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonFile {
    Many(Vec<Document>),
    One(Document),
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    fn list_json_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        files.sort();
        files
    }
}

impl DocumentStore for JsonDirStore {
    fn get_all(&self) -> Result<Vec<Document>> {
        if !self.root.exists() {
            return Err(anyhow!(Error::NotFound(self.root.display().to_string())));
        }
        let mut documents = Vec::new();
        for path in self.list_json_files(&self.root) {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
            let parsed: JsonFile = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
            let before = documents.len();
            match parsed {
                JsonFile::Many(docs) => documents.extend(docs),
                JsonFile::One(doc) => documents.push(doc),
            }
            debug!(path = %path.display(), count = documents.len() - before, "loaded documents");
        }
        Ok(documents)
    }
}

/// Fixed in-memory corpus.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new(documents: Vec<Document>) -> Self { Self { documents } }
}

impl DocumentStore for MemoryStore {
    fn get_all(&self) -> Result<Vec<Document>> { Ok(self.documents.clone()) }
}
