//! Document sources feeding the index builder.

use async_trait::async_trait;
use convopilot_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A listed document whose bytes can be fetched on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    /// Display name, also used as the source identifier
    pub name: String,

    /// Source-specific address of the content
    pub locator: String,
}

/// Supplier of raw documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short description for logs.
    fn describe(&self) -> String;

    async fn list_documents(&self) -> AppResult<Vec<DocumentHandle>>;

    async fn fetch(&self, handle: &DocumentHandle) -> AppResult<Vec<u8>>;
}

/// Documents stored under a local directory.
///
/// Names are paths relative to the root with `/` separators, so the same
/// tree yields the same source identifiers on every platform.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl DocumentSource for DirectorySource {
    fn describe(&self) -> String {
        format!("directory {:?}", self.root)
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentHandle>> {
        if !self.root.is_dir() {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("document directory {:?} does not exist", self.root),
            )));
        }

        let mut handles: Vec<DocumentHandle> = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| DocumentHandle {
                name: self.relative_name(e.path()),
                locator: e.path().to_string_lossy().to_string(),
            })
            .collect();

        handles.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!("Listed {} files under {:?}", handles.len(), self.root);
        Ok(handles)
    }

    async fn fetch(&self, handle: &DocumentHandle) -> AppResult<Vec<u8>> {
        Ok(tokio::fs::read(&handle.locator).await?)
    }
}

/// A fixed set of documents held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    documents: Vec<(String, Vec<u8>)>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.documents.push((name.into(), content.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    fn describe(&self) -> String {
        format!("{} in-memory documents", self.documents.len())
    }

    async fn list_documents(&self) -> AppResult<Vec<DocumentHandle>> {
        Ok(self
            .documents
            .iter()
            .enumerate()
            .map(|(i, (name, _))| DocumentHandle {
                name: name.clone(),
                locator: i.to_string(),
            })
            .collect())
    }

    async fn fetch(&self, handle: &DocumentHandle) -> AppResult<Vec<u8>> {
        handle
            .locator
            .parse::<usize>()
            .ok()
            .and_then(|i| self.documents.get(i))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| AppError::Knowledge(format!("Unknown document '{}'", handle.name)))
    }
}
