//! Document loaders.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::Document;
use crate::error::{RagError, Result};

/// A source of [`Document`]s.
///
/// `source` is interpreted by the implementation (a path, a URL, a table
/// name). Failures to reach or decode the source are reported as
/// [`RagError::LoaderError`] or [`RagError::Io`].
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load every document available at `source`.
    async fn load(&self, source: &str) -> Result<Vec<Document>>;

    /// Load several sources in order, concatenating their documents.
    ///
    /// Stops at the first failing source.
    async fn load_batch(&self, sources: &[&str]) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source in sources {
            documents.extend(self.load(source).await?);
        }
        Ok(documents)
    }
}

/// Loads a single UTF-8 text file as one document.
///
/// The document id is the file name and `source` is the path as given. The
/// metadata records `source` and `loaded_at` (RFC 3339) unless already set by
/// [`with_metadata`](TextFileLoader::with_metadata).
#[derive(Debug, Clone, Default)]
pub struct TextFileLoader {
    metadata: Vec<(String, String)>,
}

impl TextFileLoader {
    /// Create a loader with no extra metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a metadata entry to every loaded document.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl Loader for TextFileLoader {
    async fn load(&self, source: &str) -> Result<Vec<Document>> {
        let path = Path::new(source);
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| RagError::LoaderError {
                origin: source.to_string(),
                message: "path has no file name".to_string(),
            })?;

        let bytes = tokio::fs::read(path).await.inspect_err(|e| {
            error!(source, error = %e, "failed to read document");
        })?;
        let text = String::from_utf8(bytes).map_err(|e| RagError::LoaderError {
            origin: source.to_string(),
            message: format!("file is not valid UTF-8: {e}"),
        })?;

        let mut document = Document::new(id, text).with_source(source);
        for (key, value) in &self.metadata {
            document.metadata.insert(key.clone(), value.clone());
        }
        document.metadata.entry("source".to_string()).or_insert_with(|| source.to_string());
        document
            .metadata
            .entry("loaded_at".to_string())
            .or_insert_with(|| chrono::Utc::now().to_rfc3339());

        debug!(document.id = %document.id, bytes = document.text.len(), "loaded document");
        Ok(vec![document])
    }
}
