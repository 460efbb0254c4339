use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Content type of an ingestable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Markdown,
    Csv,
    Html,
    Pdf,
}

impl ContentType {
    /// Guess the content type from a file extension.
    ///
    /// Returns `None` for extensions we do not ingest.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "text" | "log" | "rst" => Some(ContentType::Text),
            "md" | "markdown" => Some(ContentType::Markdown),
            "csv" | "tsv" => Some(ContentType::Csv),
            "html" | "htm" | "xhtml" => Some(ContentType::Html),
            "pdf" => Some(ContentType::Pdf),
            _ => None,
        }
    }

    /// Guess the content type from an HTTP `Content-Type` header value.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            "text/html" | "application/xhtml+xml" => Some(ContentType::Html),
            "application/pdf" => Some(ContentType::Pdf),
            "text/csv" => Some(ContentType::Csv),
            "text/markdown" => Some(ContentType::Markdown),
            m if m.starts_with("text/") => Some(ContentType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Text => "text",
            ContentType::Markdown => "markdown",
            ContentType::Csv => "csv",
            ContentType::Html => "html",
            ContentType::Pdf => "pdf",
        };
        write!(f, "{}", s)
    }
}

/// Where a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Local file system path
    File,
    /// Fetched over HTTP
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::File => write!(f, "file"),
            SourceKind::Url => write!(f, "url"),
        }
    }
}

/// Source identifier of a document: a file path or a URL.
///
/// The location string is the document identity: re-ingesting the same
/// location supersedes the previous version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub location: String,
}

impl Source {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::File,
            location: path.into(),
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Url,
            location: url.into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// Metadata captured at extraction time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: Option<String>,
    pub title: Option<String>,
    pub size_bytes: u64,
}

/// A normalized document ready for chunking.
///
/// Immutable once created; a re-ingestion of the same source produces a new
/// `Document` with the same id, which replaces the old one wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub content_type: ContentType,
    pub source: Source,
    pub checksum: String,
    pub metadata: DocumentMetadata,
    pub created_at: String,
}

impl Document {
    /// Derive the stable document id from its source location.
    pub fn generate_id(source: &Source) -> String {
        use sha2::{Digest, Sha256};
        let input = format!("{}:{}", source.kind, source.location);
        let hash = Sha256::digest(input.as_bytes());
        hex::encode(&hash[..16])
    }

    pub fn new(
        content: String,
        content_type: ContentType,
        source: Source,
        metadata: DocumentMetadata,
    ) -> Self {
        let id = Self::generate_id(&source);
        let checksum = crate::utils::calculate_checksum(&content);
        Self {
            id,
            content,
            content_type,
            source,
            checksum,
            metadata,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn file_name(path: &Path) -> Option<String> {
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }
}

/// A bounded slice of document text, the atomic unit of embedding and
/// retrieval. Created during ingestion and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    pub content: String,
    pub start_offset: u64,
    pub end_offset: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    pub source: Source,
    pub checksum: String,
    pub created_at: String,
}

impl DocumentChunk {
    /// Deterministic chunk id: the same document and position always map to
    /// the same UUID, so a re-ingest overwrites rather than duplicates.
    pub fn generate_id(document_id: &str, chunk_index: u32) -> String {
        use uuid::Uuid;
        let name = format!("{}:{}", document_id, chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    pub fn from_document(
        document: &Document,
        content: String,
        chunk_index: u32,
        total_chunks: u32,
        start_offset: u64,
        end_offset: u64,
    ) -> Self {
        let id = Self::generate_id(&document.id, chunk_index);
        Self {
            id,
            document_id: document.id.clone(),
            chunk_index,
            total_chunks,
            content,
            start_offset,
            end_offset,
            embedding: Vec::new(),
            source: document.source.clone(),
            checksum: document.checksum.clone(),
            created_at: document.created_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_id_is_stable_per_source() {
        let a = Document::generate_id(&Source::file("/docs/a.txt"));
        let b = Document::generate_id(&Source::file("/docs/a.txt"));
        let c = Document::generate_id(&Source::url("https://example.com/a.txt"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn chunk_id_is_deterministic() {
        let id = DocumentChunk::generate_id("abc123", 5);
        assert_eq!(id, DocumentChunk::generate_id("abc123", 5));
        assert_ne!(id, DocumentChunk::generate_id("abc123", 6));
        assert_eq!(id.len(), 36);
    }

    #[test]
    fn content_type_detection() {
        assert_eq!(ContentType::from_extension("PDF"), Some(ContentType::Pdf));
        assert_eq!(ContentType::from_extension("md"), Some(ContentType::Markdown));
        assert_eq!(ContentType::from_extension("exe"), None);
        assert_eq!(
            ContentType::from_mime("text/html; charset=utf-8"),
            Some(ContentType::Html)
        );
        assert_eq!(
            ContentType::from_mime("application/pdf"),
            Some(ContentType::Pdf)
        );
        assert_eq!(ContentType::from_mime("image/png"), None);
    }

    #[test]
    fn new_document_gets_checksum() {
        let doc = Document::new(
            "content".to_string(),
            ContentType::Text,
            Source::file("/test.txt"),
            DocumentMetadata::default(),
        );
        assert!(!doc.id.is_empty());
        assert_eq!(doc.checksum.len(), 64);
    }
}
