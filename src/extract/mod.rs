//! Source fetching and text extraction.
//!
//! Turns a [`Source`] (file path or URL) into a normalized [`Document`].
//! Format detection prefers the file extension for files and the
//! `Content-Type` header for URLs, falling back to the URL path extension.
//! Extracted text is whitespace-normalized before chunking.

use std::path::Path;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::debug;

use crate::error::IngestError;
use crate::models::{ContentType, Document, DocumentMetadata, IngestionConfig, Source, SourceKind};
use crate::utils::{is_blank, is_text_file, normalize_whitespace, read_file_content};

const FETCH_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("kbchat/", env!("CARGO_PKG_VERSION"));

pub struct Extractor {
    client: reqwest::Client,
    max_file_size: u64,
}

impl Extractor {
    pub fn new(config: &IngestionConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IngestError::Fetch {
                src: "http client".to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            client,
            max_file_size: config.max_file_size,
        })
    }

    /// Fetch a source and extract its text into a [`Document`].
    pub async fn extract(&self, source: &Source) -> Result<Document, IngestError> {
        let document = match source.kind {
            SourceKind::File => self.extract_file(source)?,
            SourceKind::Url => self.extract_url(source).await?,
        };

        if is_blank(&document.content) {
            return Err(IngestError::EmptyContent(source.location.clone()));
        }

        debug!(
            source = %source,
            content_type = %document.content_type,
            chars = document.content.chars().count(),
            "extracted document"
        );

        Ok(document)
    }

    fn extract_file(&self, source: &Source) -> Result<Document, IngestError> {
        let path = Path::new(&source.location);
        let content_type = detect_file_type(path, source)?;

        let mut metadata = DocumentMetadata {
            filename: Document::file_name(path),
            ..Default::default()
        };

        let content = match content_type {
            ContentType::Pdf => {
                let bytes = std::fs::read(path)
                    .map_err(|e| IngestError::FileReadError(format!("{}: {}", source, e)))?;
                metadata.size_bytes = bytes.len() as u64;
                extract_pdf(&bytes, source)?
            }
            ContentType::Html => {
                let raw = read_file_content(path, self.max_file_size)
                    .map_err(|e| IngestError::FileReadError(format!("{}: {}", source, e)))?;
                metadata.size_bytes = raw.len() as u64;
                let (text, title) = extract_html(&raw);
                metadata.title = title;
                text
            }
            _ => {
                let raw = read_file_content(path, self.max_file_size)
                    .map_err(|e| IngestError::FileReadError(format!("{}: {}", source, e)))?;
                metadata.size_bytes = raw.len() as u64;
                normalize_whitespace(&raw)
            }
        };

        Ok(Document::new(content, content_type, source.clone(), metadata))
    }

    async fn extract_url(&self, source: &Source) -> Result<Document, IngestError> {
        let response = self
            .client
            .get(&source.location)
            .send()
            .await
            .map_err(|e| IngestError::Fetch {
                src: source.location.clone(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(IngestError::Fetch {
                src: source.location.clone(),
                detail: format!("status {}", response.status()),
            });
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let content_type = header_mime
            .as_deref()
            .and_then(ContentType::from_mime)
            .or_else(|| url_extension(&source.location).and_then(|e| ContentType::from_extension(&e)))
            .ok_or_else(|| IngestError::UnsupportedFormat {
                src: source.location.clone(),
                detail: format!(
                    "unrecognized content type '{}'",
                    header_mime.unwrap_or_else(|| "unknown".to_string())
                ),
            })?;

        let body = self.read_body_capped(response, source).await?;

        let mut metadata = DocumentMetadata {
            size_bytes: body.len() as u64,
            ..Default::default()
        };

        let content = match content_type {
            ContentType::Pdf => extract_pdf(&body, source)?,
            ContentType::Html => {
                let (text, title) = extract_html(&String::from_utf8_lossy(&body));
                metadata.title = title;
                text
            }
            _ => normalize_whitespace(&String::from_utf8_lossy(&body)),
        };

        Ok(Document::new(content, content_type, source.clone(), metadata))
    }

    /// Read a response body, refusing anything over `max_file_size`. A
    /// Content-Length header rejects early; bodies without one are capped
    /// while streaming so a huge remote document is never fully buffered.
    async fn read_body_capped(
        &self,
        mut response: reqwest::Response,
        source: &Source,
    ) -> Result<Vec<u8>, IngestError> {
        let oversized = |len: u64| IngestError::Fetch {
            src: source.location.clone(),
            detail: format!("body exceeds maximum size: {} > {}", len, self.max_file_size),
        };

        if let Some(len) = response.content_length()
            && len > self.max_file_size
        {
            return Err(oversized(len));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| IngestError::Fetch {
            src: source.location.clone(),
            detail: e.to_string(),
        })? {
            let total = body.len() as u64 + chunk.len() as u64;
            if total > self.max_file_size {
                return Err(oversized(total));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn detect_file_type(path: &Path, source: &Source) -> Result<ContentType, IngestError> {
    if let Some(content_type) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ContentType::from_extension)
    {
        return Ok(content_type);
    }

    // Unknown extension: try the mime table, then sniff for plain text
    if let Some(content_type) = mime_guess::from_path(path)
        .first()
        .and_then(|m| ContentType::from_mime(m.essence_str()))
    {
        return Ok(content_type);
    }

    if is_text_file(path) {
        return Ok(ContentType::Text);
    }

    Err(IngestError::UnsupportedFormat {
        src: source.location.clone(),
        detail: "unrecognized extension and not a text file".to_string(),
    })
}

fn url_extension(location: &str) -> Option<String> {
    let parsed = url::Url::parse(location).ok()?;
    let path = parsed.path();
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || ext.contains('/') {
        return None;
    }
    Some(ext.to_string())
}

fn extract_pdf(bytes: &[u8], source: &Source) -> Result<String, IngestError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| IngestError::Extraction {
        src: source.location.clone(),
        detail: e.to_string(),
    })?;
    Ok(normalize_whitespace(&text))
}

/// Strip markup from an HTML page: visible block-level text plus the title.
fn extract_html(raw: &str) -> (String, Option<String>) {
    let document = Html::parse_document(raw);

    let title_selector = Selector::parse("title").expect("valid selector");
    let title = document
        .select(&title_selector)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let block_selector =
        Selector::parse("h1, h2, h3, h4, h5, h6, p, li, td, th, pre, blockquote, figcaption")
            .expect("valid selector");

    let mut blocks: Vec<String> = document
        .select(&block_selector)
        .map(|el| el.text().collect::<String>())
        .map(|t| normalize_whitespace(&t))
        .filter(|t| !t.is_empty())
        .collect();

    // Pages without block markup still get their raw text
    if blocks.is_empty() {
        let body_selector = Selector::parse("body").expect("valid selector");
        if let Some(body) = document.select(&body_selector).next() {
            let text = normalize_whitespace(&body.text().collect::<String>());
            if !text.is_empty() {
                blocks.push(text);
            }
        }
    }

    (blocks.join("\n\n"), title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn html_extraction_strips_markup() {
        let html = r#"
            <html>
              <head><title>Test Page</title><style>p { color: red }</style></head>
              <body>
                <script>var x = 1;</script>
                <h1>Heading</h1>
                <p>First   paragraph.</p>
                <p>Second paragraph.</p>
              </body>
            </html>
        "#;
        let (text, title) = extract_html(html);

        assert_eq!(title.as_deref(), Some("Test Page"));
        assert!(text.contains("Heading"));
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("color: red"));
    }

    #[test]
    fn url_extension_parsing() {
        assert_eq!(
            url_extension("https://example.com/docs/guide.pdf"),
            Some("pdf".to_string())
        );
        assert_eq!(
            url_extension("https://example.com/page.html?ref=1"),
            Some("html".to_string())
        );
        assert_eq!(url_extension("https://example.com/docs"), None);
        assert_eq!(url_extension("not a url"), None);
    }

    #[tokio::test]
    async fn text_file_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# Title\n\nSome    body text.\n").unwrap();

        let extractor = Extractor::new(&IngestionConfig::default()).unwrap();
        let source = Source::file(path.to_string_lossy());
        let doc = extractor.extract(&source).await.unwrap();

        assert_eq!(doc.content_type, ContentType::Markdown);
        assert_eq!(doc.content, "# Title\n\nSome body text.");
        assert_eq!(doc.metadata.filename.as_deref(), Some("note.md"));
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "   \n\t\n").unwrap();

        let extractor = Extractor::new(&IngestionConfig::default()).unwrap();
        let source = Source::file(path.to_string_lossy());
        let err = extractor.extract(&source).await.unwrap_err();

        assert!(matches!(err, IngestError::EmptyContent(_)));
    }

    // One-shot HTTP server: reads the request, writes `response`, closes.
    async fn serve_once(response: String) -> std::net::SocketAddr {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        addr
    }

    fn small_limit_extractor() -> Extractor {
        Extractor::new(&IngestionConfig {
            max_file_size: 1024,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn oversized_content_length_is_rejected_early() {
        let body = "x".repeat(4096);
        let addr = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let source = Source::url(format!("http://{}/big.txt", addr));
        let err = small_limit_extractor().extract(&source).await.unwrap_err();

        match err {
            IngestError::Fetch { detail, .. } => {
                assert!(detail.contains("exceeds maximum size"), "{}", detail)
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_unsized_body_is_capped_while_streaming() {
        // No Content-Length: the body is read until EOF, so only the
        // streaming cap can stop it
        let body = "y".repeat(4096);
        let addr = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{}",
            body
        ))
        .await;

        let source = Source::url(format!("http://{}/big.txt", addr));
        let err = small_limit_extractor().extract(&source).await.unwrap_err();

        match err {
            IngestError::Fetch { detail, .. } => {
                assert!(detail.contains("exceeds maximum size"), "{}", detail)
            }
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn url_body_within_limit_is_ingested() {
        let body = "small remote document";
        let addr = serve_once(format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ))
        .await;

        let source = Source::url(format!("http://{}/doc.txt", addr));
        let doc = small_limit_extractor().extract(&source).await.unwrap();

        assert_eq!(doc.content, "small remote document");
        assert_eq!(doc.content_type, ContentType::Text);
    }

    #[tokio::test]
    async fn binary_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0u8, 1, 2, 3, 0, 255]).unwrap();

        let extractor = Extractor::new(&IngestionConfig::default()).unwrap();
        let source = Source::file(path.to_string_lossy());
        let err = extractor.extract(&source).await.unwrap_err();

        assert!(matches!(err, IngestError::UnsupportedFormat { .. }));
        assert!(err.is_permanent());
    }
}
