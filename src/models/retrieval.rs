//! Retrieval models: scored chunks and result sets.

use serde::{Deserialize, Serialize};

use super::document::Source;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A single retrieved chunk with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: u32,
    pub content: String,
    pub source: Source,
    /// Similarity score (higher is closer; cosine scores land in 0.0-1.0)
    pub score: f32,
}

/// Ordered retrieval results: descending by score, capped at K.
///
/// An empty result set means "no relevant knowledge". It is a valid
/// outcome, not an error, and is what triggers the web-search fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub hits: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            hits: Vec::new(),
        }
    }

    /// Build a result set from raw hits: drop everything below `min_score`,
    /// sort descending, cap at `k`.
    pub fn from_hits(
        query: impl Into<String>,
        mut hits: Vec<RetrievedChunk>,
        k: usize,
        min_score: f32,
    ) -> Self {
        hits.retain(|h| h.score >= min_score);
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Self {
            query: query.into(),
            hits,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk_id: id.to_string(),
            document_id: "doc".to_string(),
            chunk_index: 0,
            content: "text".to_string(),
            source: Source::file("/test.txt"),
            score,
        }
    }

    #[test]
    fn sorted_thresholded_and_capped() {
        let hits = vec![hit("a", 0.2), hit("b", 0.9), hit("c", 0.5), hit("d", 0.7)];
        let result = RetrievalResult::from_hits("q", hits, 2, 0.4);

        assert_eq!(result.len(), 2);
        assert_eq!(result.hits[0].chunk_id, "b");
        assert_eq!(result.hits[1].chunk_id, "d");
    }

    #[test]
    fn below_threshold_yields_empty_not_error() {
        let hits = vec![hit("a", 0.1), hit("b", 0.2)];
        let result = RetrievalResult::from_hits("q", hits, 5, 0.5);
        assert!(result.is_empty());
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
