//! Local embedding strategy: ONNX Runtime inference, no network dependency.
//!
//! Expects a directory containing `model.onnx` and `tokenizer.json` for a
//! BGE-style encoder. Embeddings are CLS-pooled and L2-normalized.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};

use super::{Embedder, QUERY_INSTRUCTION, check_dimensions};
use crate::error::EmbeddingError;
use crate::models::EmbeddingConfig;

#[derive(Debug)]
pub struct LocalEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl LocalEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let model_dir = config.model_dir.as_deref().ok_or_else(|| {
            EmbeddingError::ModelError(
                "embedding.model_dir is required for the local strategy".to_string(),
            )
        })?;
        let model_dir = Path::new(model_dir);
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::ModelError(format!(
                "model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?
            .with_intra_threads(num_cpus())
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;

        // Truncation prevents OOM on long chunks; padding enables batching
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens as usize,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model: config.model.clone(),
            dimension: config.dimension as usize,
            batch_size: config.batch_size.max(1) as usize,
        })
    }

    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::ModelError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        // Single-sequence input: token type ids stay zero
        let token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
            }
        }

        let input_ids_tensor = Tensor::from_array(([batch_size, max_len], input_ids))
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array(([batch_size, max_len], attention_mask))
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([batch_size, max_len], token_type_ids))
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::ModelError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                input_ids_tensor,
                attention_mask_tensor,
                token_type_ids_tensor
            ])
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| EmbeddingError::ModelError(e.to_string()))?;

        let shape = output_array.shape();
        check_output_width(shape, self.dimension)?;

        // BGE encoders pool on the CLS token (position 0)
        let embeddings: Vec<Vec<f32>> = if shape.len() == 3 {
            (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> = (0..self.dimension)
                        .map(|d| output_array[[i, 0, d]])
                        .collect();
                    normalize(&embedding)
                })
                .collect()
        } else if shape.len() == 2 {
            (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..self.dimension).map(|d| output_array[[i, d]]).collect();
                    normalize(&embedding)
                })
                .collect()
        } else {
            return Err(EmbeddingError::ModelError(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        };

        Ok(embeddings)
    }

    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all_embeddings.extend(self.run_batch(batch)?);
        }

        check_dimensions(&all_embeddings, self.dimension)?;
        Ok(all_embeddings)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.embed_all(texts)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let prefixed = format!("{}{}", QUERY_INSTRUCTION, text);
        let embeddings = self.embed_all(std::slice::from_ref(&prefixed))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding output".to_string()))
    }
}

/// The model's hidden size (last output axis) must equal the configured
/// dimension, or the pooling loops below would index out of bounds.
fn check_output_width(shape: &[usize], expected: usize) -> Result<(), EmbeddingError> {
    let actual = shape.last().copied().unwrap_or(0);
    if actual != expected {
        return Err(EmbeddingError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
