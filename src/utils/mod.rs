//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{calculate_checksum, is_text_file, read_file_content};
pub use retry::{RetryConfig, RetryResult, Retryable, with_retry};
pub use text::{estimate_tokens, is_blank, normalize_whitespace};
