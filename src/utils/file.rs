//! File utilities for ingestion.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// Check if a file is likely a text file.
pub fn is_text_file(path: &Path) -> bool {
    // Null bytes in the first block are a reliable binary indicator
    if let Ok(file) = fs::File::open(path) {
        let mut buffer = [0u8; 512];
        let mut reader = std::io::BufReader::new(file);
        if let Ok(n) = reader.read(&mut buffer) {
            if n == 0 {
                return true;
            }
            return !buffer[..n].contains(&0);
        }
    }
    false
}

/// Read file content with a size limit.
pub fn read_file_content(path: &Path, max_size: u64) -> std::io::Result<String> {
    let metadata = fs::metadata(path)?;

    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    fs::read_to_string(path)
}
