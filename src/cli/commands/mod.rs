pub mod ask;
pub mod config;
pub mod ingest;
pub mod kb;
pub mod session;
pub mod status;
