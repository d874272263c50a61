pub mod config;
pub mod embeddings;
pub mod errors;
pub mod evaluation;
pub mod ingest;
pub mod matching;
pub mod rate_limit;
pub mod routes;
pub mod state;
