// Match engine: normalization, skill extraction, component scorers,
// weighted aggregation, recommendations.
// The embedding model is reached only through crate::embeddings.

pub mod aggregate;
pub mod catalog;
pub mod handlers;
pub mod normalize;
pub mod pipeline;
pub mod scorers;
