pub mod anomaly_log_adapter;
pub mod canonical_shape;
pub mod ollama_transformer;
pub mod sqlite_store;
