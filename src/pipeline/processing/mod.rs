// Record processing: typed record tree, dedup, range validation and the
// per-stream processor that sequences them

pub mod dedup;
pub mod quality_gate;
pub mod record;
pub mod stream_processor;
