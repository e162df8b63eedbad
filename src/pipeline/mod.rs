// Telemetry pipeline: record processing, batch file I/O and orchestration

pub mod json_files;
pub mod orchestrator;
pub mod processing;
