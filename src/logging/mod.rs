// Request logging
//
// Diagnostic logs go through `tracing`; this module is the durable JSONL
// record of every action the pipeline handled.

pub mod action_log;

pub use action_log::{ActionLogger, ActionRecord};
