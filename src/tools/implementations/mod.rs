// Tool implementations
//
// The file tools the in-process toolbox runs

// Connectivity
pub mod ping;

// Tabular data
pub mod csv_tools;

// Plain text
pub mod text_tools;

// Re-exports for convenience
pub use csv_tools::{compute_insight, CsvAddRowTool, CsvInsightTool, CsvReadTool, InsightOperation};
pub use ping::PingTool;
pub use text_tools::{TextAppendTool, TextEditTool, TextReadTool};
