// Agent session - natural-language query in, one dispatched tool call out
//
// Usage:
//   let session = AgentSession::connect(&config, false).await?;
//   let envelope = session.run_action("what is the total of the amount column").await;

pub mod prompt;
pub mod session;

pub use session::{AgentSession, SessionOptions, Stage};
