//! Session lifecycle: one browser, one pipeline, torn down together.

mod session;

pub use session::AgentSession;
