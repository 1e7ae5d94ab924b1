pub mod builtin;
pub mod constants;
pub mod eval;
pub mod executor;
pub mod global;
pub mod parser;
pub mod pipeline;
pub mod reaper;
pub mod registry;
pub mod signal;
pub mod types;
