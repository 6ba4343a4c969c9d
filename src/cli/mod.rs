mod types;

pub use types::{validate_tool_names, Cli, Commands};
