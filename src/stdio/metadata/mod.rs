//! Static tool metadata for the stdio server.
//!
//! Schemas are generated once from the typed argument structs and served
//! as-is from `tools/list`.

mod args;
mod catalog;
mod types;

pub use args::{
    ExecuteCommandArgs, ListDirectoryArgs, EXECUTE_COMMAND, GET_CURRENT_DIRECTORY, LIST_DIRECTORY,
};
pub use catalog::all_tool_metadata;
