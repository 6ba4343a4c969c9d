//! Tool names and typed argument structs.
//!
//! The structs double as the source of each tool's JSON input schema.

use schemars::JsonSchema;
use serde::Deserialize;

pub const EXECUTE_COMMAND: &str = "execute_command";
pub const LIST_DIRECTORY: &str = "list_directory";
pub const GET_CURRENT_DIRECTORY: &str = "get_current_directory";

/// Arguments for `execute_command`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ExecuteCommandArgs {
    /// Shell command to execute
    pub command: String,

    /// Working directory to run the command in (defaults to the server's current directory)
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Timeout in seconds, must be greater than zero (default: 30)
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Arguments for `list_directory`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListDirectoryArgs {
    /// Directory path to list (default: ".")
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    ".".to_string()
}

/// `get_current_directory` takes no arguments.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetCurrentDirectoryArgs {}
