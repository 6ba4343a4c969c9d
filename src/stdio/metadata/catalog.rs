//! Static metadata for every tool this server exposes.

use once_cell::sync::Lazy;

use super::args::{
    ExecuteCommandArgs, GetCurrentDirectoryArgs, ListDirectoryArgs, EXECUTE_COMMAND,
    GET_CURRENT_DIRECTORY, LIST_DIRECTORY,
};
use super::types::{build_schema, ToolMetadata};

fn execution_tools() -> Vec<ToolMetadata> {
    vec![ToolMetadata {
        name: EXECUTE_COMMAND,
        category: "execution",
        description: "Execute a shell command (sh -c on Unix, cmd /C on Windows) and return its \
                      exit code, stdout and stderr as text. Commands matching the destructive \
                      command denylist are rejected without running. Commands exceeding the \
                      timeout are killed.",
        schema: build_schema::<ExecuteCommandArgs>(),
    }]
}

fn filesystem_tools() -> Vec<ToolMetadata> {
    vec![
        ToolMetadata {
            name: LIST_DIRECTORY,
            category: "filesystem",
            description: "List the files and folders directly inside a directory, with \
                          human-readable file sizes.",
            schema: build_schema::<ListDirectoryArgs>(),
        },
        ToolMetadata {
            name: GET_CURRENT_DIRECTORY,
            category: "filesystem",
            description: "Return the server's current working directory.",
            schema: build_schema::<GetCurrentDirectoryArgs>(),
        },
    ]
}

/// All tools with static metadata, cached and sorted alphabetically.
static CACHED_TOOL_METADATA: Lazy<Vec<ToolMetadata>> = Lazy::new(|| {
    let mut tools = Vec::new();
    tools.extend(execution_tools());
    tools.extend(filesystem_tools());

    // Sort alphabetically by tool name for consistent ordering
    tools.sort_by(|a, b| a.name.cmp(b.name));

    tools
});

/// Returns a static reference to all tool metadata (cached, sorted).
pub fn all_tool_metadata() -> &'static [ToolMetadata] {
    &CACHED_TOOL_METADATA
}
