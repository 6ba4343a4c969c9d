//! Tool invocation gateway.
//!
//! Maps a `(tool name, arguments)` pair to exactly one engine operation.
//! Argument validation happens here, before the engine is touched, and every
//! path ends in a single text block.

use std::collections::HashSet;
use std::time::Duration;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::metadata::{
    all_tool_metadata, ExecuteCommandArgs, ListDirectoryArgs, EXECUTE_COMMAND,
    GET_CURRENT_DIRECTORY, LIST_DIRECTORY,
};
use crate::executor::{CommandExecutor, CommandRequest};

/// Text produced for one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Engine report. May itself describe a failure (timeout, denylist, ...).
    Report(String),
    /// The call never reached the engine.
    Rejected(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            Self::Report(text) | Self::Rejected(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn into_call_result(self) -> CallToolResult {
        match self {
            Self::Report(text) => CallToolResult::success(vec![Content::text(text)]),
            Self::Rejected(text) => CallToolResult::error(vec![Content::text(text)]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolGateway {
    executor: CommandExecutor,
    /// Enabled tool names (filtered by --tool/--tools/--toolset); `None` enables all.
    enabled_tools: Option<HashSet<String>>,
}

impl ToolGateway {
    pub fn new(executor: CommandExecutor, enabled_tools: Option<HashSet<String>>) -> Self {
        Self {
            executor,
            enabled_tools,
        }
    }

    /// Whether `name` is a known tool that passes the tool filter.
    pub fn is_enabled(&self, name: &str) -> bool {
        let known = all_tool_metadata().iter().any(|tool| tool.name == name);
        let allowed = self
            .enabled_tools
            .as_ref()
            .is_none_or(|enabled| enabled.contains(name));
        known && allowed
    }

    pub async fn dispatch(&self, name: &str, arguments: Option<&JsonObject>) -> ToolOutput {
        log::info!("Tool call: {name}");
        log::debug!("Tool call arguments for {name}: {arguments:?}");

        if !all_tool_metadata().iter().any(|tool| tool.name == name) {
            log::error!("Unknown tool requested: {name}");
            return ToolOutput::Rejected(format!("Error: unknown tool '{name}'"));
        }
        if !self.is_enabled(name) {
            log::warn!("Disabled tool requested: {name}");
            return ToolOutput::Rejected(format!("Error: tool '{name}' is not enabled"));
        }

        let empty = JsonObject::new();
        let arguments = arguments.unwrap_or(&empty);

        match name {
            EXECUTE_COMMAND => self.execute_command(arguments).await,
            LIST_DIRECTORY => match parse_args::<ListDirectoryArgs>(name, arguments) {
                Ok(args) => ToolOutput::Report(self.executor.list_directory(&args.path).await),
                Err(rejected) => rejected,
            },
            GET_CURRENT_DIRECTORY => ToolOutput::Report(self.executor.get_current_directory()),
            _ => ToolOutput::Rejected(format!("Error: unknown tool '{name}'")),
        }
    }

    async fn execute_command(&self, arguments: &JsonObject) -> ToolOutput {
        let has_command = arguments
            .get("command")
            .and_then(Value::as_str)
            .is_some_and(|command| !command.trim().is_empty());
        if !has_command {
            return ToolOutput::Rejected("Error: please provide a command to execute.".to_string());
        }

        let args = match parse_args::<ExecuteCommandArgs>(EXECUTE_COMMAND, arguments) {
            Ok(args) => args,
            Err(rejected) => return rejected,
        };

        let mut request = CommandRequest::new(args.command);
        if let Some(dir) = args.working_directory {
            request = request.working_directory(dir);
        }
        match args.timeout {
            Some(0) => {
                return ToolOutput::Rejected(
                    "Error: timeout must be greater than zero seconds.".to_string(),
                );
            }
            Some(secs) => request = request.timeout(Duration::from_secs(secs)),
            None => {}
        }

        ToolOutput::Report(self.executor.execute_command(request).await)
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &JsonObject) -> Result<T, ToolOutput> {
    serde_json::from_value(Value::Object(arguments.clone()))
        .map_err(|e| ToolOutput::Rejected(format!("Error: invalid arguments for {tool}: {e}")))
}
