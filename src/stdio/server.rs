use anyhow::Result;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    model::{
        CallToolRequestParam, CallToolResult, GetPromptRequestParam, GetPromptResult,
        Implementation, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam,
        ReadResourceResult, ServerCapabilities, ServerInfo, Tool,
    },
    service::RequestContext,
    transport::stdio,
};
use serde_json::json;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

use super::gateway::ToolGateway;
use super::metadata::all_tool_metadata;
use crate::executor::CommandExecutor;

/// MCP server exposing the command execution tools over stdio.
///
/// Holds no per-connection state; every call is forwarded to the
/// [`ToolGateway`], which owns argument validation and dispatch.
#[derive(Debug, Clone)]
pub struct CommandServer {
    gateway: ToolGateway,
}

impl CommandServer {
    /// Create a new stdio server
    ///
    /// # Arguments
    /// * `executor` - Shared command execution engine
    /// * `enabled_tools` - Individual tool names to enable (from CLI --tool/--tools/--toolset)
    pub fn new(executor: CommandExecutor, enabled_tools: Option<HashSet<String>>) -> Self {
        Self {
            gateway: ToolGateway::new(executor, enabled_tools),
        }
    }

    /// Tools advertised by `tools/list`, honouring the tool filter.
    pub fn tools(&self) -> Vec<Tool> {
        all_tool_metadata()
            .iter()
            .filter(|tool_meta| self.gateway.is_enabled(tool_meta.name))
            .map(|tool_meta| {
                Tool::new(tool_meta.name, tool_meta.description, tool_meta.input_schema())
            })
            .collect()
    }

    /// Serve the stdio server until the peer disconnects or `shutdown_token` fires
    pub async fn serve_stdio(self, shutdown_token: CancellationToken) -> Result<()> {
        log::info!("Starting stdio server");

        let service = self
            .serve_with_ct(stdio(), shutdown_token)
            .await
            .inspect_err(|e| {
                log::error!("serving error: {e:?}");
            })?;
        let reason = service.waiting().await?;

        log::info!("Stdio server stopped: {reason:?}");
        Ok(())
    }
}

impl ServerHandler for CommandServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Command execution server - run shell commands, list directories and report \
                 the working directory. Every tool returns a plain text report."
                    .to_string(),
            ),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let output = self
            .gateway
            .dispatch(&request.name, request.arguments.as_ref())
            .await;
        Ok(output.into_call_result())
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.tools();
        log::debug!("Serving {} tools from static metadata", tools.len());
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn get_prompt(
        &self,
        _request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        Err(McpError::invalid_request("Prompts not supported", None))
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    /// Resources capability is not advertised; these exist to answer clients
    /// that ask anyway.
    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        Err(McpError::invalid_request(
            "Resources not supported",
            Some(json!({
                "message": "This server only supports tools.",
                "uri": request.uri
            })),
        ))
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: Vec::new(),
        })
    }
}
