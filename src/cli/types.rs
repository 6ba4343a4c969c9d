use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::{Decoder, DecoderChain, Denylist, ExecutorConfig, DEFAULT_TIMEOUT_SECS};

/// Toolset configuration loaded from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsetConfig {
    /// List of individual tool names to enable
    pub tools: Vec<String>,
}

impl ToolsetConfig {
    /// Load toolset config from JSON file
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read toolset file: {}", path.display()))?;

        let config: ToolsetConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse toolset file as JSON: {}", path.display()))?;

        Ok(config)
    }
}

/// cmdserve - shell command execution tools for AI agents over MCP stdio
///
/// Available tools:
/// - `execute_command`: Run a shell command with a timeout
/// - `list_directory`: List a directory's direct children
/// - `get_current_directory`: Report the server's working directory
#[derive(Parser, Debug)]
#[command(name = "cmdserve")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable specific tools by name (comma-separated)
    ///
    /// Example: --tools execute_command,list_directory
    ///
    /// If not specified, all tools are enabled.
    #[arg(long, value_delimiter = ',', conflicts_with = "tool")]
    pub tools: Option<Vec<String>>,

    /// Enable specific tool by name (can be specified multiple times)
    ///
    /// Example: --tool list_directory --tool get_current_directory
    ///
    /// If not specified, all tools are enabled.
    #[arg(long = "tool", conflicts_with = "tools")]
    pub tool: Vec<String>,

    /// Load tool names from JSON file
    ///
    /// JSON format:
    /// ```json
    /// {
    ///   "tools": [
    ///     "list_directory",
    ///     "get_current_directory"
    ///   ]
    /// }
    /// ```
    #[arg(long, value_name = "PATH", conflicts_with_all = ["tool", "tools"])]
    pub toolset: Option<PathBuf>,

    /// List available tool names and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Timeout in seconds for commands that do not specify one (default: 30)
    /// Can also be set via `CMDSERVE_DEFAULT_TIMEOUT_SECS` environment variable
    #[arg(
        long,
        value_name = "SECONDS",
        env = "CMDSERVE_DEFAULT_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub default_timeout: u64,

    /// Additional denylist pattern (case-insensitive substring, repeatable)
    ///
    /// Appended to the built-in list. Can also be set via `CMDSERVE_DENY`
    /// as a comma-separated list.
    #[arg(long = "deny", value_name = "PATTERN", env = "CMDSERVE_DENY", value_delimiter = ',')]
    pub deny: Vec<String>,

    /// Encoding label tried first when decoding command output (e.g. euc-kr, shift_jis)
    ///
    /// Defaults to windows-949 on Windows; elsewhere decoding starts at UTF-8.
    #[arg(long, value_name = "LABEL", env = "CMDSERVE_ENCODING")]
    pub encoding: Option<String>,

    /// Also append log records to this file (stderr logging stays on)
    #[arg(long, value_name = "PATH", env = "CMDSERVE_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the tools once against the current directory and print the reports
    SelfTest,
}

impl Cli {
    /// Get the set of enabled tool names
    ///
    /// Returns None if no filter specified (enable all tools)
    /// Returns Some(HashSet) if filter specified (enable only these tools)
    pub fn enabled_tools(&self) -> anyhow::Result<Option<HashSet<String>>> {
        // Priority 1: --toolset (JSON file)
        if let Some(ref path) = self.toolset {
            let config = ToolsetConfig::from_file(path)?;
            return Ok(Some(config.tools.into_iter().collect()));
        }

        // Priority 2: --tools (comma-separated)
        if let Some(tools) = &self.tools {
            return Ok(Some(tools.iter().cloned().collect()));
        }

        // Priority 3: --tool (repeated flags)
        if !self.tool.is_empty() {
            return Ok(Some(self.tool.iter().cloned().collect()));
        }

        // No filter specified - enable all tools
        Ok(None)
    }

    /// Build the engine configuration from flags and environment
    pub fn executor_config(&self) -> anyhow::Result<ExecutorConfig> {
        if self.default_timeout == 0 {
            bail!("--default-timeout must be greater than zero");
        }

        let regional = match &self.encoding {
            Some(label) => Some(
                Decoder::for_label(label)
                    .with_context(|| format!("Unknown encoding label: {label}"))?,
            ),
            None => Decoder::platform_regional(),
        };

        let mut denylist = Denylist::with_defaults();
        denylist.extend(&self.deny);

        Ok(ExecutorConfig {
            denylist,
            decoders: DecoderChain::new(regional),
            default_timeout: Duration::from_secs(self.default_timeout),
        })
    }
}

/// Get all available tool names
pub fn available_tools() -> Vec<&'static str> {
    crate::stdio::metadata::all_tool_metadata()
        .iter()
        .map(|tool| tool.name)
        .collect()
}

/// Fail startup when the tool filter names a tool the catalog does not have.
pub fn validate_tool_names(enabled: &HashSet<String>) -> anyhow::Result<()> {
    let available = available_tools();
    let mut unknown: Vec<&str> = enabled
        .iter()
        .map(String::as_str)
        .filter(|name| !available.contains(name))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }

    unknown.sort_unstable();
    bail!(
        "Invalid tool names specified: {} (available: {}; see --list-tools)",
        unknown.join(", "),
        available.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["cmdserve"]).expect("parse");
        assert_eq!(cli.command, None);
        assert!(cli.enabled_tools().expect("tools").is_none());

        let config = cli.executor_config().expect("config");
        assert_eq!(config.default_timeout, Duration::from_secs(30));
        assert_eq!(config.denylist, Denylist::with_defaults());
    }

    #[test]
    fn test_tool_filters() {
        let cli = Cli::try_parse_from(["cmdserve", "--tools", "list_directory,execute_command"])
            .expect("parse");
        let tools = cli.enabled_tools().expect("tools").expect("filter");
        assert_eq!(tools.len(), 2);
        assert!(tools.contains("execute_command"));

        let cli = Cli::try_parse_from(["cmdserve", "--tool", "list_directory"]).expect("parse");
        assert_eq!(
            cli.enabled_tools().expect("tools"),
            Some(HashSet::from(["list_directory".to_string()]))
        );

        assert!(Cli::try_parse_from(["cmdserve", "--tool", "a", "--tools", "b"]).is_err());
    }

    #[test]
    fn test_toolset_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"tools": ["get_current_directory"]}}"#).expect("write");

        let args = vec![
            OsString::from("cmdserve"),
            OsString::from("--toolset"),
            file.path().as_os_str().to_owned(),
        ];
        let cli = Cli::try_parse_from(args).expect("parse");
        assert_eq!(
            cli.enabled_tools().expect("tools"),
            Some(HashSet::from(["get_current_directory".to_string()]))
        );
    }

    #[test]
    fn test_malformed_toolset_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "tools: [oops").expect("write");

        let err = ToolsetConfig::from_file(file.path()).expect_err("malformed");
        assert!(err.to_string().contains("Failed to parse toolset file"));
    }

    #[test]
    fn test_engine_flags() {
        let cli = Cli::try_parse_from([
            "cmdserve",
            "--default-timeout",
            "5",
            "--deny",
            "curl,wget",
            "--encoding",
            "euc-kr",
        ])
        .expect("parse");
        let config = cli.executor_config().expect("config");

        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert_eq!(config.denylist.matched("WGET http://x"), Some("wget"));
        assert_eq!(config.decoders.candidates()[0].name(), "EUC-KR");
    }

    #[test]
    fn test_invalid_engine_flags() {
        let zero = Cli::try_parse_from(["cmdserve", "--default-timeout", "0"]).expect("parse");
        assert!(zero.executor_config().is_err());

        let bad_label = Cli::try_parse_from(["cmdserve", "--encoding", "klingon"]).expect("parse");
        let err = bad_label.executor_config().expect_err("unknown label");
        assert!(err.to_string().contains("Unknown encoding label: klingon"));
    }

    #[test]
    fn test_self_test_subcommand() {
        let cli = Cli::try_parse_from(["cmdserve", "self-test"]).expect("parse");
        assert_eq!(cli.command, Some(Commands::SelfTest));
    }

    #[test]
    fn test_validate_tool_names() {
        let known: HashSet<String> = ["list_directory".to_string()].into();
        assert!(validate_tool_names(&known).is_ok());

        let mixed: HashSet<String> =
            ["list_directory".to_string(), "rm_rf".to_string(), "eval".to_string()].into();
        let err = validate_tool_names(&mixed).expect_err("unknown names");
        let message = err.to_string();
        assert!(message.starts_with("Invalid tool names specified: eval, rm_rf"), "{message}");
        assert!(message.contains("execute_command"), "{message}");
    }

    #[test]
    fn test_available_tools() {
        assert_eq!(
            available_tools(),
            vec!["execute_command", "get_current_directory", "list_directory"]
        );
    }
}
