//! Built-in tool catalogue for Majordome.
//!
//! The catalogue is sealed: [`BuiltinTool`] lists every shipped tool and
//! [`BuiltinTool::build`] matches exhaustively, so a variant without a
//! handler does not compile. Names the model invents that are not in the
//! registry are still handled at dispatch time as a non-fatal error.

pub mod get_time;
pub mod list_files;
pub mod read_file;
pub mod run_shell;
pub mod write_file;

use std::fmt;
use std::str::FromStr;

use majordome_config::ToolsConfig;
use majordome_core::tool::{Tool, ToolRegistry};

pub use get_time::GetTimeTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use run_shell::RunShellTool;
pub use write_file::WriteFileTool;

/// Every tool shipped with Majordome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    GetTime,
    ReadFile,
    WriteFile,
    ListFiles,
    RunShell,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 5] = [
        BuiltinTool::GetTime,
        BuiltinTool::ReadFile,
        BuiltinTool::WriteFile,
        BuiltinTool::ListFiles,
        BuiltinTool::RunShell,
    ];

    /// The name the model uses to call this tool.
    pub const fn name(self) -> &'static str {
        match self {
            BuiltinTool::GetTime => "get_time",
            BuiltinTool::ReadFile => "read_file",
            BuiltinTool::WriteFile => "write_file",
            BuiltinTool::ListFiles => "list_files",
            BuiltinTool::RunShell => "run_shell",
        }
    }

    /// Instantiate the handler for this tool.
    pub fn build(self, config: &ToolsConfig) -> Box<dyn Tool> {
        match self {
            BuiltinTool::GetTime => Box::new(GetTimeTool),
            BuiltinTool::ReadFile => Box::new(ReadFileTool),
            BuiltinTool::WriteFile => Box::new(WriteFileTool),
            BuiltinTool::ListFiles => Box::new(ListFilesTool),
            BuiltinTool::RunShell => Box::new(RunShellTool::new(config.shell_timeout_secs)),
        }
    }
}

impl fmt::Display for BuiltinTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuiltinTool::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("Unknown built-in tool: {s}"))
    }
}

/// Registry holding every built-in tool, configured from `[tools]`.
pub fn registry_from_config(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in BuiltinTool::ALL {
        registry.register(tool.build(config));
    }
    registry
}

/// Registry holding every built-in tool with default settings.
pub fn default_registry() -> ToolRegistry {
    registry_from_config(&ToolsConfig::default())
}

/// The path argument, accepting the spellings models commonly produce.
pub(crate) fn path_argument(arguments: &serde_json::Value) -> Option<&str> {
    ["path", "file_path", "filepath", "filename", "directory", "dir"]
        .iter()
        .find_map(|key| arguments[*key].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_registered() {
        let registry = default_registry();
        assert_eq!(registry.len(), BuiltinTool::ALL.len());
        for tool in BuiltinTool::ALL {
            assert!(registry.contains(tool.name()), "missing {tool}");
        }
    }

    #[test]
    fn handler_name_matches_variant() {
        let config = ToolsConfig::default();
        for tool in BuiltinTool::ALL {
            assert_eq!(tool.build(&config).name(), tool.name());
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("run_shell".parse::<BuiltinTool>(), Ok(BuiltinTool::RunShell));
        assert!("send_email".parse::<BuiltinTool>().is_err());
    }

    #[test]
    fn positional_arguments() {
        let registry = default_registry();
        assert_eq!(registry.positional_argument("run_shell"), Some("command"));
        assert_eq!(registry.positional_argument("read_file"), Some("path"));
        assert_eq!(registry.positional_argument("list_files"), Some("path"));
        assert_eq!(registry.positional_argument("nope"), None);
    }

    #[test]
    fn path_argument_aliases() {
        let args = serde_json::json!({"file_path": "/tmp/a.txt"});
        assert_eq!(path_argument(&args), Some("/tmp/a.txt"));
        assert_eq!(path_argument(&serde_json::json!({})), None);
    }
}
