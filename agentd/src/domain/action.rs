//! The action catalog — a tagged union decoded from the LLM's tool calls.
//!
//! Replaces the source's dynamic dispatch-by-string-name with a closed set
//! of variants; an unrecognized tool name decodes to [`Action::Unknown`]
//! rather than failing the iteration.

use serde::Deserialize;

use crate::llm::{ToolCall, ToolDefinition};

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserOp {
    Navigate,
    GetText,
    Screenshot,
    Click,
    FillForm,
    ExtractLinks,
}

impl BrowserOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "navigate" => Some(Self::Navigate),
            "get_text" => Some(Self::GetText),
            "screenshot" => Some(Self::Screenshot),
            "click" => Some(Self::Click),
            "fill_form" => Some(Self::FillForm),
            "extract_links" => Some(Self::ExtractLinks),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ExecutePython { code: String },
    ShellCommand { command: String },
    BrowserNavigate { url: String, op: BrowserOp, selector: Option<String>, value: Option<String> },
    WebSearch { query: String, num_results: u32 },
    SaveFile { filename: String, content: String },
    ReadFile { filename: String },
    Complete { summary: String, output_files: Vec<String> },
    /// A tool name the loop does not recognize; treated as a no-op observation.
    Unknown { name: String },
}

#[derive(Debug, Deserialize)]
struct ExecutePythonArgs {
    code: String,
}

#[derive(Debug, Deserialize)]
struct ShellCommandArgs {
    command: String,
}

#[derive(Debug, Deserialize)]
struct BrowserNavigateArgs {
    url: String,
    op: String,
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default = "default_num_results")]
    num_results: u32,
}

fn default_num_results() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
struct SaveFileArgs {
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    filename: String,
}

#[derive(Debug, Deserialize)]
struct CompleteArgs {
    summary: String,
    #[serde(default)]
    output_files: Vec<String>,
}

/// Tool-call argument JSON failed to decode into the variant named by the call.
#[derive(Debug, thiserror::Error)]
#[error("malformed tool call arguments for '{name}': {source}")]
pub struct MalformedToolArgs {
    pub name: String,
    #[source]
    pub source: serde_json::Error,
}

impl Action {
    /// Decode a tool call into an [`Action`].
    ///
    /// Never evaluates the argument blob as code: it is parsed strictly as
    /// JSON against each variant's expected shape.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, MalformedToolArgs> {
        let wrap = |e: serde_json::Error| MalformedToolArgs {
            name: call.name.clone(),
            source: e,
        };

        match call.name.as_str() {
            "execute_python" => {
                let args: ExecutePythonArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::ExecutePython { code: args.code })
            }
            "shell_command" => {
                let args: ShellCommandArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::ShellCommand { command: args.command })
            }
            "browser_navigate" => {
                let args: BrowserNavigateArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                let op = BrowserOp::parse(&args.op).unwrap_or(BrowserOp::Navigate);
                Ok(Action::BrowserNavigate {
                    url: args.url,
                    op,
                    selector: args.selector,
                    value: args.value,
                })
            }
            "web_search" => {
                let args: WebSearchArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::WebSearch { query: args.query, num_results: args.num_results })
            }
            "save_file" => {
                let args: SaveFileArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::SaveFile { filename: args.filename, content: args.content })
            }
            "read_file" => {
                let args: ReadFileArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::ReadFile { filename: args.filename })
            }
            "complete" => {
                let args: CompleteArgs = serde_json::from_value(call.input.clone()).map_err(wrap)?;
                Ok(Action::Complete { summary: args.summary, output_files: args.output_files })
            }
            other => Ok(Action::Unknown { name: other.to_string() }),
        }
    }

    /// The fixed set of tools advertised to the model every iteration.
    pub fn tool_catalog() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new(
                "execute_python",
                "Run Python code in the sandbox and capture stdout/stderr.",
                serde_json::json!({"type": "object", "properties": {"code": {"type": "string"}}, "required": ["code"]}),
            ),
            ToolDefinition::new(
                "shell_command",
                "Run a POSIX shell command in the sandbox and capture stdout/stderr.",
                serde_json::json!({"type": "object", "properties": {"command": {"type": "string"}}, "required": ["command"]}),
            ),
            ToolDefinition::new(
                "browser_navigate",
                "Drive a headless browser session: navigate, get_text, screenshot, click, fill_form, or extract_links.",
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {"type": "string"},
                        "op": {"type": "string", "enum": ["navigate", "get_text", "screenshot", "click", "fill_form", "extract_links"]},
                        "selector": {"type": "string"},
                        "value": {"type": "string"}
                    },
                    "required": ["url", "op"]
                }),
            ),
            ToolDefinition::new(
                "web_search",
                "Search the web and return up to num_results {title, url, snippet} entries.",
                serde_json::json!({
                    "type": "object",
                    "properties": {"query": {"type": "string"}, "num_results": {"type": "integer"}},
                    "required": ["query"]
                }),
            ),
            ToolDefinition::new(
                "save_file",
                "Write content to a file in the task workspace.",
                serde_json::json!({
                    "type": "object",
                    "properties": {"filename": {"type": "string"}, "content": {"type": "string"}},
                    "required": ["filename", "content"]
                }),
            ),
            ToolDefinition::new(
                "read_file",
                "Read a file from the task workspace.",
                serde_json::json!({"type": "object", "properties": {"filename": {"type": "string"}}, "required": ["filename"]}),
            ),
            ToolDefinition::new(
                "complete",
                "Signal the task is done, with a final summary and the list of output files.",
                serde_json::json!({
                    "type": "object",
                    "properties": {"summary": {"type": "string"}, "output_files": {"type": "array", "items": {"type": "string"}}},
                    "required": ["summary"]
                }),
            ),
        ]
    }
}
