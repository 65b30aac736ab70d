pub mod agent;
pub mod bus;
pub mod event;
pub mod permission;
pub mod tool;
pub mod tools;

pub use agent::{Agent, AgentStream};
pub use bus::{Bus, Event, EventKind};
pub use event::{AgentEvent, DisplayBody, ToolCallDisplay, ToolResultDisplay};
pub use permission::{Decision, PermissionBroker, PermissionRequest};
pub use tool::{Tool, ToolOutput};
pub use tools::{
    AgentTool, BashTool, DiagnosticsTool, DownloadTool, EditTool, FetchTool, GlobTool, GrepTool,
    LsTool, MultiEditTool, ReadTool, SourcegraphTool, WriteTool,
};
