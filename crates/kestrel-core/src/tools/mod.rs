mod bash;
mod diagnostics;
mod download;
mod edit;
pub(crate) mod exclude;
mod fetch;
mod glob;
mod grep;
mod ls;
mod multiedit;
mod read;
mod sourcegraph;
mod subagent;
mod write;

pub use bash::BashTool;
pub use diagnostics::DiagnosticsTool;
pub use download::DownloadTool;
pub use edit::EditTool;
pub use fetch::FetchTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use ls::LsTool;
pub use multiedit::MultiEditTool;
pub use read::ReadTool;
pub use sourcegraph::SourcegraphTool;
pub use subagent::AgentTool;
pub use write::WriteTool;
