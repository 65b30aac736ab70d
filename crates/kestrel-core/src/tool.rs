use kestrel_llm::{Describe, ToolDefinition};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

use crate::event::{ToolCallDisplay, ToolResultDisplay};

/// Errors a tool call can fail with, at the `kestrel-core` boundary.
///
/// `PermissionDenied` is distinguished from the generic `Llm` variant because
/// the agent loop reacts to it specially: it writes an error `ToolResult` and
/// ends the assistant turn with `Finish{reason: permission_denied}` instead
/// of looping back to the model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("permission denied")]
    PermissionDenied,

    #[error(transparent)]
    Llm(#[from] kestrel_llm::Error),
}

impl Error {
    pub fn other(message: impl Into<String>) -> Self {
        Error::Llm(kestrel_llm::Error::Other(message.into()))
    }
}

/// Describes a side effect a tool call is about to perform, for the
/// Permission Broker. `action` is the normalized grant-scope key (the exact
/// command string for Bash, the workspace-relative path for file tools);
/// `path` is set when the action touches a specific file.
#[derive(Debug, Clone)]
pub struct PermissionScope {
    pub action: String,
    pub path: Option<String>,
}

/// Output produced by a [`Tool`] call. Implementors decide how their
/// structured result collapses to the plain-text form the model sees.
pub trait ToolOutput {
    /// Render this output as the text sent back to the model as the
    /// `ToolResult` content.
    fn to_llm(&self) -> String;
}

/// A callable tool with typed input and output. Implement this trait to
/// register tools with the agent.
///
/// The `Input` type must implement [`Describe`] (for schema generation),
/// [`DeserializeOwned`] (for parsing the model's JSON arguments), and
/// `Clone` (the erasure layer needs the input both to run the call and,
/// afterwards, to render the result display).
///
/// Tools must be `Clone` so the erasure layer can clone them before calling
/// `async fn call` — this avoids the borrow-across-await problem without
/// requiring manual `Box::pin`.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone)]
/// struct ReadFile;
///
/// impl Tool for ReadFile {
///     type Input = ReadFileInput;
///     type Output = ReadFileOutput;
///
///     fn name(&self) -> &str { "read_file" }
///     fn description(&self) -> &str { "Read a file from disk" }
///
///     async fn call(&self, input: ReadFileInput) -> Result<ReadFileOutput, Error> {
///         let content = std::fs::read_to_string(&input.path)
///             .map_err(Error::other)?;
///         Ok(ReadFileOutput { content })
///     }
///
///     fn render_input(&self, input: &ReadFileInput) -> ToolCallDisplay { .. }
///     fn render_output(&self, input: &ReadFileInput, output: &ReadFileOutput) -> ToolResultDisplay { .. }
/// }
/// ```
pub trait Tool: Clone + Send + Sync + 'static {
    type Input: Describe + DeserializeOwned + Clone + Send;
    type Output: ToolOutput + Send;

    fn name(&self) -> &str;
    fn description(&self) -> &str;

    fn call(&self, input: Self::Input) -> impl Future<Output = Result<Self::Output, Error>> + Send;

    /// Render the input side of this call for display before it runs.
    fn render_input(&self, input: &Self::Input) -> ToolCallDisplay;

    /// Render the output side of this call for display once it completes.
    fn render_output(&self, input: &Self::Input, output: &Self::Output) -> ToolResultDisplay;

    /// Describe the side effect this call is about to perform, for the
    /// Permission Broker. Tools with no side effects (read-only tools) keep
    /// the default, which requires no permission.
    fn permission_scope(&self, _input: &Self::Input) -> Option<PermissionScope> {
        None
    }
}

// ---------------------------------------------------------------------------
// Type erasure
// ---------------------------------------------------------------------------

/// Object-safe, type-erased wrapper around a [`Tool`].
///
/// Split into a synchronous `render_call` (so the agent loop can show the
/// call before it runs, without waiting on the future) and an async
/// `call_erased` that yields the plain-text model-facing result alongside
/// its rendered display. The returned future is `'static` — it does not
/// borrow `self`, which allows callers to drop locks before awaiting.
pub(crate) trait ErasedTool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn render_call(&self, arguments: &str) -> Result<ToolCallDisplay, Error>;

    /// `Ok(None)` means the call has no side effect requiring permission.
    fn permission_scope(&self, arguments: &str) -> Result<Option<PermissionScope>, Error>;

    fn call_erased(
        &self,
        arguments: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(String, ToolResultDisplay), Error>> + Send>>;
}

impl<T: Tool> ErasedTool for T {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: T::Input::describe(),
        }
    }

    fn render_call(&self, arguments: &str) -> Result<ToolCallDisplay, Error> {
        let input: T::Input = serde_json::from_str(arguments).map_err(Error::other)?;
        Ok(self.render_input(&input))
    }

    fn permission_scope(&self, arguments: &str) -> Result<Option<PermissionScope>, Error> {
        let input: T::Input = serde_json::from_str(arguments).map_err(Error::other)?;
        Ok(Tool::permission_scope(self, &input))
    }

    fn call_erased(
        &self,
        arguments: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(String, ToolResultDisplay), Error>> + Send>> {
        let parsed: Result<T::Input, _> = serde_json::from_str(arguments);
        // Clone self so the future is 'static and doesn't borrow from the
        // tool registry. This is why Tool requires Clone.
        let this = self.clone();
        Box::pin(async move {
            let input = parsed.map_err(Error::other)?;
            let output = this.call(input.clone()).await?;
            let display = this.render_output(&input, &output);
            Ok((output.to_llm(), display))
        })
    }
}
