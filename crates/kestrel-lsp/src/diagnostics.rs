//! Per-file diagnostic cache, fed by `textDocument/publishDiagnostics`
//! notifications and flattened workspace-wide for the Diagnostics tool.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    fn from_lsp(value: Option<i64>) -> Self {
        match value {
            Some(1) => DiagnosticSeverity::Error,
            Some(2) => DiagnosticSeverity::Warning,
            Some(3) => DiagnosticSeverity::Information,
            Some(4) => DiagnosticSeverity::Hint,
            _ => DiagnosticSeverity::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: u32,
    pub character: u32,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: Option<String>,
}

/// Workspace-wide diagnostic cache for a single LSP client, keyed by file.
/// Each `publishDiagnostics` notification replaces the full diagnostic set
/// for its `uri`, matching LSP's "this is the current complete state"
/// semantics.
#[derive(Clone, Default)]
pub struct DiagnosticsStore {
    by_file: Arc<Mutex<HashMap<PathBuf, Vec<Diagnostic>>>>,
}

impl DiagnosticsStore {
    pub fn ingest(&self, params: &Value) {
        let Some(uri) = params.get("uri").and_then(|v| v.as_str()) else {
            return;
        };
        let Some(path) = uri_to_path(uri) else { return };
        let Some(diagnostics) = params.get("diagnostics").and_then(|v| v.as_array()) else {
            return;
        };

        let parsed: Vec<Diagnostic> = diagnostics
            .iter()
            .filter_map(|d| parse_diagnostic(&path, d))
            .collect();

        self.by_file.lock().insert(path, parsed);
    }

    /// Flatten every file's current diagnostics into one list.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.by_file.lock().values().flatten().cloned().collect()
    }

    pub fn for_file(&self, path: &std::path::Path) -> Vec<Diagnostic> {
        self.by_file.lock().get(path).cloned().unwrap_or_default()
    }
}

fn parse_diagnostic(path: &std::path::Path, value: &Value) -> Option<Diagnostic> {
    let range = value.get("range")?;
    let start = range.get("start")?;
    Some(Diagnostic {
        path: path.to_path_buf(),
        line: start.get("line")?.as_u64()? as u32,
        character: start.get("character")?.as_u64()? as u32,
        severity: DiagnosticSeverity::from_lsp(value.get("severity").and_then(|v| v.as_i64())),
        message: value.get("message")?.as_str()?.to_string(),
        source: value.get("source").and_then(|v| v.as_str()).map(String::from),
    })
}

fn uri_to_path(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix("file://").map(PathBuf::from)
}
