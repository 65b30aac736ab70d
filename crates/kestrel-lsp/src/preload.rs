//! Startup preload: opens a bounded set of high-priority files per language
//! server so it has enough context to answer requests without waiting on
//! the editor to open every file by hand.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::Client;

const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "out",
    "bin",
    ".idea",
    ".vscode",
    ".cache",
    "coverage",
    "target",
    "vendor",
];

const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
const THROTTLE_EVERY: usize = 10;
const THROTTLE_DELAY: Duration = Duration::from_millis(50);

/// Per-server preload glob sets and open-count budgets, per the preload
/// strategy table.
pub fn preload_globs_for(server: &str) -> (&'static [&'static str], usize) {
    match server {
        "typescript" => (
            &[
                "**/tsconfig.json",
                "**/package.json",
                "**/jsconfig.json",
                "**/{index,main}.{ts,js}",
            ],
            100,
        ),
        "gopls" => (&["**/go.{mod,sum}", "**/main.go"], 50),
        "rust-analyzer" => (&["**/Cargo.{toml,lock}", "**/src/{lib,main}.rs"], 50),
        "pyright" | "pylsp" => (
            &[
                "**/pyproject.toml",
                "**/setup.py",
                "**/requirements.txt",
                "**/__init__.py",
                "**/__main__.py",
            ],
            50,
        ),
        "clangd" => (&["**/CMakeLists.txt", "**/Makefile", "**/compile_commands.json"], 50),
        "jdtls" => (&["**/pom.xml", "**/build.gradle", "**/src/main/java/**/*.java"], 200),
        _ => (&[], 50),
    }
}

/// Walk `root`, open every file matching one of `globs` via `textDocument/didOpen`,
/// up to `budget` files, throttling every [`THROTTLE_EVERY`] opens.
pub async fn run_preload(client: &Client, root: &Path, globs: &[&str], budget: usize) {
    let matchers: Vec<globset::GlobMatcher> = globs
        .iter()
        .flat_map(|g| expand_braces(g))
        .filter_map(|g| {
            globset::GlobBuilder::new(&g)
                .literal_separator(false)
                .build()
                .ok()
        })
        .map(|g| g.compile_matcher())
        .collect();

    let mut opened = 0usize;
    let mut files = Vec::new();
    collect_candidates(root, root, &matchers, &mut files);

    for path in files {
        if opened >= budget {
            break;
        }
        let Ok(content) = tokio::fs::read_to_string(&path).await else {
            continue;
        };
        let uri = format!("file://{}", path.display());
        let params = serde_json::json!({
            "textDocument": {
                "uri": uri,
                "languageId": "",
                "version": 1,
                "text": content,
            }
        });
        if client.notify("textDocument/didOpen", params).await.is_err() {
            break;
        }
        opened += 1;
        if opened % THROTTLE_EVERY == 0 {
            tokio::time::sleep(THROTTLE_DELAY).await;
        }
    }
}

fn collect_candidates(
    dir: &Path,
    root: &Path,
    matchers: &[globset::GlobMatcher],
    out: &mut Vec<PathBuf>,
) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());

        if is_dir {
            if EXCLUDED_DIRS.contains(&name.as_str()) || name.starts_with('.') {
                continue;
            }
            collect_candidates(&path, root, matchers, out);
            continue;
        }

        if entry.metadata().map(|m| m.len()).unwrap_or(0) > MAX_FILE_BYTES {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(&path);
        if matchers.iter().any(|m| m.is_match(relative)) {
            out.push(path);
        }
    }
}

fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(open) = pattern.find('{') {
        let Some(close) = pattern[open..].find('}').map(|i| i + open) else {
            return vec![pattern.to_string()];
        };
        let prefix = &pattern[..open];
        let suffix = &pattern[close + 1..];
        let mut out = Vec::new();
        for alt in pattern[open + 1..close].split(',') {
            for rest in expand_braces(suffix) {
                out.push(format!("{prefix}{alt}{rest}"));
            }
        }
        out
    } else {
        vec![pattern.to_string()]
    }
}
