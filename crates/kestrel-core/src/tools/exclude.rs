//! Shared exclusion rules for tools and the LSP watcher that walk the
//! workspace tree (LS, Grep, Glob).

pub const EXCLUDED_DIRS: &[&str] = &[
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

pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    "swp", "swo", "tmp", "temp", "bak", "log", "o", "so", "dylib", "dll", "a", "exe", "lock",
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "zip", "tar", "gz", "rar", "7z", "pdf", "mp3",
    "mp4", "mov", "wav", "wasm",
];

pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

pub fn is_excluded_dir_name(name: &str) -> bool {
    EXCLUDED_DIRS.contains(&name) || name.starts_with('.')
}

pub fn is_excluded_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXCLUDED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}
