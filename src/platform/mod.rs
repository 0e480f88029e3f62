// pagefaves platform abstraction
// Provides the per-OS default data directory for the store's files.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific data directory for pagefaves.
///
/// - **Linux**: `~/.local/share/pagefaves` (or `$XDG_DATA_HOME/pagefaves`)
/// - **macOS**: `~/Library/Application Support/pagefaves`
/// - **Windows**: `%APPDATA%/pagefaves`
///
/// Used when the embedder does not override `data_dir` in the options.
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
