// pagefaves platform paths for Linux
// Data: ~/.local/share/pagefaves

use std::env;
use std::path::PathBuf;

/// Returns the data directory for pagefaves on Linux.
/// Uses `$XDG_DATA_HOME/pagefaves` if set, otherwise `~/.local/share/pagefaves`.
pub fn get_data_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg).join("pagefaves")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("pagefaves")
    }
}
