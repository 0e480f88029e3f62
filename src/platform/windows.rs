// pagefaves platform paths for Windows
// Data: %APPDATA%/pagefaves

use std::env;
use std::path::PathBuf;

/// Returns the data directory for pagefaves on Windows.
pub fn get_data_dir() -> PathBuf {
    let appdata = env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Temp"));
    PathBuf::from(appdata).join("pagefaves")
}
