//! Generation banner appended to every stub

use std::path::Path;

pub const TRAILER_PREFIX: &str = "# This file was generated by stubgen-pyx";

fn trailer(pyx_path: Option<&Path>) -> String {
    match pyx_path {
        Some(path) => format!("{TRAILER_PREFIX} from {}", path.display()),
        None => TRAILER_PREFIX.to_string(),
    }
}

/// Append the banner after one blank line
pub fn append_trailer(text: &str, pyx_path: Option<&Path>) -> String {
    let text = text.trim_end();
    if text.is_empty() {
        return trailer(pyx_path);
    }
    format!("{text}\n\n{}", trailer(pyx_path))
}
