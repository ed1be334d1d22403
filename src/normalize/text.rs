use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.*?>").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// Lines containing any of these are login-form boilerplate some sources embed in
/// their item bodies.
const SKIP_MARKERS: [&str; 2] = ["Nickname:", "Password:"];

/// Strips markup and boilerplate lines from feed text.
///
/// Each line has its tags removed; lines left empty, or carrying a login prompt, are
/// dropped. Text that cleans down to nothing comes back as `None`.
pub fn clean_text(text: Option<&str>) -> Option<String> {
    let text = text?;

    // A `\r\n` pair splits into an extra empty line, which is dropped below.
    let joined = text
        .split(['\n', '\r'])
        .map(|line| HTML_TAG.replace_all(line, ""))
        .filter(|line| !line.is_empty())
        .filter(|line| !SKIP_MARKERS.iter().any(|marker| line.contains(marker)))
        .collect::<Vec<_>>()
        .join("\n");

    let cleaned = BLANK_RUN.replace_all(&joined, "\n");
    let cleaned = cleaned.trim_matches('\n');

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
