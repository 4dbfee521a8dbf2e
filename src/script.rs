//! Script text written for each exported module.
//! Output must stay byte-identical: downstream tooling re-applies these files
//! and diffs them across runs.

/// Line terminator used throughout the script.
pub const CRLF: &str = "\r\n";

/// Batch separator understood by sqlcmd / SSMS.
pub const BATCH_SEPARATOR: &str = "GO";

const HEADER_LINES: [&str; 4] = [
    "SET ANSI_NULLS ON",
    BATCH_SEPARATOR,
    "SET QUOTED_IDENTIFIER ON",
    BATCH_SEPARATOR,
];

/// Fixed preamble, each line CRLF-terminated.
pub fn header() -> String {
    let mut out = String::with_capacity(64);
    for line in HEADER_LINES {
        out.push_str(line);
        out.push_str(CRLF);
    }
    out
}

/// Header, blank line, definition verbatim, then a final `GO` with no
/// trailing newline.
pub fn compose(definition: &str) -> String {
    let mut out = header();
    out.reserve(definition.len() + 8);
    out.push_str(CRLF);
    out.push_str(definition);
    out.push_str(CRLF);
    out.push_str(BATCH_SEPARATOR);
    out
}
