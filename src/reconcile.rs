//! Line-alignment reconciliation for line-by-line commentary.
//!
//! Models rarely return exactly one comment per source line. This forces a
//! freeform response into a 1:1 alignment with the source: blank source lines
//! get an empty comment, other lines consume response lines in order, and a
//! placeholder fills in once the response runs out.

/// Comment used when the response has fewer usable lines than the source.
pub const FALLBACK_LINE_COMMENT: &str = "No comment generated for this line";

/// Split source text into the lines an editor would show.
pub fn source_lines(source: &str) -> Vec<&str> {
    source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Align `raw_response` to `source`, one comment per source line.
///
/// Each non-blank response line is used once, trimmed; only a line-number
/// echo in front of it is removed.
///
/// The result always has exactly `source_lines(source).len()` entries.
pub fn reconcile_line_comments(raw_response: &str, source: &str) -> Vec<String> {
    let mut responses = raw_response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(strip_line_number_echo);

    source_lines(source)
        .into_iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                responses
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| FALLBACK_LINE_COMMENT.to_string())
            }
        })
        .collect()
}

/// Drop a leading `12 |` or `12. ` echoed back from the numbered prompt.
/// A line that would be left empty is returned unchanged.
fn strip_line_number_echo(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    let after = &line[digits..];
    let rest = match after.trim_start().strip_prefix('|') {
        Some(rest) => rest,
        None => match after.strip_prefix('.') {
            Some(rest) if rest.starts_with(char::is_whitespace) => rest,
            _ => return line,
        },
    };
    match rest.trim() {
        "" => line,
        comment => comment,
    }
}
