//! Whitespace cleanup for edited text.
//!
//! Only lines an edit touched are normalised; the rest of the document is
//! returned byte for byte.

use std::collections::BTreeSet;
use std::ops::Range;

/// Trims trailing whitespace on every touched line and drops a touched blank
/// line that directly follows another blank line or a line ending in `{`.
pub fn tidy(text: &str, touched: &[Range<usize>]) -> String {
    if touched.is_empty() {
        return text.to_string();
    }

    let mut line_starts = vec![0];
    line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    let line_of = |byte: usize| match line_starts.binary_search(&byte) {
        Ok(line) => line,
        Err(next) => next - 1,
    };

    let touched_lines: BTreeSet<usize> = touched
        .iter()
        .flat_map(|range| line_of(range.start)..=line_of(range.end))
        .collect();

    let lines: Vec<&str> = text.split('\n').collect();
    let mut output = String::with_capacity(text.len());
    let mut previous_blank = false;
    let mut previous_opens_block = false;

    for (index, raw) in lines.iter().enumerate() {
        let (line, carriage_return) = match raw.strip_suffix('\r') {
            Some(stripped) => (stripped, true),
            None => (*raw, false),
        };
        let is_touched = touched_lines.contains(&index);
        let line = if is_touched {
            line.trim_end_matches([' ', '\t'])
        } else {
            line
        };
        let blank = line.trim().is_empty();
        let is_last = index + 1 == lines.len();

        if is_touched && blank && (previous_blank || previous_opens_block) && !is_last {
            continue;
        }

        output.push_str(line);
        if carriage_return {
            output.push('\r');
        }
        if !is_last {
            output.push('\n');
        }
        previous_blank = blank;
        previous_opens_block = line.trim_end().ends_with('{');
    }

    output
}
