use std::fmt::Write;

/// `N→line` per line, numbered from `first_line`.
pub(super) fn number_lines(text: &str, first_line: usize) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for (offset, line) in text.split_inclusive('\n').enumerate() {
        if offset > 0 {
            out.push('\n');
        }
        let line = line.strip_suffix('\n').unwrap_or(line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let _ = write!(out, "{}→{line}", first_line + offset);
    }
    out
}

/// `1234567` -> `1,234,567`.
pub(super) fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Separator before trailing sections of most tools.
pub(super) const SECTION_BREAK: &str = "\n\n";
/// `read` sets its trailing sections off with a rule.
pub(super) const RULED_BREAK: &str = "\n\n---\n";

/// Append a trailing section (changed files, instruction documents); empty sections vanish.
pub(super) fn append_section(out: &mut String, section: &str, separator: &str) {
    if section.is_empty() {
        return;
    }
    out.push_str(separator);
    out.push_str(section);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_lines_from_the_given_start() {
        assert_eq!(number_lines("a\nb\r\nc", 1), "1→a\n2→b\n3→c");
        assert_eq!(number_lines("x\n", 41), "41→x");
        assert_eq!(number_lines("", 1), "");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1_000), "1,000");
        assert_eq!(group_digits(1_234_567), "1,234,567");
    }

    #[test]
    fn sections_are_separated_and_empty_ones_skipped() {
        let mut out = "body".to_string();
        append_section(&mut out, "", SECTION_BREAK);
        append_section(&mut out, "[CHANGED_FILES]", SECTION_BREAK);
        append_section(&mut out, "[Appending /w/AGENTS.md]", RULED_BREAK);
        assert_eq!(
            out,
            "body\n\n[CHANGED_FILES]\n\n---\n[Appending /w/AGENTS.md]"
        );
    }
}
