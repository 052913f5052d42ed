//! Command text normalization.
//!
//! Every grammar downstream assumes lowercase text with single spaces and a
//! handful of common spellings folded together.

const REPLACEMENTS: &[(&str, &str)] = &[
    (" & ", " and "),
    (" + ", " and "),
    ("visual studio code", "vscode"),
    ("vs code", "vscode"),
    ("notepad++", "notepadplusplus"),
    ("internet browser", "browser"),
    ("web browser", "browser"),
];

/// Lowercase, collapse whitespace, and fold common variants.
pub fn normalize(command: &str) -> String {
    let mut normalized = command
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    for (from, to) in REPLACEMENTS {
        if normalized.contains(from) {
            normalized = normalized.replace(from, to);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Create   a Folder\tNamed X  "), "create a folder named x");
    }

    #[test]
    fn folds_conjunction_symbols() {
        assert_eq!(normalize("open vs code & web browser"), "open vscode and browser");
        assert_eq!(normalize("copy a + b"), "copy a and b");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize("   "), "");
    }
}
