//! Post-recognition text cleanup.

/// Narrow seam for OCR text cleanup so the tables can be tuned or replaced
/// without touching the cascade.
pub trait TextNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Characters kept besides letters, digits and whitespace.
const ALLOWED_PUNCTUATION: &str = "-_.,!?()@#$%&*+=<>/\\:;\"'";

/// Trimmed from the end of a label.
const TRAILING_JUNK: &[char] = &['.', ',', ':', ';', '|', '-', '_', '~', '\'', '"', '`'];

/// Trimmed from the start of a label.
const LEADING_JUNK: &[char] = &['|', '.', ',', ':', ';', '_', '~', '\'', '"', '`'];

/// Common misreads of button and menu labels.
const DEFAULT_ARTIFACTS: &[(&str, &str)] = &[
    ("0K", "OK"),
    ("0k", "Ok"),
    ("C1ose", "Close"),
    ("Cl0se", "Close"),
    ("Cance1", "Cancel"),
    ("Subrnit", "Submit"),
    ("Subm1t", "Submit"),
    ("0pen", "Open"),
    ("5ave", "Save"),
    ("Sav3", "Save"),
    ("F1le", "File"),
    ("Fi1e", "File"),
    ("Ed1t", "Edit"),
    ("He1p", "Help"),
    ("Sett1ngs", "Settings"),
    ("Setlings", "Settings"),
    ("De1ete", "Delete"),
    ("Log1n", "Login"),
    ("Nexl", "Next"),
    ("Opti0ns", "Options"),
];

/// Whitespace collapse, character whitelist, artifact table, duplicate-word
/// collapse and punctuation trim, in that order.
#[derive(Debug, Clone)]
pub struct TableNormalizer {
    artifacts: Vec<(String, String)>,
}

impl TableNormalizer {
    pub fn new() -> Self {
        Self::with_artifacts(
            DEFAULT_ARTIFACTS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
        )
    }

    pub fn with_artifacts(artifacts: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            artifacts: artifacts.into_iter().collect(),
        }
    }

    fn fix_word<'a>(&'a self, word: &'a str) -> &'a str {
        self.artifacts
            .iter()
            .find(|(from, _)| from == word)
            .map(|(_, to)| to.as_str())
            .unwrap_or(word)
    }
}

impl Default for TableNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer for TableNormalizer {
    fn normalize(&self, raw: &str) -> String {
        let filtered: String = raw
            .chars()
            .filter(|c| {
                c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(*c)
            })
            .collect();

        let mut words: Vec<&str> = Vec::new();
        for word in filtered.split_whitespace() {
            let word = self.fix_word(word);
            if words
                .last()
                .is_some_and(|prev| prev.eq_ignore_ascii_case(word))
            {
                continue;
            }
            words.push(word);
        }
        let joined = words.join(" ");

        let trimmed = joined
            .trim_end_matches(TRAILING_JUNK)
            .trim_start_matches(LEADING_JUNK)
            .trim();
        if trimmed.is_empty() {
            // A lone symbol such as "-" is still a label.
            joined
        } else {
            trimmed.to_string()
        }
    }
}
