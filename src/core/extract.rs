//! Filename metadata extraction
//!
//! Released drawings and models carry their revision in the filename, e.g.
//! `PN-1001_RevB.pdf`. Anything without a revision token is treated as
//! work in progress.

/// Metadata derived from a filename alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartMetadata {
    /// Part number (never empty)
    pub part_number: String,

    /// Revision letter, if the name carries a revision token
    pub revision: Option<char>,

    /// True when a revision token was found
    pub is_production: bool,
}

/// Split a filename into its `_` / `.` separated tokens, dropping empty ones
pub fn tokenize(filename: &str) -> Vec<&str> {
    filename
        .split(|c| c == '_' || c == '.')
        .filter(|t| !t.is_empty())
        .collect()
}

/// Return the revision letter if `token` is exactly `Rev` + one uppercase ASCII letter
pub fn revision_letter(token: &str) -> Option<char> {
    let rest = token.strip_prefix("Rev")?;
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_uppercase() => Some(letter),
        _ => None,
    }
}

/// Extract part number, revision and production status from a filename
///
/// The first revision token wins; the part number is every token before it
/// rejoined with `_`. Without a revision token the whole filename is the
/// part number.
pub fn extract(filename: &str) -> PartMetadata {
    let tokens = tokenize(filename);

    for (i, token) in tokens.iter().enumerate() {
        if let Some(letter) = revision_letter(token) {
            let prefix = tokens[..i].join("_");
            let part_number = if prefix.is_empty() {
                filename.to_string()
            } else {
                prefix
            };
            return PartMetadata {
                part_number,
                revision: Some(letter),
                is_production: true,
            };
        }
    }

    PartMetadata {
        part_number: filename.to_string(),
        revision: None,
        is_production: false,
    }
}
