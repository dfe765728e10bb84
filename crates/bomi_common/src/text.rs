//! Text normalization for keyword matching.
//!
//! Every extractor and classifier matches against the output of
//! [`normalize`], so the rules here decide what "contains" means across the
//! whole pipeline: lowercase, no whitespace, and nothing outside word
//! characters and the Hangul syllable block.

/// Normalize free text for matching: lowercase, strip all whitespace, keep
/// only word characters (ASCII alphanumerics and `_`) and Hangul syllables.
///
/// Total function; any input yields a (possibly empty) string.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| is_word_char(*c) || is_hangul_syllable(*c))
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_whitespace() {
        assert_eq!(normalize("40대 남성 TOP 4"), "40대남성top4");
    }

    #[test]
    fn test_drops_punctuation_keeps_hangul() {
        assert_eq!(normalize("보험료, 저렴한 순서로!"), "보험료저렴한순서로");
    }

    #[test]
    fn test_keeps_underscore() {
        assert_eq!(normalize("in_situ 암"), "in_situ암");
    }

    #[test]
    fn test_empty_and_symbol_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!... "), "");
    }
}
