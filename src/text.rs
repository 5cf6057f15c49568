//! Character-safe text capping.

/// Marker appended to capped document text and merged attachment sections.
pub const TRUNCATED_MARKER: &str = "...[truncated]";

/// Marker appended to capped detail page text.
pub const PAGE_TRUNCATED_MARKER: &str = "...[text truncated]";

/// Keeps the first `max_chars` characters of `text`, appending `marker` when
/// anything was cut.
///
/// Counts Unicode scalar values, never splitting a character.
#[must_use]
pub fn truncate_with_marker(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut out = String::with_capacity(byte_index + marker.len());
            out.push_str(&text[..byte_index]);
            out.push_str(marker);
            out
        }
        None => text.to_string(),
    }
}

/// Returns the first `max_chars` characters and whether anything was cut.
#[must_use]
pub fn take_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_unchanged() {
        assert_eq!(truncate_with_marker("abc", 3, TRUNCATED_MARKER), "abc");
    }

    #[test]
    fn test_long_text_gets_marker() {
        assert_eq!(
            truncate_with_marker("abcdef", 3, TRUNCATED_MARKER),
            "abc...[truncated]"
        );
    }

    #[test]
    fn test_truncation_respects_multibyte_characters() {
        let text = "éàüçô";
        assert_eq!(truncate_with_marker(text, 2, "~"), "éà~");
        assert_eq!(take_chars(text, 4), ("éàüç", true));
        assert_eq!(take_chars(text, 5), ("éàüçô", false));
    }
}
