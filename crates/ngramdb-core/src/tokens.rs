//! Whitespace tokenization shared by patterns and documents.
//!
//! Only the ASCII space separates tokens. Consecutive spaces yield an empty
//! token, exactly as a byte-wise split would.

/// Token separator.
pub const SEPARATOR: char = ' ';

/// Splits `text` on [`SEPARATOR`], yielding `(byte_offset, token)` pairs.
pub fn split_tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split(SEPARATOR).scan(0usize, |offset, token| {
        let start = *offset;
        *offset += token.len() + SEPARATOR.len_utf8();
        Some((start, token))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tokens_offsets() {
        let tokens: Vec<_> = split_tokens("hello big world").collect();
        assert_eq!(tokens, vec![(0, "hello"), (6, "big"), (10, "world")]);
    }

    #[test]
    fn test_split_tokens_double_space_yields_empty_token() {
        let tokens: Vec<_> = split_tokens("a  b").collect();
        assert_eq!(tokens, vec![(0, "a"), (2, ""), (3, "b")]);
    }

    #[test]
    fn test_split_tokens_single() {
        let tokens: Vec<_> = split_tokens("word").collect();
        assert_eq!(tokens, vec![(0, "word")]);
    }
}
