//! Hex text program reader
//!
//! The textual image format: whitespace-separated tokens, each either `0x`
//! followed by one to four hex digits (zero-padded on the left) or a bare
//! run of exactly four hex digits. A `;` starts a comment running to the
//! end of the line.

use thiserror::Error;

/// A token the hex reader could not understand
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: invalid token {token:?}")]
pub struct HexParseError {
    /// 1-based source line of the token
    pub line: usize,
    /// The rejected token
    pub token: String,
}

/// Parses a hex program text into instruction words.
///
/// # Errors
///
/// Returns [`HexParseError`] for any token that is not a hex word.
pub fn parse_hex(source: &str) -> Result<Vec<u16>, HexParseError> {
    let mut words = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let code = line.split(';').next().unwrap_or_default();
        for token in code.split_whitespace() {
            let word = parse_token(token).ok_or_else(|| HexParseError {
                line: index + 1,
                token: token.to_string(),
            })?;
            words.push(word);
        }
    }
    Ok(words)
}

fn parse_token(token: &str) -> Option<u16> {
    let (digits, padded) = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Some(digits) => (digits, true),
        None => (token, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if padded && digits.len() > 4 || !padded && digits.len() != 4 {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_token_forms() {
        let words = parse_hex("C105 0xC203\n0x1312 FFFF").unwrap();
        assert_eq!(words, vec![0xC105, 0xC203, 0x1312, 0xFFFF]);
    }

    #[test]
    fn short_prefixed_tokens_are_zero_padded() {
        assert_eq!(parse_hex("0x5 0x42 0xFFF").unwrap(), vec![0x0005, 0x0042, 0x0FFF]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        let source = "; add 5 and 3\nC105 ; LOADI R1, 5\nC203\n0x1312 0xFFFF ; ADD, HALT\n";
        assert_eq!(
            parse_hex(source).unwrap(),
            vec![0xC105, 0xC203, 0x1312, 0xFFFF]
        );
    }

    #[test]
    fn empty_input_is_an_empty_program() {
        assert_eq!(parse_hex("").unwrap(), Vec::new());
        assert_eq!(parse_hex("; nothing but comments\n").unwrap(), Vec::new());
    }

    #[test]
    fn bare_tokens_must_have_exactly_four_digits() {
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("12345").is_err());
        assert_eq!(parse_hex("0123").unwrap(), vec![0x0123]);
    }

    #[test]
    fn rejections_carry_line_and_token() {
        let err = parse_hex("C105\nC2G3\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.token, "C2G3");
        assert_eq!(err.to_string(), "line 2: invalid token \"C2G3\"");
    }

    #[test]
    fn prefixed_tokens_wider_than_a_word_are_rejected() {
        assert!(parse_hex("0x12345").is_err());
        assert!(parse_hex("0x").is_err());
        assert!(parse_hex("+123").is_err());
    }
}
