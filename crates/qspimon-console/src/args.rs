//! Command line tokenizer and numeric arguments

use crate::error::CommandError;

/// Most tokens a single line may carry, command name included
pub const MAX_ARGS: usize = 32;

/// Tokens of one command line
///
/// Token 0 is the command name. Tokens borrow from the line.
#[derive(Debug, Clone, Default)]
pub struct Args<'a> {
    tokens: heapless::Vec<&'a str, MAX_ARGS>,
}

impl<'a> Args<'a> {
    /// Split `line` on runs of whitespace
    ///
    /// Anything after the first `\r` or `\n` is ignored.
    pub fn tokenize(line: &'a str) -> Result<Self, CommandError> {
        let end = line.find(|c: char| c == '\r' || c == '\n').unwrap_or(line.len());
        let mut tokens = heapless::Vec::new();
        for token in line[..end].split_whitespace() {
            tokens.push(token).map_err(|_| CommandError::TooManyArgs)?;
        }
        Ok(Self { tokens })
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true for a blank line
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The command name
    pub fn name(&self) -> Option<&'a str> {
        self.get(0)
    }

    /// Token at `index`
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).copied()
    }

    /// All tokens
    pub fn as_slice(&self) -> &[&'a str] {
        &self.tokens
    }

    /// Tokens from `index` on
    pub fn rest(&self, index: usize) -> &[&'a str] {
        self.tokens.get(index..).unwrap_or(&[])
    }

    /// Numeric token at `index`
    ///
    /// A missing token is a usage error; a malformed one is a parse error.
    pub fn int(&self, index: usize) -> Result<i64, CommandError> {
        let token = self.get(index).ok_or(CommandError::Usage)?;
        parse_int(token).ok_or(CommandError::Parse { index })
    }

    /// Numeric token at `index` that must fit a `u32`
    pub fn u32(&self, index: usize) -> Result<u32, CommandError> {
        u32::try_from(self.int(index)?).map_err(|_| CommandError::Parse { index })
    }

    /// Numeric token at `index` that must fit a `u8`
    pub fn u8(&self, index: usize) -> Result<u8, CommandError> {
        u8::try_from(self.int(index)?).map_err(|_| CommandError::Parse { index })
    }
}

/// Parse an integer the way C's `%i` conversion does
///
/// Accepts an optional sign, then `0x`/`0X` for hexadecimal, a leading `0`
/// for octal, or plain decimal. The whole token must be consumed.
pub fn parse_int(token: &str) -> Option<i64> {
    let (negative, unsigned) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };

    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_collapses_whitespace() {
        let args = Args::tokenize("  qspi   read\t0x100  16 ").unwrap();
        assert_eq!(args.as_slice(), &["qspi", "read", "0x100", "16"]);
        assert_eq!(args.name(), Some("qspi"));
        assert_eq!(args.rest(2), &["0x100", "16"]);
        assert_eq!(args.rest(9), &[] as &[&str]);
    }

    #[test]
    fn test_tokenize_stops_at_line_end() {
        let args = Args::tokenize("help\r\nreset").unwrap();
        assert_eq!(args.as_slice(), &["help"]);
        assert!(Args::tokenize("\r\n").unwrap().is_empty());
        assert!(Args::tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_limit() {
        let mut line = heapless::String::<256>::new();
        for _ in 0..MAX_ARGS {
            line.push_str("a ").unwrap();
        }
        assert_eq!(Args::tokenize(&line).unwrap().len(), MAX_ARGS);
        line.push_str("b").unwrap();
        assert_eq!(Args::tokenize(&line).unwrap_err(), CommandError::TooManyArgs);
    }

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("0x2A"), Some(42));
        assert_eq!(parse_int("0X2a"), Some(42));
        assert_eq!(parse_int("052"), Some(42));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("+7"), Some(7));
    }

    #[test]
    fn test_parse_int_rejects_garbage() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("08"), None);
        assert_eq!(parse_int("12ab"), None);
        assert_eq!(parse_int("on"), None);
        assert_eq!(parse_int("--1"), None);
    }

    #[test]
    fn test_typed_accessors() {
        let args = Args::tokenize("x 300 -1 0xff").unwrap();
        assert_eq!(args.u32(1), Ok(300));
        assert_eq!(args.u8(1), Err(CommandError::Parse { index: 1 }));
        assert_eq!(args.u32(2), Err(CommandError::Parse { index: 2 }));
        assert_eq!(args.u8(3), Ok(0xFF));
        assert_eq!(args.int(4), Err(CommandError::Usage));
    }
}
