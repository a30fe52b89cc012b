//! Per-session delimiter token

use crate::ProtocolError;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

/// Total token length on the wire, brackets included
pub const TOKEN_LEN: usize = 10;

const OPEN: u8 = b'<';
const CLOSE: u8 = b'>';

/// Delimiter appended to every framed message of one session
///
/// Always `<` followed by 8 ASCII alphanumerics followed by `>`. Generated by
/// the server once per connection and immutable afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelimiterToken([u8; TOKEN_LEN]);

impl DelimiterToken {
    /// Generate a fresh random token
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; TOKEN_LEN];
        bytes[0] = OPEN;
        bytes[TOKEN_LEN - 1] = CLOSE;
        for b in &mut bytes[1..TOKEN_LEN - 1] {
            *b = rng.sample(Alphanumeric);
        }
        Self(bytes)
    }

    /// Validate raw bytes received during the handshake
    pub fn parse(raw: &[u8]) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidToken(String::from_utf8_lossy(raw).into_owned());

        let bytes: [u8; TOKEN_LEN] = raw.try_into().map_err(|_| invalid())?;
        if bytes[0] != OPEN
            || bytes[TOKEN_LEN - 1] != CLOSE
            || !bytes[1..TOKEN_LEN - 1].iter().all(u8::is_ascii_alphanumeric)
        {
            return Err(invalid());
        }

        Ok(Self(bytes))
    }

    /// Token bytes as sent on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Token as text; always valid ASCII
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Offset of the first occurrence of the token in `haystack`
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        haystack.windows(TOKEN_LEN).position(|w| w == self.0)
    }
}

impl fmt::Display for DelimiterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for DelimiterToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DelimiterToken({})", self.as_str())
    }
}

impl AsRef<[u8]> for DelimiterToken {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
