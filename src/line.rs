//! The unit of transfer between pipeline stages.

use std::fmt;

/// One line of input, stored verbatim.
///
/// The bytes include the line terminator when the input had one, so a
/// Line written back out reproduces the input exactly. Source and relay
/// treat the content as opaque; only the sink looks inside it.
///
/// A physical input line longer than the configured maximum arrives as
/// several Lines. Every chunk after the first is marked as a
/// continuation and is never a whole input line.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Line {
    bytes: Vec<u8>,
    continuation: bool,
}

impl Line {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            continuation: false,
        }
    }

    /// A later chunk of a split physical line.
    pub fn continuation(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            continuation: true,
        }
    }

    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.continuation
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Content without a trailing `\n` or `\r\n`.
    #[inline]
    pub fn content(&self) -> &[u8] {
        strip_terminator(&self.bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Line {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.continuation {
            write!(f, "Line(+{:?})", String::from_utf8_lossy(&self.bytes))
        } else {
            write!(f, "Line({:?})", String::from_utf8_lossy(&self.bytes))
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.content()))
    }
}

/// Remove one trailing `\n` or `\r\n`.
#[inline]
pub fn strip_terminator(bytes: &[u8]) -> &[u8] {
    match bytes {
        [rest @ .., b'\r', b'\n'] => rest,
        [rest @ .., b'\n'] => rest,
        _ => bytes,
    }
}
