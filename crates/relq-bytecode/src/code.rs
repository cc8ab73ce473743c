//! Compiled code buffer

use std::fmt;

/// An opaque, immutable instruction stream
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteCode {
    bytes: Vec<u8>,
}

impl ByteCode {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ByteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteCode[")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{b:02x}")?;
        }
        write!(f, "]")
    }
}

impl AsRef<[u8]> for ByteCode {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
