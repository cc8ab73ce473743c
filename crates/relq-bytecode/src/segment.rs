//! Code segments
//!
//! A segment is a nested, independently invokable piece of code: a
//! transform field, a `where` predicate, an ordering key or a function body.
//! Its header tells the evaluator how to run it.

use crate::ByteCode;
use relq_types::Heading;
use std::fmt;

/// How a segment has to be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExprKind {
    /// No reference to the enclosing row; evaluate once
    Closed = 0,
    /// Reads enclosing row columns; evaluate per row
    Open = 1,
    /// Contains an aggregate; needs an accumulator block
    HasFold = 2,
    /// Contains a windowed operator; needs ordered input
    HasWin = 3,
}

impl ExprKind {
    /// Classify from what a segment captured, highest priority first
    pub fn classify(lookup: &Heading, accums: usize, has_window: bool) -> Self {
        if has_window {
            Self::HasWin
        } else if accums > 0 {
            Self::HasFold
        } else if !lookup.is_empty() {
            Self::Open
        } else {
            Self::Closed
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Closed),
            1 => Some(Self::Open),
            2 => Some(Self::HasFold),
            3 => Some(Self::HasWin),
            _ => None,
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HasFold => write!(f, "fold"),
            Self::HasWin => write!(f, "window"),
        }
    }
}

/// Segment header flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockFlags(u8);

impl BlockFlags {
    pub const NONE: Self = Self(0);
    /// The segment is an ordering key
    pub const ORDER: Self = Self(1);
    /// Descending key
    pub const DESC: Self = Self(2);
    /// Grouping key of a windowed transform
    pub const GROUPED: Self = Self(4);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl fmt::Display for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.contains(Self::ORDER) {
            parts.push("order");
        }
        if self.contains(Self::DESC) {
            parts.push("desc");
        }
        if self.contains(Self::GROUPED) {
            parts.push("grouped");
        }
        write!(f, "{}", parts.join("|"))
    }
}

/// A compiled segment with its header
#[derive(Debug, Clone, PartialEq)]
pub struct ExprBlock {
    /// Output name, e.g. the transform field it computes
    pub name: String,
    pub kind: ExprKind,
    /// Accumulator slots the segment needs
    pub accums: usize,
    pub flags: BlockFlags,
    /// Columns of the enclosing row the segment reads
    pub lookup: Heading,
    pub code: ByteCode,
}

impl ExprBlock {
    pub fn new(name: impl Into<String>, lookup: Heading, accums: usize, has_window: bool, code: ByteCode) -> Self {
        let kind = ExprKind::classify(&lookup, accums, has_window);
        Self {
            name: name.into(),
            kind,
            accums,
            flags: BlockFlags::NONE,
            lookup,
            code,
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: BlockFlags) -> Self {
        self.flags = flags;
        self
    }
}
