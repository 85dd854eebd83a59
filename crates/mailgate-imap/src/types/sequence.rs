//! Sequence sets for message ranges.

use super::{SeqNum, Uid};

/// Sequence set for specifying message ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceSet {
    /// Single sequence number.
    Single(SeqNum),
    /// Range of sequence numbers (inclusive, either order).
    Range(SeqNum, SeqNum),
    /// Range from start to end of mailbox.
    RangeFrom(SeqNum),
    /// All messages (*).
    All,
    /// Multiple sequence specifications.
    Set(Vec<Self>),
}

impl SequenceSet {
    /// Creates a sequence set from a single number.
    #[must_use]
    pub fn single(n: u32) -> Option<Self> {
        SeqNum::new(n).map(Self::Single)
    }

    /// Creates a range sequence set.
    #[must_use]
    pub fn range(start: u32, end: u32) -> Option<Self> {
        Some(Self::Range(SeqNum::new(start)?, SeqNum::new(end)?))
    }

    /// Creates a set listing the given numbers, in order.
    ///
    /// Returns `None` for an empty list.
    #[must_use]
    pub fn from_nums(nums: &[SeqNum]) -> Option<Self> {
        match nums {
            [] => None,
            [one] => Some(Self::Single(*one)),
            many => Some(Self::Set(many.iter().copied().map(Self::Single).collect())),
        }
    }

    /// Returns true if `n` is in the set, with `*` standing for `last`.
    #[must_use]
    pub fn contains(&self, n: SeqNum, last: u32) -> bool {
        let value = n.get();
        match self {
            Self::Single(s) => *s == n,
            Self::Range(a, b) => {
                let (lo, hi) = ordered(a.get(), b.get());
                (lo..=hi).contains(&value)
            }
            Self::RangeFrom(start) => {
                let (lo, hi) = ordered(start.get(), last);
                (lo..=hi).contains(&value)
            }
            Self::All => value <= last,
            Self::Set(items) => items.iter().any(|item| item.contains(n, last)),
        }
    }
}

const fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl std::fmt::Display for SequenceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::RangeFrom(start) => write!(f, "{start}:*"),
            Self::All => write!(f, "*"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}

/// UID-based sequence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UidSet {
    /// Single UID.
    Single(Uid),
    /// Range of UIDs (inclusive, either order).
    Range(Uid, Uid),
    /// Multiple UID specifications.
    Set(Vec<Self>),
}

impl UidSet {
    /// Creates a UID set from a single UID.
    #[must_use]
    pub const fn single(uid: Uid) -> Self {
        Self::Single(uid)
    }

    /// Returns true if `uid` is in the set.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        match self {
            Self::Single(u) => *u == uid,
            Self::Range(a, b) => {
                let (lo, hi) = ordered(a.get(), b.get());
                (lo..=hi).contains(&uid.get())
            }
            Self::Set(items) => items.iter().any(|item| item.contains(uid)),
        }
    }
}

impl std::fmt::Display for UidSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(n) => write!(f, "{n}"),
            Self::Range(start, end) => write!(f, "{start}:{end}"),
            Self::Set(items) => {
                let s: Vec<_> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", s.join(","))
            }
        }
    }
}
