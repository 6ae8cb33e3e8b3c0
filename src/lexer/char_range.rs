// src/lexer/char_range.rs

/// Inclusive byte range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharRange {
    pub min: u8,
    pub max: u8,
}

impl CharRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub const fn single(c: u8) -> Self {
        Self { min: c, max: c }
    }

    #[inline]
    pub fn contains(&self, c: u8) -> bool {
        self.min <= c && c <= self.max
    }

    /// True when the ranges overlap or touch (`a-c` and `d-f`).
    pub fn intersecting_or_adjacent(&self, other: &CharRange) -> bool {
        (self.min as u16) <= other.max as u16 + 1 && (other.min as u16) <= self.max as u16 + 1
    }

    /// Union of two ranges that intersect or are adjacent.
    pub fn merge(&self, other: &CharRange) -> CharRange {
        debug_assert!(self.intersecting_or_adjacent(other));
        CharRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn bytes(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

/// Sorts `ranges` and merges every intersecting or adjacent pair, so
/// `[a-z0-9_a-f]` ends up as three disjoint ranges.
pub fn coalesce(ranges: &mut Vec<CharRange>) {
    ranges.sort();
    let mut out: Vec<CharRange> = Vec::with_capacity(ranges.len());
    for r in ranges.drain(..) {
        match out.last_mut() {
            Some(last) if last.intersecting_or_adjacent(&r) => *last = last.merge(&r),
            _ => out.push(r),
        }
    }
    *ranges = out;
}
