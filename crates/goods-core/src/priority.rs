//! # Priority Planning
//!
//! Priorities form a set over live goods: no two non-removed goods share one.
//! Moving a good therefore shifts a contiguous run of its neighbours by one.
//!
//! ```text
//!   Promote 3 → 1                    Demote 2 → 4
//!
//!   before   after                   before   after
//!   A  1  →  2   (+1)                A  1  →  1
//!   B  2  →  3   (+1)                T  2  →  4   (target)
//!   T  3  →  1   (target)            B  3  →  2   (−1)
//!   C  4  →  4                       C  4  →  3   (−1)
//!                                    D  5  →  5
//! ```
//!
//! The store turns a [`PriorityMove`] into one `UPDATE ... WHERE priority
//! BETWEEN lo AND hi`; in-memory fakes call [`PriorityMove::shifted`] instead.

use crate::types::PriorityEntry;

/// What a reprioritize request does to the priority space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityMove {
    /// Requested priority equals the current one.
    Unchanged { priority: i32 },
    /// Target moves to a lower number; `[to, from)` shifts up by one.
    Promote { from: i32, to: i32 },
    /// Target moves to a higher number; `(from, to]` shifts down by one.
    Demote { from: i32, to: i32 },
}

impl PriorityMove {
    pub fn plan(current: i32, requested: i32) -> Self {
        use std::cmp::Ordering;

        match requested.cmp(&current) {
            Ordering::Equal => PriorityMove::Unchanged { priority: current },
            Ordering::Less => PriorityMove::Promote {
                from: current,
                to: requested,
            },
            Ordering::Greater => PriorityMove::Demote {
                from: current,
                to: requested,
            },
        }
    }

    /// Inclusive bounds of the neighbours that shift, `None` when nothing moves.
    pub fn shift_range(&self) -> Option<(i32, i32)> {
        match *self {
            PriorityMove::Unchanged { .. } => None,
            PriorityMove::Promote { from, to } => Some((to, from - 1)),
            PriorityMove::Demote { from, to } => Some((from + 1, to)),
        }
    }

    /// Amount added to every shifted neighbour.
    pub fn delta(&self) -> i32 {
        match self {
            PriorityMove::Unchanged { .. } => 0,
            PriorityMove::Promote { .. } => 1,
            PriorityMove::Demote { .. } => -1,
        }
    }

    /// Priority the target ends up with.
    pub fn target(&self) -> i32 {
        match *self {
            PriorityMove::Unchanged { priority } => priority,
            PriorityMove::Promote { to, .. } | PriorityMove::Demote { to, .. } => to,
        }
    }

    /// New priority of a neighbour currently at `priority`.
    pub fn shifted(&self, priority: i32) -> i32 {
        match self.shift_range() {
            Some((lo, hi)) if (lo..=hi).contains(&priority) => priority + self.delta(),
            _ => priority,
        }
    }
}

/// Orders entries by ascending priority, ties broken by id.
pub fn sort_entries(entries: &mut [PriorityEntry]) {
    entries.sort_by_key(|e| (e.priority, e.id));
}

// =============================================================================
// Unit Tests
// =============================================================================
