//! Vector clock algebra: comparison (`dominates`) and merge, both total
//! over disjoint key sets. Simplified to the two operations a causal
//! replication engine needs — no four-way ordering classification
//! (`Before`/`After`/`Concurrent`/`Equal`) for conflict detection, since this
//! simulator just stores every version and lets the read layer pick.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VectorClock(HashMap<String, u64>);

impl VectorClock {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// True iff `self[k] >= target[k]` for every `k` in `target`. Missing
    /// entries in `self` read as 0.
    pub fn dominates(&self, target: &VectorClock) -> bool {
        target.0.iter().all(|(k, c)| self.get(k) >= *c)
    }

    /// Pointwise max, merged into `self`. Idempotent, commutative, associative.
    pub fn merge_into(&mut self, incoming: &VectorClock) {
        for (k, c) in &incoming.0 {
            let entry = self.0.entry(k.clone()).or_insert(0);
            if *c > *entry {
                *entry = *c;
            }
        }
    }

    /// Non-mutating counterpart of `merge_into`, for call sites that want
    /// an owned copy rather than a mutation (e.g. constructing a
    /// dependency snapshot without touching the caller's clock).
    pub fn merged(&self, incoming: &VectorClock) -> VectorClock {
        let mut out = self.clone();
        out.merge_into(incoming);
        out
    }

    pub fn increment(&mut self, replica_id: &str) {
        *self.0.entry(replica_id.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, replica_id: &str) -> u64 {
        *self.0.get(replica_id).unwrap_or(&0)
    }

    pub fn sum(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|c| *c == 0)
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.0.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        write!(f, "{{")?;
        for (i, (k, v)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl From<Vec<(&str, u64)>> for VectorClock {
    fn from(pairs: Vec<(&str, u64)>) -> Self {
        let mut vc = VectorClock::new();
        for (k, v) in pairs {
            vc.0.insert(k.to_string(), v);
        }
        vc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominates_treats_missing_entries_as_zero() {
        let empty = VectorClock::new();
        let target = VectorClock::from(vec![("a", 0)]);
        assert!(empty.dominates(&target));
        assert!(!empty.dominates(&VectorClock::from(vec![("a", 1)])));
    }

    #[test]
    fn dominates_is_reflexive() {
        let a = VectorClock::from(vec![("a", 3), ("b", 1)]);
        assert!(a.dominates(&a));
    }

    #[test]
    fn dominates_after_merge() {
        let a = VectorClock::from(vec![("a", 1)]);
        let b = VectorClock::from(vec![("b", 2)]);
        let merged = a.merged(&b);
        assert!(merged.dominates(&a));
        assert!(merged.dominates(&b));
    }

    #[test]
    fn merge_into_is_idempotent() {
        let mut a = VectorClock::from(vec![("a", 1), ("b", 2)]);
        let b = VectorClock::from(vec![("b", 5), ("c", 1)]);
        a.merge_into(&b);
        let once = a.clone();
        a.merge_into(&b);
        assert_eq!(a, once);
    }

    #[test]
    fn merge_into_is_commutative() {
        let a = VectorClock::from(vec![("a", 1), ("b", 5)]);
        let b = VectorClock::from(vec![("b", 2), ("c", 9)]);

        let mut ab = a.clone();
        ab.merge_into(&b);
        let mut ba = b.clone();
        ba.merge_into(&a);

        assert_eq!(ab, ba);
    }

    #[test]
    fn merge_into_is_associative() {
        let a = VectorClock::from(vec![("a", 1)]);
        let b = VectorClock::from(vec![("b", 2)]);
        let c = VectorClock::from(vec![("a", 5), ("c", 3)]);

        let mut left = a.clone();
        left.merge_into(&b);
        left.merge_into(&c);

        let mut bc = b.clone();
        bc.merge_into(&c);
        let mut right = a.clone();
        right.merge_into(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn is_empty_true_only_for_all_zero_counters() {
        assert!(VectorClock::new().is_empty());
        assert!(VectorClock::from(vec![("a", 0)]).is_empty());
        assert!(!VectorClock::from(vec![("a", 1)]).is_empty());
    }

    #[test]
    fn increment_bumps_own_entry_only() {
        let mut a = VectorClock::new();
        a.increment("r1");
        a.increment("r1");
        a.increment("r2");
        assert_eq!(a.get("r1"), 2);
        assert_eq!(a.get("r2"), 1);
        assert_eq!(a.sum(), 3);
    }
}
