use std::collections::BTreeSet;

use crate::types::ElectorateId;

/// Highest dummy electorate id; codes are two digits.
pub const MAX_DUMMY_ID: i64 = 99;

/// Ids available for dummy electorates in one comparison: `1..=max`
/// (never past [`MAX_DUMMY_ID`]) minus the ids of electorates that did not
/// change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummyPool {
    ids: Vec<ElectorateId>,
}

impl DummyPool {
    pub fn new(max: i64, excluded: &BTreeSet<ElectorateId>) -> Self {
        Self {
            ids: (1..=max.min(MAX_DUMMY_ID)).map(ElectorateId).filter(|id| !excluded.contains(id)).collect(),
        }
    }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Available ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ElectorateId> + '_ { self.ids.iter().copied() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_unchanged_ids() {
        let pool = DummyPool::new(99, &BTreeSet::from([ElectorateId(1), ElectorateId(5), ElectorateId(200)]));
        assert_eq!(pool.len(), 97);
        let ids = pool.ids().take(4).collect::<Vec<_>>();
        assert_eq!(ids, vec![ElectorateId(2), ElectorateId(3), ElectorateId(4), ElectorateId(6)]);
    }

    #[test]
    fn never_exceeds_two_digits() {
        let pool = DummyPool::new(150, &BTreeSet::new());
        assert_eq!(pool.len(), 99);
        assert_eq!(pool.ids().last(), Some(ElectorateId(MAX_DUMMY_ID)));
    }

    #[test]
    fn empty_pool() {
        assert!(DummyPool::new(0, &BTreeSet::new()).is_empty());
    }
}
