//! Pairing of reported RAM modules / storage disks with their baseline entries.
//!
//! Policy, applied in two passes over the submitted list:
//!
//! 1. An entry that names an index is paired with the baseline entry recorded
//!    under that index.
//! 2. Every entry left over (no index, or an index the baseline never saw) is
//!    paired with the baseline entry at the same position in index order, unless
//!    pass 1 already claimed that baseline entry.
//!
//! Entries that stay unpaired on either side are not reconciled. Every pairing
//! carries its [`MatchedBy`] basis, which the reconciler writes into the
//! message of each positional entry.

/// An entry that may carry an explicit slot or disk index.
pub trait Indexed {
    fn index(&self) -> Option<i32>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Index,
    Position,
}

#[derive(Debug)]
pub struct Pairing<'a, B, I> {
    /// Index the baseline entry is stored under.
    pub slot: i32,
    pub baseline: &'a B,
    pub incoming: &'a I,
    pub matched_by: MatchedBy,
}

/// Pairs `incoming` entries with `baseline` entries. `baseline` must be sorted
/// by index and every baseline entry must carry one. The result is ordered by
/// baseline index.
pub fn pair_entries<'a, B, I>(baseline: &'a [B], incoming: &'a [I]) -> Vec<Pairing<'a, B, I>>
where
    B: Indexed,
    I: Indexed,
{
    let mut claimed = vec![false; baseline.len()];
    let mut pairs = Vec::with_capacity(incoming.len().min(baseline.len()));
    let mut leftovers = Vec::new();

    for (position, entry) in incoming.iter().enumerate() {
        let by_index = entry
            .index()
            .and_then(|idx| baseline.iter().position(|b| b.index() == Some(idx)));
        match by_index {
            Some(slot_pos) if !claimed[slot_pos] => {
                claimed[slot_pos] = true;
                pairs.push((slot_pos, entry, MatchedBy::Index));
            }
            _ => leftovers.push((position, entry)),
        }
    }

    for (position, entry) in leftovers {
        if position < baseline.len() && !claimed[position] {
            claimed[position] = true;
            pairs.push((position, entry, MatchedBy::Position));
        }
    }

    pairs.sort_by_key(|(slot_pos, _, _)| *slot_pos);
    pairs
        .into_iter()
        .map(|(slot_pos, entry, matched_by)| {
            let baseline_entry = &baseline[slot_pos];
            Pairing {
                slot: baseline_entry.index().unwrap_or(slot_pos as i32),
                baseline: baseline_entry,
                incoming: entry,
                matched_by,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Entry(Option<i32>, &'static str);

    impl Indexed for Entry {
        fn index(&self) -> Option<i32> {
            self.0
        }
    }

    fn summary(pairs: &[Pairing<'_, Entry, Entry>]) -> Vec<(i32, &'static str, MatchedBy)> {
        pairs.iter().map(|p| (p.slot, p.incoming.1, p.matched_by)).collect()
    }

    #[test]
    fn explicit_indices_survive_reordering() {
        let baseline = [Entry(Some(0), "a"), Entry(Some(1), "b")];
        let incoming = [Entry(Some(1), "b'"), Entry(Some(0), "a'")];
        let pairs = pair_entries(&baseline, &incoming);
        assert_eq!(
            summary(&pairs),
            vec![(0, "a'", MatchedBy::Index), (1, "b'", MatchedBy::Index)]
        );
    }

    #[test]
    fn missing_indices_fall_back_to_position() {
        let baseline = [Entry(Some(0), "a"), Entry(Some(2), "b")];
        let incoming = [Entry(None, "x"), Entry(None, "y")];
        let pairs = pair_entries(&baseline, &incoming);
        assert_eq!(
            summary(&pairs),
            vec![(0, "x", MatchedBy::Position), (2, "y", MatchedBy::Position)]
        );
    }

    #[test]
    fn explicit_claims_win_over_positional_fallback() {
        // "y" claims slot 0 explicitly, so "x" at position 0 has nothing left.
        let baseline = [Entry(Some(0), "a"), Entry(Some(1), "b")];
        let incoming = [Entry(None, "x"), Entry(Some(0), "y")];
        let pairs = pair_entries(&baseline, &incoming);
        assert_eq!(summary(&pairs), vec![(0, "y", MatchedBy::Index)]);
    }

    #[test]
    fn unknown_index_falls_back_to_position() {
        let baseline = [Entry(Some(0), "a")];
        let incoming = [Entry(Some(7), "x")];
        let pairs = pair_entries(&baseline, &incoming);
        assert_eq!(summary(&pairs), vec![(0, "x", MatchedBy::Position)]);
    }

    #[test]
    fn extra_entries_are_left_unpaired() {
        let baseline = [Entry(Some(0), "a")];
        let incoming = [Entry(None, "x"), Entry(None, "y")];
        assert_eq!(pair_entries(&baseline, &incoming).len(), 1);
        assert!(pair_entries::<Entry, Entry>(&[], &incoming).is_empty());
    }
}
