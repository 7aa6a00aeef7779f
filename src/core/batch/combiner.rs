//! Merging independently built batches into one execution run

use super::batch::{Batch, CollectionGroup};

/// Merge two batches, concatenating per-collection lists
///
/// Collections of `a` come first; within a collection present in both,
/// items from `a` precede items from `b`. The result shares one retry budget
/// when executed but carries no cross-collection atomicity.
pub fn combine(a: Batch, b: Batch) -> Batch {
    let mut groups = a.into_groups();
    for incoming in b.into_groups() {
        match groups
            .iter_mut()
            .find(|g| g.collection == incoming.collection)
        {
            Some(existing) => existing.ops.extend(incoming.ops),
            None => groups.push(CollectionGroup {
                collection: incoming.collection,
                ops: incoming.ops,
            }),
        }
    }
    Batch::from_groups(groups)
}

/// Pairwise combination of any number of batches
pub fn combine_all(batches: impl IntoIterator<Item = Batch>) -> Batch {
    batches.into_iter().fold(Batch::new(), combine)
}
