//! Batch and unprocessed-set containers

use super::item::{ItemKey, WriteOp};
use crate::utils::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Operations addressed to one collection, in submission order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionGroup {
    pub collection: String,
    pub ops: Vec<WriteOp>,
}

/// One logical request: write/delete operations grouped by collection
///
/// Groups keep the order in which their collection was first seen, and each
/// group keeps the order in which its operations were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    groups: Vec<CollectionGroup>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: impl IntoIterator<Item = WriteOp>) -> Self {
        let mut batch = Self::new();
        for op in ops {
            batch.push(op);
        }
        batch
    }

    /// Add an operation to the group of its collection
    pub fn push(&mut self, op: WriteOp) {
        match self
            .groups
            .iter_mut()
            .find(|g| g.collection == op.collection())
        {
            Some(group) => group.ops.push(op),
            None => self.groups.push(CollectionGroup {
                collection: op.collection().to_string(),
                ops: vec![op],
            }),
        }
    }

    pub fn push_all(&mut self, ops: impl IntoIterator<Item = impl Into<WriteOp>>) {
        for op in ops {
            self.push(op.into());
        }
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.ops.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.ops.is_empty())
    }

    pub fn groups(&self) -> &[CollectionGroup] {
        &self.groups
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.collection.as_str())
    }

    pub fn group(&self, collection: &str) -> Option<&[WriteOp]> {
        self.groups
            .iter()
            .find(|g| g.collection == collection)
            .map(|g| g.ops.as_slice())
    }

    /// Operations flattened group by group
    pub fn ops(&self) -> impl Iterator<Item = &WriteOp> {
        self.groups.iter().flat_map(|g| g.ops.iter())
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.groups.into_iter().flat_map(|g| g.ops).collect()
    }

    pub(crate) fn into_groups(self) -> Vec<CollectionGroup> {
        self.groups
    }

    pub(crate) fn from_groups(groups: Vec<CollectionGroup>) -> Self {
        Self { groups }
    }

    /// Shape checks that must pass before anything is sent to the store
    ///
    /// A key may appear only once per collection: the store rejects requests
    /// that touch the same item twice.
    pub fn validate(&self) -> Result<()> {
        for group in &self.groups {
            let mut seen: HashSet<&ItemKey> = HashSet::with_capacity(group.ops.len());
            for op in &group.ops {
                op.validate()?;
                if !seen.insert(op.key()) {
                    return Err(BatchError::validation(format!(
                        "duplicate key {} in collection '{}'",
                        op.key(),
                        group.collection
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<WriteOp> for Batch {
    fn from_iter<T: IntoIterator<Item = WriteOp>>(iter: T) -> Self {
        Self::from_ops(iter)
    }
}

/// Items the store declined to persist in the most recent attempt
///
/// An empty set means full success. Each attempt produces a fresh set that
/// replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnprocessedSet {
    groups: BTreeMap<String, Vec<WriteOp>>,
}

impl UnprocessedSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: impl IntoIterator<Item = WriteOp>) -> Self {
        let mut groups: BTreeMap<String, Vec<WriteOp>> = BTreeMap::new();
        for op in ops {
            groups.entry(op.collection().to_string()).or_default().push(op);
        }
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn get(&self, collection: &str) -> &[WriteOp] {
        self.groups
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.groups.values().flatten()
    }

    /// Union of two disjoint sets, consuming both
    pub fn union(mut self, other: Self) -> Self {
        for (collection, ops) in other.groups {
            self.groups.entry(collection).or_default().extend(ops);
        }
        self
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.groups.into_values().flatten().collect()
    }

    /// Turn the remainder back into a batch for resubmission
    pub fn into_batch(self) -> Batch {
        Batch::from_groups(
            self.groups
                .into_iter()
                .filter(|(_, ops)| !ops.is_empty())
                .map(|(collection, ops)| CollectionGroup { collection, ops })
                .collect(),
        )
    }
}

impl From<Batch> for UnprocessedSet {
    fn from(batch: Batch) -> Self {
        Self::from_ops(batch.into_ops())
    }
}
