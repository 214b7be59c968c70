//! Purpose: Model an optionally labeled, index-unique collection of wells.
//! Exports: `WellSet`.
//! Role: Backing store for plates and the decoded form of result tables.
//! Invariants: At most one well per index; iteration is ascending (row, column).
//! Invariants: An absent label is the empty string.

use crate::core::cursor::Cursor;
use crate::core::error::Error;
use crate::core::numeric::Numeric;
use crate::core::well::{Well, WellIndex};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct WellSet<N> {
    label: String,
    wells: BTreeMap<WellIndex, Well<N>>,
}

impl<N: Numeric> WellSet<N> {
    pub fn new() -> Self {
        Self {
            label: String::new(),
            wells: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Builds a set from wells, rejecting a repeated index.
    pub fn from_wells(wells: impl IntoIterator<Item = Well<N>>) -> Result<Self, Error> {
        let mut set = Self::new();
        for well in wells {
            set.insert_unique(well)?;
        }
        Ok(set)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn len(&self) -> usize {
        self.wells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wells.is_empty()
    }

    /// Inserts a well, returning the one it replaced at the same index.
    pub fn insert(&mut self, well: Well<N>) -> Option<Well<N>> {
        self.wells.insert(well.index, well)
    }

    pub(crate) fn insert_unique(&mut self, well: Well<N>) -> Result<(), Error> {
        let index = well.index;
        if self.wells.insert(index, well).is_some() {
            return Err(Error::malformed(format!("duplicate well {index}")));
        }
        Ok(())
    }

    pub fn remove(&mut self, index: &WellIndex) -> Option<Well<N>> {
        self.wells.remove(index)
    }

    pub fn get(&self, index: &WellIndex) -> Option<&Well<N>> {
        self.wells.get(index)
    }

    pub fn contains(&self, index: &WellIndex) -> bool {
        self.wells.contains_key(index)
    }

    pub fn wells(&self) -> impl Iterator<Item = &Well<N>> {
        self.wells.values()
    }

    pub fn cursor(&self) -> Cursor<Well<N>> {
        Cursor::new(self.wells.values().cloned().collect())
    }
}

impl<N: Numeric> Default for WellSet<N> {
    fn default() -> Self {
        Self::new()
    }
}
