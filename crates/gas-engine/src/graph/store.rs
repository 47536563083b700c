//! Per-vertex payload cells
//!
//! Each payload sits behind its own lock so that neighbors can read it during
//! Gather while its owner partition is the only writer.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
pub(crate) struct VertexStore<V> {
    cells: Vec<RwLock<V>>,
}

impl<V> VertexStore<V> {
    pub fn new(values: Vec<V>) -> Self {
        Self {
            cells: values.into_iter().map(RwLock::new).collect(),
        }
    }

    pub fn read(&self, index: usize) -> RwLockReadGuard<'_, V> {
        self.cells[index]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self, index: usize) -> RwLockWriteGuard<'_, V> {
        self.cells[index]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
