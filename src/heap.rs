use crate::error::HeapError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backing store for a [`PriorityQueue`]. Lives inside durable memory so a queue can be rebuilt every tick
/// by attaching to the same block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapMemory<T> {
    pub array: Vec<T>,
    pub index: Option<BTreeMap<String, ()>>,
}

impl<T> Default for HeapMemory<T> {
    fn default() -> HeapMemory<T> {
        HeapMemory {
            array: Vec::new(),
            index: None,
        }
    }
}

impl<T> HeapMemory<T> {
    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.array.iter()
    }

    pub fn clear(&mut self) {
        self.array.clear();

        if let Some(index) = self.index.as_mut() {
            index.clear();
        }
    }

    /// Recomputes the membership index from the array contents.
    pub fn rebuild_index<K>(&mut self, key: K)
    where
        K: Fn(&T) -> &str,
    {
        let index = self.array.iter().map(|item| (key(item).to_string(), ())).collect();

        self.index = Some(index);
    }
}

/// Binary heap over an externally owned [`HeapMemory`]. `compare(a, b)` returns true when `a` must sit above
/// `b`. When built with a key function, keys are unique and membership is tracked in the memory's index.
pub struct PriorityQueue<'m, T, C>
where
    C: Fn(&T, &T) -> bool,
{
    memory: &'m mut HeapMemory<T>,
    compare: C,
    key: Option<fn(&T) -> &str>,
}

impl<'m, T, C> PriorityQueue<'m, T, C>
where
    C: Fn(&T, &T) -> bool,
{
    pub fn new(memory: &'m mut HeapMemory<T>, compare: C) -> Self {
        PriorityQueue { memory, compare, key: None }
    }

    pub fn with_key(memory: &'m mut HeapMemory<T>, compare: C, key: fn(&T) -> &str) -> Self {
        if memory.index.is_none() {
            memory.rebuild_index(key);
        }

        PriorityQueue {
            memory,
            compare,
            key: Some(key),
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), HeapError> {
        if let Some(key) = self.key {
            let name = key(&item).to_string();

            let index = self.memory.index.get_or_insert_with(BTreeMap::new);

            if index.contains_key(&name) {
                return Err(HeapError::DuplicateKey(name));
            }

            index.insert(name, ());
        }

        self.memory.array.push(item);

        let last = self.memory.array.len() - 1;

        self.sift_up(last);

        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.memory.array.is_empty() {
            return None;
        }

        let item = self.memory.array.swap_remove(0);

        if !self.memory.array.is_empty() {
            self.sift_down(0);
        }

        if let (Some(key), Some(index)) = (self.key, self.memory.index.as_mut()) {
            index.remove(key(&item));
        }

        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.memory.array.first()
    }

    pub fn is_empty(&self) -> bool {
        self.memory.array.is_empty()
    }

    pub fn size(&self) -> usize {
        self.memory.array.len()
    }

    pub fn has_item(&self, key: &str) -> Result<bool, HeapError> {
        if self.key.is_none() {
            return Err(HeapError::Unkeyed);
        }

        Ok(self.memory.index.as_ref().map(|index| index.contains_key(key)).unwrap_or(false))
    }

    fn sift_up(&mut self, mut position: usize) {
        let array = &mut self.memory.array;

        while position > 0 {
            let parent = (position - 1) / 2;

            if (self.compare)(&array[position], &array[parent]) {
                array.swap(position, parent);

                position = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        let array = &mut self.memory.array;
        let len = array.len();

        loop {
            let left = position * 2 + 1;
            let right = left + 1;

            let mut best = position;

            if left < len && (self.compare)(&array[left], &array[best]) {
                best = left;
            }

            if right < len && (self.compare)(&array[right], &array[best]) {
                best = right;
            }

            if best == position {
                break;
            }

            array.swap(position, best);

            position = best;
        }
    }
}
