//! Persistent list with structural sharing.
//!
//! Every document collection (passages, tags, entities, dialogue, events)
//! is a `SharedList`. Edits return a new list; elements that were not
//! touched are shared by pointer with the list they came from, so two
//! document revisions never copy more than the collection spine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

pub struct SharedList<T> {
    items: Arc<Vec<Arc<T>>>,
}

impl<T> SharedList<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(items.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).map(|item| item.as_ref())
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last().map(|item| item.as_ref())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.items.iter().map(|item| item.as_ref())
    }

    pub fn position<P>(&self, mut predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().position(|item| predicate(item))
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|item| predicate(item))
    }

    /// New list with `item` appended.
    pub fn with_pushed(&self, item: T) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.push(Arc::new(item));
        Self {
            items: Arc::new(items),
        }
    }

    /// New list with `item` inserted at `index`.
    ///
    /// Panics if `index > len`, like `Vec::insert`.
    pub fn with_inserted(&self, index: usize, item: T) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.insert(index, Arc::new(item));
        Self {
            items: Arc::new(items),
        }
    }

    /// New list with the element at `index` replaced.
    ///
    /// Panics if `index` is out of bounds, like slice indexing.
    pub fn with_replaced(&self, index: usize, item: T) -> Self {
        let mut items: Vec<Arc<T>> = self.items.iter().cloned().collect();
        items[index] = Arc::new(item);
        Self {
            items: Arc::new(items),
        }
    }

    /// New list without the element at `index`; the remainder keeps its order.
    ///
    /// Panics if `index` is out of bounds, like slice indexing.
    pub fn with_removed(&self, index: usize) -> Self {
        let mut items: Vec<Arc<T>> = self.items.iter().cloned().collect();
        items.remove(index);
        Self {
            items: Arc::new(items),
        }
    }

    /// New list holding the first `len` elements.
    pub fn truncated(&self, len: usize) -> Self {
        if len >= self.items.len() {
            return self.clone();
        }
        Self {
            items: Arc::new(self.items[..len].to_vec()),
        }
    }

    /// New list keeping only the elements matching `predicate`.
    ///
    /// Returns a clone sharing the same spine when nothing is dropped.
    pub fn retain<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        if self.items.iter().all(|item| predicate(item)) {
            return self.clone();
        }
        Self {
            items: Arc::new(
                self.items
                    .iter()
                    .filter(|item| predicate(item))
                    .cloned()
                    .collect(),
            ),
        }
    }

    /// True when both lists are the very same spine.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }

    /// True when `self[index]` and `other[other_index]` are the same allocation.
    pub fn shares_item(&self, index: usize, other: &Self, other_index: usize) -> bool {
        match (self.items.get(index), other.items.get(other_index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Clone> SharedList<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Clone for SharedList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for SharedList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for SharedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for SharedList<T> {}

impl<T: fmt::Debug> fmt::Debug for SharedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Index<usize> for SharedList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> From<Vec<T>> for SharedList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for SharedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Serialize> Serialize for SharedList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for SharedList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_vec)
    }
}
