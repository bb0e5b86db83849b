use std::cmp::Ordering;

/// A record with a backend-assigned id.
pub trait Record {
    fn id(&self) -> &str;

    /// Position relative to `other` in a displayed list.
    fn list_order(&self, other: &Self) -> Ordering {
        let _ = other;
        Ordering::Equal
    }
}

/// Fetched records kept in sync with successful mutations, without a refetch.
#[derive(Debug, Clone)]
pub struct RecordList<T> {
    items: Vec<T>,
}

impl<T: Record> RecordList<T> {
    pub fn new(mut items: Vec<T>) -> Self {
        items.sort_by(|a, b| a.list_order(b));
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Drop the record after a successful delete.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        Some(self.items.remove(index))
    }

    /// Insert a created record or replace an updated one, keeping list order.
    pub fn upsert(&mut self, record: T) {
        match self.items.iter_mut().find(|item| item.id() == record.id()) {
            Some(existing) => *existing = record,
            None => self.items.push(record),
        }
        self.items.sort_by(|a, b| a.list_order(b));
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for RecordList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}
