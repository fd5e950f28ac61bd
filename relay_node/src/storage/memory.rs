use parking_lot::Mutex;

/// Append-only in-memory log guarded by a single lock.
///
/// Entries live for the lifetime of the owning process and are never
/// mutated or removed once appended.
pub struct AppendLog<T> {
    entries: Mutex<Vec<T>>,
}

impl<T> Default for AppendLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AppendLog<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, entry: T) {
        self.entries.lock().push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<T: Clone> AppendLog<T> {
    /// Consistent snapshot in insertion order.
    pub fn list(&self) -> Vec<T> {
        self.entries.lock().clone()
    }
}
