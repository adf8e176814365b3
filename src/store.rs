use std::collections::{HashMap, VecDeque};
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The operations handlers are allowed to perform against list storage. Handlers only see this
/// trait, so a different engine (sets, hashes, a sharded store) can be plugged into the router
/// without touching the commands.
pub trait ListEngine: Send + Sync {
    /// Pushes `values` to the head of the list, one at a time, and returns the new length.
    fn lpush(&self, key: &str, values: Vec<String>) -> usize;

    /// Appends `values` to the tail of the list and returns the new length.
    fn rpush(&self, key: &str, values: Vec<String>) -> usize;

    fn lpop(&self, key: &str) -> Option<String>;

    fn rpop(&self, key: &str) -> Option<String>;

    /// Returns the elements between `start` and `end`, both inclusive. Negative indexes count
    /// from the tail.
    fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String>;

    fn llen(&self, key: &str) -> usize;
}

/// The Store owns every list of the server. All access goes through a single mutex, which makes
/// each operation atomic with respect to the others. It is cheap to clone, clones share the same
/// underlying state.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        let state = State {
            keys: HashMap::new(),
        };

        let inner = Arc::new(InnerStore {
            state: Mutex::new(state),
        });

        Self { inner }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InnerStore {
    state: Mutex<State>,
}

pub struct InnerStoreLocked<'a> {
    state: MutexGuard<'a, State>,
}

impl<'a> InnerStoreLocked<'a> {
    pub fn lpush(&mut self, key: &str, values: Vec<String>) -> usize {
        let list = self.state.keys.entry(key.to_string()).or_default();
        for value in values {
            list.push_front(value);
        }
        list.len()
    }

    pub fn rpush(&mut self, key: &str, values: Vec<String>) -> usize {
        let list = self.state.keys.entry(key.to_string()).or_default();
        list.extend(values);
        list.len()
    }

    pub fn lpop(&mut self, key: &str) -> Option<String> {
        self.pop(key, VecDeque::pop_front)
    }

    pub fn rpop(&mut self, key: &str) -> Option<String> {
        self.pop(key, VecDeque::pop_back)
    }

    fn pop(
        &mut self,
        key: &str,
        pop: fn(&mut VecDeque<String>) -> Option<String>,
    ) -> Option<String> {
        let list = self.state.keys.get_mut(key)?;
        let value = pop(list);

        // An empty list and a missing key must look the same, so the entry goes away with its
        // last element.
        if list.is_empty() {
            self.state.keys.remove(key);
        }

        value
    }

    pub fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        let list = match self.state.keys.get(key) {
            Some(list) => list,
            None => return vec![],
        };

        match resolve_range(list.len(), start, end) {
            Some((start, end)) => list.range(start..=end).cloned().collect(),
            None => vec![],
        }
    }

    pub fn llen(&self, key: &str) -> usize {
        self.state.keys.get(key).map_or(0, VecDeque::len)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.state.keys.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.state.keys.len()
    }
}

/// Turns Redis style inclusive indexes into a valid `start..=end` range over a list of `len`
/// elements, or `None` when nothing is selected.
fn resolve_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;
    if len == 0 {
        return None;
    }

    let start = get_positive_index(len, start).max(0);
    let end = get_positive_index(len, end).min(len - 1);

    if start > end || start >= len {
        return None;
    }

    Some((start as usize, end as usize))
}

fn get_positive_index(len: i64, index: i64) -> i64 {
    if index >= 0 {
        index
    } else {
        len.saturating_add(index)
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl InnerStore {
    pub fn lock(&self) -> InnerStoreLocked<'_> {
        // Every operation leaves the map consistent before it can panic, so a poisoned lock still
        // guards valid data.
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        InnerStoreLocked { state }
    }
}

impl ListEngine for Store {
    fn lpush(&self, key: &str, values: Vec<String>) -> usize {
        self.lock().lpush(key, values)
    }

    fn rpush(&self, key: &str, values: Vec<String>) -> usize {
        self.lock().rpush(key, values)
    }

    fn lpop(&self, key: &str) -> Option<String> {
        self.lock().lpop(key)
    }

    fn rpop(&self, key: &str) -> Option<String> {
        self.lock().rpop(key)
    }

    fn lrange(&self, key: &str, start: i64, end: i64) -> Vec<String> {
        self.lock().lrange(key, start, end)
    }

    fn llen(&self, key: &str) -> usize {
        self.lock().llen(key)
    }
}

type Key = String;

pub struct State {
    keys: HashMap<Key, VecDeque<String>>,
}
