use bitcoin_hashes::siphash24::Hash;
use std::collections::HashMap;
use std::hash::{self, BuildHasher};

/// Hasher using `siphash24`.
#[derive(Default)]
pub struct Hasher {
    data: Vec<u8>,
    key1: u64,
    key2: u64,
}

impl Hasher {
    fn new(key1: u64, key2: u64) -> Self {
        Self {
            data: vec![],
            key1,
            key2,
        }
    }
}

impl hash::Hasher for Hasher {
    fn write(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes)
    }

    fn finish(&self) -> u64 {
        Hash::hash_with_keys(self.key1, self.key2, &self.data).as_u64()
    }
}

/// Random hasher state.
///
/// Keyed from the simulation RNG, so that map iteration order is a pure
/// function of the seed.
#[derive(Debug, Default, Clone)]
pub struct RandomState {
    key1: u64,
    key2: u64,
}

impl RandomState {
    fn new(mut rng: fastrand::Rng) -> Self {
        Self {
            key1: rng.u64(..),
            key2: rng.u64(..),
        }
    }
}

impl BuildHasher for RandomState {
    type Hasher = Hasher;

    fn build_hasher(&self) -> Self::Hasher {
        Hasher::new(self.key1, self.key2)
    }
}

impl From<fastrand::Rng> for RandomState {
    fn from(rng: fastrand::Rng) -> Self {
        Self::new(rng)
    }
}

/// A map with deterministic, insertion-ordered iteration and the ability to
/// draw uniformly random entries.
#[derive(Debug, Clone)]
pub struct AddressBook<K, V> {
    keys: Vec<K>,
    map: HashMap<K, V, RandomState>,
}

impl<K: Copy + Eq + hash::Hash, V> AddressBook<K, V> {
    /// Create a new, empty address book.
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            keys: Vec::new(),
            map: HashMap::with_hasher(RandomState::from(rng)),
        }
    }

    /// Insert a *new* entry. Returns `true` if the key was inserted, or
    /// `false` if it was already present; an existing value is never
    /// overwritten.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        use std::collections::hash_map::Entry;

        match self.map.entry(key) {
            Entry::Vacant(v) => {
                v.insert(value);
            }
            Entry::Occupied(_) => return false,
        }
        self.keys.push(key);
        true
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.map.remove(key)?;
        self.keys.retain(|k| k != key);
        Some(value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Pick a key uniformly at random.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Option<K> {
        if self.keys.is_empty() {
            return None;
        }
        Some(self.keys[rng.usize(..self.keys.len())])
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().map(move |k| {
            let v = self.map.get(k).expect("keys and map are in sync");
            (k, v)
        })
    }

    pub fn clear(&mut self) {
        self.keys.clear();
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> AddressBook<u32, ()> {
        AddressBook::new(fastrand::Rng::with_seed(7))
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut book = book();

        assert!(book.insert(1, ()));
        assert!(!book.insert(1, ()));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn test_iteration_order_is_insertion_order() {
        let mut book = book();

        for k in [9, 3, 7, 1] {
            book.insert(k, ());
        }
        book.remove(&7);

        let keys: Vec<u32> = book.keys().copied().collect();
        assert_eq!(keys, vec![9, 3, 1]);
    }

    #[test]
    fn test_sample_is_uniform_over_keys() {
        let mut book = book();
        let mut rng = fastrand::Rng::with_seed(11);

        for k in 0..4u32 {
            book.insert(k, ());
        }

        let mut seen = [false; 4];
        for _ in 0..256 {
            let k = book.sample(&mut rng).unwrap();
            seen[k as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_sample_empty() {
        let book = book();
        let mut rng = fastrand::Rng::with_seed(11);

        assert_eq!(book.sample(&mut rng), None);
    }
}
