//! Character-keyed prefix trie.
//!
//! Every node owns its children in a `BTreeMap`, so traversal and the
//! serialized form are ordered by character rather than by insertion. The
//! serialized bytes of a trie are therefore a pure function of its
//! (key, payload) set, which the build uses for change detection.
//!
//! ## Wire format
//!
//! Each node is encoded as a two element JSON array:
//!
//! ```text
//! [payload-or-null, { "<char>": <child node>, ... }]
//! ```

use std::collections::BTreeMap;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeTuple, Serializer};

use crate::error::Result;

/// A node in the trie. A node without payload is an internal prefix node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieNode<T> {
    payload: Option<T>,
    children: BTreeMap<char, TrieNode<T>>,
}

impl<T> Default for TrieNode<T> {
    fn default() -> Self {
        Self {
            payload: None,
            children: BTreeMap::new(),
        }
    }
}

impl<T> TrieNode<T> {
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    pub fn children(&self) -> impl Iterator<Item = (char, &TrieNode<T>)> {
        self.children.iter().map(|(ch, node)| (*ch, node))
    }

    fn count_payloads(&self) -> usize {
        usize::from(self.payload.is_some())
            + self
                .children
                .values()
                .map(TrieNode::count_payloads)
                .sum::<usize>()
    }
}

impl<T: Serialize> Serialize for TrieNode<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.payload)?;
        tuple.serialize_element(&self.children)?;
        tuple.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for TrieNode<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (payload, children) =
            <(Option<T>, BTreeMap<char, TrieNode<T>>)>::deserialize(deserializer)?;
        Ok(Self { payload, children })
    }
}

/// Result of an exact lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a, T> {
    /// Some character of the key has no node.
    NotFound,
    /// The key is a prefix of stored keys but carries no payload itself.
    Prefix,
    Found(&'a T),
}

impl<'a, T> Lookup<'a, T> {
    pub fn found(self) -> Option<&'a T> {
        match self {
            Lookup::Found(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Prefix trie mapping strings to payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTrie<T> {
    root: TrieNode<T>,
    len: usize,
}

impl<T> Default for PrefixTrie<T> {
    fn default() -> Self {
        Self {
            root: TrieNode::default(),
            len: 0,
        }
    }
}

impl<T> PrefixTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that carry a payload.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> &TrieNode<T> {
        &self.root
    }

    /// Stores `payload` under `key`, replacing any previous payload.
    ///
    /// Missing intermediate nodes are created without payload. The empty key
    /// addresses the root.
    pub fn insert(&mut self, key: &str, payload: T) {
        let mut node = &mut self.root;
        for ch in key.chars() {
            node = node.children.entry(ch).or_default();
        }
        if node.payload.replace(payload).is_none() {
            self.len += 1;
        }
    }

    pub fn find_exact(&self, key: &str) -> Lookup<'_, T> {
        match self.find_node(key) {
            None => Lookup::NotFound,
            Some(node) => match &node.payload {
                Some(payload) => Lookup::Found(payload),
                None => Lookup::Prefix,
            },
        }
    }

    /// Lazily yields every stored key starting with `prefix`, including
    /// `prefix` itself, in character order.
    pub fn prefix_search(&self, prefix: &str) -> PrefixSearch<'_, T> {
        let stack = match self.find_node(prefix) {
            Some(node) => vec![(prefix.to_string(), node)],
            None => Vec::new(),
        };
        PrefixSearch { stack }
    }

    fn find_node(&self, key: &str) -> Option<&TrieNode<T>> {
        let mut node = &self.root;
        for ch in key.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node)
    }
}

impl<T: Serialize> PrefixTrie<T> {
    /// Encodes the whole trie as compact JSON. Byte-for-byte stable for an
    /// unchanged trie.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.root)?)
    }
}

impl<T: for<'de> Deserialize<'de>> PrefixTrie<T> {
    /// Decodes bytes produced by [`PrefixTrie::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        // Nesting grows by two levels per key character.
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        deserializer.disable_recursion_limit();
        let root = TrieNode::<T>::deserialize(&mut deserializer)?;
        deserializer.end()?;
        let len = root.count_payloads();
        Ok(Self { root, len })
    }
}

/// Depth-first iterator returned by [`PrefixTrie::prefix_search`].
pub struct PrefixSearch<'a, T> {
    stack: Vec<(String, &'a TrieNode<T>)>,
}

impl<'a, T> Iterator for PrefixSearch<'a, T> {
    type Item = (String, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, node)) = self.stack.pop() {
            // Reversed so the smallest character is popped first.
            for (ch, child) in node.children.iter().rev() {
                let mut child_key = String::with_capacity(key.len() + ch.len_utf8());
                child_key.push_str(&key);
                child_key.push(*ch);
                self.stack.push((child_key, child));
            }
            if let Some(payload) = &node.payload {
                return Some((key, payload));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sample() -> PrefixTrie<Vec<(String, String)>> {
        let mut trie = PrefixTrie::new();
        trie.insert("cat", vec![("N".into(), "felis".into())]);
        trie.insert("car", vec![("N".into(), "vehicle".into())]);
        trie
    }

    #[test]
    fn exact_lookup_distinguishes_missing_prefix_and_found() {
        let trie = sample();
        assert_eq!(
            trie.find_exact("cat").found(),
            Some(&vec![("N".to_string(), "felis".to_string())])
        );
        assert_eq!(trie.find_exact("ca"), Lookup::Prefix);
        assert_eq!(trie.find_exact("dog"), Lookup::NotFound);
        assert_eq!(trie.find_exact("cats"), Lookup::NotFound);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn prefix_search_yields_completed_keys_under_prefix() {
        let trie = sample();
        let keys: Vec<String> = trie.prefix_search("ca").map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["car".to_string(), "cat".to_string()]);

        assert_eq!(trie.prefix_search("cat").count(), 1);
        assert_eq!(trie.prefix_search("x").count(), 0);
        assert_eq!(trie.prefix_search("").count(), 2);
    }

    #[test]
    fn prefix_search_is_restartable() {
        let trie = sample();
        let first: Vec<_> = trie.prefix_search("c").collect();
        let second: Vec<_> = trie.prefix_search("c").collect();
        assert_eq!(first, second);
    }

    #[test]
    fn prefix_search_is_complete_for_nested_keys() {
        let words = ["a", "ab", "abc", "abd", "b", "ba", "ábær", "ŋ", "ŋŋ", "abcdef"];
        let mut trie = PrefixTrie::new();
        for (i, word) in words.iter().enumerate() {
            trie.insert(word, i);
        }

        for prefix in ["", "a", "ab", "abc", "b", "á", "ŋ", "z", "abcd"] {
            let expected: BTreeSet<&str> =
                words.iter().copied().filter(|w| w.starts_with(prefix)).collect();
            let found: Vec<String> = trie.prefix_search(prefix).map(|(key, _)| key).collect();
            let unique: BTreeSet<&str> = found.iter().map(String::as_str).collect();
            assert_eq!(found.len(), unique.len(), "duplicate keys for {prefix:?}");
            assert_eq!(unique, expected, "prefix {prefix:?}");
        }
    }

    #[test]
    fn insert_overwrites_payload() {
        let mut trie = PrefixTrie::new();
        trie.insert("sápmi", 1);
        trie.insert("sápmi", 2);
        assert_eq!(trie.find_exact("sápmi"), Lookup::Found(&2));
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn empty_key_addresses_the_root() {
        let mut trie: PrefixTrie<u8> = PrefixTrie::new();
        assert_eq!(trie.find_exact(""), Lookup::Prefix);
        assert_eq!(trie.find_exact("a"), Lookup::NotFound);

        trie.insert("", 7);
        assert_eq!(trie.find_exact(""), Lookup::Found(&7));
        assert_eq!(trie.root().payload(), Some(&7));
        assert_eq!(trie.prefix_search("").collect::<Vec<_>>(), vec![(String::new(), &7)]);
    }

    #[test]
    fn serializes_nodes_as_payload_children_pairs() {
        let mut trie = PrefixTrie::new();
        trie.insert("ab", 1u32);
        trie.insert("a", 2u32);
        let json = String::from_utf8(trie.serialize().expect("serialize")).expect("utf8");
        assert_eq!(json, r#"[null,{"a":[2,{"b":[1,{}]}]}]"#);
    }

    #[test]
    fn serialization_ignores_insertion_order() {
        let mut forward = PrefixTrie::new();
        let mut backward = PrefixTrie::new();
        let words = ["guolli", "guolle", "guovssahas", "gáffe"];
        for word in words {
            forward.insert(word, word.len());
        }
        for word in words.iter().rev() {
            backward.insert(word, word.len());
        }
        assert_eq!(
            forward.serialize().expect("forward"),
            backward.serialize().expect("backward")
        );
    }

    #[test]
    fn round_trip_preserves_lookups() {
        let long_key = "x".repeat(300);
        let entries = vec![
            ("cat".to_string(), vec![("N".to_string(), "felis".to_string())]),
            ("car".to_string(), vec![("N".to_string(), "vehicle".to_string())]),
            ("čuožžut".to_string(), vec![("V".to_string(), "stand".to_string())]),
            (long_key.clone(), vec![("N".to_string(), "long".to_string())]),
        ];
        let mut trie = PrefixTrie::new();
        for (key, payload) in &entries {
            trie.insert(key, payload.clone());
        }

        let bytes = trie.serialize().expect("serialize");
        let decoded: PrefixTrie<Vec<(String, String)>> =
            PrefixTrie::deserialize(&bytes).expect("deserialize");

        assert_eq!(decoded, trie);
        assert_eq!(decoded.len(), entries.len());
        for (key, payload) in &entries {
            assert_eq!(decoded.find_exact(key), Lookup::Found(payload));
        }
        assert_eq!(decoded.find_exact("ca"), Lookup::Prefix);
        assert_eq!(
            decoded.prefix_search("c").collect::<Vec<_>>(),
            trie.prefix_search("c").collect::<Vec<_>>()
        );
        assert_eq!(decoded.serialize().expect("reserialize"), bytes);
    }

    #[test]
    fn deserialize_rejects_trailing_garbage() {
        assert!(PrefixTrie::<u8>::deserialize(br#"[null,{}] x"#).is_err());
        assert!(PrefixTrie::<u8>::deserialize(br#"{"a":1}"#).is_err());
    }
}
