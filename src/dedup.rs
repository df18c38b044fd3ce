use std::collections::HashMap;

use crate::post::Post;

/// Map of already-rendered posts keyed by hash id, owned by whoever renders.
/// There is no removal: entries persist for the life of the view, so a
/// long-running session grows this without bound.
#[derive(Debug, Default)]
pub struct DedupStore {
    seen: HashMap<String, Post>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &str) -> bool {
        self.seen.contains_key(key)
    }

    pub fn put(&mut self, key: String, post: Post) {
        self.seen.insert(key, post);
    }

    pub fn get(&self, key: &str) -> Option<&Post> {
        self.seen.get(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(msg: &str) -> Post {
        Post {
            msg: msg.into(),
            uid: "usera".into(),
            txtime: 1.0,
            rxtime: 0.0,
            postid: 1,
            perms: 2,
            hashid: None,
        }
    }

    #[test]
    fn put_then_has() {
        let mut store = DedupStore::new();
        assert!(!store.has("k1"));
        store.put("k1".into(), post("hello"));
        assert!(store.has("k1"));
        assert_eq!(store.get("k1").unwrap().msg, "hello");
    }

    #[test]
    fn keys_are_identity_not_content() {
        let mut store = DedupStore::new();
        store.put("k1".into(), post("same text"));
        store.put("k2".into(), post("same text"));
        assert_eq!(store.len(), 2);
    }
}
