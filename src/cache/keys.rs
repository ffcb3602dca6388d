//! Cache key definitions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The single backend key holding the full property collection.
pub const AGGREGATE_KEY: &str = "all_properties";

/// Response cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum L1Key {
    Response { path: String, query_hash: u64 },
}

impl L1Key {
    pub fn response(path: &str, query: &str) -> Self {
        Self::Response {
            path: path.to_string(),
            query_hash: hash_query(query),
        }
    }
}

/// Hash a query string for response cache key generation.
pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_key_is_the_well_known_literal() {
        assert_eq!(AGGREGATE_KEY, "all_properties");
    }

    #[test]
    fn same_path_and_query_produce_equal_keys() {
        assert_eq!(
            L1Key::response("/properties/", "page=2"),
            L1Key::response("/properties/", "page=2")
        );
    }

    #[test]
    fn different_queries_produce_different_keys() {
        assert_ne!(hash_query("page=1"), hash_query("page=2"));
        assert_ne!(
            L1Key::response("/properties/", "page=1"),
            L1Key::response("/properties/", "")
        );
    }
}
