use crate::filters::ObjectFilter;
use crate::types::StorageObject;

/// Matches keys containing the query, ignoring case. An empty query matches
/// every key.
pub struct KeySubstringFilter {
    needle: String,
}

impl KeySubstringFilter {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.to_lowercase(),
        }
    }

    pub fn matches_key(&self, key: &str) -> bool {
        self.needle.is_empty() || key.to_lowercase().contains(&self.needle)
    }
}

impl ObjectFilter for KeySubstringFilter {
    fn is_match(&self, object: &StorageObject) -> bool {
        self.matches_key(&object.key)
    }
}
