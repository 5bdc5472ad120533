//! Deterministic short hashes used to build problem variable ids
use std::hash::{DefaultHasher, Hash, Hasher};

/// Hash a value with the std SipHash hasher using fixed keys
pub(crate) fn calculate_hash<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

/// Lowercase hexadecimal form of [`calculate_hash`]
pub(crate) fn hash_as_hex_string<T: Hash + ?Sized>(t: &T) -> String {
    format!("{:x}", calculate_hash(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_within_process() {
        assert_eq!(hash_as_hex_string("PGI"), hash_as_hex_string("PGI"));
        assert_ne!(hash_as_hex_string("PGI"), hash_as_hex_string("PFK"));
        assert!(hash_as_hex_string("PGI")
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
    }
}
