//! Canonical id and fingerprint derivation.
//!
//! Every id derived here folds in the city `banana` so two cities can never
//! collide on a shared vendor-local identifier: vendor ids alone are only
//! unique within one vendor's own records.

use sha2::{Digest, Sha256};

/// `banana_<md5(vendor_id)[0:8]>` — canonical meeting id.
pub fn meeting_id(banana: &str, vendor_id: &str) -> String {
    let digest = md5::compute(vendor_id.as_bytes());
    let hex = format!("{:x}", digest);
    format!("{banana}_{}", &hex[..8])
}

/// `meeting_id_<short_hash(sequence+title)>` — canonical agenda item id.
pub fn item_id(meeting_id: &str, sequence: i32, title: &str) -> String {
    let preimage = format!("{sequence}{title}");
    format!("{meeting_id}_{}", short_hash(&preimage))
}

/// `banana_comm_<short_hash(normalized_name)>` — canonical committee id.
pub fn committee_id(banana: &str, normalized_name: &str) -> String {
    format!("{banana}_comm_{}", short_hash(normalized_name))
}

/// `hash(banana + normalized_name)` — canonical council member id.
pub fn council_member_id(banana: &str, normalized_name: &str) -> String {
    let preimage = format!("{banana}{normalized_name}");
    full_sha256_hex(&preimage)[..16].to_string()
}

/// Matter id: derived from (banana, preferred key), where the key already
/// encodes the fallback order (matter_file -> vendor matter_id -> normalized
/// title) chosen by the caller.
pub fn matter_id(banana: &str, preferred_key: &str) -> String {
    let preimage = format!("{banana}:{preferred_key}");
    format!("{banana}_m_{}", short_hash(&preimage))
}

/// A 12-hex truncation of sha256, used both as the short-hash building
/// block above and as the adapter fallback vendor id,
/// `sha256(normalize(title)+date+url_path)[0:12]`.
pub fn short_hash(input: &str) -> String {
    full_sha256_hex(input)[..12].to_string()
}

pub fn full_sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable fingerprint of an item's attachment URL set. Order-independent:
/// the set is sorted before hashing so reordering the same URLs never
/// changes the hash.
pub fn attachment_hash<'a>(urls: impl IntoIterator<Item = &'a str>) -> String {
    let mut sorted: Vec<&str> = urls.into_iter().collect();
    sorted.sort_unstable();
    full_sha256_hex(&sorted.join("\n"))
}

/// Fallback vendor id for adapters whose source has no native identifier.
pub fn fallback_vendor_id(normalized_title: &str, date: &str, url_path: &str) -> String {
    short_hash(&format!("{normalized_title}{date}{url_path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_id_includes_banana() {
        let a = meeting_id("paloaltoCA", "12345");
        let b = meeting_id("menloparkCA", "12345");
        assert_ne!(a, b);
        assert!(a.starts_with("paloaltoCA_"));
    }

    #[test]
    fn attachment_hash_stable_under_reordering() {
        let a = attachment_hash(["https://x/a.pdf", "https://x/b.pdf"]);
        let b = attachment_hash(["https://x/b.pdf", "https://x/a.pdf"]);
        assert_eq!(a, b);
    }

    #[test]
    fn attachment_hash_changes_with_set() {
        let a = attachment_hash(["https://x/a.pdf"]);
        let b = attachment_hash(["https://x/a.pdf", "https://x/b.pdf"]);
        assert_ne!(a, b);
    }

    #[test]
    fn short_hash_is_twelve_hex_chars() {
        assert_eq!(short_hash("anything").len(), 12);
    }
}
