//! Property-based tests for key generation and part number parsing.

use std::collections::HashSet;

use proptest::prelude::*;

use super::key::{MAX_PART_NUMBER, generate_object_key, parse_part_numbers, validate_key};
use crate::access::SlotConfig;

/// File stems without separators or dots.
fn stem() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

/// Short alphanumeric extensions.
fn extension() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,5}"
}

/// Single-segment path prefixes.
fn prefix() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
}

fn part_number() -> impl Strategy<Value = u32> {
    1u32..=MAX_PART_NUMBER
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Preserved names map to exactly `prefix/stem.ext`.
    #[test]
    fn prop_preserved_key_is_prefix_stem_ext(
        prefix in prefix(),
        stem in stem(),
        ext in extension(),
    ) {
        let slot = SlotConfig::new("f").with_prefix(prefix.clone()).preserving_filename();
        let key = generate_object_key(&format!("{stem}.{ext}"), &slot);
        prop_assert_eq!(key, format!("{prefix}/{stem}.{ext}"));
    }

    /// Generated keys always land inside the slot that produced them.
    #[test]
    fn prop_generated_key_passes_validation(
        prefix in prefix(),
        stem in stem(),
        ext in extension(),
        preserve in any::<bool>(),
    ) {
        let mut slot = SlotConfig::new("f").with_prefix(prefix);
        slot.preserve_filename = preserve;
        let key = generate_object_key(&format!("{stem}.{ext}"), &slot);
        prop_assert!(validate_key(&key, &slot).is_ok());
        let expected_suffix = format!(".{ext}");
        prop_assert!(key.ends_with(&expected_suffix));
    }

    /// Whatever the client sends, preserved keys only use URL-safe characters.
    #[test]
    fn prop_preserved_key_is_url_safe(name in "\\PC{1,40}") {
        let slot = SlotConfig::new("f").with_prefix("p").preserving_filename();
        let key = generate_object_key(&name, &slot);
        let file = key.strip_prefix("p/").unwrap();
        prop_assert!(
            file.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')),
            "unsafe key {}", key
        );
    }

    /// Opaque names never collide across a batch of calls.
    #[test]
    fn prop_opaque_keys_are_unique(stem in stem(), ext in extension()) {
        let slot = SlotConfig::new("f").with_prefix("p");
        let filename = format!("{stem}.{ext}");
        let keys: HashSet<String> = (0..32).map(|_| generate_object_key(&filename, &slot)).collect();
        prop_assert_eq!(keys.len(), 32);
    }

    /// Parsing a joined list yields exactly the distinct numbers.
    #[test]
    fn prop_parse_part_numbers_matches_input(
        numbers in prop::collection::vec(part_number(), 1..50),
    ) {
        let raw = numbers.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        let parsed = parse_part_numbers(&raw).unwrap();
        let expected: std::collections::BTreeSet<u32> = numbers.into_iter().collect();
        prop_assert_eq!(parsed, expected);
    }

    /// Anything above the S3 limit is rejected.
    #[test]
    fn prop_out_of_range_part_rejected(number in (MAX_PART_NUMBER + 1)..u32::MAX) {
        prop_assert!(parse_part_numbers(&number.to_string()).is_err());
    }
}
