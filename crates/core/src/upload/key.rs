//! Object key derivation and request validation.

use std::collections::BTreeSet;

use uuid::Uuid;

use super::error::UploadError;
use crate::access::SlotConfig;
use crate::storage::CompletedPart;

/// Highest part number S3 accepts.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// Generate the object key for a new upload into `slot`.
///
/// Keeps the original name when the slot preserves file names, otherwise
/// uses a random UUID. The original extension is always kept. Both are
/// reduced to `[A-Za-z0-9._-]` so keys stay URL- and path-safe.
#[must_use]
pub fn generate_object_key(original_filename: &str, slot: &SlotConfig) -> String {
    let (stem, extension) = split_filename(base_name(original_filename));

    let name = Some(sanitize_filename(stem))
        .filter(|name| slot.preserve_filename && name.chars().any(|c| c != '.'))
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let file = match extension {
        Some(ext) => format!("{name}.{}", sanitize_filename(ext)),
        None => name,
    };

    match &slot.path_prefix {
        Some(prefix) => format!("{prefix}/{file}"),
        None => file,
    }
}

/// Last path segment, tolerating both separators.
#[must_use]
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Replace everything outside ASCII alphanumerics, dots, hyphens and
/// underscores with `_`.
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Split `name` into stem and extension at the last dot.
///
/// A leading dot (`.env`) or trailing dot does not start an extension.
fn split_filename(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Check that a client-supplied key belongs to `slot`.
///
/// # Errors
///
/// Returns `UploadError::Validation` for empty keys, keys containing `..`,
/// or keys outside the slot's prefix.
pub fn validate_key(key: &str, slot: &SlotConfig) -> Result<(), UploadError> {
    if key.is_empty() {
        return Err(UploadError::validation("key is required"));
    }
    if key.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(UploadError::validation("key must not contain '..' segments"));
    }
    if let Some(prefix) = &slot.path_prefix {
        let inside = key
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| !rest.is_empty());
        if !inside {
            return Err(UploadError::validation(format!(
                "key '{key}' is outside field '{}'",
                slot.name
            )));
        }
    }
    Ok(())
}

/// Check an upload ID is present.
///
/// # Errors
///
/// Returns `UploadError::Validation` when empty.
pub fn validate_upload_id(upload_id: &str) -> Result<(), UploadError> {
    if upload_id.trim().is_empty() {
        return Err(UploadError::validation("uploadId is required"));
    }
    Ok(())
}

/// Check a part number is within `1..=MAX_PART_NUMBER`.
///
/// # Errors
///
/// Returns `UploadError::Validation` when out of range.
pub fn validate_part_number(part_number: u32) -> Result<u32, UploadError> {
    if (1..=MAX_PART_NUMBER).contains(&part_number) {
        Ok(part_number)
    } else {
        Err(UploadError::validation(format!(
            "part number {part_number} must be between 1 and {MAX_PART_NUMBER}"
        )))
    }
}

/// Parse a comma-separated part number list such as `"1,2,3"`.
///
/// Whitespace is ignored and duplicates collapse.
///
/// # Errors
///
/// Returns `UploadError::Validation` for an empty list, a non-numeric entry,
/// or an out-of-range number.
pub fn parse_part_numbers(raw: &str) -> Result<BTreeSet<u32>, UploadError> {
    let mut numbers = BTreeSet::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let number = entry
            .parse::<u32>()
            .map_err(|_| UploadError::validation(format!("invalid part number '{entry}'")))?;
        numbers.insert(validate_part_number(number)?);
    }
    if numbers.is_empty() {
        return Err(UploadError::validation("partNumbers is required"));
    }
    Ok(numbers)
}

/// Validate parts for completion and sort them ascending.
///
/// # Errors
///
/// Returns `UploadError::Validation` for an empty list, an out-of-range or
/// duplicate part number, or an empty `ETag`.
pub fn sort_completed_parts(mut parts: Vec<CompletedPart>) -> Result<Vec<CompletedPart>, UploadError> {
    if parts.is_empty() {
        return Err(UploadError::validation("at least one part is required"));
    }
    for part in &parts {
        validate_part_number(part.part_number)?;
        if part.e_tag.trim().is_empty() {
            return Err(UploadError::validation(format!(
                "part {} has an empty ETag",
                part.part_number
            )));
        }
    }

    parts.sort_by_key(|p| p.part_number);
    if let Some(pair) = parts.windows(2).find(|w| w[0].part_number == w[1].part_number) {
        return Err(UploadError::validation(format!(
            "part {} submitted more than once",
            pair[0].part_number
        )));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn slot(prefix: &str, preserve: bool) -> SlotConfig {
        let slot = SlotConfig::new("scan").with_prefix(prefix);
        if preserve { slot.preserving_filename() } else { slot }
    }

    #[test]
    fn test_preserved_name_joined_with_prefix() {
        assert_eq!(generate_object_key("report.pdf", &slot("docs", true)), "docs/report.pdf");
        assert_eq!(
            generate_object_key("C:\\Users\\me\\report.final.pdf", &slot("docs", true)),
            "docs/report.final.pdf"
        );
        assert_eq!(generate_object_key("README", &slot("", true)), "README");
    }

    #[rstest]
    #[case("a b#1?.png", "photos/a_b_1_.png")]
    #[case("100%.pdf", "photos/100_.pdf")]
    #[case("日本.p&g", "photos/__.p_g")]
    #[case("résumé-v2.docx", "photos/r_sum_-v2.docx")]
    fn test_preserved_name_is_sanitized(#[case] input: &str, #[case] expected: &str) {
        let key = generate_object_key(input, &slot("photos", true));
        assert_eq!(key, expected);
        assert!(validate_key(&key, &slot("photos", true)).is_ok());
    }

    #[rstest]
    #[case("..")]
    #[case(".")]
    #[case("")]
    fn test_dot_only_name_falls_back_to_opaque(#[case] input: &str) {
        let key = generate_object_key(input, &slot("photos", true));
        let name = key.strip_prefix("photos/").unwrap();
        assert_eq!(name.len(), 32);
        assert!(validate_key(&key, &slot("photos", true)).is_ok());
    }

    #[test]
    fn test_opaque_name_keeps_extension() {
        let key = generate_object_key("report.pdf", &slot("docs", false));
        let name = key.strip_prefix("docs/").unwrap();
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "pdf");
        assert_eq!(stem.len(), 32);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));

        let other = generate_object_key("report.pdf", &slot("docs", false));
        assert_ne!(key, other);
    }

    #[rstest]
    #[case("archive.tar.gz", ("archive.tar", Some("gz")))]
    #[case(".env", (".env", None))]
    #[case("trailing.", ("trailing.", None))]
    #[case("plain", ("plain", None))]
    fn test_split_filename(#[case] input: &str, #[case] expected: (&str, Option<&str>)) {
        assert_eq!(split_filename(input), expected);
    }

    #[rstest]
    #[case("docs/a.pdf", true)]
    #[case("docs/nested/a.pdf", true)]
    #[case("docs/", false)]
    #[case("docsx/a.pdf", false)]
    #[case("other/a.pdf", false)]
    #[case("docs/../other/a.pdf", false)]
    #[case("", false)]
    fn test_validate_key_against_prefix(#[case] key: &str, #[case] ok: bool) {
        assert_eq!(validate_key(key, &slot("docs", false)).is_ok(), ok);
    }

    #[test]
    fn test_unprefixed_slot_accepts_any_safe_key() {
        let slot = slot("", false);
        assert!(validate_key("a.pdf", &slot).is_ok());
        assert!(validate_key("../a.pdf", &slot).is_err());
    }

    #[test]
    fn test_parse_part_numbers() {
        let parsed = parse_part_numbers(" 3, 1,2,3 ,").unwrap();
        assert_eq!(parsed.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert!(parse_part_numbers("").is_err());
        assert!(parse_part_numbers("1,x").is_err());
        assert!(parse_part_numbers("0").is_err());
        assert!(parse_part_numbers("10001").is_err());
    }

    #[test]
    fn test_sort_completed_parts() {
        let sorted = sort_completed_parts(vec![
            CompletedPart::new(2, "etagB"),
            CompletedPart::new(1, "etagA"),
        ])
        .unwrap();
        assert_eq!(sorted, vec![CompletedPart::new(1, "etagA"), CompletedPart::new(2, "etagB")]);

        assert!(sort_completed_parts(vec![]).is_err());
        assert!(sort_completed_parts(vec![CompletedPart::new(0, "e")]).is_err());
        assert!(sort_completed_parts(vec![CompletedPart::new(1, " ")]).is_err());
        assert!(
            sort_completed_parts(vec![CompletedPart::new(1, "a"), CompletedPart::new(1, "b")])
                .is_err()
        );
    }
}
