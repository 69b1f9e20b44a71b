//! # Sequential Id Derivation
//!
//! Human-readable sequential identifiers for clients (`CLI001`) and sales
//! (`VND001`).
//!
//! ## How The Next Id Is Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  existing ids: ["VND001", "VND003", "vnd2", "draft-VND007"]            │
//! │       │                                                                 │
//! │       ▼  uppercase, find prefix anywhere, take trailing digits          │
//! │  suffixes: [1, 3, 2, 7]                                                │
//! │       │                                                                 │
//! │       ▼  max + 1                                                        │
//! │  next suffix: 8                                                         │
//! │       │                                                                 │
//! │       ▼  zero-pad to 3 digits                                           │
//! │  "VND008"                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is a pure function of the current id snapshot, **not** a persisted
//! counter: two callers deriving from the same snapshot compute the same
//! "next" id. The create-only guards in the entity repositories turn that
//! collision into a clean duplicate-key failure (the caller retries); it can
//! never silently corrupt data.

/// Prefix for client ids.
pub const CLIENT_ID_PREFIX: &str = "CLI";

/// Prefix for sale ids.
pub const SALE_ID_PREFIX: &str = "VND";

/// Width of the zero-padded numeric suffix. Ids past 999 simply grow wider.
const SUFFIX_WIDTH: usize = 3;

// =============================================================================
// Derivation
// =============================================================================

/// Derives the next id for `prefix` from the snapshot of existing ids.
///
/// Ids that do not contain `prefix` followed by digits are ignored; an
/// empty or all-foreign snapshot yields suffix 1 (`"CLI001"` / `"VND001"`).
pub fn next_id<I, S>(prefix: &str, existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max_suffix = existing
        .into_iter()
        .filter_map(|id| extract_suffix(prefix, id.as_ref()))
        .max()
        .unwrap_or(0);

    format!("{prefix}{:0width$}", max_suffix + 1, width = SUFFIX_WIDTH)
}

/// Derives the next client id (`CLI###`).
pub fn next_client_id<I, S>(existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    next_id(CLIENT_ID_PREFIX, existing)
}

/// Derives the next sale id (`VND###`).
pub fn next_sale_id<I, S>(existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    next_id(SALE_ID_PREFIX, existing)
}

/// Extracts the numeric suffix following `prefix` anywhere in `id`,
/// case-insensitively. `None` when the id does not match the pattern.
fn extract_suffix(prefix: &str, id: &str) -> Option<u64> {
    let upper = id.trim().to_uppercase();
    let start = upper.find(prefix)? + prefix.len();

    let digits: String = upper[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }

    digits.parse().ok()
}

// =============================================================================
// Format Checks
// =============================================================================

/// Whether `id` is exactly `prefix` + digits (any casing).
fn is_valid_id(prefix: &str, id: &str) -> bool {
    let upper = id.trim().to_uppercase();
    match upper.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Whether `id` is a well-formed client id (`CLI` + digits).
pub fn is_valid_client_id(id: &str) -> bool {
    is_valid_id(CLIENT_ID_PREFIX, id)
}

/// Whether `id` is a well-formed sale id (`VND` + digits).
pub fn is_valid_sale_id(id: &str) -> bool {
    is_valid_id(SALE_ID_PREFIX, id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_id_from_empty_snapshot() {
        assert_eq!(next_sale_id(Vec::<String>::new()), "VND001");
        assert_eq!(next_client_id(Vec::<String>::new()), "CLI001");
    }

    #[test]
    fn test_next_id_skips_gaps() {
        assert_eq!(next_sale_id(["VND001", "VND003"]), "VND004");
    }

    #[test]
    fn test_next_id_ignores_foreign_ids() {
        assert_eq!(next_sale_id(["CLI001", "x", ""]), "VND001");
        assert_eq!(next_client_id(["VND009", "CLI002"]), "CLI003");
    }

    #[test]
    fn test_next_id_case_insensitive() {
        assert_eq!(next_sale_id(["vnd005"]), "VND006");
    }

    #[test]
    fn test_next_id_grows_past_padding() {
        assert_eq!(next_sale_id(["VND999"]), "VND1000");
    }

    #[test]
    fn test_repeated_calls_same_snapshot_same_id() {
        let snapshot = vec!["VND001".to_string(), "VND002".to_string()];
        assert_eq!(next_sale_id(&snapshot), next_sale_id(&snapshot));
    }

    #[test]
    fn test_id_format_checks() {
        assert!(is_valid_sale_id("VND001"));
        assert!(is_valid_sale_id("vnd42"));
        assert!(!is_valid_sale_id("VND"));
        assert!(!is_valid_sale_id("VND01X"));
        assert!(!is_valid_sale_id("CLI001"));
        assert!(is_valid_client_id("CLI001"));
    }
}
