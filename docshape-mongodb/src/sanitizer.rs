//! BSON key sanitization for MongoDB compatibility.
//!
//! MongoDB restricts field names (document keys) from containing certain
//! characters that are used in its query syntax:
//!
//! - Dots (`.`) - used for nested field access in queries
//! - Dollar signs (`$`) - used for operators in queries
//! - Null bytes (`\0`) - field name terminators
//!
//! These functions replace problematic characters in keys with escaped
//! versions before storage and revert them on the way out. Values are left
//! untouched; only keys carry the restriction.

use bson::Bson;

/// Character replacements for sanitization
const REPLACEMENTS: [(&str, &str); 3] = [
    (".", "__dot__"),
    ("$", "__dollar__"),
    ("\0", "__null__"),
];

/// Sanitizes a key by replacing problematic characters with safe escapes.
pub(crate) fn sanitize_key(input: &str) -> String {
    let mut sanitized = input.to_string();
    for (target, replacement) in REPLACEMENTS.iter() {
        sanitized = sanitized.replace(*target, *replacement);
    }
    sanitized
}

/// Restores a key by reverting sanitization escapes.
pub(crate) fn restore_key(input: &str) -> String {
    let mut restored = input.to_string();
    for (target, replacement) in REPLACEMENTS.iter().rev() {
        restored = restored.replace(*replacement, *target);
    }
    restored
}

/// Recursively sanitizes the document keys inside a BSON value.
///
/// Arrays and documents are walked; every other value is returned as-is.
pub(crate) fn sanitize_value(value: &Bson) -> Bson {
    match value {
        Bson::Array(arr) => Bson::Array(
            arr.iter()
                .map(sanitize_value)
                .collect(),
        ),
        Bson::Document(doc) => Bson::Document(
            doc.iter()
                .map(|(k, v)| (sanitize_key(k), sanitize_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Recursively restores the document keys inside a BSON value.
///
/// This is the inverse of [`sanitize_value`] and should be called on values
/// retrieved from MongoDB to restore the original field names.
pub(crate) fn restore_value(value: &Bson) -> Bson {
    match value {
        Bson::Array(arr) => Bson::Array(
            arr.iter()
                .map(restore_value)
                .collect(),
        ),
        Bson::Document(doc) => Bson::Document(
            doc.iter()
                .map(|(k, v)| (restore_key(k), restore_value(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn keys_roundtrip_through_sanitization() {
        assert_eq!(restore_key(&sanitize_key("price.usd")), "price.usd");
        assert_eq!(restore_key(&sanitize_key("$meta")), "$meta");
        assert_eq!(sanitize_key("plain"), "plain");
    }

    #[test]
    fn values_are_left_untouched() {
        let original = Bson::Document(doc! {
            "price.usd": 10,
            "note": "costs $10 per 1.5kg",
            "nested": { "a$b": [ { "c.d": 1 } ] },
        });

        let sanitized = sanitize_value(&original);
        let doc = sanitized.as_document().unwrap();

        assert!(doc.get("price__dot__usd").is_some());
        assert_eq!(
            doc.get("note"),
            Some(&Bson::String("costs $10 per 1.5kg".to_string()))
        );
        assert_eq!(restore_value(&sanitized), original);
    }
}
