use std::collections::BTreeMap;

const UID_KEY_CONTEXT: &str = "indicator-registry 2024-05-02 document labels to uid";

/// Number of hash bytes kept in the identifier.
const UID_HASH_LEN: usize = 20;

/// Computes the identifier of a document from its product name and labels.
///
/// Labels are hashed in key order, each pair written as
/// `key US value RS` (ASCII unit and record separators) so that
/// `{"a":"bc"}` and `{"ab":"c"}` never collide. The identifier is the
/// product name followed by the hex encoded hash, which keeps it stable
/// across registrations and readable in logs.
pub fn document_uid(product_name: &str, labels: &BTreeMap<String, String>) -> String {
    let key = blake3::derive_key(UID_KEY_CONTEXT, product_name.as_bytes());
    let mut hasher = blake3::Hasher::new_keyed(&key);

    // BTreeMap iterates sorted by key
    for (key, value) in labels {
        hasher.update(key.as_bytes());
        hasher.update(&[0x1F]);
        hasher.update(value.as_bytes());
        hasher.update(&[0x1E]);
    }

    let mut output = [0; UID_HASH_LEN];
    hasher.finalize_xof().fill(&mut output);

    format!("{}-{}", product_name, hex::encode(output))
}
