// Identifier generation.
//
// Record ids are nanoid strings. Ids that arrive from clients are only
// checked for shape; existence is the store's job.

/// Characters allowed in a record id.
const ID_ALPHABET_EXTRA: [char; 2] = ['_', '-'];

/// Generate a unique record id (21 characters).
pub fn generate_id() -> String {
    nanoid::nanoid!()
}

/// Generate an id with a custom length.
pub fn generate_id_with_length(len: usize) -> String {
    nanoid::nanoid!(len)
}

/// Whether `id` looks like a record id: 1..=64 chars of `[A-Za-z0-9_-]`.
///
/// Covers both nanoid ids and 24-char hex MongoDB object ids.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || ID_ALPHABET_EXTRA.contains(&c))
}
