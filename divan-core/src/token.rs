//! Unique token generation for document ids and revisions.

use uuid::Uuid;

/// Returns a fresh random token suitable as a document `id` or `rev`.
///
/// Tokens are version 4 UUIDs rendered in lowercase hyphenated form, so two calls never
/// collide in practice and no ordering can be inferred from them.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}
