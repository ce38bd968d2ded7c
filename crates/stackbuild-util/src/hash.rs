/// Derive a short, filename-safe token from a set of seed parts.
///
/// Parts are length-prefixed before hashing so `["ab", "c"]` and
/// `["a", "bc"]` never collide. The token is `len` lowercase hex chars
/// (capped at the digest length).
#[must_use]
pub fn short_token(parts: &[&[u8]], len: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let hex = hasher.finalize().to_hex();
    hex[..len.min(hex.len())].to_string()
}
