use xxhash_rust::xxh3::xxh3_64;

/// Fast, non-cryptographic content fingerprint used for job identity.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:016x}", xxh3_64(data))
}
