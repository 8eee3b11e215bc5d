//! CRC32C hashing utilities.
//!
//! CRC32C (Castagnoli) identifies structure types in container headers (the
//! hash of the structure's name) and fingerprints geometry payloads (content
//! hashes over vertex and index blocks).

/// Compute CRC32C hash of a byte slice.
///
/// Uses hardware acceleration when available (SSE4.2 on x86).
#[inline]
pub fn hash_bytes(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Continue a CRC32C computation over additional bytes.
///
/// Used to fingerprint a mesh's vertex block and index block as one hash.
#[inline]
pub fn hash_bytes_with_seed(data: &[u8], seed: u32) -> u32 {
    crc32c::crc32c_append(seed, data)
}

/// Compute CRC32C hash of a string (UTF-8 bytes).
#[inline]
pub fn hash_str(s: &str) -> u32 {
    hash_bytes(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // The standard CRC32C check value.
        assert_eq!(hash_bytes(b"123456789"), 0xE3069283);
    }

    #[test]
    fn test_empty_hash() {
        assert_eq!(hash_bytes(&[]), 0);
    }

    #[test]
    fn test_seeded_continuation() {
        let whole = hash_bytes(b"vertexindex");
        let split = hash_bytes_with_seed(b"index", hash_bytes(b"vertex"));
        assert_eq!(whole, split);
    }

    #[test]
    fn test_string_hash() {
        assert_eq!(hash_str("SceneNode"), hash_bytes(b"SceneNode"));
    }
}
