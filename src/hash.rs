use sha2::{Digest, Sha256};

/// Hex SHA-256 of `data`; photo files are stored under a prefix of it.
pub fn content_digest(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

pub const PHOTO_NAME_LEN: usize = 16;

pub fn photo_stem(data: &[u8]) -> String {
    let mut digest = content_digest(data);
    digest.truncate(PHOTO_NAME_LEN);
    digest
}
