//! MD5 password authentication (pre-SCRAM servers)

/// Compute the MD5 password response.
///
/// The scheme is `"md5" || md5_hex(md5_hex(password || user) || salt)`,
/// where the inner digest is hex-encoded before the salt is appended.
pub fn md5_password(user: &str, password: &str, salt: &[u8; 4]) -> String {
    let inner = format!("{}{}", password, user);
    let inner_hash = md5::compute(inner.as_bytes());

    let inner_hex = format!("{:x}", inner_hash);
    let mut outer_input = inner_hex.into_bytes();
    outer_input.extend_from_slice(salt);

    let outer_hash = md5::compute(&outer_input);
    format!("md5{:x}", outer_hash)
}
