//! SCRAM-SHA-256 authentication implementation
//!
//! Implements the SCRAM-SHA-256 (Salted Challenge Response Authentication
//! Mechanism) exchange defined in RFC 5802 / RFC 7677 as PostgreSQL uses it
//! (Postgres 10+), without channel binding (`gs2-header` is always `n,,`).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Client nonce length in characters
const NONCE_LEN: usize = 18;

/// SCRAM authentication error types
#[derive(Debug, Clone)]
pub enum ScramError {
    /// Invalid proof from server
    InvalidServerProof(String),
    /// Invalid server message format
    InvalidServerMessage(String),
    /// UTF-8 encoding/decoding error
    Utf8Error(String),
    /// Base64 decoding error
    Base64Error(String),
}

impl fmt::Display for ScramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScramError::InvalidServerProof(msg) => write!(f, "invalid server proof: {}", msg),
            ScramError::InvalidServerMessage(msg) => write!(f, "invalid server message: {}", msg),
            ScramError::Utf8Error(msg) => write!(f, "UTF-8 error: {}", msg),
            ScramError::Base64Error(msg) => write!(f, "Base64 error: {}", msg),
        }
    }
}

impl std::error::Error for ScramError {}

/// Internal state needed for server-signature verification
#[derive(Clone, Debug)]
pub struct ScramState {
    /// Combined authentication message
    auth_message: Vec<u8>,
    /// Server key derived from the salted password
    server_key: Vec<u8>,
}

/// SCRAM-SHA-256 client implementation
pub struct ScramClient {
    username: String,
    password: String,
    nonce: String,
}

impl ScramClient {
    /// Create a new SCRAM client with a fresh random nonce.
    ///
    /// The nonce is 18 lowercase letters drawn from a cryptographic RNG
    /// (`rand::thread_rng` is a CSPRNG).
    pub fn new(username: String, password: String) -> Self {
        let mut rng = rand::thread_rng();
        let nonce: String = (0..NONCE_LEN)
            .map(|_| rng.gen_range(b'a'..=b'z') as char)
            .collect();

        Self {
            username,
            password,
            nonce,
        }
    }

    #[cfg(test)]
    fn with_nonce(username: String, password: String, nonce: String) -> Self {
        Self {
            username,
            password,
            nonce,
        }
    }

    /// The client nonce chosen at construction
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Generate the client first message, `n,,n=<user>,r=<nonce>`
    pub fn client_first(&self) -> String {
        format!("n,,{}", self.client_first_bare())
    }

    fn client_first_bare(&self) -> String {
        format!("n={},r={}", self.username, self.nonce)
    }

    /// Process the server first message and generate the client final message
    ///
    /// Returns (client_final_message, internal_state)
    pub fn client_final(&mut self, server_first: &str) -> Result<(String, ScramState), ScramError> {
        // Parse server first message: r=<client_nonce><server_nonce>,s=<salt>,i=<iterations>
        let (server_nonce, salt, iterations) = parse_server_first(server_first)?;

        // Verify server nonce starts with our client nonce
        if !server_nonce.starts_with(&self.nonce) {
            return Err(ScramError::InvalidServerMessage(
                "server nonce doesn't contain client nonce".to_string(),
            ));
        }

        // Decode salt and iterations
        let salt_bytes = BASE64
            .decode(&salt)
            .map_err(|_| ScramError::Base64Error("invalid salt encoding".to_string()))?;
        let iterations = iterations
            .parse::<u32>()
            .map_err(|_| ScramError::InvalidServerMessage("invalid iteration count".to_string()))?;

        // No channel binding: c = base64("n,,")
        let channel_binding = BASE64.encode(b"n,,");

        // Build client final without proof
        let client_final_without_proof = format!("c={},r={}", channel_binding, server_nonce);

        // Build auth message for signature calculation
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            client_final_without_proof
        );

        // Calculate proof
        let proof = calculate_client_proof(
            &self.password,
            &salt_bytes,
            iterations,
            auth_message.as_bytes(),
        )?;

        // Calculate server key for later verification of the server signature
        let server_key = calculate_server_key(&self.password, &salt_bytes, iterations)?;

        // Build client final message
        let client_final = format!("{},p={}", client_final_without_proof, BASE64.encode(&proof));

        let state = ScramState {
            auth_message: auth_message.into_bytes(),
            server_key,
        };

        Ok((client_final, state))
    }

    /// Verify the server final message and confirm authentication
    pub fn verify_server_final(
        &self,
        server_final: &str,
        state: &ScramState,
    ) -> Result<(), ScramError> {
        // Parse server final: v=<server_signature>
        let server_sig_encoded = server_final
            .strip_prefix("v=")
            .ok_or_else(|| ScramError::InvalidServerMessage("missing 'v=' prefix".to_string()))?;

        let server_signature = BASE64.decode(server_sig_encoded).map_err(|_| {
            ScramError::Base64Error("invalid server signature encoding".to_string())
        })?;

        // Calculate expected server signature
        let expected_signature = calculate_server_signature(&state.server_key, &state.auth_message);

        // Constant-time comparison
        if constant_time_compare(&server_signature, &expected_signature) {
            Ok(())
        } else {
            Err(ScramError::InvalidServerProof(
                "server signature verification failed".to_string(),
            ))
        }
    }
}

/// Parse server first message format: r=<nonce>,s=<salt>,i=<iterations>
fn parse_server_first(msg: &str) -> Result<(String, String, String), ScramError> {
    let mut nonce = String::new();
    let mut salt = String::new();
    let mut iterations = String::new();

    for part in msg.split(',') {
        if let Some(value) = part.strip_prefix("r=") {
            nonce = value.to_string();
        } else if let Some(value) = part.strip_prefix("s=") {
            salt = value.to_string();
        } else if let Some(value) = part.strip_prefix("i=") {
            iterations = value.to_string();
        }
    }

    if nonce.is_empty() || salt.is_empty() || iterations.is_empty() {
        return Err(ScramError::InvalidServerMessage(
            "missing required fields in server first message".to_string(),
        ));
    }

    Ok((nonce, salt, iterations))
}

/// Derive the 32-byte salted password.
///
/// PBKDF2-HMAC-SHA-256 with a single output block: the HMAC is keyed with
/// the password and iterated over salt ‖ INT(1).
fn salted_password(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut salted = vec![0u8; 32]; // SHA256 produces 32 bytes
    let _ = pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut salted);
    salted
}

/// Calculate SCRAM client proof
fn calculate_client_proof(
    password: &str,
    salt: &[u8],
    iterations: u32,
    auth_message: &[u8],
) -> Result<Vec<u8>, ScramError> {
    let salted = salted_password(password, salt, iterations);

    // ClientKey := HMAC(SaltedPassword, "Client Key")
    let mut client_key_hmac = HmacSha256::new_from_slice(&salted)
        .map_err(|_| ScramError::Utf8Error("HMAC key error".to_string()))?;
    client_key_hmac.update(b"Client Key");
    let client_key = client_key_hmac.finalize().into_bytes();

    // StoredKey := SHA256(ClientKey)
    let stored_key = Sha256::digest(client_key.as_slice());

    // ClientSignature := HMAC(StoredKey, AuthMessage)
    let mut client_sig_hmac = HmacSha256::new_from_slice(&stored_key)
        .map_err(|_| ScramError::Utf8Error("HMAC key error".to_string()))?;
    client_sig_hmac.update(auth_message);
    let client_signature = client_sig_hmac.finalize().into_bytes();

    // ClientProof := ClientKey XOR ClientSignature
    let mut proof = client_key.to_vec();
    for (proof_byte, sig_byte) in proof.iter_mut().zip(client_signature.iter()) {
        *proof_byte ^= sig_byte;
    }

    Ok(proof)
}

/// Calculate server key for server signature verification
fn calculate_server_key(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<Vec<u8>, ScramError> {
    let salted = salted_password(password, salt, iterations);

    // ServerKey := HMAC(SaltedPassword, "Server Key")
    let mut server_key_hmac = HmacSha256::new_from_slice(&salted)
        .map_err(|_| ScramError::Utf8Error("HMAC key error".to_string()))?;
    server_key_hmac.update(b"Server Key");

    Ok(server_key_hmac.finalize().into_bytes().to_vec())
}

/// Calculate server signature for verification
fn calculate_server_signature(server_key: &[u8], auth_message: &[u8]) -> Vec<u8> {
    let mut hmac = HmacSha256::new_from_slice(server_key).expect("HMAC key should be valid");
    hmac.update(auth_message);
    hmac.finalize().into_bytes().to_vec()
}

/// Constant-time comparison to prevent timing attacks
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_charset_and_length() {
        let client = ScramClient::new("user".to_string(), "password".to_string());
        assert_eq!(client.nonce().len(), 18);
        assert!(client.nonce().bytes().all(|b| b.is_ascii_lowercase()));
    }

    #[test]
    fn test_nonces_differ() {
        let a = ScramClient::new("u".to_string(), "p".to_string());
        let b = ScramClient::new("u".to_string(), "p".to_string());
        assert_ne!(a.nonce(), b.nonce());
    }

    #[test]
    fn test_client_first_message_format() {
        let client = ScramClient::new("alice".to_string(), "secret".to_string());
        let first = client.client_first();

        assert!(first.starts_with("n,,n=alice,r="));
        assert_eq!(first.len(), "n,,n=alice,r=".len() + 18);
    }

    // RFC 7677 section 3 test vector: user "user", password "pencil"
    #[test]
    fn test_rfc7677_exchange() {
        let mut client = ScramClient::with_nonce(
            "user".to_string(),
            "pencil".to_string(),
            "rOprNGfwEbeRWgbNEkqO".to_string(),
        );
        assert_eq!(client.client_first(), "n,,n=user,r=rOprNGfwEbeRWgbNEkqO");

        let server_first =
            "r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096";
        let (client_final, state) = client.client_final(server_first).unwrap();

        assert_eq!(
            client_final,
            "c=biws,r=rOprNGfwEbeRWgbNEkqO%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0,\
             p=dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ="
        );

        let server_final = "v=6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4=";
        assert!(client.verify_server_final(server_final, &state).is_ok());
    }

    #[test]
    fn test_parse_server_first_valid() {
        let server_first = "r=client_nonce_server_nonce,s=aW1hZ2luYXJ5c2FsdA==,i=4096";
        let (nonce, salt, iterations) = parse_server_first(server_first).unwrap();

        assert_eq!(nonce, "client_nonce_server_nonce");
        assert_eq!(salt, "aW1hZ2luYXJ5c2FsdA==");
        assert_eq!(iterations, "4096");
    }

    #[test]
    fn test_parse_server_first_missing_fields() {
        assert!(parse_server_first("r=nonce,s=salt").is_err());
        assert!(parse_server_first("s=c2FsdA==,i=4096").is_err());
        assert!(parse_server_first("r=nonce,i=4096").is_err());
        assert!(parse_server_first("").is_err());
        assert!(parse_server_first("r=,s=,i=").is_err());
    }

    #[test]
    fn test_parse_server_first_extra_fields_ignored() {
        let result = parse_server_first("r=nonce123,x=junk,s=c2FsdA==,i=4096");
        let (nonce, salt, iterations) = result.unwrap();
        assert_eq!(nonce, "nonce123");
        assert_eq!(salt, "c2FsdA==");
        assert_eq!(iterations, "4096");
    }

    #[test]
    fn test_client_final_nonce_prefix_mismatch() {
        let mut client = ScramClient::new("user".to_string(), "pass".to_string());
        let _first = client.client_first();

        let server_first = format!(
            "r=TAMPERED_NONCE_server_ext,s={},i=4096",
            BASE64.encode(b"salty")
        );
        let result = client.client_final(&server_first);
        assert!(matches!(result, Err(ScramError::InvalidServerMessage(_))));
    }

    #[test]
    fn test_client_final_invalid_base64_salt() {
        let mut client = ScramClient::new("user".to_string(), "pass".to_string());
        let _first = client.client_first();

        let server_first = format!("r={}server_ext,s=!!!not-base64!!!,i=4096", client.nonce);
        let result = client.client_final(&server_first);
        assert!(matches!(result, Err(ScramError::Base64Error(_))));
    }

    #[test]
    fn test_client_final_non_numeric_iterations() {
        let mut client = ScramClient::new("user".to_string(), "pass".to_string());
        let _first = client.client_first();

        let server_first = format!(
            "r={}server_ext,s={},i=abc",
            client.nonce,
            BASE64.encode(b"salty")
        );
        let result = client.client_final(&server_first);
        assert!(matches!(result, Err(ScramError::InvalidServerMessage(_))));
    }

    #[test]
    fn test_verify_server_final_missing_v_prefix() {
        let client = ScramClient::new("user".to_string(), "pass".to_string());
        let state = ScramState {
            auth_message: b"dummy".to_vec(),
            server_key: vec![0; 32],
        };
        let result = client.verify_server_final("not_a_valid_response", &state);
        assert!(matches!(result, Err(ScramError::InvalidServerMessage(_))));
    }

    #[test]
    fn test_verify_server_final_wrong_signature() {
        let client = ScramClient::new("user".to_string(), "pass".to_string());
        let state = ScramState {
            auth_message: b"auth_msg".to_vec(),
            server_key: vec![0x42; 32],
        };
        // Valid base64, but wrong signature bytes
        let wrong_sig = BASE64.encode(vec![0xFF; 32]);
        let result = client.verify_server_final(&format!("v={}", wrong_sig), &state);
        assert!(matches!(result, Err(ScramError::InvalidServerProof(_))));
    }

    #[test]
    fn test_verify_server_final_correct_signature() {
        let mut client = ScramClient::new("user".to_string(), "password".to_string());
        let _first = client.client_first();

        let server_nonce = format!("{}server_ext", client.nonce);
        let server_first = format!("r={},s={},i=4096", server_nonce, BASE64.encode(b"salty"));

        let (_client_final, state) = client.client_final(&server_first).unwrap();

        // Compute the real server signature from the state
        let expected = calculate_server_signature(&state.server_key, &state.auth_message);
        let server_final = format!("v={}", BASE64.encode(&expected));

        let result = client.verify_server_final(&server_final, &state);
        assert!(result.is_ok());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"test_value", b"test_value"));
        assert!(!constant_time_compare(b"test_value", b"test_wrong"));
        assert!(!constant_time_compare(b"test", b"test_longer"));
        assert!(constant_time_compare(&[], &[]));

        let a = vec![0b1010_1010; 32];
        let mut b = a.clone();
        b[15] ^= 0b0000_0001; // flip one bit
        assert!(!constant_time_compare(&a, &b));
    }

    #[test]
    fn test_client_final_empty_password() {
        let mut client = ScramClient::new("user".to_string(), String::new());
        let _first = client.client_first();

        let server_nonce = format!("{}server_ext", client.nonce);
        let server_first = format!("r={},s={},i=4096", server_nonce, BASE64.encode(b"salty"));

        let result = client.client_final(&server_first);
        assert!(result.is_ok());
    }

    #[test]
    fn test_client_final_unicode_credentials() {
        let mut client = ScramClient::new("héllo".to_string(), "pässwörd™".to_string());
        let _first = client.client_first();

        let server_nonce = format!("{}server_ext", client.nonce);
        let server_first = format!("r={},s={},i=4096", server_nonce, BASE64.encode(b"salty"));

        let result = client.client_final(&server_first);
        assert!(result.is_ok());
    }
}
