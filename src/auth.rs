//! Token-based session management and password authentication.
//!
//! Tokens are random 32-byte values handed to the client once; only their
//! SHA-256 hash is stored. Passwords are salted SHA-256, kept in a separate
//! table keyed by user id.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::{current_epoch, read};
use crate::error::{GiftlistError, Result};
use crate::ids::require_field;
use crate::tx::{transact, Tx};
use crate::users;

/// Outcome of a successful signup or login
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: u64,
}

/// Default session lifetime: 30 days
const SESSION_TTL_MS: u64 = 30 * 24 * 60 * 60 * 1000;

/// Generate a cryptographically secure token (32 bytes, base64url encoded)
fn generate_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| GiftlistError::Storage(format!("rng failure: {}", e)))?;
    Ok(base64url_encode(&bytes))
}

/// Hash token with SHA-256 for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Base64url encode without padding
fn base64url_encode(data: &[u8]) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut result = String::with_capacity((data.len() * 4 + 2) / 3);
    for chunk in data.chunks(3) {
        let n = match chunk.len() {
            3 => ((chunk[0] as u32) << 16) | ((chunk[1] as u32) << 8) | (chunk[2] as u32),
            2 => ((chunk[0] as u32) << 16) | ((chunk[1] as u32) << 8),
            1 => (chunk[0] as u32) << 16,
            _ => unreachable!(),
        };
        result.push(ALPHABET[((n >> 18) & 0x3F) as usize] as char);
        result.push(ALPHABET[((n >> 12) & 0x3F) as usize] as char);
        if chunk.len() > 1 {
            result.push(ALPHABET[((n >> 6) & 0x3F) as usize] as char);
        }
        if chunk.len() > 2 {
            result.push(ALPHABET[(n & 0x3F) as usize] as char);
        }
    }
    result
}

/// Hex encode
mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Create a session for a user, returns the token
pub fn create_session(user_id: Uuid) -> Result<AuthSession> {
    let token = generate_token()?;
    let hash = hash_token(&token);
    let now = current_epoch();
    let expires = now + SESSION_TTL_MS;

    transact(|tx| {
        let value = format!("{}|{}|{}", user_id, now, expires);
        tx.dbs().sessions.put(tx.tx(), &hash, &value)?;
        Ok(())
    })?;

    Ok(AuthSession {
        user_id,
        token,
        expires_at: expires,
    })
}

/// Validate a token, returns the user id if the session is live
pub fn validate_session(token: &str) -> Result<Uuid> {
    let hash = hash_token(token);
    read(|d, tx| {
        let value = d
            .sessions
            .get(tx, &hash)?
            .ok_or_else(|| GiftlistError::Unauthorized("invalid token".into()))?;
        let parts: Vec<&str> = value.split('|').collect();
        if parts.len() != 3 {
            return Err(GiftlistError::Storage("corrupted session".into()));
        }
        let expires: u64 = parts[2].parse().unwrap_or(0);
        if expires > 0 && expires < current_epoch() {
            return Err(GiftlistError::Unauthorized("token expired".into()));
        }
        Uuid::parse_str(parts[0])
            .map_err(|e| GiftlistError::Storage(format!("corrupted session: {}", e)))
    })
}

/// Revoke a session by token; false if it did not exist
pub fn revoke_session(token: &str) -> Result<bool> {
    let hash = hash_token(token);
    transact(|tx| {
        let r = tx.dbs().sessions.delete(tx.tx(), &hash)?;
        Ok(r)
    })
}

/// Drop every session of a user. Runs in the caller's transaction so account
/// deletion removes the record and its sessions atomically.
pub(crate) fn revoke_user_sessions(tx: &mut Tx, user_id: Uuid) -> Result<()> {
    let prefix = format!("{}|", user_id);
    let mut hashes = Vec::new();
    {
        let d = tx.dbs();
        for item in d.sessions.iter(tx.tx())? {
            let (hash, value) = item?;
            if value.starts_with(&prefix) {
                hashes.push(hash.to_string());
            }
        }
    }
    for hash in hashes {
        tx.dbs().sessions.delete(tx.tx(), &hash)?;
    }
    Ok(())
}

/// Generate random salt (16 bytes, hex encoded)
fn generate_salt() -> Result<String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| GiftlistError::Storage(format!("rng failure: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Hash password with salt
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Set (or replace) a user's password
pub fn set_password(user_id: Uuid, password: &str) -> Result<()> {
    require_field("password", password)?;
    let salt = generate_salt()?;
    let hash = hash_password(&salt, password);
    let value = format!("{}|{}", salt, hash);
    transact(|tx| {
        tx.dbs()
            .credentials
            .put(tx.tx(), &user_id.to_string(), &value)?;
        Ok(())
    })
}

/// Verify a user's password; false when none is set
pub fn verify_password(user_id: Uuid, password: &str) -> Result<bool> {
    read(|d, tx| {
        let value = match d.credentials.get(tx, &user_id.to_string())? {
            Some(v) => v.to_string(),
            None => return Ok(false),
        };
        let parts: Vec<&str> = value.split('|').collect();
        if parts.len() != 2 {
            return Err(GiftlistError::Storage("corrupted credentials".into()));
        }
        Ok(parts[1] == hash_password(parts[0], password))
    })
}

/// Create an account with a password and open a first session
pub fn signup(email: &str, display_name: &str, password: &str) -> Result<AuthSession> {
    require_field("password", password)?;
    let user_id = users::create_user(email, display_name)?;
    set_password(user_id, password)?;
    create_session(user_id)
}

/// Login with email and password, returns a fresh session.
///
/// Unknown email and wrong password produce the same error so the endpoint
/// does not leak which addresses have accounts.
pub fn login(email: &str, password: &str) -> Result<AuthSession> {
    let user_id = users::find_by_email(email)?
        .ok_or_else(|| GiftlistError::Unauthorized("invalid credentials".into()))?;
    if !verify_password(user_id, password)? {
        return Err(GiftlistError::Unauthorized("invalid credentials".into()));
    }
    create_session(user_id)
}
