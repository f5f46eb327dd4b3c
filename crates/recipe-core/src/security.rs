use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher as _, PasswordVerifier,
};
use rand::{distr::Alphanumeric, Rng, RngCore};

use crate::error::{RecipeError, Result};

/// Prefix marking a password hash that can never be verified.
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';
const UNUSABLE_SUFFIX_LEN: usize = 40;
const TOKEN_BYTES: usize = 20;

/// Lowercases the domain part of an address, leaving the local part alone.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn unusable_password() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

pub fn is_password_usable(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}

/// Generates an opaque 40 character hex key for token authentication.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| RecipeError::PasswordHash(e.to_string()))?;

        Ok(password_hash.to_string())
    }

    /// Hashes `password` when present, otherwise returns an unusable marker.
    pub fn hash_optional(&self, password: Option<&str>) -> Result<String> {
        match password {
            Some(p) => self.hash(p),
            None => Ok(unusable_password()),
        }
    }

    pub fn verify(&self, password: &str, hash: &str) -> bool {
        if !is_password_usable(hash) {
            return false;
        }
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}
