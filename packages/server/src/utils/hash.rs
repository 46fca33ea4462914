use argon2::Argon2;
use argon2::password_hash::{
    Error, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};

/// Hash a plain password with Argon2id and a random 16-byte salt.
pub fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a plain password against a stored PHC string.
///
/// A wrong password is `Ok(false)`; a malformed stored hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}
