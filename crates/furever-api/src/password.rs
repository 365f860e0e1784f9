use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// Salted Argon2id digest in PHC string form.
pub fn hash(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(digest)
}

/// A digest that does not parse never verifies.
pub fn verify(plain: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_hashed_password() {
        let digest = hash("correct horse").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify("correct horse", &digest));
        assert!(!verify("wrong horse", &digest));
    }

    #[test]
    fn salts_every_digest() {
        assert_ne!(hash("same").unwrap(), hash("same").unwrap());
    }

    #[test]
    fn garbage_digest_does_not_verify() {
        assert!(!verify("anything", "plaintext-left-in-db"));
    }
}
