use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::IdpError;

pub fn hash_password(password: &str) -> Result<String, IdpError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| IdpError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, IdpError> {
    verify(password, hash)
        .map_err(|e| IdpError::Internal(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hashed = hash_password("s3cret").unwrap();
        assert_ne!(hashed, "s3cret");
        assert!(verify_password("s3cret", &hashed).unwrap());
        assert!(!verify_password("other", &hashed).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }
}
