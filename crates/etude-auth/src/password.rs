//! Password hashing and verification using bcrypt

use thiserror::Error;

/// Default bcrypt cost factor (2^12 rounds)
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// Sentinel hashed at startup so the unknown-user path still pays for
/// a full verification. The comparison result is always discarded.
const DUMMY_PASSWORD: &str = "dummy-password-never-issued";

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Bcrypt password hasher with a configurable cost factor.
///
/// Construction computes a dummy hash at the same cost, used by
/// [`PasswordHasher::verify_dummy`] to keep the unknown-user login path
/// as expensive as the wrong-password path.
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost factor.
    ///
    /// Fails if the cost is outside the range bcrypt accepts (4..=31).
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash =
            bcrypt::hash(DUMMY_PASSWORD, cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(Self { cost, dummy_hash })
    }

    /// The configured cost factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a random salt.
    ///
    /// Returns a `$2b$...` hash string suitable for storage.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// The full-cost digest is recomputed on every call; the comparison
    /// itself is constant-time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        match bcrypt::verify(password, hash) {
            Ok(matches) => Ok(matches),
            Err(bcrypt::BcryptError::InvalidHash(h)) => Err(PasswordError::InvalidHashFormat(h)),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }

    /// Verify against the dummy hash and discard the result.
    ///
    /// Called when the login does not resolve to a user, so that both
    /// rejection paths cost one bcrypt verification.
    pub fn verify_dummy(&self, password: &str) {
        let _ = bcrypt::verify(password, &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum bcrypt cost keeps the test suite fast
    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_produces_valid_bcrypt_string() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash = hasher.hash("TestPassword123!").expect("Failed to hash password");

        assert!(hash.starts_with("$2"));
        assert!(hash.contains("$04$"), "cost factor should be encoded in the hash");
    }

    #[test]
    fn test_verify_correct_password() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash = hasher.hash("CorrectPassword123!").expect("Failed to hash password");

        assert!(hasher.verify("CorrectPassword123!", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_verify_incorrect_password() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash = hasher.hash("CorrectPassword123!").expect("Failed to hash password");

        assert!(!hasher.verify("WrongPassword123!", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_verify_invalid_hash() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");

        let result = hasher.verify("AnyPassword", "not_a_bcrypt_hash");
        assert!(result.is_err(), "Invalid hash should return error");
    }

    #[test]
    fn test_hash_different_salts() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash1 = hasher.hash("SamePassword123!").expect("Failed to hash password");
        let hash2 = hasher.hash("SamePassword123!").expect("Failed to hash password");

        assert_ne!(hash1, hash2, "Hashes should differ due to random salts");
        assert!(hasher.verify("SamePassword123!", &hash1).unwrap());
        assert!(hasher.verify("SamePassword123!", &hash2).unwrap());
    }

    #[test]
    fn test_cost_out_of_range_rejected() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
    }

    #[test]
    fn test_dummy_verification_runs() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");

        // Must not panic and must not leak the comparison result
        hasher.verify_dummy("any password at all");
        hasher.verify_dummy("");
    }

    #[test]
    fn test_dummy_hash_uses_configured_cost() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");

        assert!(hasher.dummy_hash.contains("$04$"));
    }

    #[test]
    fn test_verify_case_sensitive() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash = hasher.hash("TestPassword123!").expect("Failed to hash password");

        assert!(hasher.verify("TestPassword123!", &hash).unwrap());
        assert!(!hasher.verify("testpassword123!", &hash).unwrap());
        assert!(!hasher.verify("TESTPASSWORD123!", &hash).unwrap());
    }

    #[test]
    fn test_hash_unicode_password() {
        let hasher = PasswordHasher::new(TEST_COST).expect("Failed to create hasher");
        let hash = hasher.hash("Пароль123!日本語").expect("Failed to hash unicode password");

        assert!(hasher.verify("Пароль123!日本語", &hash).unwrap());
    }
}
