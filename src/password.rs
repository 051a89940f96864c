use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::LazyLock;

/// Stand-in hash verified when no account matches, so an unknown email costs
/// the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no-account-matches-this-email").ok());

/// Raised when a new hash cannot be produced. Verification never errors: a
/// mismatch or an unreadable stored hash is simply `false`.
#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct PasswordError(String);

/// Argon2id with fixed cost parameters. Stored hashes embed their own
/// parameters in PHC format, so verification follows whatever the hash says.
fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// hash_password
///
/// Produces a salted PHC-format hash suitable for the `users.password_hash` column.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError(e.to_string()))
}

/// verify_password
///
/// Checks a submitted plaintext against a stored hash. Callers must map a
/// `false` to the generic invalid-credentials response.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash could not be parsed");
            return false;
        }
    };
    hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Verifies against `stored_hash`, or against [`DUMMY_HASH`] when there is no
/// stored hash. The dummy branch always reports a mismatch.
pub fn verify_password_or_dummy(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            false
        }
    }
}

// --- Off the async workers ---
// Argon2 blocks for tens of milliseconds; these run it on the blocking pool.

pub async fn hash_password_blocking(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError(format!("hashing task failed: {e}")))?
}

pub async fn verify_password_blocking(
    password: String,
    stored_hash: Option<String>,
) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password_or_dummy(&password, stored_hash.as_deref()))
        .await
        .map_err(|e| PasswordError(format!("verification task failed: {e}")))
}
