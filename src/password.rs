use actix_web::web;

use crate::error::ApiError;

/// bcrypt hashing, run on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub(crate) fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub(crate) async fn hash(&self, plain: String) -> Result<String, ApiError> {
        let cost = self.cost;
        web::block(move || bcrypt::hash(plain, cost))
            .await
            .map_err(|e| {
                log::error!("password hashing was cancelled: {e}");
                ApiError::Internal("Failed to hash password".to_string())
            })?
            .map_err(|e| {
                log::error!("password hashing failed: {e}");
                ApiError::Internal("Failed to hash password".to_string())
            })
    }

    /// Constant-time check of `plain` against a stored hash. A hash that
    /// cannot be parsed never matches.
    pub(crate) async fn verify(&self, plain: String, hash: String) -> bool {
        match web::block(move || bcrypt::verify(plain, &hash)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                log::warn!("stored password hash is unusable: {e}");
                false
            }
            Err(e) => {
                log::error!("password verification was cancelled: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TEST_BCRYPT_COST;

    #[actix_web::test]
    async fn hash_verifies_only_the_original() {
        let hasher = PasswordHasher::new(TEST_BCRYPT_COST);

        let hash = hasher.hash("secret".to_string()).await.unwrap();
        assert_ne!(hash, "secret");
        assert!(hasher.verify("secret".to_string(), hash.clone()).await);
        assert!(!hasher.verify("Secret".to_string(), hash).await);
    }

    #[actix_web::test]
    async fn hashes_are_salted() {
        let hasher = PasswordHasher::new(TEST_BCRYPT_COST);

        let first = hasher.hash("secret".to_string()).await.unwrap();
        let second = hasher.hash("secret".to_string()).await.unwrap();
        assert_ne!(first, second);
    }

    #[actix_web::test]
    async fn malformed_hash_never_matches() {
        let hasher = PasswordHasher::new(TEST_BCRYPT_COST);

        assert!(!hasher.verify("secret".to_string(), "plaintext".to_string()).await);
    }

    #[actix_web::test]
    async fn invalid_cost_is_an_internal_error() {
        let hasher = PasswordHasher::new(99);

        assert!(matches!(
            hasher.hash("secret".to_string()).await,
            Err(ApiError::Internal(_))
        ));
    }
}
