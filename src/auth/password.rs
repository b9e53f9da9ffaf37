use crate::error::{AppError, AppResult};

/// bcrypt work factor. Ten rounds keeps login latency well under a second.
const COST: u32 = 10;

pub fn hash(plaintext: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, COST)
}

/// Constant-time verification via bcrypt; malformed hashes never verify.
pub fn verify(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

/// Hash on the blocking pool so a slow bcrypt round never stalls the runtime.
pub async fn hash_blocking(plaintext: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash(&plaintext))
        .await
        .map_err(|e| AppError::Internal(format!("Hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub async fn verify_blocking(plaintext: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify(&plaintext, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verify task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash("correct horse").unwrap();
        assert_ne!(h, "correct horse");
        assert!(verify("correct horse", &h));
        assert!(!verify("battery staple", &h));
    }

    #[tokio::test]
    async fn blocking_helpers_agree_with_sync_ones() {
        let h = hash_blocking("secret".into()).await.unwrap();
        assert!(verify_blocking("secret".into(), h.clone()).await.unwrap());
        assert!(!verify_blocking("wrong".into(), h).await.unwrap());
    }

    #[test]
    fn garbage_hash_does_not_verify() {
        assert!(!verify("anything", "not-a-bcrypt-hash"));
    }
}
