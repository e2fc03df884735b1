use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";
pub const COMMON_PATTERNS: [&str; 5] = ["password", "123456", "qwerty", "abc123", "password123"];
pub const MIN_LENGTH: usize = 8;
pub const STRONG_PASSWORD: &str = "Strong password!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    pub is_valid: bool,
    pub score: u8,
    pub feedback: Vec<String>,
}

/// Scores a password 0..=5. Valid passwords score at least 4 and have
/// at least eight characters.
pub fn score(password: &str) -> PasswordStrength {
    let mut score: i32 = 0;
    let mut feedback = Vec::new();
    let length = password.chars().count();

    if length >= MIN_LENGTH {
        score += 1;
    } else {
        feedback.push(format!("Password must be at least {} characters long", MIN_LENGTH));
    }

    if password.chars().any(|c| c.is_uppercase()) {
        score += 1;
    } else {
        feedback.push("Password must contain at least one uppercase letter".to_string());
    }

    if password.chars().any(|c| c.is_lowercase()) {
        score += 1;
    } else {
        feedback.push("Password must contain at least one lowercase letter".to_string());
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    } else {
        feedback.push("Password must contain at least one number".to_string());
    }

    if password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        score += 1;
    } else {
        feedback.push("Password must contain at least one special character".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        score -= 1;
        feedback.push("Password contains common patterns and is easy to guess".to_string());
    }

    let score = score.clamp(0, 5) as u8;
    if feedback.is_empty() {
        feedback.push(STRONG_PASSWORD.to_string());
    }

    PasswordStrength {
        is_valid: score >= 4 && length >= MIN_LENGTH,
        score,
        feedback,
    }
}

/// Rejects passwords that do not pass [`score`].
pub fn ensure_strong(password: &str) -> AppResult<PasswordStrength> {
    let strength = score(password);
    if strength.is_valid {
        Ok(strength)
    } else {
        Err(AppError::WeakPassword(strength))
    }
}

/// Argon2id hasher with a configurable work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {}", e))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hash failed: {}", e)))
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_password_collects_all_missing_classes() {
        let result = score("abc");
        assert!(!result.is_valid);
        assert_eq!(result.score, 1);
        let feedback = result.feedback.join("|");
        assert!(feedback.contains("at least 8 characters"));
        assert!(feedback.contains("uppercase"));
        assert!(feedback.contains("number"));
        assert!(feedback.contains("special character"));
    }

    #[test]
    fn common_pattern_costs_one_point_but_still_valid_at_four() {
        let result = score("Password123!");
        assert_eq!(result.score, 4);
        assert!(result.is_valid);
        assert!(!result.feedback.is_empty());
        assert!(result.feedback.iter().any(|f| f.contains("common patterns")));
        assert!(!result.feedback.iter().any(|f| f == STRONG_PASSWORD));
    }

    #[test]
    fn strong_password_gets_strong_feedback() {
        let result = score("Tr1cky&Horse");
        assert_eq!(result.score, 5);
        assert!(result.is_valid);
        assert_eq!(result.feedback, vec![STRONG_PASSWORD.to_string()]);
    }

    #[test]
    fn short_password_is_invalid_even_with_high_score() {
        let result = score("Ab1!xyz");
        assert_eq!(result.score, 4);
        assert!(!result.is_valid);
    }

    #[test]
    fn score_never_goes_negative() {
        let result = score("123456");
        assert_eq!(result.score, 0);
        assert!(!result.is_valid);
    }

    #[test]
    fn symbol_outside_set_does_not_count() {
        let result = score("Abcdefg1_");
        assert_eq!(result.score, 4);
        assert!(result.feedback.iter().any(|f| f.contains("special character")));
    }

    #[test]
    fn ensure_strong_rejects_weak() {
        assert!(matches!(ensure_strong("weak"), Err(AppError::WeakPassword(_))));
        assert!(ensure_strong("Tr1cky&Horse").is_ok());
    }

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let hasher = PasswordHasher::new(1024, 1).unwrap();
        let hash = hasher.hash("Tr1cky&Horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Tr1cky&Horse", &hash));
        assert!(!hasher.verify("tr1cky&horse", &hash));
        assert!(!hasher.verify("Tr1cky&Horse", "not-a-hash"));
    }
}
