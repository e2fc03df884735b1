use std::sync::Arc;

use auth_validate::jwt::{Claims, JwtKeys, Role, issue_jwt};
use chrono::Duration;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::model::{
    ForgotPasswordForm, LoginForm, LoginResponse, ResetPasswordForm, SignupForm, SignupResponse,
};
use super::password::{PasswordHasher, ensure_strong};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::notify::Notifier;
use crate::reset::model::PasswordResetToken;
use crate::reset::repo::ResetTokenStore;
use crate::user::model::{ProfileForm, User, UserView};
use crate::user::repo::UserStore;

pub struct AuthSettings {
    pub keys: JwtKeys,
    pub session_ttl: Duration,
    pub reset_ttl: Duration,
    pub hasher: PasswordHasher,
    pub admin_emails: Vec<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    reset_tokens: Arc<dyn ResetTokenStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: Arc<AuthSettings>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        reset_tokens: Arc<dyn ResetTokenStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            notifier,
            clock,
            settings: Arc::new(settings),
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.settings.keys
    }

    fn issue_session(&self, user: &User) -> AppResult<String> {
        let role = if user.is_admin { Role::Admin } else { Role::User };
        let expires_at = self.clock.now() + self.settings.session_ttl;
        issue_jwt(&self.settings.keys, &user.id.to_string(), &user.email, role, expires_at)
            .map_err(|e| AppError::Internal(e.into()))
    }

    async fn hash(&self, password: String) -> AppResult<String> {
        let hasher = self.settings.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(anyhow::Error::from)?
    }

    async fn verify(&self, password: String, hash: String) -> AppResult<bool> {
        let hasher = self.settings.hasher.clone();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(anyhow::Error::from)?;
        Ok(matched)
    }

    pub async fn signup(&self, form: SignupForm) -> AppResult<SignupResponse> {
        form.validate()?;
        let strength = ensure_strong(&form.password)?;

        if self.users.find_by_email(&form.email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = self.hash(form.password).await?;
        let is_admin = self.settings.admin_emails.iter().any(|e| *e == form.email);
        let user = User::new(
            form.first_name,
            form.last_name,
            form.email,
            password_hash,
            form.risk_appetite.unwrap_or_default(),
            is_admin,
            self.clock.now(),
        );
        self.users.insert(&user).await?;
        let token = self.issue_session(&user)?;
        info!(user_id = %user.id, "user signed up");

        let view = user.view();
        let notifier = Arc::clone(&self.notifier);
        let welcome = view.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_welcome(&welcome).await {
                warn!(email = %welcome.email, "welcome notification failed: {}", e);
            }
        });

        Ok(SignupResponse {
            token,
            user: view,
            password_feedback: strength,
        })
    }

    pub async fn login(&self, form: LoginForm) -> AppResult<LoginResponse> {
        form.validate()?;
        let user = self
            .users
            .find_by_email(&form.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !self.verify(form.password, user.password_hash.clone()).await? {
            info!(user_id = %user.id, "login rejected");
            return Err(AppError::InvalidCredentials);
        }
        let token = self.issue_session(&user)?;
        Ok(LoginResponse {
            token,
            user: user.view(),
        })
    }

    pub async fn current_user(&self, claims: &Claims) -> AppResult<UserView> {
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;
        self.users
            .find_by_id(id)
            .await?
            .map(|u| u.view())
            .ok_or(AppError::UserNotFound)
    }

    pub async fn update_profile(&self, claims: &Claims, form: ProfileForm) -> AppResult<UserView> {
        form.validate()?;
        let current = self.current_user(claims).await?;
        let first_name = form.first_name.unwrap_or(current.first_name);
        let last_name = form.last_name.or(current.last_name);
        let risk_appetite = form.risk_appetite.unwrap_or(current.risk_appetite);
        self.users
            .update_profile(
                current.id,
                &first_name,
                last_name.as_deref(),
                risk_appetite,
                self.clock.now(),
            )
            .await?
            .map(|u| u.view())
            .ok_or(AppError::UserNotFound)
    }

    /// Issues a fresh code; earlier codes for the same email stay valid.
    pub async fn forgot_password(&self, form: ForgotPasswordForm) -> AppResult<Value> {
        form.validate()?;
        if self.users.find_by_email(&form.email).await?.is_none() {
            return Err(AppError::UserNotFound);
        }

        let token =
            PasswordResetToken::issue(&form.email, self.settings.reset_ttl, self.clock.now());
        self.reset_tokens.insert(&token).await?;

        self.notifier
            .send_reset_code(&token.email, &token.token, self.settings.reset_ttl.num_minutes())
            .await
            .map_err(|e| {
                warn!(email = %token.email, "reset code delivery failed: {}", e);
                AppError::NotificationFailed(e.to_string())
            })?;

        info!(email = %token.email, "password reset code issued");
        Ok(json!({ "message": "Password reset code sent to your email" }))
    }

    /// The token is claimed with a compare-and-set before the password is written,
    /// so of two concurrent resets with one code only one succeeds.
    pub async fn reset_password(&self, form: ResetPasswordForm) -> AppResult<Value> {
        form.validate()?;
        ensure_strong(&form.new_password)?;

        let now = self.clock.now();
        let token = self
            .reset_tokens
            .find_live(&form.email, &form.code, now)
            .await?
            .ok_or(AppError::InvalidOrExpiredCode)?;
        let user = self
            .users
            .find_by_email(&form.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let password_hash = self.hash(form.new_password).await?;
        if !self.reset_tokens.mark_used(token.id).await? {
            return Err(AppError::InvalidOrExpiredCode);
        }
        if !self
            .users
            .update_password(user.id, &password_hash, self.clock.now())
            .await?
        {
            return Err(AppError::UserNotFound);
        }

        info!(user_id = %user.id, "password reset");
        Ok(json!({ "message": "Password has been reset successfully" }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notify::{Notification, RecordingNotifier};
    use crate::store::memory::MemoryStore;
    use auth_validate::jwt::verify_jwt;
    use chrono::{TimeZone, Utc};

    const STRONG: &str = "Tr1cky&Horse";

    struct Fixture {
        svc: AuthService,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        clock: Arc<FixedClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let svc = AuthService::new(
            store.clone(),
            store.clone(),
            notifier.clone(),
            clock.clone(),
            AuthSettings {
                keys: JwtKeys::from_secret(b"test"),
                session_ttl: Duration::days(7),
                reset_ttl: Duration::minutes(15),
                hasher: PasswordHasher::new(1024, 1).unwrap(),
                admin_emails: vec!["root@invest.io".to_string()],
            },
        );
        Fixture {
            svc,
            store,
            notifier,
            clock,
        }
    }

    fn signup_form(email: &str, password: &str) -> SignupForm {
        SignupForm {
            first_name: "Ana".to_string(),
            last_name: Some("Lim".to_string()),
            email: email.to_string(),
            password: password.to_string(),
            risk_appetite: None,
        }
    }

    fn reset_form(email: &str, code: &str, new_password: &str) -> ResetPasswordForm {
        ResetPasswordForm {
            email: email.to_string(),
            code: code.to_string(),
            new_password: new_password.to_string(),
        }
    }

    async fn issue_code(f: &Fixture, email: &str) -> String {
        f.svc
            .forgot_password(ForgotPasswordForm {
                email: email.to_string(),
            })
            .await
            .unwrap();
        f.notifier.last_reset_code(email).unwrap()
    }

    #[tokio::test]
    async fn signup_issues_session_and_defaults_risk() {
        let f = fixture();
        let res = f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        assert_eq!(res.user.email, "ana@x.io");
        assert_eq!(res.user.risk_appetite, crate::types::RiskLevel::Moderate);
        assert_eq!(res.password_feedback.score, 5);

        let claims = verify_jwt(&res.token, f.svc.keys(), f.clock.now()).unwrap();
        assert_eq!(claims.sub, res.user.id.to_string());
        assert_eq!(claims.email, "ana@x.io");
        assert_eq!(claims.role, Role::User);

        let json = serde_json::to_value(&res).unwrap();
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn signup_sends_welcome_in_background() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        for _ in 0..20 {
            if !f.notifier.sent().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            f.notifier.sent(),
            vec![Notification::Welcome {
                email: "ana@x.io".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn signup_survives_welcome_failure() {
        let f = fixture();
        f.notifier.set_failing(true);
        assert!(f.svc.signup(signup_form("ana@x.io", STRONG)).await.is_ok());
        assert_eq!(f.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn weak_password_rejected_before_anything_is_stored() {
        let f = fixture();
        let err = f.svc.signup(signup_form("ana@x.io", "abc")).await.unwrap_err();
        match err {
            AppError::WeakPassword(strength) => {
                assert!(!strength.is_valid);
                assert!(strength.feedback.len() >= 4);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(f.store.user_count().await, 0);
    }

    #[tokio::test]
    async fn duplicate_email_creates_nothing() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let err = f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(f.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn email_match_is_case_sensitive() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        assert!(f.svc.signup(signup_form("Ana@x.io", STRONG)).await.is_ok());
        assert_eq!(f.store.user_count().await, 2);
    }

    #[tokio::test]
    async fn admin_email_gets_admin_role() {
        let f = fixture();
        let res = f.svc.signup(signup_form("root@invest.io", STRONG)).await.unwrap();
        let claims = verify_jwt(&res.token, f.svc.keys(), f.clock.now()).unwrap();
        assert_eq!(claims.role, Role::Admin);
    }

    #[tokio::test]
    async fn login_errors_do_not_reveal_which_part_failed() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();

        let unknown = f
            .svc
            .login(LoginForm {
                email: "bob@x.io".to_string(),
                password: STRONG.to_string(),
            })
            .await
            .unwrap_err();
        let wrong = f
            .svc
            .login(LoginForm {
                email: "ana@x.io".to_string(),
                password: "Wrong&Pass1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.body(), wrong.body());

        let ok = f
            .svc
            .login(LoginForm {
                email: "ana@x.io".to_string(),
                password: STRONG.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.email, "ana@x.io");
    }

    #[tokio::test]
    async fn current_user_for_vanished_subject_is_not_found() {
        let f = fixture();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "ghost@x.io".to_string(),
            role: Role::User,
            exp: usize::MAX,
        };
        assert!(matches!(
            f.svc.current_user(&claims).await,
            Err(AppError::UserNotFound)
        ));
        let bad = Claims {
            sub: "not-a-uuid".to_string(),
            ..claims
        };
        assert!(matches!(
            f.svc.current_user(&bad).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn profile_update_keeps_unset_fields() {
        let f = fixture();
        let res = f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let claims = verify_jwt(&res.token, f.svc.keys(), f.clock.now()).unwrap();
        f.clock.advance(Duration::minutes(1));
        let updated = f
            .svc
            .update_profile(
                &claims,
                ProfileForm {
                    first_name: None,
                    last_name: None,
                    risk_appetite: Some(crate::types::RiskLevel::High),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Ana");
        assert_eq!(updated.last_name.as_deref(), Some("Lim"));
        assert_eq!(updated.risk_appetite, crate::types::RiskLevel::High);
        assert!(updated.updated_at > updated.created_at);
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email() {
        let f = fixture();
        let err = f
            .svc
            .forgot_password(ForgotPasswordForm {
                email: "nobody@x.io".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn forgot_password_surfaces_delivery_failure() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        f.notifier.set_failing(true);
        let err = f
            .svc
            .forgot_password(ForgotPasswordForm {
                email: "ana@x.io".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotificationFailed(_)));
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn reset_with_valid_code_changes_password_once() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let code = issue_code(&f, "ana@x.io").await;
        let tokens = f.store.reset_tokens_for("ana@x.io").await;
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].expires_at, f.clock.now() + Duration::minutes(15));

        f.svc
            .reset_password(reset_form("ana@x.io", &code, "N3w&Stronger"))
            .await
            .unwrap();

        let login = f
            .svc
            .login(LoginForm {
                email: "ana@x.io".to_string(),
                password: "N3w&Stronger".to_string(),
            })
            .await;
        assert!(login.is_ok());

        let again = f
            .svc
            .reset_password(reset_form("ana@x.io", &code, "An0ther&Pass"))
            .await
            .unwrap_err();
        assert!(matches!(again, AppError::InvalidOrExpiredCode));
    }

    #[tokio::test]
    async fn reset_code_expires_after_fifteen_minutes() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let code = issue_code(&f, "ana@x.io").await;

        f.clock.advance(Duration::minutes(15) + Duration::seconds(1));
        let err = f
            .svc
            .reset_password(reset_form("ana@x.io", &code, "N3w&Stronger"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOrExpiredCode));
        assert_eq!(err.status(), 401);
    }

    #[tokio::test]
    async fn reset_code_still_valid_just_before_expiry() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let code = issue_code(&f, "ana@x.io").await;

        f.clock.advance(Duration::minutes(15) - Duration::seconds(1));
        assert!(f
            .svc
            .reset_password(reset_form("ana@x.io", &code, "N3w&Stronger"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn weak_new_password_is_checked_before_code() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let code = issue_code(&f, "ana@x.io").await;
        let err = f
            .svc
            .reset_password(reset_form("ana@x.io", &code, "weak"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WeakPassword(_)));
        assert!(f.store.reset_tokens_for("ana@x.io").await[0].is_live(f.clock.now()));
    }

    #[tokio::test]
    async fn older_codes_stay_valid_after_new_request() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let first = issue_code(&f, "ana@x.io").await;
        let second = issue_code(&f, "ana@x.io").await;
        assert_eq!(f.store.reset_tokens_for("ana@x.io").await.len(), 2);
        if first != second {
            assert!(f
                .svc
                .reset_password(reset_form("ana@x.io", &first, "N3w&Stronger"))
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn concurrent_resets_with_one_code_only_one_wins() {
        let f = fixture();
        f.svc.signup(signup_form("ana@x.io", STRONG)).await.unwrap();
        let code = issue_code(&f, "ana@x.io").await;

        let (a, b) = tokio::join!(
            f.svc
                .reset_password(reset_form("ana@x.io", &code, "F1rst&Winner")),
            f.svc
                .reset_password(reset_form("ana@x.io", &code, "Sec0nd&Winner")),
        );
        let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(AppError::InvalidOrExpiredCode)));
    }
}
