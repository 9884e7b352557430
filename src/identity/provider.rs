use std::collections::HashMap;
use std::time::{Duration, Instant};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use base64::Engine;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use uuid::Uuid;
use crate::tprintln;

use super::principal::Principal;
use crate::store::Store;

/// Lifetime of a bearer ID token. Long enough to complete the session
/// exchange, nothing more.
pub const ID_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Verifies short-lived bearer ID tokens into principals. The session
/// cookie verification mode lives in `SessionManager`; both entry points
/// stay available because different routes use different ones.
pub trait IdentityProvider: Send + Sync {
    fn verify_id_token(&self, token: &str) -> Option<Principal>;
}

#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Registration failures the client can act on. Store failures pass through
/// as opaque internals.
#[derive(Debug)]
pub enum RegisterError {
    InvalidEmail,
    WeakPassword,
    EmailTaken,
    Store(anyhow::Error),
}

impl std::fmt::Display for RegisterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegisterError::InvalidEmail => write!(f, "Invalid email address"),
            RegisterError::WeakPassword => write!(f, "Password should be at least 6 characters"),
            RegisterError::EmailTaken => write!(f, "Email already in use"),
            RegisterError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for RegisterError {}

impl From<anyhow::Error> for RegisterError {
    fn from(e: anyhow::Error) -> Self {
        RegisterError::Store(e)
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

fn plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

fn gen_token() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

struct TokenEntry {
    principal: Principal,
    expires_at: Instant,
}

/// Local identity: argon2 PHC hashes in the `credentials` relation, ID
/// tokens in an instance-scoped map. Constructed once at startup and
/// injected through `AppState`.
pub struct LocalIdentityProvider {
    store: Store,
    token_ttl: Duration,
    tokens: RwLock<HashMap<String, TokenEntry>>,
}

impl LocalIdentityProvider {
    pub fn new(store: Store) -> Self {
        Self::with_token_ttl(store, ID_TOKEN_TTL)
    }

    pub fn with_token_ttl(store: Store, token_ttl: Duration) -> Self {
        Self { store, token_ttl, tokens: RwLock::new(HashMap::new()) }
    }

    /// Create a credential and the matching user row. The subject id is
    /// minted here and becomes the user's permanent identifier.
    pub async fn register(&self, req: &RegisterRequest) -> Result<Principal, RegisterError> {
        if !plausible_email(&req.email) {
            return Err(RegisterError::InvalidEmail);
        }
        if req.password.len() < 6 {
            return Err(RegisterError::WeakPassword);
        }
        if self.store.credential_email_exists(&req.email).await? {
            return Err(RegisterError::EmailTaken);
        }
        let subject = Uuid::new_v4().to_string();
        let phc = hash_password(&req.password)?;
        self.store.insert_credential(&subject, &req.email, &phc).await?;
        self.store.upsert_user(&subject, &req.email, None).await?;
        tprintln!("identity.register subject={} email={}", subject, req.email);
        Ok(Principal { subject, email: req.email.clone(), display_name: None })
    }

    /// Password sign-in. Returns a fresh bearer ID token, or None when the
    /// credentials do not match.
    pub async fn sign_in(&self, email: &str, password: &str) -> anyhow::Result<Option<String>> {
        let Some((subject, phc)) = self.store.credential_for_email(email).await? else {
            return Ok(None);
        };
        if !verify_password(&phc, password) {
            return Ok(None);
        }
        let display_name = self
            .store
            .get_user(&subject)
            .await?
            .and_then(|u| u.display_name);
        let principal = Principal { subject: subject.clone(), email: email.to_string(), display_name };
        let token = gen_token();
        self.tokens.write().insert(
            token.clone(),
            TokenEntry { principal, expires_at: Instant::now() + self.token_ttl },
        );
        tprintln!("identity.sign_in subject={}", subject);
        Ok(Some(token))
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn verify_id_token(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        let mut drop_key: Option<String> = None;
        let out = {
            let map = self.tokens.read();
            if let Some(ent) = map.get(token) {
                if ent.expires_at > now {
                    Some(ent.principal.clone())
                } else {
                    drop_key = Some(token.to_string());
                    None
                }
            } else {
                None
            }
        };
        if let Some(k) = drop_key {
            self.tokens.write().remove(&k);
        }
        out
    }
}
