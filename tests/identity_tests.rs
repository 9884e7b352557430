//! Identity integration tests: registration, password sign-in, ID token
//! verification and the token-to-session exchange, backed by a throwaway
//! SQLite store.

use anyhow::Result;
use std::time::Duration;
use tempfile::TempDir;

use librarium::identity::{IdentityProvider, LocalIdentityProvider, RegisterError, RegisterRequest, SessionManager};
use librarium::store::{sqlite_url_for_path, Store};

async fn store_in(td: &TempDir) -> Result<Store> {
    let url = sqlite_url_for_path(td.path().join("librarium.db").as_path())?;
    Ok(Store::connect(&url).await?)
}

fn req(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest { email: email.into(), password: password.into() }
}

#[tokio::test]
async fn register_creates_credential_and_user_row() -> Result<()> {
    let td = TempDir::new()?;
    let store = store_in(&td).await?;
    let idp = LocalIdentityProvider::new(store.clone());

    let principal = idp.register(&req("reader@example.com", "hunter22")).await.unwrap();
    assert_eq!(principal.email, "reader@example.com");
    assert!(!principal.subject.is_empty());

    // the user row exists so book ownership can reference it immediately
    let user = store.get_user(&principal.subject).await?.expect("user row");
    assert_eq!(user.email, "reader@example.com");
    assert!(store.credential_email_exists("reader@example.com").await?);
    Ok(())
}

#[tokio::test]
async fn register_rejects_bad_input_and_duplicates() -> Result<()> {
    let td = TempDir::new()?;
    let store = store_in(&td).await?;
    let idp = LocalIdentityProvider::new(store);

    assert!(matches!(
        idp.register(&req("nope", "hunter22")).await,
        Err(RegisterError::InvalidEmail)
    ));
    assert!(matches!(
        idp.register(&req("reader@example.com", "short")).await,
        Err(RegisterError::WeakPassword)
    ));

    idp.register(&req("reader@example.com", "hunter22")).await.unwrap();
    assert!(matches!(
        idp.register(&req("reader@example.com", "other-pass")).await,
        Err(RegisterError::EmailTaken)
    ));
    Ok(())
}

#[tokio::test]
async fn sign_in_issues_a_verifiable_token_only_for_valid_credentials() -> Result<()> {
    let td = TempDir::new()?;
    let store = store_in(&td).await?;
    let idp = LocalIdentityProvider::new(store);
    let registered = idp.register(&req("reader@example.com", "hunter22")).await.unwrap();

    let token = idp.sign_in("reader@example.com", "hunter22").await?.expect("token issued");
    let principal = idp.verify_id_token(&token).expect("token verifies");
    assert_eq!(principal.subject, registered.subject);
    assert_eq!(principal.email, "reader@example.com");

    assert!(idp.sign_in("reader@example.com", "wrong").await?.is_none());
    assert!(idp.sign_in("unknown@example.com", "hunter22").await?.is_none());
    assert!(idp.verify_id_token("forged-token").is_none());
    Ok(())
}

#[tokio::test]
async fn expired_id_tokens_do_not_verify() -> Result<()> {
    let td = TempDir::new()?;
    let store = store_in(&td).await?;
    let idp = LocalIdentityProvider::with_token_ttl(store, Duration::ZERO);
    idp.register(&req("reader@example.com", "hunter22")).await.unwrap();

    let token = idp.sign_in("reader@example.com", "hunter22").await?.unwrap();
    assert!(idp.verify_id_token(&token).is_none());
    Ok(())
}

#[tokio::test]
async fn verified_token_exchanges_for_a_revocable_session() -> Result<()> {
    let td = TempDir::new()?;
    let store = store_in(&td).await?;
    let idp = LocalIdentityProvider::new(store);
    let sm = SessionManager::default();
    idp.register(&req("reader@example.com", "hunter22")).await.unwrap();

    let token = idp.sign_in("reader@example.com", "hunter22").await?.unwrap();
    let principal = idp.verify_id_token(&token).unwrap();
    let session = sm.issue(principal.clone());

    assert_eq!(sm.validate(&session.token).unwrap().subject, principal.subject);
    assert_eq!(sm.ttl(), Duration::from_secs(5 * 24 * 60 * 60));

    assert!(sm.logout(&session.token));
    assert!(sm.validate(&session.token).is_none());
    Ok(())
}
