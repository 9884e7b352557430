use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use base64::Engine;
use parking_lot::RwLock;
use crate::tprintln;

use super::principal::Principal;

pub type SessionToken = String;

/// Fixed session lifetime: 5 days.
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug)]
struct SessionEntry {
    session: Session,
}

fn gen_id() -> String {
    // 256-bit random token base64url without padding
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// In-process session registry. All state is instance-scoped and shared via
/// the surrounding `Arc` in `AppState`; there are no process-global maps.
pub struct SessionManager {
    ttl: Duration,
    sessions: RwLock<HashMap<String, SessionEntry>>,
    user_index: RwLock<HashMap<String, HashSet<String>>>,
    revoked: RwLock<HashSet<String>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_ttl(SESSION_TTL)
    }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
            user_index: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, principal: Principal) -> Session {
        let now = Instant::now();
        let sid = gen_id();
        let token = gen_id();
        let sess = Session {
            session_id: sid.clone(),
            token: token.clone(),
            principal: principal.clone(),
            issued_at: now,
            expires_at: now + self.ttl,
        };
        let entry = SessionEntry { session: sess.clone() };
        {
            let mut m = self.sessions.write();
            m.insert(token.clone(), entry);
        }
        {
            let mut uidx = self.user_index.write();
            let set = uidx.entry(principal.subject.clone()).or_insert_with(HashSet::new);
            set.insert(token.clone());
        }
        tprintln!("session.issue user={} sid={} ttl_secs={}", principal.subject, sid, self.ttl.as_secs());
        sess
    }

    /// Validate a session cookie value with revocation checking. Expired
    /// entries are pruned on first sight.
    pub fn validate(&self, token: &str) -> Option<Principal> {
        if self.revoked.read().contains(token) {
            return None;
        }
        let now = Instant::now();
        let mut drop_key: Option<String> = None;
        let out = {
            let map = self.sessions.read();
            if let Some(ent) = map.get(token) {
                if ent.session.expires_at > now {
                    Some(ent.session.principal.clone())
                } else {
                    drop_key = Some(token.to_string());
                    None
                }
            } else {
                None
            }
        };
        if let Some(k) = drop_key {
            self.sessions.write().remove(&k);
        }
        out
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut removed = false;
        if let Some(ent) = self.sessions.write().remove(token) {
            removed = true;
            let uid = ent.session.principal.subject;
            let mut idx = self.user_index.write();
            if let Some(set) = idx.get_mut(&uid) {
                set.remove(token);
            }
            self.revoked.write().insert(token.to_string());
        }
        removed
    }

    /// Revoke every live session for a user. Returns how many were dropped.
    pub fn revoke_user(&self, subject: &str) -> usize {
        let mut count = 0usize;
        if let Some(tokens) = self.user_index.read().get(subject).cloned() {
            let mut s = self.sessions.write();
            let mut r = self.revoked.write();
            for t in tokens.iter() {
                if s.remove(t).is_some() {
                    count += 1;
                }
                r.insert(t.clone());
            }
        }
        tprintln!("session.revoke user={} count={}", subject, count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(subject: &str) -> Principal {
        Principal {
            subject: subject.into(),
            email: format!("{subject}@example.com"),
            display_name: None,
        }
    }

    #[test]
    fn issued_session_validates_until_logout() {
        let sm = SessionManager::default();
        let sess = sm.issue(principal("u1"));
        assert_eq!(sm.validate(&sess.token).unwrap().subject, "u1");

        assert!(sm.logout(&sess.token));
        assert!(sm.validate(&sess.token).is_none(), "revoked token must not validate");
        assert!(!sm.logout(&sess.token), "second logout is a no-op");
    }

    #[test]
    fn expired_session_is_rejected_and_pruned() {
        let sm = SessionManager::with_ttl(Duration::ZERO);
        let sess = sm.issue(principal("u1"));
        assert!(sm.validate(&sess.token).is_none());
        // second lookup hits the pruned map, not the expiry branch
        assert!(sm.validate(&sess.token).is_none());
    }

    #[test]
    fn revoke_user_drops_all_sessions_for_that_user_only() {
        let sm = SessionManager::default();
        let a1 = sm.issue(principal("a"));
        let a2 = sm.issue(principal("a"));
        let b = sm.issue(principal("b"));

        assert_eq!(sm.revoke_user("a"), 2);
        assert!(sm.validate(&a1.token).is_none());
        assert!(sm.validate(&a2.token).is_none());
        assert_eq!(sm.validate(&b.token).unwrap().subject, "b");
    }

    #[test]
    fn tokens_are_unique_and_opaque() {
        let sm = SessionManager::default();
        let s1 = sm.issue(principal("a"));
        let s2 = sm.issue(principal("a"));
        assert_ne!(s1.token, s2.token);
        assert_ne!(s1.session_id, s2.session_id);
        assert!(s1.token.len() >= 40);
    }
}
