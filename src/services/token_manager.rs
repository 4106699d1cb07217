use crate::error::{AppError, Result};
use crate::models::SessionCredential;
use crate::services::provider::MusicProvider;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// A login that never reaches the callback is forgotten after this long.
const PENDING_LOGIN_MINUTES: i64 = 10;
/// Matches the session cookie lifetime.
const SESSION_IDLE_DAYS: i64 = 7;

/// Authorization state of one user session.
#[derive(Debug, Clone, Default)]
enum SessionState {
    #[default]
    Absent,
    AwaitingCallback {
        oauth_state: String,
    },
    Valid(SessionCredential),
}

#[derive(Debug)]
struct SessionSlot {
    state: SessionState,
    touched: DateTime<Utc>,
}

impl SessionSlot {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: SessionState::Absent,
            touched: now,
        }
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            SessionState::Absent => true,
            SessionState::AwaitingCallback { .. } => {
                now - self.touched > Duration::minutes(PENDING_LOGIN_MINUTES)
            }
            SessionState::Valid(_) => now - self.touched > Duration::days(SESSION_IDLE_DAYS),
        }
    }
}

/// Owns each session's provider credential and refreshes it before expiry.
///
/// Every session has its own mutex, held across check-and-refresh, so parallel
/// requests from one session never refresh twice. Sessions share nothing.
/// Sessions left without a credential are dropped from the map, and idle ones
/// are swept whenever a new session is created.
pub struct TokenManager {
    provider: Arc<dyn MusicProvider>,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>,
}

impl TokenManager {
    pub fn new(provider: Arc<dyn MusicProvider>) -> Self {
        Self {
            provider,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, session_id: Uuid) -> Arc<Mutex<SessionSlot>> {
        if let Some(slot) = self.sessions.read().await.get(&session_id) {
            return slot.clone();
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session_id) {
            prune_stale(&mut sessions, now);
        }
        sessions
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(SessionSlot::new(now))))
            .clone()
    }

    async fn existing_slot(&self, session_id: Uuid) -> Option<Arc<Mutex<SessionSlot>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Remove the session's slot if it holds nothing. Slots still held by an
    /// in-flight request are left alone.
    async fn evict_if_absent(&self, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        let absent = sessions
            .get(&session_id)
            .filter(|slot| Arc::strong_count(slot) == 1)
            .and_then(|slot| slot.try_lock().ok().map(|s| matches!(s.state, SessionState::Absent)))
            .unwrap_or(false);

        if absent {
            sessions.remove(&session_id);
        }
    }

    /// Discard any credential and return the URL that starts the provider login.
    pub async fn begin_login(&self, session_id: Uuid) -> Result<String> {
        let slot = self.slot(session_id).await;
        let mut slot = slot.lock().await;

        let oauth_state = generate_oauth_state();
        let url = self.provider.authorize_url(&oauth_state)?;
        slot.state = SessionState::AwaitingCallback { oauth_state };
        slot.touched = Utc::now();

        tracing::info!("Session {} awaiting authorization callback", session_id);
        Ok(url)
    }

    /// Exchange an authorization code for a credential.
    ///
    /// Only a session that started a login can complete one, and the callback
    /// must echo the `state` value issued for it. Any failure leaves the
    /// session without a credential.
    pub async fn complete_login(
        &self,
        session_id: Uuid,
        code: &str,
        returned_state: Option<&str>,
    ) -> Result<SessionCredential> {
        let result = self.exchange(session_id, code, returned_state).await;
        if result.is_err() {
            self.evict_if_absent(session_id).await;
        }
        result
    }

    async fn exchange(
        &self,
        session_id: Uuid,
        code: &str,
        returned_state: Option<&str>,
    ) -> Result<SessionCredential> {
        let slot = self
            .existing_slot(session_id)
            .await
            .ok_or_else(|| AppError::Auth("No login in progress".to_string()))?;
        let mut slot = slot.lock().await;

        let state_matches = match &slot.state {
            SessionState::AwaitingCallback { oauth_state } => {
                returned_state == Some(oauth_state.as_str())
            }
            _ => {
                tracing::warn!("Callback for session {} without a pending login", session_id);
                return Err(AppError::Auth("No login in progress".to_string()));
            }
        };

        // a pending login is single-use, whatever the outcome
        slot.state = SessionState::Absent;

        if !state_matches {
            tracing::warn!("OAuth state mismatch for session {}", session_id);
            return Err(AppError::Auth("OAuth state mismatch".to_string()));
        }

        match self.provider.exchange_code(code).await {
            Ok(credential) => {
                slot.state = SessionState::Valid(credential.clone());
                slot.touched = Utc::now();
                tracing::info!("Session {} authorized", session_id);
                Ok(credential)
            }
            Err(e) => {
                tracing::error!("Error in OAuth callback for session {}: {}", session_id, e);
                Err(AppError::Auth(format!("Code exchange failed: {}", e)))
            }
        }
    }

    /// A usable credential for the session, refreshed first if it expires
    /// within a minute. `None` means the caller has to send the user to login.
    pub async fn get_token(&self, session_id: Uuid) -> Option<SessionCredential> {
        let token = self.current_token(session_id).await;
        if token.is_none() {
            self.evict_if_absent(session_id).await;
        }
        token
    }

    async fn current_token(&self, session_id: Uuid) -> Option<SessionCredential> {
        let slot = self.existing_slot(session_id).await?;
        let mut slot = slot.lock().await;

        let credential = match &slot.state {
            SessionState::Valid(credential) => credential.clone(),
            _ => return None,
        };
        slot.touched = Utc::now();

        if !credential.is_expiring(Utc::now()) {
            return Some(credential);
        }

        tracing::info!("Token for session {} expiring, refreshing", session_id);
        match self.provider.refresh(&credential.refresh_token).await {
            Ok(refreshed) => {
                slot.state = SessionState::Valid(refreshed.clone());
                Some(refreshed)
            }
            Err(e) => {
                tracing::error!("Error refreshing access token for session {}: {}", session_id, e);
                slot.state = SessionState::Absent;
                None
            }
        }
    }

    /// Forget the session's credential, e.g. after the provider revoked it.
    pub async fn invalidate(&self, session_id: Uuid) {
        if let Some(slot) = self.existing_slot(session_id).await {
            slot.lock().await.state = SessionState::Absent;
            tracing::info!("Credential for session {} invalidated", session_id);
        }
        self.evict_if_absent(session_id).await;
    }

    /// Drop all state kept for the session.
    pub async fn end_session(&self, session_id: Uuid) {
        if self.sessions.write().await.remove(&session_id).is_some() {
            tracing::info!("Session {} ended", session_id);
        }
    }

    /// Sweep sessions that are empty, abandoned mid-login, or idle.
    pub async fn prune_stale(&self, now: DateTime<Utc>) {
        prune_stale(&mut *self.sessions.write().await, now);
    }

    #[cfg(test)]
    async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn prune_stale(sessions: &mut HashMap<Uuid, Arc<Mutex<SessionSlot>>>, now: DateTime<Utc>) {
    let before = sessions.len();
    sessions.retain(|_, slot| {
        if Arc::strong_count(slot) > 1 {
            // busy with a request
            return true;
        }
        match slot.try_lock() {
            Ok(slot) => !slot.is_stale(now),
            Err(_) => true,
        }
    });

    let pruned = before - sessions.len();
    if pruned > 0 {
        tracing::debug!("Pruned {} stale sessions, {} remain", pruned, sessions.len());
    }
}

fn generate_oauth_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{credential_expiring_in, oauth_state_from, MockProvider};
    use std::sync::atomic::Ordering;

    async fn manager_with_credential(
        provider: Arc<MockProvider>,
        expires_in: i64,
    ) -> (TokenManager, Uuid) {
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();
        provider.set_exchange_result(credential_expiring_in("initial", expires_in));
        let url = manager.begin_login(session).await.unwrap();
        manager
            .complete_login(session, "code", Some(&oauth_state_from(&url)))
            .await
            .unwrap();
        (manager, session)
    }

    #[tokio::test]
    async fn test_absent_session_has_no_token() {
        let manager = TokenManager::new(Arc::new(MockProvider::default()));
        assert!(manager.get_token(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_fresh_credential_is_not_refreshed() {
        let provider = Arc::new(MockProvider::default());
        let (manager, session) = manager_with_credential(provider.clone(), 120).await;

        let token = manager.get_token(session).await.unwrap();
        assert_eq!(token.access_token, "initial");
        let again = manager.get_token(session).await.unwrap();
        assert_eq!(again, token);
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expiring_credential_is_refreshed() {
        let provider = Arc::new(MockProvider::default());
        let (manager, session) = manager_with_credential(provider.clone(), 30).await;

        let token = manager.get_token(session).await.unwrap();
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(token.access_token, "refreshed");
        assert!(!token.is_expiring(Utc::now()));

        // replaced credential is served without another refresh
        manager.get_token(session).await.unwrap();
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_drops_credential() {
        let provider = Arc::new(MockProvider::default());
        provider.fail_refresh.store(true, Ordering::SeqCst);
        let (manager, session) = manager_with_credential(provider.clone(), 30).await;

        assert!(manager.get_token(session).await.is_none());
        // no stale credential afterwards, and no further refresh attempts
        assert!(manager.get_token(session).await.is_none());
        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_refresh_once() {
        let provider = Arc::new(MockProvider::default());
        provider.refresh_delay_ms.store(50, Ordering::SeqCst);
        let (manager, session) = manager_with_credential(provider.clone(), 10).await;

        let (a, b, c) = tokio::join!(
            manager.get_token(session),
            manager.get_token(session),
            manager.get_token(session)
        );

        assert_eq!(provider.refresh_calls.load(Ordering::SeqCst), 1);
        for token in [a, b, c] {
            assert_eq!(token.unwrap().access_token, "refreshed");
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let provider = Arc::new(MockProvider::default());
        let (manager, session) = manager_with_credential(provider.clone(), 3600).await;

        let other = Uuid::new_v4();
        assert!(manager.get_token(other).await.is_none());
        manager.invalidate(other).await;
        assert!(manager.get_token(session).await.is_some());
    }

    #[tokio::test]
    async fn test_begin_login_discards_credential() {
        let provider = Arc::new(MockProvider::default());
        let (manager, session) = manager_with_credential(provider.clone(), 3600).await;

        let url = manager.begin_login(session).await.unwrap();
        assert!(url.starts_with("https://accounts.example/authorize"));
        assert!(manager.get_token(session).await.is_none());
    }

    #[tokio::test]
    async fn test_login_round_trip_with_matching_state() {
        let provider = Arc::new(MockProvider::default());
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        let url = manager.begin_login(session).await.unwrap();
        let state = oauth_state_from(&url);
        manager
            .complete_login(session, "code", Some(&state))
            .await
            .unwrap();

        assert!(manager.get_token(session).await.is_some());
    }

    #[tokio::test]
    async fn test_state_mismatch_fails_login() {
        let provider = Arc::new(MockProvider::default());
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        manager.begin_login(session).await.unwrap();
        let result = manager.complete_login(session, "code", Some("forged")).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
        assert!(manager.get_token(session).await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_code_leaves_session_absent() {
        let provider = Arc::new(MockProvider::default());
        provider.fail_exchange.store(true, Ordering::SeqCst);
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        let url = manager.begin_login(session).await.unwrap();
        let result = manager
            .complete_login(session, "bad-code", Some(&oauth_state_from(&url)))
            .await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert!(manager.get_token(session).await.is_none());
    }

    #[tokio::test]
    async fn test_end_session_forgets_everything() {
        let provider = Arc::new(MockProvider::default());
        let (manager, session) = manager_with_credential(provider, 3600).await;

        manager.end_session(session).await;
        assert!(manager.get_token(session).await.is_none());
    }

    #[tokio::test]
    async fn test_callback_without_login_is_rejected() {
        let provider = Arc::new(MockProvider::default());
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        let result = manager.complete_login(session, "code", None).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_stateless_retry_after_mismatch_is_rejected() {
        let provider = Arc::new(MockProvider::default());
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        let url = manager.begin_login(session).await.unwrap();
        let forged = manager.complete_login(session, "code", Some("forged")).await;
        assert!(matches!(forged, Err(AppError::Auth(_))));

        let retry = manager.complete_login(session, "code", None).await;
        assert!(matches!(retry, Err(AppError::Auth(_))));

        // the real state is spent as well
        let late = manager
            .complete_login(session, "code", Some(&oauth_state_from(&url)))
            .await;
        assert!(matches!(late, Err(AppError::Auth(_))));

        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
        assert!(manager.get_token(session).await.is_none());
    }

    #[tokio::test]
    async fn test_omitted_state_is_rejected() {
        let provider = Arc::new(MockProvider::default());
        let manager = TokenManager::new(provider.clone());
        let session = Uuid::new_v4();

        manager.begin_login(session).await.unwrap();
        let result = manager.complete_login(session, "code", None).await;

        assert!(matches!(result, Err(AppError::Auth(_))));
        assert_eq!(provider.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abandoned_logins_do_not_accumulate() {
        let manager = TokenManager::new(Arc::new(MockProvider::default()));

        for _ in 0..1000 {
            let session = Uuid::new_v4();
            manager.begin_login(session).await.unwrap();
            manager.invalidate(session).await;
        }

        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_logins_do_not_accumulate() {
        let manager = TokenManager::new(Arc::new(MockProvider::default()));

        for _ in 0..100 {
            let session = Uuid::new_v4();
            manager.begin_login(session).await.unwrap();
            let _ = manager.complete_login(session, "code", Some("forged")).await;
        }

        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_evicts_session() {
        let provider = Arc::new(MockProvider::default());
        provider.fail_refresh.store(true, Ordering::SeqCst);
        let (manager, session) = manager_with_credential(provider, 30).await;

        assert!(manager.get_token(session).await.is_none());
        assert_eq!(manager.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_prune_removes_stale_pending_logins() {
        let provider = Arc::new(MockProvider::default());
        let (manager, valid) = manager_with_credential(provider, 3600).await;

        for _ in 0..10 {
            manager.begin_login(Uuid::new_v4()).await.unwrap();
        }
        assert_eq!(manager.session_count().await, 11);

        // recent pending logins survive a sweep
        manager.prune_stale(Utc::now()).await;
        assert_eq!(manager.session_count().await, 11);

        manager
            .prune_stale(Utc::now() + Duration::minutes(PENDING_LOGIN_MINUTES + 1))
            .await;
        assert_eq!(manager.session_count().await, 1);
        assert!(manager.get_token(valid).await.is_some());

        manager
            .prune_stale(Utc::now() + Duration::days(SESSION_IDLE_DAYS + 1))
            .await;
        assert_eq!(manager.session_count().await, 0);
    }
}
