// src/session.rs
//! Session lifecycle: the token triple, its persistence, and the silent
//! refresh task.
//!
//! A [`SessionManager`] is an explicit context object. Build one, call
//! [`SessionManager::init`] inside a Tokio runtime, hand clones to whatever
//! issues authenticated requests, and call [`SessionManager::dispose`] when
//! done.
//!
//! Every wholesale change of the token set (hydrate, sign in, sign out)
//! bumps a generation counter. The refresh task is bound to the generation
//! it was spawned for and drops any response that arrives after the
//! session it belonged to has ended.

use crate::auth::{decode_claims, AuthApi, Claims};
use crate::config::Config;
use crate::error::{FolioError, Result};
use crate::models::RefreshResponse;
use crate::store::{FileTokenStore, TokenSet, TokenStore};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Where the user is sent once the session ends.
pub trait Navigator: Send + Sync {
    fn to_sign_in(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn to_sign_in(&self) {
        self()
    }
}

pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn to_sign_in(&self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
    /// Incremented on every token change, silent refreshes included.
    pub revision: u64,
}

struct SessionState {
    tokens: TokenSet,
    generation: u64,
    revision: u64,
    refresher: Option<JoinHandle<()>>,
}

struct Inner {
    auth: AuthApi,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    refresh_interval: Duration,
    state: Mutex<SessionState>,
    status: watch::Sender<SessionStatus>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.refresher.take() {
            handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        auth: AuthApi,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        refresh_interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(SessionStatus::default());
        SessionManager {
            inner: Arc::new(Inner {
                auth,
                store,
                navigator,
                refresh_interval,
                state: Mutex::new(SessionState {
                    tokens: TokenSet::default(),
                    generation: 0,
                    revision: 0,
                    refresher: None,
                }),
                status,
            }),
        }
    }

    /// Session backed by the token file named in `config`.
    pub fn from_config(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        Ok(Self::new(
            AuthApi::new(config)?,
            Arc::new(FileTokenStore::new(&config.token_file)),
            navigator,
            config.refresh_interval,
        ))
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &mut SessionState) {
        state.revision += 1;
        self.inner.status.send_replace(SessionStatus {
            authenticated: state.tokens.access_token.is_some(),
            revision: state.revision,
        });
    }

    /// Hydrates from storage and starts the refresh task when a refresh
    /// token is present. Must be called from within a Tokio runtime.
    pub fn init(&self) {
        self.hydrate();
        let mut state = self.state();
        self.restart_refresher(&mut state);
    }

    /// Loads the persisted tokens. Never fails: unreadable storage is
    /// treated as signed out. Returns whether the session is authenticated.
    pub fn hydrate(&self) -> bool {
        let tokens = match self.inner.store.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Ignoring unreadable stored tokens: {}", e);
                TokenSet::default()
            }
        };
        let mut state = self.state();
        state.tokens = tokens;
        state.generation += 1;
        self.publish(&mut state);
        let authenticated = state.tokens.access_token.is_some();
        debug!("Hydrated session (authenticated: {})", authenticated);
        authenticated
    }

    /// Stops the refresh task. Tokens stay in memory and in storage.
    pub fn dispose(&self) {
        if let Some(handle) = self.state().refresher.take() {
            handle.abort();
            debug!("Refresh task stopped");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().tokens.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state().tokens.access_token.clone()
    }

    pub fn tokens(&self) -> TokenSet {
        self.state().tokens.clone()
    }

    pub fn has_refresher(&self) -> bool {
        self.state()
            .refresher
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Yields a new [`SessionStatus`] on sign in, sign out and refresh.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    /// Unverified claims of the identity token.
    pub fn identity(&self) -> Option<Claims> {
        let token = self.state().tokens.id_token.clone()?;
        decode_claims(&token)
    }

    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        let token = self.access_token()?;
        decode_claims(&token)?.expires_at()
    }

    /// Signs in and replaces all three tokens at once. On failure nothing
    /// changes.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        let response = self.inner.auth.sign_in(email, password).await?;
        let expires_in = response.expires_in;
        let tokens = TokenSet {
            id_token: Some(response.id_token),
            access_token: Some(response.access_token),
            refresh_token: Some(response.refresh_token),
        };

        let mut state = self.state();
        self.inner.store.save(&tokens)?;
        state.tokens = tokens;
        state.generation += 1;
        self.restart_refresher(&mut state);
        self.publish(&mut state);
        info!("Signed in; access token valid for {}s", expires_in);
        Ok(())
    }

    /// Ends the session. The remote sign-out is best effort; local tokens
    /// are always cleared and the navigator is always invoked.
    pub async fn sign_out(&self) {
        self.end_session(None).await;
    }

    /// Refreshes the access token now. Unlike the background task, a
    /// failure is returned to the caller and the session is left intact.
    pub async fn refresh(&self) -> Result<()> {
        let generation = self.state().generation;
        match self.refresh_for(generation).await? {
            true => Ok(()),
            false => Err(FolioError::NotAuthenticated),
        }
    }

    fn restart_refresher(&self, state: &mut SessionState) {
        if let Some(handle) = state.refresher.take() {
            handle.abort();
        }
        if state.tokens.refresh_token.is_some() {
            state.refresher = Some(self.spawn_refresher(state.generation));
            debug!(
                "Refresh task scheduled every {}s",
                self.inner.refresh_interval.as_secs()
            );
        }
    }

    fn spawn_refresher(&self, generation: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.refresh_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let inner = match weak.upgrade() {
                    Some(inner) => inner,
                    None => break,
                };
                let session = SessionManager { inner };
                if !session.refresh_tick(generation).await {
                    break;
                }
            }
        })
    }

    /// One background refresh. Returns whether the task should keep running.
    async fn refresh_tick(&self, generation: u64) -> bool {
        match self.refresh_for(generation).await {
            Ok(alive) => alive,
            Err(e) => {
                error!("Token refresh failed: {}", e);
                self.end_session(Some(generation)).await;
                false
            }
        }
    }

    /// Ok(false) when the session `generation` refers to is gone.
    async fn refresh_for(&self, generation: u64) -> Result<bool> {
        let refresh_token = {
            let state = self.state();
            if state.generation != generation {
                return Ok(false);
            }
            match &state.tokens.refresh_token {
                Some(token) => token.clone(),
                None => return Ok(false),
            }
        };
        let response = self.inner.auth.refresh_token(&refresh_token).await?;
        Ok(self.apply_refresh(generation, response))
    }

    fn apply_refresh(&self, generation: u64, response: RefreshResponse) -> bool {
        let mut state = self.state();
        if state.generation != generation {
            debug!("Discarding refresh response for an ended session");
            return false;
        }
        let tokens = TokenSet {
            id_token: Some(response.id_token),
            access_token: Some(response.access_token),
            refresh_token: state.tokens.refresh_token.clone(),
        };
        if let Err(e) = self.inner.store.save(&tokens) {
            warn!("Failed to persist refreshed tokens: {}", e);
        }
        state.tokens = tokens;
        self.publish(&mut state);
        info!("Access token refreshed");
        true
    }

    /// `expected` is set when the refresh task ends its own session; a
    /// newer session started meanwhile is then left alone.
    ///
    /// The refresh task is cancelled before the remote sign-out so no tick
    /// can run while that call is pending.
    async fn end_session(&self, expected: Option<u64>) {
        let (ended, access_token) = {
            let mut state = self.state();
            if let Some(generation) = expected {
                if state.generation != generation {
                    debug!("Session already replaced; skipping forced sign out");
                    return;
                }
            }
            state.generation += 1;
            if let Some(handle) = state.refresher.take() {
                // The refresh task must not abort itself mid-sign-out.
                if expected.is_none() {
                    handle.abort();
                }
            }
            (state.generation, state.tokens.access_token.clone())
        };

        if let Some(token) = access_token {
            if let Err(e) = self.inner.auth.sign_out(&token).await {
                warn!("Sign out error: {}", e);
            }
        }

        {
            let mut state = self.state();
            if state.generation != ended {
                debug!("Signed in again during sign out; keeping the new session");
                return;
            }
            state.tokens = TokenSet::default();
            if let Err(e) = self.inner.store.clear() {
                error!("Failed to clear stored tokens: {}", e);
            }
            self.publish(&mut state);
        }

        info!("Signed out");
        self.inner.navigator.to_sign_in();
    }
}
