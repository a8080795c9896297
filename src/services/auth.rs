//! Current-user state shared with the rest of the client.
//!
//! `AuthBroadcaster` owns the single current-user slot and the loading flag,
//! mirrors the backend session into it, and fans every transition out to
//! subscribers in subscription order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::{AuthChange, Backend};
use crate::config::{Config, LazyBackend};
use crate::error::{AppResult, AuthFailure};
use crate::model::{AuthUser, Session, UserMetadata, UserUpsert};

/// What subscribers see: the current user and whether a session lookup is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub user: Option<AuthUser>,
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self { user: None, loading: true }
    }
}

type Callback = Arc<dyn Fn(&AuthSnapshot) + Send + Sync>;

struct Observer {
    id: u64,
    callback: Callback,
}

type ObserverList = Mutex<Vec<Observer>>;

/// Keeps an observer registered until it is dropped or unsubscribed.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    observers: Weak<ObserverList>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            let mut list = observers.lock().unwrap_or_else(|e| e.into_inner());
            list.retain(|o| o.id != self.id);
        }
    }
}

pub struct AuthBroadcaster {
    backend: Arc<LazyBackend>,
    config: Arc<Config>,
    snapshot: RwLock<AuthSnapshot>,
    observers: Arc<ObserverList>,
    next_id: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl AuthBroadcaster {
    pub fn new(backend: Arc<LazyBackend>, config: Arc<Config>) -> Self {
        Self {
            backend,
            config,
            snapshot: RwLock::new(AuthSnapshot::default()),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
            listener: Mutex::new(None),
        }
    }

    /// Registers `callback`, invoking it right away with the current state.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuthSnapshot) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback = Arc::new(callback);
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Observer { id, callback: callback.clone() });
        callback(&self.snapshot());
        Subscription { id, observers: Arc::downgrade(&self.observers) }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner()).user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.read().unwrap_or_else(|e| e.into_inner()).loading
    }

    fn set_user(&self, user: Option<AuthUser>) {
        self.snapshot.write().unwrap_or_else(|e| e.into_inner()).user = user;
    }

    fn set_loading(&self, loading: bool) {
        self.snapshot.write().unwrap_or_else(|e| e.into_inner()).loading = loading;
    }

    fn notify(&self) {
        let snapshot = self.snapshot();
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|o| o.callback.clone())
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Loads the ambient session, then starts mirroring backend session changes.
    ///
    /// Never fails: any backend error is logged and leaves the client signed out.
    pub async fn initialize(self: &Arc<Self>) {
        self.set_loading(true);
        self.notify();

        let user = match self.backend.get() {
            Ok(backend) => {
                let user = match backend.get_session().await {
                    Ok(Some(session)) => {
                        self.upsert_user(backend.as_ref(), &session.user).await;
                        Some(session.user)
                    }
                    Ok(None) => None,
                    Err(e) => {
                        error!(error = %e, "Error getting session");
                        None
                    }
                };
                // After the lookup, so a startup refresh is not mirrored a second time.
                self.start_listener(backend.as_ref());
                user
            }
            Err(e) => {
                error!(error = %e, "Error initializing auth");
                None
            }
        };

        self.set_user(user);
        self.set_loading(false);
        self.notify();
    }

    fn start_listener(self: &Arc<Self>, backend: &dyn Backend) {
        let mut rx = backend.subscribe_auth_changes();
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                let change = match rx.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Auth listener lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(this) = weak.upgrade() else { break };
                this.apply_change(change).await;
            }
        });
        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    async fn apply_change(&self, change: AuthChange) {
        debug!(?change, "Auth state change");
        match change.session() {
            Some(session) => {
                self.set_user(Some(session.user.clone()));
                if let Ok(backend) = self.backend.get() {
                    self.upsert_user(backend.as_ref(), &session.user).await;
                }
            }
            None => self.set_user(None),
        }
        self.notify();
    }

    /// Mirrors the identity into the `users` table. Failures are only logged.
    async fn upsert_user(&self, backend: &dyn Backend, user: &AuthUser) {
        let row = UserUpsert::from_identity(user, &self.config.avatar_fallback_base, Utc::now());
        let result = match serde_json::to_value(&row) {
            Ok(value) => backend.upsert("users", value, "id").await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            error!(user_id = %user.id, error = %e, "Error upserting user");
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthFailure> {
        let result: AppResult<Session> = async {
            let backend = self.backend.get()?;
            backend.sign_in_with_password(email, password).await
        }
        .await;
        result
            .inspect(|_| info!(email, "Signed in"))
            .map_err(|e| {
                error!(error = %e, "Sign in error");
                AuthFailure::from(e)
            })
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<Option<Session>, AuthFailure> {
        let result: AppResult<Option<Session>> = async {
            let backend = self.backend.get()?;
            backend.sign_up(email, password, metadata).await
        }
        .await;
        result
            .inspect(|_| info!(email, "Account created"))
            .map_err(|e| {
                error!(error = %e, "Sign up error");
                AuthFailure::from(e)
            })
    }

    pub async fn sign_out(&self) -> Result<(), AuthFailure> {
        let result: AppResult<()> = async {
            let backend = self.backend.get()?;
            backend.sign_out().await
        }
        .await;
        match result {
            Ok(()) => {
                info!("Signed out");
                self.set_user(None);
                self.notify();
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Sign out error");
                Err(e.into())
            }
        }
    }

    /// Bearer token for outbound requests, `None` when signed out or on error.
    pub async fn token(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }
        let result: AppResult<Option<Session>> = async { self.backend.get()?.get_session().await }.await;
        match result {
            Ok(session) => session.map(|s| s.access_token),
            Err(e) => {
                error!(error = %e, "Error getting token");
                None
            }
        }
    }
}

impl Drop for AuthBroadcaster {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().ok().and_then(|slot| slot.take()) {
            handle.abort();
        }
    }
}
