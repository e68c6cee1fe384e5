use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::api::{ApiError, Gateway, UnauthorizedListener};
use crate::models::{ApiResponse, AuthPayload, LoginRequest, ProfileUpdate, RegisterRequest, UserProfile};
use crate::routes::{self, Navigation, Route};
use crate::services::AuthService;
use crate::state::{OperationState, StateCell};

use super::CredentialStore;

/// Buffered session events per subscriber
const EVENT_CAPACITY: usize = 16;

/// Observable view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<UserProfile>,
    pub token: Option<String>,
    pub loading: bool,
    pub error: Option<ApiError>,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.is_admin()).unwrap_or(false)
    }
}

impl OperationState for SessionSnapshot {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_error(&mut self, error: Option<ApiError>) {
        self.error = error;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    /// The backend rejected the token; the front-end should navigate to `redirect`.
    Expired { redirect: Route },
}

struct SessionCell {
    state: StateCell<SessionSnapshot>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionCell {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl UnauthorizedListener for SessionCell {
    fn on_unauthorized(&self) {
        let was_authenticated = self.state.read(SessionSnapshot::is_authenticated);
        self.state.modify(|s| {
            s.user = None;
            s.token = None;
        });
        // A rejected sign-in attempt has no session to expire
        if was_authenticated {
            info!("Session expired, sign-in required");
            self.emit(SessionEvent::Expired {
                redirect: Route::Login,
            });
        }
    }
}

/// Signed-in state backed by the credential store.
///
/// All mutation goes through the methods below; readers take snapshots or
/// subscribe to changes.
pub struct SessionState {
    auth: AuthService,
    credentials: CredentialStore,
    cell: Arc<SessionCell>,
}

impl SessionState {
    /// Create an anonymous session and subscribe it to the gateway's 401s.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cell = Arc::new(SessionCell {
            state: StateCell::new(SessionSnapshot::default()),
            events,
        });
        gateway.on_unauthorized(cell.clone());

        Self {
            credentials: gateway.credentials().clone(),
            auth: AuthService::new(gateway),
            cell,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.cell.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.cell.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.cell.events.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.cell.state.read(SessionSnapshot::is_authenticated)
    }

    pub fn is_admin(&self) -> bool {
        self.cell.state.read(SessionSnapshot::is_admin)
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.cell.state.read(|s| s.user.clone())
    }

    /// Restore the session from the credential store.
    ///
    /// Returns whether a session is active afterwards. Calling it again with
    /// the same stored record changes nothing.
    pub fn initialize(&self) -> Result<bool> {
        let Some(record) = self.credentials.load()? else {
            debug!("No stored session");
            return Ok(self.is_authenticated());
        };

        let was_authenticated = self.is_authenticated();
        self.cell.state.modify(|s| {
            s.token = Some(record.token);
            s.user = Some(record.user);
        });
        if !was_authenticated {
            debug!("Session restored from storage");
            self.cell.emit(SessionEvent::SignedIn);
        }
        Ok(true)
    }

    /// `POST /auth/login`, then persist and adopt the returned session.
    pub async fn login(&self, request: &LoginRequest) -> Result<UserProfile, ApiError> {
        let _loading = self.cell.state.begin();
        let result = self.establish(self.auth.login(request).await);
        self.cell.state.record(result)
    }

    /// `POST /auth/register`, then persist and adopt the returned session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<UserProfile, ApiError> {
        let _loading = self.cell.state.begin();
        let result = self.establish(self.auth.register(request).await);
        self.cell.state.record(result)
    }

    fn establish(&self, response: Result<ApiResponse<AuthPayload>, ApiError>) -> Result<UserProfile, ApiError> {
        let AuthPayload { token, user } = response?.into_data()?;

        // Persist first so an authenticated session always has stored credentials
        self.credentials
            .save(&token, &user)
            .map_err(ApiError::storage)?;
        self.cell.state.modify(|s| {
            s.token = Some(token);
            s.user = Some(user.clone());
        });

        debug!(user = %user.display_name(), "Signed in");
        self.cell.emit(SessionEvent::SignedIn);
        Ok(user)
    }

    /// `GET /auth/profile`: refresh the profile in memory and in storage.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let _loading = self.cell.state.begin();
        let result = self.refresh_profile().await;
        self.cell.state.record(result)
    }

    async fn refresh_profile(&self) -> Result<UserProfile, ApiError> {
        let user = self.auth.profile().await?.into_data()?;
        self.credentials
            .save_user(&user)
            .map_err(ApiError::storage)?;
        self.cell.state.modify(|s| s.user = Some(user.clone()));
        Ok(user)
    }

    /// `PUT /auth/profile`: merge the returned fields into the profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let _loading = self.cell.state.begin();
        let result = self.apply_profile_update(update).await;
        self.cell.state.record(result)
    }

    async fn apply_profile_update(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        let changes = self.auth.update_profile(update).await?.into_data()?;

        let mut user = match self.current_user() {
            Some(user) => user,
            None => self
                .credentials
                .user()
                .map_err(ApiError::storage)?
                .unwrap_or_default(),
        };
        user.merge(&changes);

        self.credentials
            .save_user(&user)
            .map_err(ApiError::storage)?;
        self.cell.state.modify(|s| s.user = Some(user.clone()));
        Ok(user)
    }

    /// End the session. Never fails; a storage problem is only logged.
    pub fn logout(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.cell.state.modify(|s| {
            s.user = None;
            s.token = None;
            s.error = None;
        });
        info!("Signed out");
        self.cell.emit(SessionEvent::SignedOut);
    }

    pub fn clear_error(&self) {
        self.cell.state.modify(|s| s.error = None);
    }

    /// Navigation guard. An anonymous session with stored credentials is
    /// restored before the route is evaluated.
    pub fn authorize(&self, route: Route) -> Navigation {
        if !self.is_authenticated() && self.credentials.has_credentials() {
            if let Err(e) = self.initialize() {
                warn!(error = %e, "Failed to restore session from storage");
            }
        }
        routes::guard(route, &self.snapshot())
    }
}
