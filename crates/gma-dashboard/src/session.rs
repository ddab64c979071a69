//! Session gate: the signed-in identity, the backend profile and token minting.
//!
//! # Design
//! - The gate is the only owner of the identity; everything else asks it for a
//!   bearer token immediately before each backend call.
//! - Tokens are never cached: [`SessionGate::token`] mints a fresh one per call
//!   and stores the rotated refresh credential.
//! - Profile upserts after sign-in are best effort. A failure is logged and the
//!   sign-in still succeeds.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gma_api_models::{DoctorProfile, ProfileUpsert};
use gma_client::IdentitySession;
use tracing::{info, warn};

use crate::backend::{SharedBackend, SharedIdentity};
use crate::error::{DashboardError, DashboardResult, ValidationError};

#[derive(Debug)]
struct SessionState {
    identity: Option<IdentitySession>,
    profile: Option<DoctorProfile>,
    loading: bool,
}

/// Holds the authenticated identity and gates access to backend calls.
pub struct SessionGate {
    identity_provider: SharedIdentity,
    backend: SharedBackend,
    state: Mutex<SessionState>,
}

impl SessionGate {
    /// Create a gate in the loading state with no identity.
    #[must_use]
    pub fn new(identity_provider: SharedIdentity, backend: SharedBackend) -> Self {
        Self {
            identity_provider,
            backend,
            state: Mutex::new(SessionState {
                identity: None,
                profile: None,
                loading: true,
            }),
        }
    }

    /// Finish start-up with a previously persisted identity, if any.
    pub fn restore(&self, identity: Option<IdentitySession>) {
        let mut state = self.lock();
        state.identity = identity;
        state.loading = false;
    }

    /// Email and password sign-in.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCredentials`] for blank input and
    /// [`DashboardError::SignInFailed`] when the provider rejects the credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> DashboardResult<IdentitySession> {
        require_credentials(email, password)?;
        let identity = self
            .identity_provider
            .sign_in(email.trim(), password)
            .await
            .map_err(|source| DashboardError::SignInFailed { source })?;
        self.establish(identity, None).await
    }

    /// Email and password account creation, followed by sign-in.
    ///
    /// # Errors
    ///
    /// Same as [`SessionGate::sign_in`].
    pub async fn sign_up(&self, email: &str, password: &str) -> DashboardResult<IdentitySession> {
        require_credentials(email, password)?;
        let identity = self
            .identity_provider
            .sign_up(email.trim(), password)
            .await
            .map_err(|source| DashboardError::SignInFailed { source })?;
        self.establish(identity, None).await
    }

    /// Federated sign-in with a provider-issued token.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::SignInFailed`] when the provider rejects the token.
    pub async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        provider_token: &str,
    ) -> DashboardResult<IdentitySession> {
        let identity = self
            .identity_provider
            .sign_in_with_provider(provider_id, provider_token)
            .await
            .map_err(|source| DashboardError::SignInFailed { source })?;
        let display_name = identity.display_name.clone();
        self.establish(identity, display_name).await
    }

    /// Resume a session from a stored refresh credential.
    ///
    /// The provider only returns the account id, so the email and display
    /// name stay unset until the backend profile is fetched.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCredentials`] for a blank credential and
    /// [`DashboardError::SignInFailed`] when the provider refuses it.
    pub async fn resume(&self, refresh_token: &str) -> DashboardResult<IdentitySession> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }
        let stored = IdentitySession::new("", None, None, None, refresh_token);
        let refreshed = self
            .identity_provider
            .fresh_token(&stored)
            .await
            .map_err(|source| DashboardError::SignInFailed { source })?;
        let identity = IdentitySession::new(
            refreshed.user_id,
            None,
            None,
            None,
            refreshed.refresh_token,
        );
        self.restore(Some(identity.clone()));
        info!(uid = %identity.uid, "session resumed");
        Ok(identity)
    }

    /// Drop the identity and profile.
    pub fn sign_out(&self) {
        let mut state = self.lock();
        let had_identity = state.identity.take().is_some();
        state.profile = None;
        state.loading = false;
        drop(state);
        if had_identity {
            info!("signed out");
        }
    }

    /// Mint a fresh bearer token for one backend call.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Unauthenticated`] without an identity, or
    /// [`DashboardError::Network`] when the provider refuses to mint a token.
    pub async fn token(&self) -> DashboardResult<String> {
        let identity = self.identity().ok_or(DashboardError::Unauthenticated)?;
        let refreshed = self
            .identity_provider
            .fresh_token(&identity)
            .await
            .map_err(|source| DashboardError::network("identity.refresh", source))?;
        let mut state = self.lock();
        if let Some(current) = state.identity.as_mut()
            && current.uid == refreshed.user_id
        {
            current.rotate_refresh_token(refreshed.refresh_token);
        }
        drop(state);
        Ok(refreshed.id_token)
    }

    /// Current identity, if signed in.
    #[must_use]
    pub fn identity(&self) -> Option<IdentitySession> {
        self.lock().identity.clone()
    }

    /// Whether start-up has not yet resolved the identity.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Last fetched backend profile.
    #[must_use]
    pub fn profile(&self) -> Option<DoctorProfile> {
        self.lock().profile.clone()
    }

    /// Re-fetch the backend profile. A missing profile clears the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Unauthenticated`] or [`DashboardError::Network`];
    /// the cached profile is cleared on failure.
    pub async fn refresh_profile(&self) -> DashboardResult<Option<DoctorProfile>> {
        let fetched = match self.token().await {
            Ok(token) => self
                .backend
                .get_profile(&token)
                .await
                .map_err(|source| DashboardError::network("profile.get", source)),
            Err(err) => Err(err),
        };
        let mut state = self.lock();
        match fetched {
            Ok(profile) => {
                state.profile.clone_from(&profile);
                Ok(profile)
            }
            Err(err) => {
                state.profile = None;
                Err(err)
            }
        }
    }

    /// Update the display name on the backend profile, then refresh it.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Unauthenticated`] or [`DashboardError::Network`].
    pub async fn update_profile(&self, name: Option<String>) -> DashboardResult<DoctorProfile> {
        let identity = self.identity().ok_or(DashboardError::Unauthenticated)?;
        let email = match identity.email.or_else(|| self.profile().map(|p| p.email)) {
            Some(email) => email,
            None => self
                .refresh_profile()
                .await?
                .map(|profile| profile.email)
                .unwrap_or_default(),
        };
        let token = self.token().await?;
        let body = ProfileUpsert {
            email,
            name: name.map(|value| value.trim().to_string()).filter(|value| !value.is_empty()),
        };
        let updated = self
            .backend
            .upsert_profile(&token, &body)
            .await
            .map_err(|source| DashboardError::network("profile.upsert", source))?;
        match self.refresh_profile().await? {
            Some(profile) => Ok(profile),
            None => {
                self.lock().profile = Some(updated.clone());
                Ok(updated)
            }
        }
    }

    async fn establish(
        &self,
        identity: IdentitySession,
        name: Option<String>,
    ) -> DashboardResult<IdentitySession> {
        {
            let mut state = self.lock();
            state.identity = Some(identity.clone());
            state.profile = None;
            state.loading = false;
        }
        info!(uid = %identity.uid, "signed in");

        if let Err(err) = self.sync_profile(&identity, name).await {
            warn!(error = %err, detail = ?err.detail(), "profile sync after sign-in failed");
        }
        Ok(identity)
    }

    async fn sync_profile(
        &self,
        identity: &IdentitySession,
        name: Option<String>,
    ) -> DashboardResult<()> {
        let token = self.token().await?;
        let body = ProfileUpsert {
            email: identity.email.clone().unwrap_or_default(),
            name,
        };
        self.backend
            .upsert_profile(&token, &body)
            .await
            .map_err(|source| DashboardError::network("profile.upsert", source))?;
        self.refresh_profile().await?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("session state lock was poisoned; continuing with last state");
            PoisonError::into_inner(poisoned)
        })
    }
}

fn require_credentials(email: &str, password: &str) -> DashboardResult<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials.into());
    }
    Ok(())
}
