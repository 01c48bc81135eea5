//! Session lifecycle: restore on start, sign in, log out.

use core_api::ApiClient;
use core_auth::SessionToken;
use core_library::Profile;
use core_playback::PlaybackController;
use core_state::{AuthAction, AuthSlice, SliceStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{CoreError, Result};
use crate::notifications::NotificationCoordinator;

#[derive(Clone)]
pub struct Session {
    api: ApiClient,
    auth: SliceStore<AuthSlice>,
    player: Arc<PlaybackController>,
    notifications: NotificationCoordinator,
}

impl Session {
    pub fn new(
        api: ApiClient,
        auth: SliceStore<AuthSlice>,
        player: Arc<PlaybackController>,
        notifications: NotificationCoordinator,
    ) -> Self {
        Self {
            api,
            auth,
            player,
            notifications,
        }
    }

    /// Load the profile for a stored token, if there is one.
    ///
    /// Returns whether a session was restored. Failures are reported and
    /// leave the user signed out.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<bool> {
        let _busy = BusyGuard::new(&self.auth);

        let restored = async {
            if !self.api.tokens().has_token().await? {
                return Ok::<_, CoreError>(None);
            }
            Ok(Some(self.api.is_auth().await?))
        }
        .await;

        match restored {
            Ok(Some(profile)) => {
                info!(user_id = %profile.id, "Session restored");
                self.signed_in(profile);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(error) => {
                warn!(error = %error, "Session restore failed");
                self.notifications.report(&error);
                Err(error)
            }
        }
    }

    /// Persist a token obtained from a sign-in flow and mark the user signed in.
    #[instrument(skip(self, token, profile), fields(user_id = %profile.id))]
    pub async fn sign_in(&self, token: SessionToken, profile: Profile) -> Result<()> {
        if let Err(error) = self.api.tokens().store(&token).await {
            let error = CoreError::from(error);
            self.notifications.report(&error);
            return Err(error);
        }
        self.signed_in(profile);
        Ok(())
    }

    /// Log out on the server, then forget the token, the profile and
    /// whatever was playing.
    #[instrument(skip(self))]
    pub async fn logout(&self, from_all: bool) -> Result<()> {
        let _busy = BusyGuard::new(&self.auth);

        let result = async {
            self.api.logout(from_all).await?;
            self.api.tokens().clear().await?;
            Ok::<_, CoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.auth.dispatch(AuthAction::UpdateProfile(None));
                self.auth.dispatch(AuthAction::UpdateLoggedIn(false));
                // The session is already gone; a stuck engine only gets logged.
                if let Err(error) = self.player.stop().await {
                    warn!(error = %error, "Player not cleared after logout");
                }
                info!("Logged out");
                Ok(())
            }
            Err(error) => {
                self.notifications.report(&error);
                Err(error)
            }
        }
    }

    fn signed_in(&self, profile: Profile) {
        self.auth.dispatch(AuthAction::UpdateProfile(Some(profile)));
        self.auth.dispatch(AuthAction::UpdateLoggedIn(true));
    }
}

/// Holds `is_busy` for its lifetime.
struct BusyGuard<'a> {
    auth: &'a SliceStore<AuthSlice>,
}

impl<'a> BusyGuard<'a> {
    fn new(auth: &'a SliceStore<AuthSlice>) -> Self {
        auth.dispatch(AuthAction::UpdateBusy(true));
        Self { auth }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.auth.dispatch(AuthAction::UpdateBusy(false));
    }
}
