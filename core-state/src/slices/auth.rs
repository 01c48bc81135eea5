//! Signed-in profile and session flags.

use core_library::Profile;

use crate::store::Slice;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub profile: Option<Profile>,
    pub is_logged_in: bool,
    /// A session check or logout is in flight.
    pub is_busy: bool,
}

#[derive(Debug, Clone)]
pub enum AuthAction {
    UpdateProfile(Option<Profile>),
    UpdateLoggedIn(bool),
    UpdateBusy(bool),
}

pub struct AuthSlice;

impl Slice for AuthSlice {
    const NAME: &'static str = "auth";
    type State = AuthState;
    type Action = AuthAction;

    fn reduce(state: &mut AuthState, action: AuthAction) {
        match action {
            AuthAction::UpdateProfile(profile) => state.profile = profile,
            AuthAction::UpdateLoggedIn(logged_in) => state.is_logged_in = logged_in,
            AuthAction::UpdateBusy(busy) => state.is_busy = busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SliceStore;

    fn profile() -> Profile {
        Profile {
            id: "u1".to_string(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            verified: true,
            avatar: None,
            followers: 0,
            followings: 2,
        }
    }

    #[test]
    fn test_sign_in_sequence() {
        let store = SliceStore::<AuthSlice>::default();
        assert_eq!(*store.get(), AuthState::default());

        store.dispatch(AuthAction::UpdateBusy(true));
        store.dispatch(AuthAction::UpdateProfile(Some(profile())));
        store.dispatch(AuthAction::UpdateLoggedIn(true));
        store.dispatch(AuthAction::UpdateBusy(false));

        let state = store.get();
        assert!(state.is_logged_in);
        assert!(!state.is_busy);
        assert_eq!(state.profile.as_ref().map(|p| p.name.as_str()), Some("Ana"));
    }

    #[test]
    fn test_repeated_flag_is_noop() {
        let store = SliceStore::<AuthSlice>::default();
        assert!(store.dispatch(AuthAction::UpdateLoggedIn(true)));
        assert!(!store.dispatch(AuthAction::UpdateLoggedIn(true)));
    }
}
