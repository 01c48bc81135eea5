//! Current track, current list and playback rate.
//!
//! `current_list` is the list `current_track` was drawn from. It is empty
//! whenever there is no current track.

use core_library::{PlaybackRate, Track, TrackList};

use crate::store::Slice;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub current_track: Option<Track>,
    pub current_list: TrackList,
    pub rate: PlaybackRate,
}

impl PlayerState {
    pub fn current_track_id(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.id.as_str())
    }

    /// Position of the current track in the current list (first occurrence).
    pub fn current_index(&self) -> Option<usize> {
        self.current_track_id()
            .and_then(|id| self.current_list.index_of(id))
    }
}

#[derive(Debug, Clone)]
pub enum PlayerAction {
    SetCurrentTrack(Track),
    /// Track and list replaced in one transition.
    SetNowPlaying { track: Track, list: TrackList },
    SetRate(PlaybackRate),
    /// Drop the track and list. The rate is kept.
    Reset,
}

pub struct PlayerSlice;

impl Slice for PlayerSlice {
    const NAME: &'static str = "player";
    type State = PlayerState;
    type Action = PlayerAction;

    fn reduce(state: &mut PlayerState, action: PlayerAction) {
        match action {
            PlayerAction::SetCurrentTrack(track) => state.current_track = Some(track),
            PlayerAction::SetNowPlaying { track, list } => {
                state.current_track = Some(track);
                state.current_list = list;
            }
            PlayerAction::SetRate(rate) => state.rate = rate,
            PlayerAction::Reset => {
                state.current_track = None;
                state.current_list = TrackList::empty();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SliceStore;
    use core_library::{ListProvenance, Owner};

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: id.to_uppercase(),
            url: format!("https://cdn.test/{}.mp3", id),
            poster: None,
            owner: Owner {
                id: "u1".to_string(),
                name: "Host".to_string(),
            },
            category: "Arts".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_initial_state() {
        let state = PlayerState::default();
        assert!(state.current_track.is_none());
        assert!(state.current_list.is_empty());
        assert_eq!(state.rate, PlaybackRate::NORMAL);
    }

    #[test]
    fn test_now_playing_and_index() {
        let store = SliceStore::<PlayerSlice>::default();
        let list = TrackList::new(vec![track("a"), track("b")], ListProvenance::Latest);
        store.dispatch(PlayerAction::SetNowPlaying {
            track: track("b"),
            list,
        });

        let state = store.get();
        assert_eq!(state.current_track_id(), Some("b"));
        assert_eq!(state.current_index(), Some(1));
    }

    #[test]
    fn test_reset_keeps_rate() {
        let store = SliceStore::<PlayerSlice>::default();
        let rate = PlaybackRate::new(1.5).unwrap();
        store.dispatch(PlayerAction::SetRate(rate));
        store.dispatch(PlayerAction::SetNowPlaying {
            track: track("a"),
            list: TrackList::from(vec![track("a")]),
        });
        store.dispatch(PlayerAction::Reset);

        let state = store.get();
        assert!(state.current_track.is_none());
        assert!(state.current_list.is_empty());
        assert_eq!(state.rate, rate);
    }
}
