//! Playlist picker coordination between screens that are not co-located.

use crate::store::Slice;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistModalState {
    pub visible: bool,
    pub selected_list_id: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum PlaylistModalAction {
    SetVisible(bool),
    SetSelectedListId(Option<String>),
    SetPrivate(Option<bool>),
}

pub struct PlaylistModalSlice;

impl Slice for PlaylistModalSlice {
    const NAME: &'static str = "playlistModal";
    type State = PlaylistModalState;
    type Action = PlaylistModalAction;

    fn reduce(state: &mut PlaylistModalState, action: PlaylistModalAction) {
        match action {
            PlaylistModalAction::SetVisible(visible) => state.visible = visible,
            PlaylistModalAction::SetSelectedListId(id) => state.selected_list_id = id,
            PlaylistModalAction::SetPrivate(is_private) => state.is_private = is_private,
        }
    }
}
