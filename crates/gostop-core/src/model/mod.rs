pub mod action;
pub mod captured;
pub mod card;
pub mod combo;
pub mod economy;
pub mod player;
pub mod score;
pub mod snapshot;
pub mod state;
