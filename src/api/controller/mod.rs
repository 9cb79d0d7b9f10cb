pub mod inspect;
pub mod state;
