pub mod cards;
pub mod owner;
pub mod sessions;
