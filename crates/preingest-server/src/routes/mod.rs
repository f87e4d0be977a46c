pub mod actions;
pub mod checksum;
pub mod events;
pub mod health;
