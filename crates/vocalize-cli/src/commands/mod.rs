pub mod devices;
pub mod health;
pub mod preview;
pub mod record;
