pub mod messages;
pub mod system;
