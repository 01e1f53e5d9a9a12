//! Discord surface: panel UI, interaction routing and DM delivery

pub mod courier;
pub mod handler;
pub mod panel;
pub mod session;

pub use session::BotSession;
