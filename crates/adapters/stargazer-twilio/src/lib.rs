pub mod config;
pub mod sender;

pub use config::TwilioConfig;
pub use sender::{TwilioSetupError, TwilioSmsSender};
