pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod handler;
pub mod mfa;
pub mod role;
pub mod run;
pub mod store;
