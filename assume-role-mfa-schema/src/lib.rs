pub mod credentials;
pub mod profile;
