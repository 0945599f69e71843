pub mod agenda;
pub mod applications;
pub mod auth;
