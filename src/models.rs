pub mod agenda;
pub mod application;
pub mod auth;
