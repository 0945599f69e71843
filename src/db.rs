pub mod application_repo;
pub use application_repo::{ApplicationStore, PgApplicationRepository};
pub mod profile_repo;
pub use profile_repo::{PgProfileRepository, ProfileStore};
pub mod agenda_repo;
pub use agenda_repo::{AgendaStore, PgAgendaRepository};

#[cfg(test)]
pub mod memory;
