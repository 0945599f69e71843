pub mod agenda_service;
pub mod auth;
pub mod board_service;
pub mod kanban_flow;
pub mod sla;
