//! Application layer - Ports and the streaming session use case.

/// Port interfaces for the terminal collaborators.
pub mod ports;

/// Application services driving the domain.
pub mod services;
