/// Middleware modules for the API server
///
/// - `security`: Security headers on every response
/// - `session`: Session gate in front of every protected path

pub mod security;
pub mod session;
