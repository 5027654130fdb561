// Adapters layer: concrete implementations for external systems (http, sqlite, in-memory).

pub mod http;
pub mod memory;
pub mod sqlite;
