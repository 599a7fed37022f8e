// Context Store: fingerprinted, versioned run directories plus read-only history endpoints.

pub mod handlers;
pub mod store;
