pub mod client;
pub mod codec;
pub mod connection;
pub mod types;

pub use client::NutClient;
pub use connection::ConnectionManager;
