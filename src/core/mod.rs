pub mod client;
pub mod config;
pub mod error;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod test_server;
