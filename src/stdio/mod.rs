pub mod gateway;
pub mod metadata;
pub mod server;

pub use server::CommandServer;
