mod client;
mod models;

pub use client::{HttpRemote, HttpRemoteBuilder};
