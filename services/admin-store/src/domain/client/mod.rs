//! Client 聚合

mod client;
mod clone;
mod repository;

pub use client::*;
pub use clone::CloneOptions;
pub use repository::ClientRepository;
