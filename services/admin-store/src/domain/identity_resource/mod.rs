//! IdentityResource 聚合

mod identity_resource;
mod repository;

pub use identity_resource::*;
pub use repository::IdentityResourceRepository;
