//! ApiResource 聚合

mod api_resource;
mod repository;

pub use api_resource::*;
pub use repository::ApiResourceRepository;
