//! ids-adapter-postgres - PostgreSQL 适配器

mod connection;
mod error_mapper;
mod migration;
mod result_sets;
mod transaction;

pub use connection::*;
pub use error_mapper::*;
pub use migration::*;
pub use result_sets::*;
pub use transaction::*;
