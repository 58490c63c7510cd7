//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the value source and audit store
//! interfaces.

pub mod env_source;
pub mod memory_audit_store;
pub mod sql_audit_store;
pub mod ssm_source;
pub mod static_source;

pub use env_source::EnvironmentSource;
pub use memory_audit_store::InMemoryAuditStore;
pub use sql_audit_store::{SqlAuditStore, SqlBackend};
pub use ssm_source::SsmParameterSource;
pub use static_source::StaticValueSource;
