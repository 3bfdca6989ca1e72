//! Kernel services backing the request gate.

pub mod audit;

pub use audit::{AuditLog, AuditService, TracingAudit};
