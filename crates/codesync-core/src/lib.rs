//! Core engine for the CodeSync collaborative execution service.
//!
//! This crate provides the execution pipeline behind the CodeSync API:
//! untrusted code is run inside a disposable, resource-constrained
//! container (with a clearly-degraded local fallback when no isolation
//! backend is reachable) while a static analyzer classifies the code's
//! asymptotic loop nesting without ever executing it. The two results are
//! merged by a stateless composition service.
//!
//! # Architecture Overview
//!
//! - **Execution environments**: Docker-backed sandbox with a local
//!   fallback, both behind the [`CodeExecutor`] trait
//! - **Complexity analysis**: pure syntax-tree traversal producing a
//!   heuristic big-O classification
//! - **Execution service**: composition root merging sandbox output and
//!   analysis into one response, with bounded admission

pub mod complexity;
pub mod errors;
pub mod executors;
pub mod service;
pub mod types;

pub use complexity::analyze;
pub use errors::SandboxError;
pub use executors::sandbox::Sandbox;
pub use executors::{CodeExecutor, ExecutionOutput, SandboxConfig};
pub use service::ExecutionService;
pub use types::{CodeRequest, CodeResponse, ComplexityReport};
