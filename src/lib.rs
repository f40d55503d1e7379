#![allow(unused_assignments)]

//! # stackhub
//!
//! Registry, reconciliation and drift repair for docker compose service stacks.
//!
//! ## Features
//!
//! - **Service Registry**: Durable name → directory records in SQLite, created from compose YAML or ZIP archives
//! - **Status Reconciliation**: Declared services merged with observed containers into a single `RealStatus`
//! - **Consistency Audits**: Registry vs. filesystem, and enabled flag vs. container runtime
//! - **Drift Repair**: Planned or executed fixes (register orphans, drop stale records, start/stop)
//! - **Per-service Locking**: Mutations of one service are serialized, everything else runs concurrently
//! - **API Contract**: Transport-agnostic dispatch with per-call token authorization
//!
//! ## Quick Start
//!
//! ```no_run
//! use stackhub::{Engine, Parser};
//!
//! # async fn example() -> Result<(), stackhub::Error> {
//! let loaded = Parser::new().load(None)?;
//! let engine = Engine::from_settings(&loaded.settings).await?;
//!
//! for view in engine.list().await? {
//!     println!("{} {}", view.record.name, view.real_status.status);
//! }
//!
//! let drift = engine.validate_services().await?;
//! println!("{}% of services match their desired state", drift.summary.validation_percentage);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod archive;
pub mod audit;
pub mod compose;
pub mod config;
pub mod docker;
pub mod engine;
pub mod error;
pub mod layout;
pub mod lifecycle;
pub mod locks;
pub mod reconcile;
pub mod repair;
pub mod state;

// Re-export commonly used types
pub use api::{Api, ApiRequest, ApiResponse, Authorizer};
pub use config::{Parser, Settings};
pub use engine::Engine;
pub use error::{Error, ErrorKind, Result};
pub use reconcile::{RealStatus, StatusKind};
pub use repair::{FixKind, FixReport};
pub use state::{RecordStore, ServiceRecord};
