//! Container runtime access.
//!
//! Everything that talks to docker goes through the [`ContainerRuntime`]
//! trait. [`ComposeRuntime`] implements it over the docker CLI via
//! [`DockerClient`]; tests substitute a scripted runtime.

pub mod client;
pub mod error;
mod observation;
mod runtime;

pub use client::{ComposeCommand, ComposeProject, DockerClient};
pub use error::DockerError;
pub use observation::{parse_compose_ps, ContainerObservation, ContainerState};
pub use runtime::{ComposeRuntime, ContainerRuntime, ExecOutput, ExecRequest, RuntimeTimeouts};
