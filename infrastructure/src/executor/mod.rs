//! Executor implementations
//!
//! [`NativeExecutor`] runs on the host inside a workspace root;
//! [`ContainerExecutor`] runs inside a container provided by a
//! [`ContainerRuntime`]. [`DefaultExecutorFactory`] picks one per run.

pub(crate) mod container;
mod docker_cli;
mod factory;
mod native;
mod runtime;

pub use container::ContainerExecutor;
pub use docker_cli::{DockerCliRuntime, build_create_args, build_exec_args};
pub use factory::DefaultExecutorFactory;
pub use native::NativeExecutor;
pub use runtime::{
    ContainerConfig, ContainerRuntime, ContainerStatus, NetworkMode, RawExecOutput, RuntimeError,
    demultiplex,
};

pub(crate) use container::shell_quote;
