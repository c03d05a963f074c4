pub mod command;
pub mod config;
pub mod port;
pub mod render;
pub mod server;

pub use render::RenderError;
pub use server::{ServerError, StartDiagnostics};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Render(#[from] render::RenderError),

    #[error(transparent)]
    Port(#[from] port::PortError),

    #[error(transparent)]
    Server(#[from] server::ServerError),

    #[error(transparent)]
    Command(#[from] command::CommandError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}
