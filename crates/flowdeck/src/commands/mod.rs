//! Command handlers and dispatch.

pub mod config_cmd;
pub mod flows;
pub mod queues;
pub mod status;

use flowdeck_core::FlowService;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a backend-touching command to its handler. `Config` is handled
/// in `main` before a service is built.
pub async fn dispatch(
    cmd: Command,
    service: &FlowService,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Flows(args) => flows::handle(service, args, global).await,
        Command::Queues(args) => queues::handle(service, args, global).await,
        Command::Status => status::handle(service, global).await,
        Command::Config(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "config commands do not use a backend connection".into(),
        }),
    }
}
