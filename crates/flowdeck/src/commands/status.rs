//! Connection status handler.

use serde::Serialize;

use flowdeck_core::{FlowService, redacted_url};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct StatusReport {
    state: String,
    backend: String,
    provider: String,
    url: String,
}

pub async fn handle(service: &FlowService, global: &GlobalOpts) -> Result<(), CliError> {
    // Connecting is the point of the command: capabilities() reuses the
    // live provider or establishes one.
    let caps = service.capabilities().await?;
    let state = service.manager().state().borrow().clone();

    let report = StatusReport {
        state: state.to_string(),
        backend: caps.display_name.to_owned(),
        provider: caps.kind.to_string(),
        url: redacted_url(&service.config().url),
    };

    let out = output::render_single(
        &global.output,
        &report,
        |r| {
            format!(
                "State:    {}\nBackend:  {}\nProvider: {}\nURL:      {}",
                r.state, r.backend, r.provider, r.url
            )
        },
        |r| r.state.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
