//! Queue command handlers.

use tabled::Tabled;

use flowdeck_core::FlowService;

use crate::cli::{GlobalOpts, QueuesArgs, QueuesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct QueueRow {
    #[tabled(rename = "Queue")]
    name: String,
}

pub async fn handle(
    service: &FlowService,
    args: QueuesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        QueuesCommand::List => {
            let queues = service.list_queues().await?;
            let out = output::render_list(
                &global.output,
                &queues,
                |name| QueueRow { name: name.clone() },
                Clone::clone,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
