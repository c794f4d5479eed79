//! Flow command handlers.

use std::fmt::Write;
use std::time::Duration;

use tabled::Tabled;

use flowdeck_core::{FlowNode, FlowService, FlowSummary, FlowTree};

use crate::cli::{FlowsArgs, FlowsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Poll cadence in watch mode, matching the dashboard's refresh.
const WATCH_INTERVAL: Duration = Duration::from_secs(2);

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Flow")]
    name: String,
    #[tabled(rename = "Queue")]
    queue: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Jobs")]
    jobs: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl From<&FlowSummary> for FlowRow {
    fn from(f: &FlowSummary) -> Self {
        Self {
            id: f.id.clone(),
            name: f.name.clone(),
            queue: f.queue_name.clone(),
            status: f.status.to_string(),
            jobs: format!(
                "{} total / {} ok / {} failed",
                f.total_jobs, f.completed_jobs, f.failed_jobs
            ),
            created: f.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    service: &FlowService,
    args: FlowsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FlowsCommand::List => {
            let flows = service.list_flows().await?;
            let out =
                output::render_list(&global.output, &flows, |f| FlowRow::from(f), |f| f.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FlowsCommand::Get {
            queue,
            flow_id,
            watch,
        } => {
            loop {
                let tree = service.get_flow(&queue, &flow_id).await?;
                let live = tree.is_live();

                let out =
                    output::render_single(&global.output, &tree, render_tree, |t| t.id.clone());
                output::print_output(&out, global.quiet);

                // Each snapshot decides whether polling continues: once
                // every job is terminal there is nothing left to watch.
                if !watch || !live {
                    return Ok(());
                }
                tokio::time::sleep(WATCH_INTERVAL).await;
            }
        }
    }
}

// ── Tree rendering ──────────────────────────────────────────────────

fn render_tree(tree: &FlowTree) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Flow {} on '{}' -- {} total / {} completed / {} failed{}",
        tree.id,
        tree.queue_name,
        tree.total_nodes,
        tree.completed_nodes,
        tree.failed_nodes,
        if tree.is_live() { " (live)" } else { "" },
    );
    render_node(&tree.root, 0, &mut out);
    out
}

fn render_node(node: &FlowNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let reason = node
        .failed_reason
        .as_deref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "{indent}{} [{}] {}{reason}",
        node.id, node.status, node.name
    );
    for child in node.children.as_deref().unwrap_or_default() {
        render_node(child, depth + 1, out);
    }
}
