//! `cairn run`: execute a workflow document.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};
use tracing::info;

use cairn_engine::{Catalog, HandlerRegistry, SkillFn, WorkflowExecutor};
use cairn_types::WorkflowDocument;

#[derive(Args)]
pub struct RunArgs {
    /// Path to the workflow document (JSON)
    #[arg(short, long)]
    pub workflow: PathBuf,

    /// Path to the capability catalog (JSON). Without one, every
    /// capability degrades to mock output.
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Pretty-print the run result
    #[arg(long)]
    pub pretty: bool,
}

/// Builtin diagnostic skills.
///
/// `std.echo` returns its resolved inputs unchanged and `std.passthrough`
/// forwards its `value` input, so a document can be smoke-run end to end
/// while everything else mocks.
pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();

    let echo: SkillFn =
        Arc::new(|inputs| Box::pin(async move { Ok(Value::Object(inputs.into_iter().collect())) }));
    registry.register_skill("std", "echo", echo);

    let passthrough: SkillFn = Arc::new(|inputs| {
        Box::pin(async move {
            Ok(json!({ "value": inputs.get("value").cloned().unwrap_or(Value::Null) }))
        })
    });
    registry.register_skill("std", "passthrough", passthrough);

    registry
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let doc = WorkflowDocument::from_file(&args.workflow)
        .with_context(|| format!("loading workflow {}", args.workflow.display()))?;

    let catalog = match &args.catalog {
        Some(path) => Catalog::from_file(path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => Catalog::new(),
    };
    info!(
        workflow = %doc.name,
        steps = doc.workflow.len(),
        capabilities = catalog.len(),
        "Executing workflow"
    );

    let executor = WorkflowExecutor::new(Arc::new(catalog), Arc::new(builtin_registry()));
    let result = executor.execute(&doc).await;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{rendered}");

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
