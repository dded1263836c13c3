//! `cairn validate`: check a workflow document without executing it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cairn_engine::validate_document;
use cairn_types::WorkflowDocument;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the workflow document (JSON)
    #[arg(short, long)]
    pub workflow: PathBuf,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    let doc = WorkflowDocument::from_file(&args.workflow)
        .with_context(|| format!("loading workflow {}", args.workflow.display()))?;

    let violations = validate_document(&doc);
    if violations.is_empty() {
        println!("{}: ok ({} steps)", args.workflow.display(), doc.workflow.len());
        return Ok(());
    }

    for violation in &violations {
        println!("{}", violation);
    }
    anyhow::bail!("{} violation(s) found", violations.len());
}
