//! `cairn catalog`: inspect a capability catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use cairn_engine::Catalog;
use cairn_types::HandlerKind;

#[derive(Args)]
pub struct CatalogArgs {
    /// Path to the capability catalog (JSON)
    #[arg(short, long)]
    pub catalog: PathBuf,

    /// Show a single capability in detail
    #[arg(long)]
    pub capability: Option<String>,
}

pub fn execute(args: CatalogArgs) -> Result<()> {
    let catalog = Catalog::from_file(&args.catalog)
        .with_context(|| format!("loading catalog {}", args.catalog.display()))?;

    if let Some(id) = &args.capability {
        let Some(descriptor) = catalog.lookup(id) else {
            anyhow::bail!("capability '{}' not found in {}", id, args.catalog.display());
        };
        println!("{}", serde_json::to_string_pretty(descriptor)?);
        return Ok(());
    }

    for id in catalog.ids() {
        let Some(descriptor) = catalog.lookup(id) else {
            continue;
        };
        let handler = match descriptor.handler_kind() {
            HandlerKind::Agent { agent_type } => format!("agent {}", agent_type),
            HandlerKind::Skill { plugin, function } => format!("skill {}.{}", plugin, function),
            HandlerKind::Unbound => "unbound (mock)".to_string(),
        };
        println!("{:<32} {}", id, handler);
    }
    Ok(())
}
