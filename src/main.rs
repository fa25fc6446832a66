use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use diceblocks::events::{EventBus, EventRecord};
use diceblocks::field::DiceField;
use diceblocks::model::{Workspace, WorkspaceDoc};
use diceblocks::operations;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a workspace file and apply dice variable operations", long_about = None)]
struct Cli {
    /// Workspace .json file or binary .dws snapshot
    #[arg(value_name = "WORKSPACE_FILE")]
    workspace_file: String,

    /// Cascade-delete this dice variable before printing
    #[arg(long, value_name = "NAME")]
    delete: Option<String>,

    /// Print the fired dice events (wire form) instead of the workspace
    #[arg(long)]
    events: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = Utf8PathBuf::from(&cli.workspace_file);
    let mut workspace: Workspace = if path.extension() == Some("dws") {
        WorkspaceDoc::load_from_binary(&path)
            .with_context(|| format!("Failed to load snapshot {}", path))?
            .workspace
    } else {
        let text =
            std::fs::read_to_string(&path).with_context(|| format!("Open {}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path))?
    };

    let mut bus = EventBus::new();
    if let Some(name) = &cli.delete {
        let mut field = DiceField::new("cli", "diceMenu");
        bus.set_group(true);
        operations::remove_dice_variable(name, &mut workspace, &mut bus, &mut field);
        bus.set_group(false);
    }

    if cli.events {
        let records: Vec<EventRecord> = bus.dice_events().map(|e| e.encode()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&workspace)?);
    }
    Ok(())
}
