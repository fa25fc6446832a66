//! Binary workspace snapshot round-trip and format checks.

use anyhow::Result;
use diceblocks::model::{Block, Variable, Workspace, WorkspaceDoc};
use diceblocks::operations::DICE_BLOCK_CATEGORY;
use tempfile::NamedTempFile;

fn make_workspace() -> Workspace {
    let mut ws = Workspace::new("ws-snapshot");
    ws.registry.insert(Variable::dice("d1"));
    ws.registry.insert(Variable::dice("d2"));
    let mut container = Block::new("a", "markov", DICE_BLOCK_CATEGORY);
    let mut child = Block::new("a-c0", "dice_roll", DICE_BLOCK_CATEGORY);
    child.set_field("diceMenu", "d1");
    container.children.push(child);
    ws.blocks.push(container);
    ws
}

#[test]
fn test_binary_roundtrip() -> Result<()> {
    let doc = WorkspaceDoc {
        workspace: make_workspace(),
    };

    let temp_file = NamedTempFile::new()?;
    doc.save_to_binary(temp_file.path())?;
    let loaded = WorkspaceDoc::load_from_binary(temp_file.path())?;

    assert_eq!(loaded.workspace.id, "ws-snapshot");
    assert_eq!(loaded.workspace.registry.len(), 2);
    assert_eq!(loaded.workspace.block_count(), 2);
    assert_eq!(
        loaded.workspace.blocks[0].children[0].field("diceMenu"),
        Some("d1")
    );
    Ok(())
}

#[test]
fn test_rejects_bad_magic() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    std::fs::write(temp_file.path(), b"NOTADICEBLOCKSFILE")?;
    let err = WorkspaceDoc::load_from_binary(temp_file.path())
        .expect_err("bad magic must be rejected");
    assert!(err.to_string().contains("magic"));
    Ok(())
}

#[test]
fn test_rejects_unsupported_version() -> Result<()> {
    let temp_file = NamedTempFile::new()?;
    let mut bytes = b"DICEBLOCKS".to_vec();
    bytes.extend_from_slice(&99u32.to_le_bytes());
    std::fs::write(temp_file.path(), bytes)?;
    let err = WorkspaceDoc::load_from_binary(temp_file.path())
        .expect_err("unknown version must be rejected");
    assert!(err.to_string().contains("version"));
    Ok(())
}

#[test]
fn test_json_roundtrip() -> Result<()> {
    let ws = make_workspace();
    let json = serde_json::to_string_pretty(&ws)?;
    let parsed: Workspace = serde_json::from_str(&json)?;
    assert_eq!(parsed.registry.len(), ws.registry.len());
    assert_eq!(parsed.block_count(), ws.block_count());
    Ok(())
}
