use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// WorkspaceDoc – binary snapshot wrapper
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDoc {
    pub workspace: Workspace,
}

impl WorkspaceDoc {
    /// Save the WorkspaceDoc to a binary file with magic bytes and versioning.
    pub fn save_to_binary<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        std::io::Write::write_all(&mut writer, b"DICEBLOCKS")?;
        std::io::Write::write_all(&mut writer, &1u32.to_le_bytes())?;
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())?;
        Ok(())
    }

    /// Load a WorkspaceDoc from a binary file, checking magic bytes and version.
    pub fn load_from_binary<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        let mut magic = [0u8; 10];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if &magic != b"DICEBLOCKS" {
            anyhow::bail!("Invalid magic bytes: expected 'DICEBLOCKS'");
        }
        let mut version_bytes = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);
        if version != 1 {
            anyhow::bail!("Unsupported version: {}", version);
        }
        let doc: WorkspaceDoc =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())?;
        Ok(doc)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Variables
// ────────────────────────────────────────────────────────────────────────────

/// Variable kind used by dice dropdown fields.
pub const DICE_KIND: &str = "dice";

/// A named, typed workspace variable.
///
/// Dice variables carry `kind == "dice"`. Names are unique per workspace;
/// uniqueness is enforced by [`VariableRegistry::insert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: String,
}

impl Variable {
    /// Create a dice-kind variable.
    pub fn dice(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: DICE_KIND.to_string(),
        }
    }
}

/// Insertion-ordered store of workspace variables.
///
/// The ordering is part of the contract: after a cascade delete, the *first
/// remaining* dice variable (in insertion order) becomes the fallback
/// selection. `IndexMap` preserves that order across inserts and
/// `shift_remove`-based deletes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableRegistry {
    variables: IndexMap<String, Variable>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable. Returns false (and leaves the registry unchanged)
    /// if a variable with the same name already exists.
    pub fn insert(&mut self, variable: Variable) -> bool {
        if self.variables.contains_key(&variable.name) {
            return false;
        }
        self.variables.insert(variable.name.clone(), variable);
        true
    }

    /// Look up a variable by name.
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Delete a variable by name, preserving the order of the remaining
    /// entries. Deleting an absent name is a no-op and returns false.
    pub fn delete(&mut self, name: &str) -> bool {
        self.variables.shift_remove(name).is_some()
    }

    /// Rename a variable in place, keeping its position in the insertion
    /// order. No-op (returning false) if `old` is absent or `new` is taken.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if old == new || self.variables.contains_key(new) {
            return false;
        }
        let Some(index) = self.variables.get_index_of(old) else {
            return false;
        };
        let Some(mut variable) = self.variables.shift_remove(old) else {
            return false;
        };
        variable.name = new.to_string();
        self.variables.shift_insert(index, new.to_string(), variable);
        true
    }

    /// All variables of the given kind, in insertion order.
    pub fn variables_of_kind<'a, 'b>(
        &'a self,
        kind: &'b str,
    ) -> impl Iterator<Item = &'a Variable> + use<'a, 'b> {
        self.variables.values().filter(move |v| v.kind == kind)
    }

    /// The first variable of the given kind in insertion order, if any.
    pub fn first_of_kind(&self, kind: &str) -> Option<&Variable> {
        self.variables_of_kind(kind).next()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Blocks
// ────────────────────────────────────────────────────────────────────────────

/// A block in the workspace tree.
///
/// `fields` maps field names to their current string values in insertion
/// order. A block referencing a dice variable holds the variable's *name* in
/// one of its fields — a weak relation: neither side owns the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub block_type: String,
    /// Toolbox category of the block (e.g. `"Let's Chance"`).
    pub category: String,
    #[serde(default)]
    pub fields: IndexMap<String, String>,
    /// Directly attached child blocks. Disposing a child drops its entire
    /// subtree.
    #[serde(default)]
    pub children: Vec<Block>,
}

impl Block {
    pub fn new(id: &str, block_type: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            block_type: block_type.to_string(),
            category: category.to_string(),
            fields: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// The value of the named field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set_field(&mut self, name: &str, value: &str) {
        self.fields.insert(name.to_string(), value.to_string());
    }

    /// Number of blocks in this subtree, including this block.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Block::subtree_len).sum::<usize>()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Workspace
// ────────────────────────────────────────────────────────────────────────────

/// A workspace: the variable registry plus the forest of top-level blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub registry: VariableRegistry,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Workspace {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            registry: VariableRegistry::new(),
            blocks: Vec::new(),
        }
    }

    /// All blocks in the workspace, preorder.
    pub fn all_blocks(&self) -> Vec<&Block> {
        fn walk<'a>(block: &'a Block, out: &mut Vec<&'a Block>) {
            out.push(block);
            for child in &block.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for block in &self.blocks {
            walk(block, &mut out);
        }
        out
    }

    pub fn block_count(&self) -> usize {
        self.blocks.iter().map(Block::subtree_len).sum()
    }
}

/// Resolve a stored field value to the dice variable name it references.
///
/// Stored values may carry a `"||"`-separated payload suffix
/// (e.g. `"d6||weighted"`); the referenced name is the prefix before the
/// first `"||"`.
pub fn resolved_name(value: &str) -> &str {
    value.find("||").map_or(value, |i| &value[..i])
}
