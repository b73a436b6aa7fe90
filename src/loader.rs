use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::registry::CapabilityRegistry;
use crate::types::{DefinitionBase, SandboxDefinition};

/// Sandbox definitions loaded from one or more TOML files
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    definitions: Vec<SandboxDefinition>,
}

impl DefinitionSet {
    /// Create a new DefinitionSetBuilder
    pub fn builder() -> DefinitionSetBuilder {
        DefinitionSetBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&SandboxDefinition> {
        self.definitions.iter().find(|def| def.name == name)
    }

    /// Definitions in load order, sorted by name within each file
    pub fn iter(&self) -> impl Iterator<Item = &SandboxDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Check that every name a definition uses is registered
    pub fn validate(&self, registry: &CapabilityRegistry) -> Result<()> {
        for def in &self.definitions {
            for name in def.uses.resolve(registry) {
                if !registry.contains(&name) {
                    return Err(anyhow::anyhow!(
                        "Sandbox '{}' uses undefined capability '{}'",
                        def.name,
                        name
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Builder for constructing a DefinitionSet
pub struct DefinitionSetBuilder {
    paths: Vec<PathBuf>,
}

impl DefinitionSetBuilder {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Load definitions from a .toml file
    pub fn load_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn build(self) -> Result<DefinitionSet> {
        load_definitions(&self.paths)
    }
}

/// Load sandbox definitions from TOML files
pub fn load_definitions(definition_files: &[PathBuf]) -> Result<DefinitionSet> {
    let mut definitions = Vec::new();
    for path in definition_files {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => definitions.extend(parse_toml_file(path)?),
            Some(_) => return Err(anyhow::anyhow!("Unsupported file type: {}", path.display())),
            None => {
                return Err(anyhow::anyhow!(
                    "File without extension: {}",
                    path.display()
                ));
            }
        }
    }

    let mut all_names = HashSet::new();
    for def in &definitions {
        if !all_names.insert(&def.name) {
            return Err(anyhow::anyhow!("Duplicate definition name: '{}'", def.name));
        }
    }

    Ok(DefinitionSet { definitions })
}

fn parse_toml_file(path: &Path) -> Result<Vec<SandboxDefinition>> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read '{}': {e}", path.display()))?;
    parse_toml_str(&content)
}

pub(crate) fn parse_toml_str(content: &str) -> Result<Vec<SandboxDefinition>> {
    let toml_doc: toml::Value = toml::from_str(content)?;

    let toml::Value::Table(table) = toml_doc else {
        return Err(anyhow::anyhow!(
            "TOML file must contain a table at root level"
        ));
    };

    let mut definitions = Vec::new();
    for (name, value) in table {
        if !matches!(value, toml::Value::Table(_)) {
            return Err(anyhow::anyhow!("Definition '{name}' must be a table"));
        }
        let base: DefinitionBase = value
            .try_into()
            .map_err(|e| anyhow::anyhow!("Failed to parse sandbox '{name}': {e}"))?;
        definitions.push(SandboxDefinition { name, base });
    }
    Ok(definitions)
}
