//! Wordlist files: the lexical data a new project starts from
//!
//! A wordlist names the varieties, views, zones and protosegments of a
//! project together with its entries and their forms. Forms may carry a
//! hand-made alignment vector and a group tag; every form is aligned in each
//! view its variety belongs to.

use crate::error::CliError;
use anyhow::{Context, Result};
use cognate_core::AlignedVector;
use cognate_engine::{EngineConfig, GroupKey, ViewId, Workbench};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Group tag used for forms that name none
pub const DEFAULT_GROUP: &str = "1";

/// Top-level wordlist document
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Wordlist {
    /// Languages or dialects
    #[serde(default)]
    pub varieties: Vec<VarietyDef>,
    /// Ordered selections of varieties
    #[serde(default)]
    pub views: Vec<ViewDef>,
    /// Zones and their protosegments
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    /// Lexical entries
    #[serde(default)]
    pub entries: Vec<EntryDef>,
}

/// A variety
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VarietyDef {
    /// Full name
    pub name: String,
    /// Short name used by views and forms
    #[serde(default)]
    pub abbreviation: String,
}

/// A view over varieties, named by name or abbreviation
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViewDef {
    /// View name
    pub name: String,
    /// Member varieties in column order
    pub members: Vec<String>,
}

/// A zone with its protosegment labels
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneDef {
    /// Zone name
    pub name: String,
    /// Protosegment labels
    #[serde(default)]
    pub protosegments: Vec<String>,
}

/// An entry and its attested forms
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EntryDef {
    /// Gloss identifying the entry
    pub gloss: String,
    /// One form per attestation
    #[serde(default)]
    pub forms: Vec<FormDef>,
}

/// One attested form
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormDef {
    /// Variety name or abbreviation
    pub variety: String,
    /// Source text
    pub text: String,
    /// Alignment vector; all holds when omitted
    #[serde(default)]
    pub vector: Option<String>,
    /// Group tag
    #[serde(default)]
    pub group: Option<String>,
}

impl Wordlist {
    /// Read a wordlist, as TOML when the extension says so and JSON otherwise
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()).into());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read wordlist {}", path.display()))?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let wordlist = if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse wordlist {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse wordlist {}", path.display()))?
        };
        Ok(wordlist)
    }

    /// Number of forms across all entries
    pub fn form_count(&self) -> usize {
        self.entries.iter().map(|e| e.forms.len()).sum()
    }

    /// Build a workbench holding this wordlist
    pub fn build(&self, config: EngineConfig) -> Result<Workbench> {
        let mut workbench = Workbench::new(config);

        for variety in &self.varieties {
            workbench
                .lexicon_mut()
                .add_variety(&variety.name, &variety.abbreviation)
                .with_context(|| format!("variety {}", variety.name))?;
        }
        for view in &self.views {
            let members = view
                .members
                .iter()
                .map(|m| {
                    workbench
                        .lexicon()
                        .variety_named(m)
                        .ok_or_else(|| CliError::UnknownReference(format!("variety {m}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            workbench
                .lexicon_mut()
                .add_view(&view.name, &members)
                .with_context(|| format!("view {}", view.name))?;
        }
        for zone in &self.zones {
            let id = workbench
                .create_zone(&zone.name)
                .with_context(|| format!("zone {}", zone.name))?;
            for label in &zone.protosegments {
                workbench
                    .create_protosegment(id, label)
                    .with_context(|| format!("protosegment {label} in zone {}", zone.name))?;
            }
        }
        for entry in &self.entries {
            add_entry(&mut workbench, entry).with_context(|| format!("entry {}", entry.gloss))?;
        }

        log::info!(
            "Built project with {} entries and {} forms",
            self.entries.len(),
            self.form_count()
        );
        Ok(workbench)
    }
}

fn add_entry(workbench: &mut Workbench, def: &EntryDef) -> Result<()> {
    let entry = workbench.lexicon_mut().add_entry(&def.gloss)?;
    for form in &def.forms {
        let variety = workbench
            .lexicon()
            .variety_named(&form.variety)
            .ok_or_else(|| CliError::UnknownReference(format!("variety {}", form.variety)))?;
        let datum = workbench
            .lexicon_mut()
            .add_datum(entry, variety, &form.text)?;
        let vector = form.vector.as_deref().map(AlignedVector::parse).transpose()?;
        let tag = form.group.as_deref().unwrap_or(DEFAULT_GROUP);

        let views: Vec<ViewId> = workbench
            .lexicon()
            .views()
            .into_iter()
            .filter(|v| {
                workbench
                    .lexicon()
                    .view(*v)
                    .is_some_and(|view| view.members.contains(&variety))
            })
            .collect();
        for view in views {
            workbench.align(view, datum)?;
            if let Some(vector) = &vector {
                workbench.edit_alignment(view, datum, |record| record.set_vector(vector.clone()))?;
            }
            let key = GroupKey {
                view,
                entry,
                tag: tag.to_string(),
            };
            let group = match workbench.lexicon().find_group(&key) {
                Some(group) => group,
                None => workbench.add_group(view, entry, tag)?,
            };
            workbench.assign_group(view, datum, Some(group))?;
        }
    }
    Ok(())
}
