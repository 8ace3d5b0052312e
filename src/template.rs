//! Built-in starting scenes.
//!
//! A template is plain data: a JSON document with `elements` and
//! `connections` in the same shape the scene serializes to. Loading one
//! replaces the whole scene.

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coupling;
use crate::error::SceneError;
use crate::model::{Connection, Element};
use crate::scene::Scene;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template `{0}`")]
    Unknown(String),

    #[error("malformed template: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TemplateData {
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

pub struct Template {
    pub key: &'static str,
    pub title: &'static str,
    source: &'static str,
}

pub const BUILTIN: &[Template] = &[
    Template {
        key: "groundRadiation",
        title: "Ground Radiation Study",
        source: include_str!("../templates/ground_radiation.json"),
    },
    Template {
        key: "drugScreening",
        title: "Drug Screening",
        source: include_str!("../templates/drug_screening.json"),
    },
];

pub fn find(key: &str) -> Option<&'static Template> {
    BUILTIN.iter().find(|t| t.key == key)
}

impl Template {
    pub fn data(&self) -> Result<TemplateData, TemplateError> {
        parse(self.source)
    }
}

/// Parses template JSON and rejects broken timeline couplings. Invalid
/// connections are left in place; [`Scene::replace_all`] drops them.
pub fn parse(source: &str) -> Result<TemplateData, TemplateError> {
    let data: TemplateData = serde_json::from_str(source)?;
    coupling::check(&data.elements)?;
    Ok(data)
}

/// Replaces `scene` with the template named `key`. The scene is untouched
/// when the template cannot be parsed.
pub fn load(scene: &mut Scene, key: &str) -> Result<(), TemplateError> {
    let template = find(key).ok_or_else(|| TemplateError::Unknown(key.to_string()))?;
    let data = template.data()?;
    let (elements, connections) = (data.elements.len(), data.connections.len());
    scene.replace_all(data.elements, data.connections)?;
    scene.check_invariants()?;
    info!(template = key, elements, connections; "Loaded template");
    Ok(())
}
