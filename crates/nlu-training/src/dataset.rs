//! Loading utterances and entity types from JSON files.

use crate::error::{TrainingError, TrainingResult};
use nlu_abstraction::{EntityType, LabeledUtterance};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn read_utterances(path: &Path) -> TrainingResult<Vec<LabeledUtterance>> {
    read_json_array(path, "utterances")
}

pub fn read_entity_types(path: &Path) -> TrainingResult<Vec<EntityType>> {
    read_json_array(path, "entity_types")
}

/// Writes `items` as an indented JSON array, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, items: &T) -> TrainingResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(items)?)?;
    Ok(())
}

fn read_json_array<T: DeserializeOwned>(path: &Path, parameter: &'static str) -> TrainingResult<Vec<T>> {
    let contents = std::fs::read_to_string(path)?;
    let items: Vec<Option<T>> = serde_json::from_str(&contents).map_err(|e| {
        TrainingError::invalid_argument(parameter, format!("failed to parse {}: {}", path.display(), e))
    })?;

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            item.ok_or_else(|| TrainingError::invalid_argument(parameter, format!("element {idx} is null")))
        })
        .collect()
}
