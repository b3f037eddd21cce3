use crate::error::{TrainingError, TrainingResult};
use nlu_abstraction::{EntityType, LabeledUtterance};
use std::collections::HashSet;

/// Checks training inputs before anything is sent to a provider.
pub fn validate_training_arguments(utterances: &[LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<()> {
    let mut names = HashSet::new();
    for (idx, entity_type) in entity_types.iter().enumerate() {
        if entity_type.name.trim().is_empty() {
            return Err(TrainingError::invalid_argument("entity_types", format!("entity type {idx} has no name")));
        }
        if !names.insert(entity_type.name.as_str()) {
            return Err(TrainingError::invalid_argument(
                "entity_types",
                format!("entity type '{}' is defined more than once", entity_type.name),
            ));
        }
    }

    for (idx, utterance) in utterances.iter().enumerate() {
        if utterance.text.trim().is_empty() {
            return Err(TrainingError::invalid_argument("utterances", format!("utterance {idx} has no text")));
        }
        if utterance.intent.as_deref().is_none_or(|intent| intent.trim().is_empty()) {
            return Err(TrainingError::invalid_argument(
                "utterances",
                format!("utterance '{}' has no intent", utterance.text),
            ));
        }
        for entity in &utterance.entities {
            if entity.match_text.as_deref().is_none_or(str::is_empty) {
                return Err(TrainingError::invalid_argument(
                    "utterances",
                    format!("entity '{}' in utterance '{}' has no matchText", entity.entity_type, utterance.text),
                ));
            }
        }
    }

    Ok(())
}
