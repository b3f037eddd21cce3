//! Helpers shared by provider payload builders.

use crate::error::{TrainingError, TrainingResult};
use nlu_abstraction::{Entity, EntityType};
use std::ops::Range;

/// Byte range of the `occurrence`-th (zero-based) literal match of
/// `match_text` in `text`. Occurrences may overlap.
pub fn locate_entity(text: &str, match_text: &str, occurrence: usize) -> TrainingResult<Range<usize>> {
    let not_found = || TrainingError::EntityNotFound {
        text: text.to_string(),
        match_text: match_text.to_string(),
        occurrence,
    };
    if match_text.is_empty() {
        return Err(not_found());
    }

    let mut from = 0;
    let mut seen = 0;
    while let Some(offset) = text[from..].find(match_text) {
        let start = from + offset;
        if seen == occurrence {
            return Ok(start..start + match_text.len());
        }
        seen += 1;
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }

    Err(not_found())
}

/// Converts a byte offset into a character offset.
pub fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

/// Looks up the definition an entity mention refers to.
pub fn resolve_entity_type<'a>(entity_types: &'a [EntityType], name: &str) -> TrainingResult<&'a EntityType> {
    entity_types
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| TrainingError::UnknownEntityType(name.to_string()))
}

/// Locates every entity of an utterance, sorted by start offset.
///
/// Fails when two mentions overlap, since neither provider can label that.
pub fn locate_entities<'a>(text: &str, entities: &'a [Entity]) -> TrainingResult<Vec<(Range<usize>, &'a Entity)>> {
    let mut located = Vec::with_capacity(entities.len());
    for entity in entities {
        let match_text = entity.match_text.as_deref().unwrap_or_default();
        located.push((locate_entity(text, match_text, entity.match_index)?, entity));
    }
    located.sort_by_key(|(range, _)| range.start);

    for pair in located.windows(2) {
        if pair[1].0.start < pair[0].0.end {
            return Err(TrainingError::OverlappingEntities {
                text: text.to_string(),
                match_text: pair[1].1.match_text.clone().unwrap_or_default(),
            });
        }
    }

    Ok(located)
}
