//! LUIS app document and prediction mapping.

use super::client::{EntityModel, LuisResult};
use crate::json::merge_json;
use nlu_abstraction::{Entity, EntityType, EntityTypeKind, LabeledUtterance};
use nlu_training::payload::{char_offset, locate_entities, resolve_entity_type};
use nlu_training::TrainingResult;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Intent LUIS requires in every app.
pub const NONE_INTENT: &str = "None";

const LUIS_SCHEMA_VERSION: &str = "3.0.0";
const BUILTIN_PREFIX: &str = "builtin.";

/// Builds the import document for one app version.
///
/// `template` is merged over the empty skeleton before training data is
/// added, so intents and entities it declares are kept.
pub fn build_app_json(
    app_name: &str,
    version_id: &str,
    utterances: &[LabeledUtterance],
    entity_types: &[EntityType],
    template: &Value,
) -> TrainingResult<Value> {
    let mut app = json!({
        "luis_schema_version": LUIS_SCHEMA_VERSION,
        "versionId": version_id,
        "name": app_name,
        "desc": "",
        "culture": "en-us",
        "intents": [],
        "entities": [],
        "composites": [],
        "closedLists": [],
        "patternAnyEntities": [],
        "regex_entities": [],
        "prebuiltEntities": [],
        "model_features": [],
        "regex_features": [],
        "patterns": [],
        "utterances": [],
    });
    merge_json(&mut app, template.clone());

    let mut intents: Vec<&str> = utterances.iter().filter_map(|u| u.intent.as_deref()).collect();
    intents.push(NONE_INTENT);
    for intent in intents {
        push_unique(&mut app["intents"], json!({ "name": intent }));
    }

    for entity_type in entity_types {
        let (section, entry) = match &entity_type.kind {
            EntityTypeKind::Simple => ("entities", json!({ "name": entity_type.name, "children": [], "roles": [] })),
            EntityTypeKind::Builtin { builtin_id } => ("prebuiltEntities", json!({ "name": builtin_id, "roles": [] })),
            EntityTypeKind::List { values } => {
                let sub_lists: Vec<Value> = values
                    .iter()
                    .map(|set| json!({ "canonicalForm": set.canonical_form, "list": set.synonyms }))
                    .collect();
                ("closedLists", json!({ "name": entity_type.name, "subLists": sub_lists, "roles": [] }))
            }
        };
        push_unique(&mut app[section], entry);
    }

    let labeled = utterances
        .iter()
        .map(|utterance| utterance_json(utterance, entity_types))
        .collect::<TrainingResult<Vec<_>>>()?;
    if let Some(list) = app["utterances"].as_array_mut() {
        list.extend(labeled);
    }

    Ok(app)
}

/// Labeled example with inclusive character offsets. Builtin mentions are
/// recognized by LUIS itself and are left unlabeled.
fn utterance_json(utterance: &LabeledUtterance, entity_types: &[EntityType]) -> TrainingResult<Value> {
    let text = utterance.text.as_str();
    let mut entities = Vec::new();
    for (range, entity) in locate_entities(text, &utterance.entities)? {
        let entity_type = resolve_entity_type(entity_types, &entity.entity_type)?;
        if matches!(entity_type.kind, EntityTypeKind::Builtin { .. }) {
            continue;
        }
        entities.push(json!({
            "entity": entity.entity_type,
            "startPos": char_offset(text, range.start),
            "endPos": char_offset(text, range.end) - 1,
        }));
    }

    Ok(json!({
        "text": text,
        "intent": utterance.intent,
        "entities": entities,
    }))
}

fn push_unique(section: &mut Value, entry: Value) {
    let Some(list) = section.as_array_mut() else {
        return;
    };
    if !list.iter().any(|existing| existing.get("name") == entry.get("name")) {
        list.push(entry);
    }
}

/// Maps a prediction back onto the utterance model.
///
/// Prebuilt entity types come back as `builtin.<id>` and are renamed to the
/// user's entity type declaring that id.
pub fn to_labeled_utterance(result: LuisResult, entity_types: &[EntityType]) -> LabeledUtterance {
    let renamed: HashMap<String, &str> = entity_types
        .iter()
        .filter_map(|entity_type| match &entity_type.kind {
            EntityTypeKind::Builtin { builtin_id } => Some((format!("{BUILTIN_PREFIX}{builtin_id}"), entity_type.name.as_str())),
            _ => None,
        })
        .collect();

    let query: Vec<char> = result.query.chars().collect();
    let entities = result
        .entities
        .iter()
        .map(|entity| {
            let entity_type = renamed.get(&entity.entity_type).map_or_else(|| entity.entity_type.clone(), |n| (*n).to_string());
            let match_text = matched_text(&query, entity);
            let match_index = occurrence_at(&query, &match_text.chars().collect::<Vec<_>>(), entity.start_index);
            Entity::new(entity_type, entity_value(entity), Some(match_text), match_index)
        })
        .collect();

    LabeledUtterance::new(result.query, result.top_scoring_intent.map(|i| i.intent), entities)
}

/// The query slice LUIS matched, falling back to its normalized copy.
fn matched_text(query: &[char], entity: &EntityModel) -> String {
    if entity.end_index >= entity.start_index && entity.end_index < query.len() {
        query[entity.start_index..=entity.end_index].iter().collect()
    } else {
        entity.entity.clone()
    }
}

/// Resolved value: `resolution.value`, else the first of `resolution.values`.
fn entity_value(entity: &EntityModel) -> Option<Value> {
    let resolution = entity.resolution.as_ref()?;
    if let Some(value) = resolution.get("value").filter(|v| !v.is_null()) {
        return Some(value.clone());
    }
    let first = resolution.get("values")?.get(0)?;
    match first.get("value") {
        Some(value) => Some(value.clone()),
        None => Some(first.clone()),
    }
}

/// Zero-based occurrence (case-insensitive, overlaps allowed) of `needle`
/// that starts at `start`. Defaults to 0 when none starts there.
fn occurrence_at(haystack: &[char], needle: &[char], start: usize) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    let matches_at = |i: usize| {
        haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    };

    let mut occurrence = 0;
    for i in 0..=haystack.len() - needle.len() {
        if matches_at(i) {
            if i == start {
                return occurrence;
            }
            occurrence += 1;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::luis::client::IntentModel;
    use nlu_abstraction::SynonymSet;

    fn types() -> Vec<EntityType> {
        vec![
            EntityType::simple("City"),
            EntityType::builtin("Count", "number"),
            EntityType::list("Size", vec![SynonymSet::new("large", vec!["big".to_string()])]),
        ]
    }

    #[test]
    fn test_app_skeleton_and_intents() {
        let utterances = vec![
            LabeledUtterance::new("fly to paris", Some("Travel".to_string()), vec![]),
            LabeledUtterance::new("fly to rome", Some("Travel".to_string()), vec![]),
        ];

        let app = build_app_json("TravelApp", "0.1.1", &utterances, &[], &Value::Null).unwrap();

        assert_eq!(app["luis_schema_version"], "3.0.0");
        assert_eq!(app["versionId"], "0.1.1");
        assert_eq!(app["culture"], "en-us");
        assert_eq!(app["intents"], json!([{ "name": "Travel" }, { "name": "None" }]));
        assert_eq!(app["utterances"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_entity_kinds_and_positions() {
        let utterances = vec![LabeledUtterance::new(
            "book 2 big rooms in café city",
            Some("Book".to_string()),
            vec![
                Entity::new("Count", None, Some("2".to_string()), 0),
                Entity::new("Size", None, Some("big".to_string()), 0),
                Entity::new("City", None, Some("café city".to_string()), 0),
            ],
        )];

        let app = build_app_json("App", "1.0", &utterances, &types(), &Value::Null).unwrap();

        assert_eq!(app["entities"], json!([{ "name": "City", "children": [], "roles": [] }]));
        assert_eq!(app["prebuiltEntities"], json!([{ "name": "number", "roles": [] }]));
        assert_eq!(
            app["closedLists"],
            json!([{ "name": "Size", "subLists": [{ "canonicalForm": "large", "list": ["big"] }], "roles": [] }])
        );
        assert_eq!(
            app["utterances"][0]["entities"],
            json!([
                { "entity": "Size", "startPos": 7, "endPos": 9 },
                { "entity": "City", "startPos": 20, "endPos": 28 }
            ])
        );
    }

    #[test]
    fn test_template_intents_not_duplicated() {
        let template = json!({ "intents": [{ "name": "None" }], "desc": "from template" });
        let app = build_app_json("App", "1.0", &[], &[], &template).unwrap();

        assert_eq!(app["intents"], json!([{ "name": "None" }]));
        assert_eq!(app["desc"], "from template");
    }

    #[test]
    fn test_prediction_mapping() {
        let result: LuisResult = serde_json::from_value(json!({
            "query": "Book 2 rooms in Paris and paris",
            "topScoringIntent": { "intent": "Book", "score": 0.98 },
            "entities": [
                { "entity": "2", "type": "builtin.number", "startIndex": 5, "endIndex": 5, "resolution": { "value": "2" } },
                { "entity": "paris", "type": "City", "startIndex": 26, "endIndex": 30 },
                { "entity": "big", "type": "Size", "startIndex": 0, "endIndex": 3, "resolution": { "values": ["large"] } }
            ]
        }))
        .unwrap();

        let utterance = to_labeled_utterance(result, &types());

        assert_eq!(utterance.text, "Book 2 rooms in Paris and paris");
        assert_eq!(utterance.intent.as_deref(), Some("Book"));
        assert_eq!(utterance.entities[0], Entity::new("Count", Some(json!("2")), Some("2".to_string()), 0));
        assert_eq!(utterance.entities[1].entity_type, "City");
        assert_eq!(utterance.entities[1].match_index, 1);
        assert_eq!(utterance.entities[1].entity_value, None);
        assert_eq!(utterance.entities[2].entity_value, Some(json!("large")));
    }

    #[test]
    fn test_prediction_without_intent() {
        let result = LuisResult { query: "hmm".to_string(), top_scoring_intent: None, entities: vec![] };
        let utterance = to_labeled_utterance(result, &[]);
        assert!(utterance.intent.is_none());

        let result = LuisResult {
            query: "hi".to_string(),
            top_scoring_intent: Some(IntentModel { intent: "Greet".to_string() }),
            entities: vec![],
        };
        assert_eq!(to_labeled_utterance(result, &[]).intent.as_deref(), Some("Greet"));
    }

    #[test]
    fn test_occurrence_at_is_case_insensitive() {
        let query: Vec<char> = "Paris or PARIS".chars().collect();
        let needle: Vec<char> = "paris".chars().collect();
        assert_eq!(occurrence_at(&query, &needle, 9), 1);
        assert_eq!(occurrence_at(&query, &needle, 3), 0);
    }
}
