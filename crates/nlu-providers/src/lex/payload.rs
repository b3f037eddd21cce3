//! Lex bot import document.

use crate::json::merge_json;
use nlu_abstraction::{EntityType, EntityTypeKind, LabeledUtterance};
use nlu_training::payload::{locate_entities, resolve_entity_type};
use nlu_training::{TrainingError, TrainingResult};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the archive entry Lex reads the bot definition from.
pub const IMPORT_ENTRY: &str = "import.json";

/// Builds the import JSON for `bot_name`, merged with `template`.
pub fn build_import_json(
    bot_name: &str,
    utterances: &[LabeledUtterance],
    entity_types: &[EntityType],
    template: &Value,
) -> TrainingResult<Value> {
    let mut groups: Vec<(&str, Vec<&LabeledUtterance>)> = Vec::new();
    for utterance in utterances {
        let intent = utterance.intent.as_deref().unwrap_or_default();
        match groups.iter_mut().find(|(name, _)| *name == intent) {
            Some((_, members)) => members.push(utterance),
            None => groups.push((intent, vec![utterance])),
        }
    }

    let intents = groups
        .iter()
        .map(|(intent, members)| intent_json(intent, members, entity_types))
        .collect::<TrainingResult<Vec<_>>>()?;

    let slot_types: Vec<Value> = entity_types
        .iter()
        .filter_map(|entity_type| slot_type_json(entity_type, utterances))
        .collect();

    let mut document = json!({
        "metadata": {
            "schemaVersion": "1.0",
            "importType": "LEX",
            "importFormat": "JSON",
        },
        "resource": {
            "name": bot_name,
            "intents": intents,
            "slotTypes": slot_types,
            "voiceId": "0",
            "childDirected": false,
            "locale": "en-US",
            "idleSessionTTLInSeconds": 300,
            "clarificationPrompt": prompt("Sorry, can you please repeat that?", 5),
            "abortStatement": { "messages": [message("Sorry, I could not understand. Goodbye.")] },
        }
    });
    merge_json(&mut document, template.clone());
    Ok(document)
}

/// Zips the import JSON as a single `import.json` entry.
pub fn zip_import(document: &Value) -> TrainingResult<Vec<u8>> {
    let bytes = serde_json::to_vec_pretty(document)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(IMPORT_ENTRY, options).map_err(zip_error)?;
    writer.write_all(&bytes)?;
    Ok(writer.finish().map_err(zip_error)?.into_inner())
}

/// Utterance text with every entity mention replaced by `{EntityType}`.
pub fn sample_utterance(utterance: &LabeledUtterance) -> TrainingResult<String> {
    let text = utterance.text.as_str();
    let mut sample = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, entity) in locate_entities(text, &utterance.entities)? {
        sample.push_str(&text[cursor..range.start]);
        sample.push('{');
        sample.push_str(&entity.entity_type);
        sample.push('}');
        cursor = range.end;
    }
    sample.push_str(&text[cursor..]);
    Ok(sample)
}

fn intent_json(intent: &str, utterances: &[&LabeledUtterance], entity_types: &[EntityType]) -> TrainingResult<Value> {
    let mut slot_names: Vec<&str> = Vec::new();
    for entity in utterances.iter().flat_map(|u| &u.entities) {
        if !slot_names.contains(&entity.entity_type.as_str()) {
            slot_names.push(&entity.entity_type);
        }
    }

    let slots = slot_names
        .into_iter()
        .map(|name| resolve_entity_type(entity_types, name).map(slot_json))
        .collect::<TrainingResult<Vec<_>>>()?;

    let samples = utterances.iter().map(|u| sample_utterance(u)).collect::<TrainingResult<Vec<_>>>()?;

    Ok(json!({
        "name": intent,
        "fulfillmentActivity": { "type": "ReturnIntent" },
        "sampleUtterances": samples,
        "slots": slots,
    }))
}

fn slot_json(entity_type: &EntityType) -> Value {
    let slot_type = match &entity_type.kind {
        EntityTypeKind::Builtin { builtin_id } => builtin_id.as_str(),
        EntityTypeKind::Simple | EntityTypeKind::List { .. } => entity_type.name.as_str(),
    };

    json!({
        "name": entity_type.name,
        "slotConstraint": "Optional",
        "slotType": slot_type,
        "valueElicitationPrompt": prompt("E.g. What thing?", 2),
        "priority": 1,
        "sampleUtterances": [],
    })
}

/// Custom slot type for non-builtin entity types.
///
/// Simple types are enumerated from the mentions seen in training.
fn slot_type_json(entity_type: &EntityType, utterances: &[LabeledUtterance]) -> Option<Value> {
    let values: Vec<Value> = match &entity_type.kind {
        EntityTypeKind::Builtin { .. } => return None,
        EntityTypeKind::List { values } => values
            .iter()
            .map(|set| json!({ "value": set.canonical_form, "synonyms": set.synonyms }))
            .collect(),
        EntityTypeKind::Simple => {
            let mut seen: Vec<&str> = Vec::new();
            for entity in utterances.iter().flat_map(|u| &u.entities) {
                if entity.entity_type == entity_type.name {
                    if let Some(text) = entity.match_text.as_deref() {
                        if !seen.contains(&text) {
                            seen.push(text);
                        }
                    }
                }
            }
            seen.into_iter().map(|text| json!({ "value": text, "synonyms": [] })).collect()
        }
    };

    let has_synonyms = matches!(&entity_type.kind, EntityTypeKind::List { values } if values.iter().any(|v| !v.synonyms.is_empty()));
    let strategy = if has_synonyms { "TOP_RESOLUTION" } else { "ORIGINAL_VALUE" };

    Some(json!({
        "name": entity_type.name,
        "valueSelectionStrategy": strategy,
        "enumerationValues": values,
    }))
}

fn message(content: &str) -> Value {
    json!({ "contentType": "PlainText", "content": content })
}

fn prompt(content: &str, max_attempts: u32) -> Value {
    json!({ "messages": [message(content)], "maxAttempts": max_attempts })
}

fn zip_error(err: zip::result::ZipError) -> TrainingError {
    TrainingError::Other(anyhow::anyhow!("failed to write import archive: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlu_abstraction::{Entity, SynonymSet};
    use std::io::Read;
    use zip::ZipArchive;

    fn order(text: &str, food: &str) -> LabeledUtterance {
        LabeledUtterance::new(
            text,
            Some("OrderFood".to_string()),
            vec![Entity::new("Food", None, Some(food.to_string()), 0)],
        )
    }

    #[test]
    fn test_sample_utterance_replaces_mentions() {
        let utterance = LabeledUtterance::new(
            "pizza and more pizza",
            Some("OrderFood".to_string()),
            vec![Entity::new("Food", None, Some("pizza".to_string()), 1)],
        );
        assert_eq!(sample_utterance(&utterance).unwrap(), "pizza and more {Food}");
    }

    #[test]
    fn test_intents_grouped_in_first_seen_order() {
        let utterances = vec![
            order("order a pizza", "pizza"),
            LabeledUtterance::new("hi", Some("Greet".to_string()), vec![]),
            order("get me a burger", "burger"),
        ];
        let types = vec![EntityType::simple("Food")];

        let document = build_import_json("PizzaBot", &utterances, &types, &Value::Null).unwrap();
        let intents = document["resource"]["intents"].as_array().unwrap();

        assert_eq!(document["resource"]["name"], "PizzaBot");
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0]["name"], "OrderFood");
        assert_eq!(intents[0]["sampleUtterances"], json!(["order a {Food}", "get me a {Food}"]));
        assert_eq!(intents[0]["slots"][0]["slotType"], "Food");
        assert_eq!(intents[1]["slots"], json!([]));

        let slot_types = document["resource"]["slotTypes"].as_array().unwrap();
        assert_eq!(slot_types[0]["valueSelectionStrategy"], "ORIGINAL_VALUE");
        assert_eq!(slot_types[0]["enumerationValues"], json!([
            { "value": "pizza", "synonyms": [] },
            { "value": "burger", "synonyms": [] }
        ]));
    }

    #[test]
    fn test_builtin_and_list_types() {
        let utterances = vec![LabeledUtterance::new(
            "two large pizzas",
            Some("OrderFood".to_string()),
            vec![
                Entity::new("Count", None, Some("two".to_string()), 0),
                Entity::new("Size", None, Some("large".to_string()), 0),
            ],
        )];
        let types = vec![
            EntityType::builtin("Count", "AMAZON.NUMBER"),
            EntityType::list("Size", vec![SynonymSet::new("large", vec!["big".to_string()])]),
        ];

        let document = build_import_json("Bot", &utterances, &types, &Value::Null).unwrap();
        let slots = &document["resource"]["intents"][0]["slots"];
        assert_eq!(slots[0]["slotType"], "AMAZON.NUMBER");
        assert_eq!(slots[1]["slotType"], "Size");

        let slot_types = document["resource"]["slotTypes"].as_array().unwrap();
        assert_eq!(slot_types.len(), 1);
        assert_eq!(slot_types[0]["valueSelectionStrategy"], "TOP_RESOLUTION");
        assert_eq!(slot_types[0]["enumerationValues"][0], json!({ "value": "large", "synonyms": ["big"] }));
    }

    #[test]
    fn test_unknown_entity_type_fails() {
        let err = build_import_json("Bot", &[order("order a pizza", "pizza")], &[], &Value::Null).unwrap_err();
        assert!(matches!(err, TrainingError::UnknownEntityType(name) if name == "Food"));
    }

    #[test]
    fn test_template_merged() {
        let template = json!({ "resource": { "idleSessionTTLInSeconds": 60, "description": "ci" } });
        let document = build_import_json("Bot", &[], &[], &template).unwrap();

        assert_eq!(document["resource"]["idleSessionTTLInSeconds"], 60);
        assert_eq!(document["resource"]["description"], "ci");
        assert_eq!(document["resource"]["locale"], "en-US");
    }

    #[test]
    fn test_zip_holds_import_json() {
        let document = json!({ "resource": { "name": "Bot" } });
        let archive = zip_import(&document).unwrap();

        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut contents = String::new();
        zip.by_name(IMPORT_ENTRY).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&contents).unwrap(), document);
    }
}
