//! Tolerant decoding of fact-extractor payloads into criterion evaluations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::aggregate::CriterionEvaluation;
use crate::error::EngineError;

const PASSTHROUGH_KEYS: [&str; 3] = ["criteria", "certifications", "origin"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFacts {
    pub criteria: BTreeMap<String, CriterionEvaluation>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Decode an extractor payload.
///
/// Accepts either `{"criteria": {...}, "certifications": [...], "origin": "..."}` or a flat
/// object of criterion name to `{score, evidence}`. A criterion that is not a well-formed
/// record is dropped (so it aggregates as 0) and reported as `MalformedFacts`.
pub fn parse_facts(payload: &Value) -> (ExtractedFacts, Vec<EngineError>) {
    let mut facts = ExtractedFacts::default();
    let mut problems = Vec::new();

    let Some(object) = payload.as_object() else {
        problems.push(EngineError::MalformedFacts {
            criterion: "*".to_string(),
            message: "payload is not a JSON object".to_string(),
        });
        return (facts, problems);
    };

    facts.certifications = object
        .get("certifications")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    facts.origin = object
        .get("origin")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let entries: Vec<(&String, &Value)> = match object.get("criteria").and_then(Value::as_object) {
        Some(criteria) => criteria.iter().collect(),
        None => object
            .iter()
            .filter(|(key, _)| !PASSTHROUGH_KEYS.contains(&key.as_str()))
            .collect(),
    };

    for (criterion, value) in entries {
        match parse_criterion(value) {
            Ok(evaluation) => {
                facts.criteria.insert(criterion.clone(), evaluation);
            }
            Err(message) => {
                warn!(criterion = %criterion, %message, "malformed criterion in extracted facts");
                problems.push(EngineError::MalformedFacts {
                    criterion: criterion.clone(),
                    message,
                });
            }
        }
    }

    (facts, problems)
}

fn parse_criterion(value: &Value) -> Result<CriterionEvaluation, String> {
    let record = value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", kind_of(value)))?;

    let raw = record
        .get("score")
        .ok_or_else(|| "missing 'score'".to_string())?
        .as_f64()
        .filter(|score| score.is_finite())
        .ok_or_else(|| "'score' is not a number".to_string())?;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    let evidence = match record.get("evidence") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        Some(other) => {
            return Err(format!(
                "'evidence' must be a list of strings, got {}",
                kind_of(other)
            ))
        }
    };

    Ok(CriterionEvaluation { score, evidence })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parses_nested_payload() {
        let payload = json!({
            "criteria": {
                "durability": { "score": 80, "evidence": ["5 year warranty"] },
                "materials": { "score": 40.6, "evidence": [] }
            },
            "certifications": ["Energy Star", " ", 3],
            "origin": "Portugal"
        });
        let (facts, problems) = parse_facts(&payload);
        assert!(problems.is_empty());
        assert_eq!(facts.criteria["durability"].score, 80);
        assert_eq!(facts.criteria["durability"].evidence, vec!["5 year warranty"]);
        assert_eq!(facts.criteria["materials"].score, 41);
        assert_eq!(facts.certifications, vec!["Energy Star"]);
        assert_eq!(facts.origin.as_deref(), Some("Portugal"));
    }

    #[test]
    fn test_parses_flat_payload_and_clamps() {
        let payload = json!({
            "durability": { "score": 140 },
            "repairability": { "score": -3, "evidence": "no spare parts" },
            "origin": ""
        });
        let (facts, problems) = parse_facts(&payload);
        assert!(problems.is_empty());
        assert_eq!(facts.criteria.len(), 2);
        assert_eq!(facts.criteria["durability"].score, 100);
        assert_eq!(facts.criteria["repairability"].score, 0);
        assert_eq!(facts.criteria["repairability"].evidence, vec!["no spare parts"]);
        assert_eq!(facts.origin, None);
    }

    #[test]
    fn test_malformed_criteria_are_reported_not_fatal() {
        let payload = json!({
            "criteria": {
                "durability": { "score": 70 },
                "materials": "good",
                "recyclability": { "score": "high" },
                "energy_efficiency": { "evidence": [] },
                "packaging": { "score": 50, "evidence": 7 }
            }
        });
        let (facts, problems) = parse_facts(&payload);
        assert_eq!(facts.criteria.len(), 1);
        assert_eq!(facts.criteria["durability"].score, 70);
        assert_eq!(problems.len(), 4);
        assert!(problems
            .iter()
            .all(|p| matches!(p, EngineError::MalformedFacts { .. })));
    }

    #[test]
    fn test_non_object_payload() {
        let (facts, problems) = parse_facts(&json!(["durability", 80]));
        assert!(facts.criteria.is_empty());
        assert_eq!(problems.len(), 1);
    }
}
