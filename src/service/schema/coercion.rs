//! Field coercion engine for Incident Schema v2.3
//!
//! Repairs the recurring shape drift in LLM-extracted incident payloads
//! before strict validation: renamed keys, misplaced nesting, wrong scalar
//! types, and enum synonyms. Every rule is total (malformed input never
//! panics, it degrades to a labeled default) and idempotent, so a second
//! pass over the same payload changes nothing and fires no counters.
//!
//! Rules are applied in a fixed order: structural pre-normalization (key
//! renames, controls relocation, generic id remaps), then event fields,
//! context fields, and finally the per-control repairs.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::model::incident::{BarrierStatus, LineOfDefense};

/// Synonyms for the bowtie side of a control
const SIDE_SYNONYMS: &[(&str, &str)] = &[
    ("left", "prevention"),
    ("prevention", "prevention"),
    ("prevent", "prevention"),
    ("right", "mitigation"),
    ("mitigation", "mitigation"),
    ("mitigate", "mitigation"),
];

/// Synonyms for barrier status values seen in the wild
const BARRIER_STATUS_SYNONYMS: &[(&str, &str)] = &[
    ("ok", "active"),
    ("effective", "active"),
    ("in_place", "active"),
    ("in place", "active"),
    ("installed", "active"),
    ("worked", "active"),
    ("partial", "degraded"),
    ("weak", "degraded"),
    ("broken", "failed"),
    ("not installed", "not_installed"),
    ("missing", "not_installed"),
    ("none", "unknown"),
    ("na", "unknown"),
    ("n-a", "unknown"),
    ("n/a", "unknown"),
];

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Tally of coercion rules fired, keyed by rule name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionTally {
    counts: BTreeMap<&'static str, u64>,
}

impl CoercionTally {
    pub(crate) fn bump(&mut self, rule: &'static str) {
        *self.counts.entry(rule).or_insert(0) += 1;
    }

    /// Count for a single rule; absent rules imply zero
    pub fn get(&self, rule: &str) -> u64 {
        self.counts.get(rule).copied().unwrap_or(0)
    }

    /// Total number of coercions across all rules
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Fold another tally into this one
    pub fn merge(&mut self, other: CoercionTally) {
        for (rule, count) in other.counts {
            *self.counts.entry(rule).or_insert(0) += count;
        }
    }

    /// Rules with their counts, most frequent first (name as tiebreak)
    pub fn by_frequency(&self) -> Vec<(&'static str, u64)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(r, c)| (*r, *c)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        entries
    }
}

/// Apply every coercion rule to the payload in place
///
/// Returns the tally of rules that fired. The payload is expected to be a
/// decoded JSON object; any other shape is left untouched.
pub fn coerce_payload(payload: &mut Value) -> CoercionTally {
    let mut tally = CoercionTally::default();
    prenormalize(payload, &mut tally);
    coerce_event_fields(payload, &mut tally);
    coerce_context_fields(payload, &mut tally);
    coerce_controls(payload, &mut tally);
    tally
}

/// Structural pre-normalization shared with the validator
///
/// Renames drifted `event.*` keys, relocates a misplaced top-level
/// `controls` array into `bowtie`, and remaps generic `id` keys in the
/// bowtie element lists to their role-specific names.
pub(crate) fn prenormalize(payload: &mut Value, tally: &mut CoercionTally) {
    remap_event_keys(payload, tally);
    relocate_controls(payload, tally);
    remap_element_ids(payload, tally);
}

const EVENT_KEY_ALIASES: &[(&str, &str, &str)] = &[
    ("type", "top_event", "event_type_renamed"),
    ("description", "summary", "event_description_renamed"),
    ("category", "incident_type", "event_category_renamed"),
];

fn remap_event_keys(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(event) = payload.get_mut("event").and_then(Value::as_object_mut) else {
        return;
    };
    for &(alias, canonical, rule) in EVENT_KEY_ALIASES {
        if let Some(moved) = event.remove(alias) {
            // Rename when the canonical key is absent, drop the alias otherwise
            if !event.contains_key(canonical) {
                event.insert(canonical.to_string(), moved);
            }
            tally.bump(rule);
        }
    }
}

fn relocate_controls(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(root) = payload.as_object_mut() else {
        return;
    };
    if !root.contains_key("controls") {
        return;
    }

    let has_room = match root.get("bowtie") {
        None => true,
        Some(Value::Object(bowtie)) => match bowtie.get("controls") {
            None | Some(Value::Null) => true,
            Some(Value::Array(existing)) => existing.is_empty(),
            Some(_) => false,
        },
        // bowtie is present but not an object; the validator will report it
        Some(_) => false,
    };
    if !has_room {
        return;
    }

    if let Some(moved) = root.remove("controls") {
        match root.get_mut("bowtie").and_then(Value::as_object_mut) {
            Some(bowtie) => {
                bowtie.insert("controls".to_string(), moved);
            }
            None => {
                root.insert("bowtie".to_string(), json!({ "controls": moved }));
            }
        }
        tally.bump("controls_moved_to_bowtie");
    }
}

fn remap_element_ids(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(bowtie) = payload.get_mut("bowtie").and_then(Value::as_object_mut) else {
        return;
    };
    for (list_key, id_key, rule) in [
        ("hazards", "hazard_id", "hazard_id_remapped"),
        ("threats", "threat_id", "threat_id_remapped"),
        ("consequences", "consequence_id", "consequence_id_remapped"),
    ] {
        let Some(items) = bowtie.get_mut(list_key).and_then(Value::as_array_mut) else {
            continue;
        };
        for item in items.iter_mut() {
            let Some(obj) = item.as_object_mut() else {
                continue;
            };
            if obj.contains_key(id_key) {
                continue;
            }
            if let Some(generic) = obj.remove("id") {
                obj.insert(id_key.to_string(), generic);
                tally.bump(rule);
            }
        }
    }
}

fn coerce_event_fields(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(event) = payload.get_mut("event").and_then(Value::as_object_mut) else {
        return;
    };

    // incident_type -> non-empty string
    let repaired = match event.get("incident_type") {
        Some(Value::Array(items)) => {
            let joined = if items.len() == 1 {
                scalar_to_string(&items[0])
            } else {
                join_values(items)
            };
            if joined.trim().is_empty() {
                Some(("incident_type_empty_to_unknown", unknown_value()))
            } else {
                Some(("incident_type_list_to_str", Value::String(joined)))
            }
        }
        None | Some(Value::Null) => Some(("incident_type_empty_to_unknown", unknown_value())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Some(("incident_type_empty_to_unknown", unknown_value()))
        }
        Some(Value::String(_)) => None,
        Some(other) => Some(("incident_type_to_str", Value::String(scalar_to_string(other)))),
    };
    apply(event, "incident_type", repaired, tally);

    // top_event -> string
    let repaired = match event.get("top_event") {
        None | Some(Value::Null) => Some(("top_event_null_to_unknown", unknown_value())),
        Some(Value::Array(items)) => {
            Some(("top_event_list_to_str", Value::String(join_values(items))))
        }
        Some(obj @ Value::Object(_)) => {
            Some(("top_event_dict_to_json", Value::String(obj.to_string())))
        }
        Some(Value::String(_)) => None,
        Some(other) => Some(("top_event_to_str", Value::String(scalar_to_string(other)))),
    };
    apply(event, "top_event", repaired, tally);

    // costs -> optional string
    let repaired = match event.get("costs") {
        Some(Value::Object(map)) if map.is_empty() => Some(("costs_empty_dict_to_null", Value::Null)),
        Some(obj @ Value::Object(_)) => Some(("costs_dict_to_json", Value::String(obj.to_string()))),
        None | Some(Value::Null) | Some(Value::String(_)) => None,
        Some(other) => Some(("costs_to_str", Value::String(scalar_to_string(other)))),
    };
    apply(event, "costs", repaired, tally);
}

fn coerce_context_fields(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(context) = payload.get_mut("context").and_then(Value::as_object_mut) else {
        return;
    };

    // operating_phase -> lowercased trimmed string
    let repaired = match context.get("operating_phase") {
        None => None,
        Some(Value::Null) => Some(("operating_phase_null_to_unknown", unknown_value())),
        Some(Value::Array(items)) => Some((
            "operating_phase_list_to_str",
            Value::String(join_values(items).trim().to_lowercase()),
        )),
        Some(obj @ Value::Object(_)) => Some((
            "operating_phase_dict_to_json",
            Value::String(obj.to_string().to_lowercase()),
        )),
        Some(Value::String(s)) => {
            let normalized = s.trim().to_lowercase();
            if normalized == *s {
                None
            } else {
                Some(("operating_phase_normalized", Value::String(normalized)))
            }
        }
        Some(other) => Some((
            "operating_phase_to_str",
            Value::String(scalar_to_string(other).to_lowercase()),
        )),
    };
    apply(context, "operating_phase", repaired, tally);

    // materials -> list of strings
    let repaired = match context.get("materials") {
        None => None,
        Some(Value::Null) => Some(("materials_null_to_empty", json!([]))),
        Some(Value::String(s)) => Some(("materials_str_to_list", json!([s]))),
        Some(Value::Object(map)) => {
            let values: Vec<Value> = map
                .values()
                .filter(|v| !v.is_null())
                .map(scalar_to_string)
                .filter(|s| !s.trim().is_empty())
                .map(Value::String)
                .collect();
            Some(("materials_dict_to_list", Value::Array(values)))
        }
        Some(Value::Array(items)) => {
            if items.iter().all(Value::is_string) {
                None
            } else {
                let values: Vec<Value> = items
                    .iter()
                    .map(|v| Value::String(scalar_to_string(v)))
                    .collect();
                Some(("materials_item_to_str", Value::Array(values)))
            }
        }
        Some(other) => Some((
            "materials_scalar_to_list",
            json!([scalar_to_string(other)]),
        )),
    };
    apply(context, "materials", repaired, tally);
}

fn coerce_controls(payload: &mut Value, tally: &mut CoercionTally) {
    let Some(controls) = payload
        .get_mut("bowtie")
        .and_then(|b| b.get_mut("controls"))
        .and_then(Value::as_array_mut)
    else {
        return;
    };

    for control in controls.iter_mut() {
        let Some(ctrl) = control.as_object_mut() else {
            continue;
        };
        coerce_side(ctrl, tally);
        coerce_line_of_defense(ctrl, tally);
        coerce_barrier_status(ctrl, tally);
        coerce_human_value(ctrl, tally);
    }
}

fn coerce_side(ctrl: &mut Map<String, Value>, tally: &mut CoercionTally) {
    let raw = ctrl.get("side").map(scalar_to_string).unwrap_or_default();
    let key = raw.trim().to_lowercase();

    match lookup(SIDE_SYNONYMS, &key) {
        Some(canonical) => {
            if ctrl.get("side").and_then(Value::as_str) != Some(canonical) {
                ctrl.insert("side".to_string(), Value::String(canonical.to_string()));
                tally.bump("side_mapped");
            }
        }
        None => {
            ctrl.insert("side".to_string(), Value::String("prevention".to_string()));
            tally.bump("side_default_prevention");
        }
    }
}

fn lod_from_int(n: i64) -> &'static str {
    match n {
        1 => "1st",
        2 => "2nd",
        3 => "3rd",
        4 => "recovery",
        _ => "unknown",
    }
}

fn coerce_line_of_defense(ctrl: &mut Map<String, Value>, tally: &mut CoercionTally) {
    let repaired: Option<(Option<&'static str>, String)> = match ctrl.get("line_of_defense") {
        Some(Value::Number(n)) if n.as_i64().is_some() => {
            let mapped = n.as_i64().map(lod_from_int).unwrap_or("unknown");
            Some((Some("lod_int_to_enum"), mapped.to_string()))
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
                let mapped = trimmed
                    .parse::<i64>()
                    .map(lod_from_int)
                    .unwrap_or("unknown");
                Some((Some("lod_strnum_to_enum"), mapped.to_string()))
            } else if LineOfDefense::from_wire(trimmed).is_some() {
                if trimmed == s {
                    None
                } else {
                    Some((None, trimmed.to_string()))
                }
            } else {
                Some((Some("lod_unknown"), "unknown".to_string()))
            }
        }
        _ => Some((Some("lod_missing"), "unknown".to_string())),
    };

    if let Some((rule, value)) = repaired {
        ctrl.insert("line_of_defense".to_string(), Value::String(value));
        if let Some(rule) = rule {
            tally.bump(rule);
        }
    }
}

fn coerce_barrier_status(ctrl: &mut Map<String, Value>, tally: &mut CoercionTally) {
    let Some(perf) = ctrl.get_mut("performance").and_then(Value::as_object_mut) else {
        return;
    };

    let repaired: Option<(Option<&'static str>, String)> = match perf.get("barrier_status") {
        Some(Value::String(s)) => {
            let key = s.trim().to_lowercase();
            if BarrierStatus::from_wire(&key).is_some() {
                if key == *s {
                    None
                } else {
                    Some((None, key))
                }
            } else if let Some(mapped) = lookup(BARRIER_STATUS_SYNONYMS, &key) {
                Some((Some("barrier_status_mapped"), mapped.to_string()))
            } else {
                Some((Some("barrier_status_unknown"), "unknown".to_string()))
            }
        }
        _ => Some((Some("barrier_status_missing"), "unknown".to_string())),
    };

    if let Some((rule, value)) = repaired {
        perf.insert("barrier_status".to_string(), Value::String(value));
        if let Some(rule) = rule {
            tally.bump(rule);
        }
    }
}

fn coerce_human_value(ctrl: &mut Map<String, Value>, tally: &mut CoercionTally) {
    let Some(human) = ctrl.get_mut("human").and_then(Value::as_object_mut) else {
        return;
    };

    let repaired = match human.get("human_contribution_value") {
        None | Some(Value::Null) => Some(("human_value_none_to_unknown", unknown_value())),
        Some(Value::Array(items)) => {
            let joined = if items.len() == 1 {
                scalar_to_string(&items[0])
            } else {
                join_values(items)
            };
            Some(("human_value_list_to_str", Value::String(joined)))
        }
        Some(Value::String(_)) => None,
        Some(other) => Some(("human_value_to_str", Value::String(scalar_to_string(other)))),
    };
    apply(human, "human_contribution_value", repaired, tally);
}

fn apply(
    map: &mut Map<String, Value>,
    key: &str,
    repaired: Option<(&'static str, Value)>,
    tally: &mut CoercionTally,
) {
    if let Some((rule, value)) = repaired {
        map.insert(key.to_string(), value);
        tally.bump(rule);
    }
}

fn unknown_value() -> Value {
    Value::String("unknown".to_string())
}

/// Strings keep their content; everything else is JSON-encoded
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn join_values(items: &[Value]) -> String {
    items
        .iter()
        .map(scalar_to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_type_singleton_list() {
        let mut payload = json!({"event": {"incident_type": ["fire"]}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["event"]["incident_type"], "fire");
        assert_eq!(tally.get("incident_type_list_to_str"), 1);
    }

    #[test]
    fn test_incident_type_multi_list_joined() {
        let mut payload = json!({"event": {"incident_type": ["fire", "explosion"]}});
        coerce_payload(&mut payload);
        assert_eq!(payload["event"]["incident_type"], "fire; explosion");
    }

    #[test]
    fn test_incident_type_empty_shapes_become_unknown() {
        for bad in [json!(null), json!(""), json!("   "), json!([])] {
            let mut payload = json!({"event": {"incident_type": bad}});
            let tally = coerce_payload(&mut payload);
            assert_eq!(payload["event"]["incident_type"], "unknown");
            assert_eq!(tally.get("incident_type_empty_to_unknown"), 1);
        }
    }

    #[test]
    fn test_top_event_shapes() {
        let mut payload = json!({"event": {"top_event": ["loss of containment", "fire"]}});
        coerce_payload(&mut payload);
        assert_eq!(payload["event"]["top_event"], "loss of containment; fire");

        let mut payload = json!({"event": {"top_event": {"primary": "blowout"}}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["event"]["top_event"], r#"{"primary":"blowout"}"#);
        assert_eq!(tally.get("top_event_dict_to_json"), 1);

        let mut payload = json!({"event": {"top_event": 42}});
        coerce_payload(&mut payload);
        assert_eq!(payload["event"]["top_event"], "42");

        let mut payload = json!({"event": {"top_event": null}});
        coerce_payload(&mut payload);
        assert_eq!(payload["event"]["top_event"], "unknown");
    }

    #[test]
    fn test_costs_shapes() {
        let mut payload = json!({"event": {"costs": {}}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["event"]["costs"], Value::Null);
        assert_eq!(tally.get("costs_empty_dict_to_null"), 1);

        let mut payload = json!({"event": {"costs": {"amount": 500000}}});
        coerce_payload(&mut payload);
        assert_eq!(payload["event"]["costs"], r#"{"amount":500000}"#);

        let mut payload = json!({"event": {"costs": 1500000}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["event"]["costs"], "1500000");
        assert_eq!(tally.get("costs_to_str"), 1);

        // null and strings pass through untouched
        let mut payload = json!({"event": {"costs": "minor"}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["event"]["costs"], "minor");
        assert_eq!(tally.get("costs_to_str"), 0);
    }

    #[test]
    fn test_operating_phase_normalized() {
        let mut payload = json!({"context": {"operating_phase": "  DRILLING "}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["context"]["operating_phase"], "drilling");
        assert_eq!(tally.get("operating_phase_normalized"), 1);

        let mut payload = json!({"context": {"operating_phase": ["Startup", "Production"]}});
        coerce_payload(&mut payload);
        assert_eq!(payload["context"]["operating_phase"], "startup; production");

        let mut payload = json!({"context": {"operating_phase": {"phase": "Production"}}});
        coerce_payload(&mut payload);
        assert_eq!(
            payload["context"]["operating_phase"],
            r#"{"phase":"production"}"#
        );
    }

    #[test]
    fn test_materials_shapes() {
        let mut payload = json!({"context": {"materials": "crude oil"}});
        coerce_payload(&mut payload);
        assert_eq!(payload["context"]["materials"], json!(["crude oil"]));

        let mut payload = json!({"context": {"materials": null}});
        coerce_payload(&mut payload);
        assert_eq!(payload["context"]["materials"], json!([]));

        let mut payload = json!({"context": {"materials": {}}});
        coerce_payload(&mut payload);
        assert_eq!(payload["context"]["materials"], json!([]));

        // Non-null values extracted, null and blank entries dropped
        let mut payload =
            json!({"context": {"materials": {"type": "crude oil", "quantity": null, "unit": null}}});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["context"]["materials"], json!(["crude oil"]));
        assert_eq!(tally.get("materials_dict_to_list"), 1);

        let mut payload = json!({"context": {"materials": ["diesel", 7]}});
        coerce_payload(&mut payload);
        assert_eq!(payload["context"]["materials"], json!(["diesel", "7"]));
    }

    #[test]
    fn test_event_key_drift_renamed() {
        let mut payload = json!({"event": {"type": "Fire", "description": "An explosion."}});
        let tally = coerce_payload(&mut payload);
        let event = payload["event"].as_object().unwrap();
        assert_eq!(event["top_event"], "Fire");
        assert_eq!(event["summary"], "An explosion.");
        assert!(!event.contains_key("type"));
        assert!(!event.contains_key("description"));
        assert_eq!(tally.get("event_type_renamed"), 1);
        assert_eq!(tally.get("event_description_renamed"), 1);
    }

    #[test]
    fn test_event_alias_dropped_when_canonical_present() {
        let mut payload = json!({"event": {"type": "Fire", "top_event": "Blowout"}});
        coerce_payload(&mut payload);
        let event = payload["event"].as_object().unwrap();
        assert_eq!(event["top_event"], "Blowout");
        assert!(!event.contains_key("type"));
    }

    #[test]
    fn test_top_level_controls_moved_into_existing_bowtie() {
        let mut payload = json!({
            "controls": [{"control_id": "C-001"}],
            "bowtie": {"hazards": [], "controls": []}
        });
        let tally = coerce_payload(&mut payload);
        assert_eq!(tally.get("controls_moved_to_bowtie"), 1);
        assert!(payload.get("controls").is_none());
        assert_eq!(payload["bowtie"]["controls"][0]["control_id"], "C-001");
    }

    #[test]
    fn test_top_level_controls_create_bowtie() {
        let mut payload = json!({"controls": [{"control_id": "C-001"}]});
        coerce_payload(&mut payload);
        assert_eq!(payload["bowtie"]["controls"][0]["control_id"], "C-001");
    }

    #[test]
    fn test_top_level_controls_kept_when_bowtie_has_controls() {
        let mut payload = json!({
            "controls": [{"control_id": "C-002"}],
            "bowtie": {"controls": [{"control_id": "C-001"}]}
        });
        let tally = coerce_payload(&mut payload);
        assert_eq!(tally.get("controls_moved_to_bowtie"), 0);
        assert_eq!(payload["bowtie"]["controls"].as_array().unwrap().len(), 1);
        assert!(payload.get("controls").is_some());
    }

    #[test]
    fn test_generic_ids_remapped() {
        let mut payload = json!({"bowtie": {
            "hazards": [{"id": "H-001", "name": "hydrocarbons"}],
            "threats": [{"id": "T-001", "name": "corrosion"}],
            "consequences": [{"id": "CN-001", "name": "fire"}]
        }});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["bowtie"]["hazards"][0]["hazard_id"], "H-001");
        assert_eq!(payload["bowtie"]["threats"][0]["threat_id"], "T-001");
        assert_eq!(
            payload["bowtie"]["consequences"][0]["consequence_id"],
            "CN-001"
        );
        assert_eq!(tally.get("hazard_id_remapped"), 1);
    }

    #[test]
    fn test_generic_id_kept_when_specific_present() {
        let mut payload = json!({"bowtie": {
            "hazards": [{"id": "X", "hazard_id": "H-001", "name": "hydrocarbons"}]
        }});
        let tally = coerce_payload(&mut payload);
        assert_eq!(payload["bowtie"]["hazards"][0]["hazard_id"], "H-001");
        assert_eq!(tally.get("hazard_id_remapped"), 0);
    }

    #[test]
    fn test_side_synonyms_and_default() {
        let mut payload = json!({"bowtie": {"controls": [
            {"side": "left"},
            {"side": "Right"},
            {"side": "prevention"},
            {"side": "upstream"},
            {}
        ]}});
        let tally = coerce_payload(&mut payload);
        let controls = payload["bowtie"]["controls"].as_array().unwrap();
        assert_eq!(controls[0]["side"], "prevention");
        assert_eq!(controls[1]["side"], "mitigation");
        assert_eq!(controls[2]["side"], "prevention");
        assert_eq!(controls[3]["side"], "prevention");
        assert_eq!(controls[4]["side"], "prevention");
        assert_eq!(tally.get("side_mapped"), 2);
        assert_eq!(tally.get("side_default_prevention"), 2);
    }

    #[test]
    fn test_line_of_defense_shapes() {
        let mut payload = json!({"bowtie": {"controls": [
            {"line_of_defense": 2},
            {"line_of_defense": "3"},
            {"line_of_defense": "99"},
            {"line_of_defense": "recovery"},
            {"line_of_defense": "primary"},
            {}
        ]}});
        let tally = coerce_payload(&mut payload);
        let controls = payload["bowtie"]["controls"].as_array().unwrap();
        assert_eq!(controls[0]["line_of_defense"], "2nd");
        assert_eq!(controls[1]["line_of_defense"], "3rd");
        assert_eq!(controls[2]["line_of_defense"], "unknown");
        assert_eq!(controls[3]["line_of_defense"], "recovery");
        assert_eq!(controls[4]["line_of_defense"], "unknown");
        assert_eq!(controls[5]["line_of_defense"], "unknown");
        assert_eq!(tally.get("lod_int_to_enum"), 1);
        assert_eq!(tally.get("lod_strnum_to_enum"), 2);
        assert_eq!(tally.get("lod_unknown"), 1);
        assert_eq!(tally.get("lod_missing"), 1);
    }

    #[test]
    fn test_barrier_status_synonyms() {
        let mut payload = json!({"bowtie": {"controls": [
            {"performance": {"barrier_status": "ok"}},
            {"performance": {"barrier_status": "Partial"}},
            {"performance": {"barrier_status": "n/a"}},
            {"performance": {"barrier_status": "ACTIVE"}},
            {"performance": {"barrier_status": "shattered"}},
            {"performance": {}}
        ]}});
        let tally = coerce_payload(&mut payload);
        let controls = payload["bowtie"]["controls"].as_array().unwrap();
        assert_eq!(controls[0]["performance"]["barrier_status"], "active");
        assert_eq!(controls[1]["performance"]["barrier_status"], "degraded");
        assert_eq!(controls[2]["performance"]["barrier_status"], "unknown");
        assert_eq!(controls[3]["performance"]["barrier_status"], "active");
        assert_eq!(controls[4]["performance"]["barrier_status"], "unknown");
        assert_eq!(controls[5]["performance"]["barrier_status"], "unknown");
        assert_eq!(tally.get("barrier_status_mapped"), 3);
        assert_eq!(tally.get("barrier_status_unknown"), 1);
        assert_eq!(tally.get("barrier_status_missing"), 1);
        // Case canonicalization alone is not counted as a mapping
        assert_eq!(tally.get("barrier_status_unknown") + tally.get("barrier_status_mapped"), 4);
    }

    #[test]
    fn test_human_contribution_shapes() {
        let mut payload = json!({"bowtie": {"controls": [
            {"human": {"human_contribution_value": null}},
            {"human": {"human_contribution_value": ["fatigue", "stress"]}},
            {"human": {"human_contribution_value": 3}},
            {"human": {}}
        ]}});
        let tally = coerce_payload(&mut payload);
        let controls = payload["bowtie"]["controls"].as_array().unwrap();
        assert_eq!(controls[0]["human"]["human_contribution_value"], "unknown");
        assert_eq!(
            controls[1]["human"]["human_contribution_value"],
            "fatigue; stress"
        );
        assert_eq!(controls[2]["human"]["human_contribution_value"], "3");
        assert_eq!(controls[3]["human"]["human_contribution_value"], "unknown");
        assert_eq!(tally.get("human_value_none_to_unknown"), 2);
        assert_eq!(tally.get("human_value_list_to_str"), 1);
        assert_eq!(tally.get("human_value_to_str"), 1);
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let mut payload = json!({
            "event": {
                "type": "Fire",
                "description": "An explosion occurred.",
                "incident_type": ["fire", "explosion"],
                "costs": {"amount": 500000}
            },
            "context": {"operating_phase": "DRILLING", "materials": {"type": "crude oil"}},
            "controls": [{
                "control_id": "C-001",
                "side": "Left",
                "line_of_defense": 2,
                "performance": {"barrier_status": "broken"},
                "human": {"human_contribution_value": null}
            }],
            "bowtie": {"hazards": [{"id": "H-001", "name": "hydrocarbons"}]}
        });

        let first = coerce_payload(&mut payload);
        assert!(first.total() > 0);

        let after_first = payload.clone();
        let second = coerce_payload(&mut payload);
        assert_eq!(payload, after_first, "second pass must not change the payload");
        assert_eq!(second.total(), 0, "second pass must fire no counters: {second:?}");
    }

    #[test]
    fn test_malformed_shapes_never_panic() {
        // Shapes outside every enumerated branch fall through to defaults
        for mut payload in [
            json!({"event": "not an object"}),
            json!({"bowtie": {"controls": "not a list"}}),
            json!({"bowtie": {"controls": [42, "text", null]}}),
            json!({"bowtie": "not an object", "controls": []}),
            json!([1, 2, 3]),
            json!(null),
        ] {
            coerce_payload(&mut payload);
        }
    }

    #[test]
    fn test_tally_frequency_ordering() {
        let mut tally = CoercionTally::default();
        tally.bump("b_rule");
        tally.bump("b_rule");
        tally.bump("a_rule");
        tally.bump("c_rule");
        tally.bump("c_rule");

        let ordered = tally.by_frequency();
        assert_eq!(ordered[0], ("b_rule", 2));
        assert_eq!(ordered[1], ("c_rule", 2));
        assert_eq!(ordered[2], ("a_rule", 1));
        assert_eq!(tally.total(), 5);
    }

    #[test]
    fn test_tally_merge() {
        let mut a = CoercionTally::default();
        a.bump("side_mapped");
        let mut b = CoercionTally::default();
        b.bump("side_mapped");
        b.bump("lod_missing");
        a.merge(b);
        assert_eq!(a.get("side_mapped"), 2);
        assert_eq!(a.get("lod_missing"), 1);
    }
}
