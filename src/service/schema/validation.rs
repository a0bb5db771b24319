//! Strict structural validation for Incident Schema v2.3
//!
//! Attempts to construct a canonical [`IncidentRecord`] from a decoded JSON
//! payload and reports every violation found, one error string per field,
//! formatted as `"path -> to -> field: message"`. Traversal order is fixed
//! (top-level, source, context, event, bowtie with its element lists and
//! controls, pifs, notes) so error ordering is reproducible.
//!
//! The light structural pre-normalization (event key renames, top-level
//! controls relocation, generic id remaps) always runs first, so the
//! validator is usable standalone on hand-authored fixtures. The value
//! coercions and synonym tables of the coercion engine are deliberately NOT
//! applied here: this is the strict gate, repair is the caller's choice.
//!
//! Validation never panics. A non-object payload yields a single error.

use serde_json::{Map, Value};

use super::coercion::{self, CoercionTally};
use crate::model::incident::{
    BarrierStatus, BarrierType, BowtieInfo, BowtieSide, Confidence, ConsequenceItem, ContextInfo,
    ControlEvidence, ControlHuman, ControlItem, ControlPerformance, DEFAULT_RULES, EventInfo,
    HazardItem, IncidentRecord, LineOfDefense, NotesInfo, OrganisationPifs, PeoplePifs, PifsInfo,
    SCHEMA_VERSION, SourceInfo, ThreatItem, WorkPifs,
};

const MSG_REQUIRED: &str = "field required";
const MSG_STR: &str = "str type expected";
const MSG_NONE: &str = "none is not an allowed value";
const MSG_LIST: &str = "value is not a valid list";
const MSG_DICT: &str = "value is not a valid dict";
const MSG_BOOL: &str = "value could not be parsed to a boolean";

/// Result of validating one incident payload
#[derive(Debug, Clone)]
pub struct ValidationReport {
    /// Whether the payload constructs a canonical record
    pub is_valid: bool,
    /// One message per violation, in traversal order
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Validate a payload against Schema v2.3
///
/// The payload's own `incident_id` is required. The payload itself is never
/// mutated; pre-normalization happens on an internal copy.
pub fn validate_incident(payload: &Value) -> ValidationReport {
    match build(payload, None) {
        Ok(_) => ValidationReport::valid(),
        Err(errors) => ValidationReport::invalid(errors),
    }
}

/// Construct a canonical record, overriding the payload's `incident_id`
///
/// This is the construction path used after extraction: the caller-supplied
/// identifier (typically the source filename stem) wins over whatever the
/// model put in the payload, keeping identifiers stable across re-extraction.
pub fn build_incident(
    incident_id: &str,
    payload: &Value,
) -> Result<IncidentRecord, ValidationReport> {
    build(payload, Some(incident_id)).map_err(ValidationReport::invalid)
}

fn build(payload: &Value, override_id: Option<&str>) -> Result<IncidentRecord, Vec<String>> {
    let mut normalized = payload.clone();
    let mut scratch = CoercionTally::default();
    coercion::prenormalize(&mut normalized, &mut scratch);

    let Some(root) = normalized.as_object_mut() else {
        return Err(vec![format!("__root__: {MSG_DICT}")]);
    };
    if let Some(id) = override_id {
        root.insert("incident_id".to_string(), Value::String(id.to_string()));
    }

    let mut errors = Vec::new();
    let record = read_record(root, &mut errors);
    if errors.is_empty() {
        Ok(record)
    } else {
        Err(errors)
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

fn loc_join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix} -> {key}")
    }
}

fn push(errors: &mut Vec<String>, loc: &str, msg: &str) {
    errors.push(format!("{loc}: {msg}"));
}

fn required_string(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> String {
    let loc = loc_join(prefix, key);
    match map.get(key) {
        None => {
            push(errors, &loc, MSG_REQUIRED);
            String::new()
        }
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => {
            push(errors, &loc, MSG_NONE);
            String::new()
        }
        Some(_) => {
            push(errors, &loc, MSG_STR);
            String::new()
        }
    }
}

fn string_with_default(
    map: &Map<String, Value>,
    key: &str,
    default: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> String {
    match map.get(key) {
        None => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) => {
            push(errors, &loc_join(prefix, key), MSG_NONE);
            default.to_string()
        }
        Some(_) => {
            push(errors, &loc_join(prefix, key), MSG_STR);
            default.to_string()
        }
    }
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            push(errors, &loc_join(prefix, key), MSG_STR);
            None
        }
    }
}

fn read_bool(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> bool {
    match map.get(key) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) => {
            push(errors, &loc_join(prefix, key), MSG_NONE);
            false
        }
        Some(_) => {
            push(errors, &loc_join(prefix, key), MSG_BOOL);
            false
        }
    }
}

fn string_list(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> Vec<String> {
    let loc = loc_join(prefix, key);
    match map.get(key) {
        None => Vec::new(),
        Some(Value::Null) => {
            push(errors, &loc, MSG_NONE);
            Vec::new()
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => out.push(s.clone()),
                    _ => push(errors, &format!("{loc} -> {i}"), MSG_STR),
                }
            }
            out
        }
        Some(_) => {
            push(errors, &loc, MSG_LIST);
            Vec::new()
        }
    }
}

fn enum_message(permitted: &[&str]) -> String {
    let listed = permitted
        .iter()
        .map(|p| format!("'{p}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("value is not a valid enumeration member; permitted: {listed}")
}

fn enum_with_default<T>(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
    parse: fn(&str) -> Option<T>,
    permitted: &'static [&'static str],
    default: T,
) -> T {
    let loc = loc_join(prefix, key);
    match map.get(key) {
        None => default,
        Some(Value::String(s)) => match parse(s) {
            Some(value) => value,
            None => {
                push(errors, &loc, &enum_message(permitted));
                default
            }
        },
        Some(Value::Null) => {
            push(errors, &loc, MSG_NONE);
            default
        }
        Some(_) => {
            push(errors, &loc, &enum_message(permitted));
            default
        }
    }
}

/// Read a sub-record key: absent means default, null and non-objects are
/// violations
fn section<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match map.get(key) {
        None => None,
        Some(Value::Object(obj)) => Some(obj),
        Some(Value::Null) => {
            push(errors, &loc_join(prefix, key), MSG_NONE);
            None
        }
        Some(_) => {
            push(errors, &loc_join(prefix, key), MSG_DICT);
            None
        }
    }
}

fn read_items<T>(
    map: &Map<String, Value>,
    key: &str,
    prefix: &str,
    errors: &mut Vec<String>,
    read: fn(&Map<String, Value>, &str, &mut Vec<String>) -> T,
) -> Vec<T> {
    let loc = loc_join(prefix, key);
    match map.get(key) {
        None => Vec::new(),
        Some(Value::Null) => {
            push(errors, &loc, MSG_NONE);
            Vec::new()
        }
        Some(Value::Array(items)) => {
            let mut out = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let item_loc = format!("{loc} -> {i}");
                match item.as_object() {
                    Some(obj) => out.push(read(obj, &item_loc, errors)),
                    None => push(errors, &item_loc, MSG_DICT),
                }
            }
            out
        }
        Some(_) => {
            push(errors, &loc, MSG_LIST);
            Vec::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Section readers, in traversal order
// ---------------------------------------------------------------------------

fn read_record(root: &Map<String, Value>, errors: &mut Vec<String>) -> IncidentRecord {
    let incident_id = required_string(root, "incident_id", "", errors);

    let source = match section(root, "source", "", errors) {
        Some(map) => read_source(map, "source", errors),
        None => SourceInfo::default(),
    };
    let context = match section(root, "context", "", errors) {
        Some(map) => read_context(map, "context", errors),
        None => ContextInfo::default(),
    };
    let event = match section(root, "event", "", errors) {
        Some(map) => read_event(map, "event", errors),
        None => EventInfo::default(),
    };
    let bowtie = match section(root, "bowtie", "", errors) {
        Some(map) => read_bowtie(map, "bowtie", errors),
        None => BowtieInfo::default(),
    };
    let pifs = match section(root, "pifs", "", errors) {
        Some(map) => read_pifs(map, "pifs", errors),
        None => PifsInfo::default(),
    };
    let notes = match section(root, "notes", "", errors) {
        Some(map) => read_notes(map, "notes", errors),
        None => NotesInfo::default(),
    };

    IncidentRecord {
        incident_id,
        source,
        context,
        event,
        bowtie,
        pifs,
        notes,
    }
}

fn read_source(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> SourceInfo {
    SourceInfo {
        doc_type: string_with_default(map, "doc_type", "unknown", prefix, errors),
        url: optional_string(map, "url", prefix, errors),
        title: string_with_default(map, "title", "unknown", prefix, errors),
        date_published: optional_string(map, "date_published", prefix, errors),
        date_occurred: optional_string(map, "date_occurred", prefix, errors),
        timezone: optional_string(map, "timezone", prefix, errors),
    }
}

fn read_context(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> ContextInfo {
    ContextInfo {
        region: string_with_default(map, "region", "unknown", prefix, errors),
        operator: string_with_default(map, "operator", "unknown", prefix, errors),
        operating_phase: string_with_default(map, "operating_phase", "unknown", prefix, errors),
        materials: string_list(map, "materials", prefix, errors),
    }
}

fn read_event(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> EventInfo {
    EventInfo {
        top_event: string_with_default(map, "top_event", "unknown", prefix, errors),
        incident_type: string_with_default(map, "incident_type", "unknown", prefix, errors),
        costs: optional_string(map, "costs", prefix, errors),
        actions_taken: string_list(map, "actions_taken", prefix, errors),
        summary: string_with_default(map, "summary", "", prefix, errors),
        recommendations: string_list(map, "recommendations", prefix, errors),
        key_phrases: string_list(map, "key_phrases", prefix, errors),
    }
}

fn read_bowtie(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> BowtieInfo {
    BowtieInfo {
        hazards: read_items(map, "hazards", prefix, errors, read_hazard),
        threats: read_items(map, "threats", prefix, errors, read_threat),
        consequences: read_items(map, "consequences", prefix, errors, read_consequence),
        controls: read_items(map, "controls", prefix, errors, read_control),
    }
}

fn read_hazard(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> HazardItem {
    HazardItem {
        hazard_id: required_string(map, "hazard_id", prefix, errors),
        name: required_string(map, "name", prefix, errors),
        description: optional_string(map, "description", prefix, errors),
    }
}

fn read_threat(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> ThreatItem {
    ThreatItem {
        threat_id: required_string(map, "threat_id", prefix, errors),
        name: required_string(map, "name", prefix, errors),
        description: optional_string(map, "description", prefix, errors),
    }
}

fn read_consequence(
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<String>,
) -> ConsequenceItem {
    ConsequenceItem {
        consequence_id: required_string(map, "consequence_id", prefix, errors),
        name: required_string(map, "name", prefix, errors),
        description: optional_string(map, "description", prefix, errors),
        severity: optional_string(map, "severity", prefix, errors),
    }
}

fn read_control(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> ControlItem {
    ControlItem {
        control_id: required_string(map, "control_id", prefix, errors),
        name: string_with_default(map, "name", "unknown", prefix, errors),
        side: enum_with_default(
            map,
            "side",
            prefix,
            errors,
            BowtieSide::from_wire,
            BowtieSide::PERMITTED,
            BowtieSide::Prevention,
        ),
        barrier_role: string_with_default(map, "barrier_role", "unknown", prefix, errors),
        barrier_type: enum_with_default(
            map,
            "barrier_type",
            prefix,
            errors,
            BarrierType::from_wire,
            BarrierType::PERMITTED,
            BarrierType::Unknown,
        ),
        line_of_defense: enum_with_default(
            map,
            "line_of_defense",
            prefix,
            errors,
            LineOfDefense::from_wire,
            LineOfDefense::PERMITTED,
            LineOfDefense::Unknown,
        ),
        lod_basis: optional_string(map, "lod_basis", prefix, errors),
        linked_threat_ids: string_list(map, "linked_threat_ids", prefix, errors),
        linked_consequence_ids: string_list(map, "linked_consequence_ids", prefix, errors),
        performance: match section(map, "performance", prefix, errors) {
            Some(perf) => read_performance(perf, &loc_join(prefix, "performance"), errors),
            None => ControlPerformance::default(),
        },
        human: match section(map, "human", prefix, errors) {
            Some(human) => read_human(human, &loc_join(prefix, "human"), errors),
            None => ControlHuman::default(),
        },
        evidence: match section(map, "evidence", prefix, errors) {
            Some(evidence) => read_evidence(evidence, &loc_join(prefix, "evidence"), errors),
            None => ControlEvidence::default(),
        },
    }
}

fn read_performance(
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<String>,
) -> ControlPerformance {
    ControlPerformance {
        barrier_status: enum_with_default(
            map,
            "barrier_status",
            prefix,
            errors,
            BarrierStatus::from_wire,
            BarrierStatus::PERMITTED,
            BarrierStatus::Unknown,
        ),
        barrier_failed: read_bool(map, "barrier_failed", prefix, errors),
        detection_applicable: read_bool(map, "detection_applicable", prefix, errors),
        detection_mentioned: read_bool(map, "detection_mentioned", prefix, errors),
        alarm_applicable: read_bool(map, "alarm_applicable", prefix, errors),
        alarm_mentioned: read_bool(map, "alarm_mentioned", prefix, errors),
        manual_intervention_applicable: read_bool(
            map,
            "manual_intervention_applicable",
            prefix,
            errors,
        ),
        manual_intervention_mentioned: read_bool(
            map,
            "manual_intervention_mentioned",
            prefix,
            errors,
        ),
    }
}

fn read_human(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> ControlHuman {
    ControlHuman {
        human_contribution_value: optional_string(map, "human_contribution_value", prefix, errors),
        human_contribution_mentioned: read_bool(map, "human_contribution_mentioned", prefix, errors),
        barrier_failed_human: read_bool(map, "barrier_failed_human", prefix, errors),
        linked_pif_ids: string_list(map, "linked_pif_ids", prefix, errors),
    }
}

fn read_evidence(
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<String>,
) -> ControlEvidence {
    ControlEvidence {
        supporting_text: string_list(map, "supporting_text", prefix, errors),
        confidence: enum_with_default(
            map,
            "confidence",
            prefix,
            errors,
            Confidence::from_wire,
            Confidence::PERMITTED,
            Confidence::Low,
        ),
    }
}

fn read_pifs(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> PifsInfo {
    PifsInfo {
        people: match section(map, "people", prefix, errors) {
            Some(people) => read_people_pifs(people, &loc_join(prefix, "people"), errors),
            None => PeoplePifs::default(),
        },
        work: match section(map, "work", prefix, errors) {
            Some(work) => read_work_pifs(work, &loc_join(prefix, "work"), errors),
            None => WorkPifs::default(),
        },
        organisation: match section(map, "organisation", prefix, errors) {
            Some(org) => read_organisation_pifs(org, &loc_join(prefix, "organisation"), errors),
            None => OrganisationPifs::default(),
        },
    }
}

fn read_people_pifs(
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<String>,
) -> PeoplePifs {
    PeoplePifs {
        competence_value: optional_string(map, "competence_value", prefix, errors),
        competence_mentioned: read_bool(map, "competence_mentioned", prefix, errors),
        fatigue_value: optional_string(map, "fatigue_value", prefix, errors),
        fatigue_mentioned: read_bool(map, "fatigue_mentioned", prefix, errors),
        communication_value: optional_string(map, "communication_value", prefix, errors),
        communication_mentioned: read_bool(map, "communication_mentioned", prefix, errors),
        situational_awareness_value: optional_string(
            map,
            "situational_awareness_value",
            prefix,
            errors,
        ),
        situational_awareness_mentioned: read_bool(
            map,
            "situational_awareness_mentioned",
            prefix,
            errors,
        ),
    }
}

fn read_work_pifs(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> WorkPifs {
    WorkPifs {
        procedures_value: optional_string(map, "procedures_value", prefix, errors),
        procedures_mentioned: read_bool(map, "procedures_mentioned", prefix, errors),
        workload_value: optional_string(map, "workload_value", prefix, errors),
        workload_mentioned: read_bool(map, "workload_mentioned", prefix, errors),
        time_pressure_value: optional_string(map, "time_pressure_value", prefix, errors),
        time_pressure_mentioned: read_bool(map, "time_pressure_mentioned", prefix, errors),
        tools_equipment_value: optional_string(map, "tools_equipment_value", prefix, errors),
        tools_equipment_mentioned: read_bool(map, "tools_equipment_mentioned", prefix, errors),
    }
}

fn read_organisation_pifs(
    map: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<String>,
) -> OrganisationPifs {
    OrganisationPifs {
        safety_culture_value: optional_string(map, "safety_culture_value", prefix, errors),
        safety_culture_mentioned: read_bool(map, "safety_culture_mentioned", prefix, errors),
        management_of_change_value: optional_string(
            map,
            "management_of_change_value",
            prefix,
            errors,
        ),
        management_of_change_mentioned: read_bool(
            map,
            "management_of_change_mentioned",
            prefix,
            errors,
        ),
        supervision_value: optional_string(map, "supervision_value", prefix, errors),
        supervision_mentioned: read_bool(map, "supervision_mentioned", prefix, errors),
        training_value: optional_string(map, "training_value", prefix, errors),
        training_mentioned: read_bool(map, "training_mentioned", prefix, errors),
    }
}

fn read_notes(map: &Map<String, Value>, prefix: &str, errors: &mut Vec<String>) -> NotesInfo {
    NotesInfo {
        rules: string_with_default(map, "rules", DEFAULT_RULES, prefix, errors),
        schema_version: string_with_default(map, "schema_version", SCHEMA_VERSION, prefix, errors),
    }
}
