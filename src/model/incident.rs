//! Canonical models for Incident Schema v2.3
//!
//! These types are the strict target shape that LLM-extracted incident
//! payloads are coerced into and validated against. Every sub-record has a
//! fully-defaulted form so a constructed record always carries all sections.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Version identifier written into every canonical record
pub const SCHEMA_VERSION: &str = "2.3";

/// Default extraction-rules text carried in the notes section
pub const DEFAULT_RULES: &str =
    "JSON output only. mentioned fields must be evidence-based. Use null for unknown values.";

fn unknown() -> String {
    "unknown".to_string()
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Document source metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SourceInfo {
    /// Type of source document
    pub doc_type: String,
    /// URL of the source document
    pub url: Option<String>,
    /// Title of the source document
    pub title: String,
    /// Publication date (ISO-8601 string or free text)
    pub date_published: Option<String>,
    /// Date the incident occurred
    pub date_occurred: Option<String>,
    pub timezone: Option<String>,
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            doc_type: unknown(),
            url: None,
            title: unknown(),
            date_published: None,
            date_occurred: None,
            timezone: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Operational context for the incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ContextInfo {
    /// Geographic region
    pub region: String,
    /// Facility operator name
    pub operator: String,
    /// Phase of operations during the incident, lowercased free text
    pub operating_phase: String,
    /// Materials involved
    pub materials: Vec<String>,
}

impl Default for ContextInfo {
    fn default() -> Self {
        Self {
            region: unknown(),
            operator: unknown(),
            operating_phase: unknown(),
            materials: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Top-level event details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EventInfo {
    /// Top event classification
    pub top_event: String,
    /// Incident type
    pub incident_type: String,
    /// Estimated costs, free text
    pub costs: Option<String>,
    /// Actions taken during/after the event
    pub actions_taken: Vec<String>,
    /// Narrative summary of the event
    pub summary: String,
    /// Investigation recommendations
    pub recommendations: Vec<String>,
    /// Key phrases extracted from the report
    pub key_phrases: Vec<String>,
}

impl Default for EventInfo {
    fn default() -> Self {
        Self {
            top_event: unknown(),
            incident_type: unknown(),
            costs: None,
            actions_taken: Vec::new(),
            summary: String::new(),
            recommendations: Vec::new(),
            key_phrases: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bowtie elements
// ---------------------------------------------------------------------------

/// A hazard in the bowtie diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HazardItem {
    /// Unique hazard identifier
    pub hazard_id: String,
    /// Short name of the hazard
    pub name: String,
    /// Detailed description
    #[serde(default)]
    pub description: Option<String>,
}

/// A threat (cause) in the bowtie diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThreatItem {
    /// Unique threat identifier
    pub threat_id: String,
    /// Short name of the threat
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A consequence (outcome) in the bowtie diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConsequenceItem {
    /// Unique consequence identifier
    pub consequence_id: String,
    /// Short name of the consequence
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Severity rating, free text
    #[serde(default)]
    pub severity: Option<String>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Bowtie side a control acts on: prevention (left) or mitigation (right)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BowtieSide {
    #[default]
    Prevention,
    Mitigation,
}

impl BowtieSide {
    pub const PERMITTED: &'static [&'static str] = &["prevention", "mitigation"];

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "prevention" => Some(Self::Prevention),
            "mitigation" => Some(Self::Mitigation),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prevention => "prevention",
            Self::Mitigation => "mitigation",
        }
    }
}

/// Kind of safeguard a barrier is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BarrierType {
    Engineering,
    Administrative,
    Ppe,
    #[default]
    Unknown,
}

impl BarrierType {
    pub const PERMITTED: &'static [&'static str] =
        &["engineering", "administrative", "ppe", "unknown"];

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "engineering" => Some(Self::Engineering),
            "administrative" => Some(Self::Administrative),
            "ppe" => Some(Self::Ppe),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engineering => "engineering",
            Self::Administrative => "administrative",
            Self::Ppe => "ppe",
            Self::Unknown => "unknown",
        }
    }
}

/// Ordinal rank of how early in the causal chain a barrier acts
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
pub enum LineOfDefense {
    #[serde(rename = "1st")]
    First,
    #[serde(rename = "2nd")]
    Second,
    #[serde(rename = "3rd")]
    Third,
    #[serde(rename = "recovery")]
    Recovery,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl LineOfDefense {
    pub const PERMITTED: &'static [&'static str] = &["1st", "2nd", "3rd", "recovery", "unknown"];

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "1st" => Some(Self::First),
            "2nd" => Some(Self::Second),
            "3rd" => Some(Self::Third),
            "recovery" => Some(Self::Recovery),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::First => "1st",
            Self::Second => "2nd",
            Self::Third => "3rd",
            Self::Recovery => "recovery",
            Self::Unknown => "unknown",
        }
    }
}

/// Condition of a barrier as reported by the investigation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum BarrierStatus {
    Active,
    Degraded,
    Failed,
    Bypassed,
    NotInstalled,
    #[default]
    Unknown,
}

impl BarrierStatus {
    pub const PERMITTED: &'static [&'static str] = &[
        "active",
        "degraded",
        "failed",
        "bypassed",
        "not_installed",
        "unknown",
    ];

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "degraded" => Some(Self::Degraded),
            "failed" => Some(Self::Failed),
            "bypassed" => Some(Self::Bypassed),
            "not_installed" => Some(Self::NotInstalled),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Bypassed => "bypassed",
            Self::NotInstalled => "not_installed",
            Self::Unknown => "unknown",
        }
    }
}

/// Confidence level of a control assessment
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl Confidence {
    pub const PERMITTED: &'static [&'static str] = &["high", "medium", "low"];

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

// ---------------------------------------------------------------------------
// Control sub-records
// ---------------------------------------------------------------------------

/// Performance attributes of a control/barrier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ControlPerformance {
    /// Current status of the barrier
    pub barrier_status: BarrierStatus,
    /// Whether the barrier failed
    pub barrier_failed: bool,
    pub detection_applicable: bool,
    pub detection_mentioned: bool,
    pub alarm_applicable: bool,
    pub alarm_mentioned: bool,
    pub manual_intervention_applicable: bool,
    pub manual_intervention_mentioned: bool,
}

/// Human-factors attributes of a control/barrier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ControlHuman {
    /// Description of human contribution to the barrier outcome
    pub human_contribution_value: Option<String>,
    pub human_contribution_mentioned: bool,
    /// Whether the barrier failure was due to human factors
    pub barrier_failed_human: bool,
    /// IDs of linked Performance Influencing Factors
    pub linked_pif_ids: Vec<String>,
}

/// Evidence supporting a control assessment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ControlEvidence {
    /// Excerpts from the source document supporting this assessment
    pub supporting_text: Vec<String>,
    pub confidence: Confidence,
}

/// A single control (barrier) in the bowtie diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlItem {
    /// Unique control identifier
    pub control_id: String,
    /// Name of the control
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default)]
    pub side: BowtieSide,
    /// Role of the barrier, free text
    #[serde(default = "unknown")]
    pub barrier_role: String,
    #[serde(default)]
    pub barrier_type: BarrierType,
    #[serde(default)]
    pub line_of_defense: LineOfDefense,
    /// Basis for the line-of-defense classification
    #[serde(default)]
    pub lod_basis: Option<String>,
    /// IDs of threats this control defends against
    #[serde(default)]
    pub linked_threat_ids: Vec<String>,
    /// IDs of consequences this control mitigates
    #[serde(default)]
    pub linked_consequence_ids: Vec<String>,
    #[serde(default)]
    pub performance: ControlPerformance,
    #[serde(default)]
    pub human: ControlHuman,
    #[serde(default)]
    pub evidence: ControlEvidence,
}

// ---------------------------------------------------------------------------
// Bowtie container
// ---------------------------------------------------------------------------

/// Full bowtie diagram structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BowtieInfo {
    pub hazards: Vec<HazardItem>,
    pub threats: Vec<ThreatItem>,
    pub consequences: Vec<ConsequenceItem>,
    pub controls: Vec<ControlItem>,
}

// ---------------------------------------------------------------------------
// Performance Influencing Factors
// ---------------------------------------------------------------------------

/// People-related Performance Influencing Factors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PeoplePifs {
    pub competence_value: Option<String>,
    pub competence_mentioned: bool,
    pub fatigue_value: Option<String>,
    pub fatigue_mentioned: bool,
    pub communication_value: Option<String>,
    pub communication_mentioned: bool,
    pub situational_awareness_value: Option<String>,
    pub situational_awareness_mentioned: bool,
}

/// Work-related Performance Influencing Factors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WorkPifs {
    pub procedures_value: Option<String>,
    pub procedures_mentioned: bool,
    pub workload_value: Option<String>,
    pub workload_mentioned: bool,
    pub time_pressure_value: Option<String>,
    pub time_pressure_mentioned: bool,
    pub tools_equipment_value: Option<String>,
    pub tools_equipment_mentioned: bool,
}

/// Organisation-related Performance Influencing Factors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OrganisationPifs {
    pub safety_culture_value: Option<String>,
    pub safety_culture_mentioned: bool,
    pub management_of_change_value: Option<String>,
    pub management_of_change_mentioned: bool,
    pub supervision_value: Option<String>,
    pub supervision_mentioned: bool,
    pub training_value: Option<String>,
    pub training_mentioned: bool,
}

/// All Performance Influencing Factors grouped by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PifsInfo {
    pub people: PeoplePifs,
    pub work: WorkPifs,
    pub organisation: OrganisationPifs,
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

/// Schema metadata and extraction rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NotesInfo {
    /// Extraction rules handed to the LLM
    pub rules: String,
    /// Schema version identifier
    pub schema_version: String,
}

impl Default for NotesInfo {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level incident record
// ---------------------------------------------------------------------------

/// Complete Schema v2.3 incident record
///
/// All six sections are always present; an empty payload constructs a record
/// where every section carries its defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncidentRecord {
    /// Unique incident identifier, stable across re-extraction
    pub incident_id: String,
    #[serde(default)]
    pub source: SourceInfo,
    #[serde(default)]
    pub context: ContextInfo,
    #[serde(default)]
    pub event: EventInfo,
    #[serde(default)]
    pub bowtie: BowtieInfo,
    #[serde(default)]
    pub pifs: PifsInfo,
    #[serde(default)]
    pub notes: NotesInfo,
}

impl IncidentRecord {
    /// Fully-defaulted record for the given identifier
    pub fn empty(incident_id: impl Into<String>) -> Self {
        Self {
            incident_id: incident_id.into(),
            source: SourceInfo::default(),
            context: ContextInfo::default(),
            event: EventInfo::default(),
            bowtie: BowtieInfo::default(),
            pifs: PifsInfo::default(),
            notes: NotesInfo::default(),
        }
    }
}
