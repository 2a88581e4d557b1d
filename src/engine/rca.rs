//! Root-cause-analysis audit and report generation.
//!
//! Supports the two investigation methodologies used after a stuck-pipe
//! event:
//! - **5-Whys**: a linear causal chain; the terminal Why is the candidate
//!   root cause.
//! - **Fishbone (Ishikawa)**: contributing factors grouped under the 6M
//!   categories; the category with the most factors is the candidate.
//!
//! Generation audits the investigation. Once it passes the completeness
//! gate it always produces a report, but the report may state that no root
//! cause was identified (empty category and description) when the evidence
//! does not converge: a circular or unclassifiable terminal Why, or a tie
//! between the largest fishbone categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use super::{actions, Mechanism};
use crate::error::{EngineError, EngineResult};

/// Minimum non-empty Whys for a complete 5-Whys investigation.
pub const MIN_WHYS: usize = 3;

/// Distinct Whys at which 5-Whys confidence saturates.
const WHYS_FOR_FULL_CONFIDENCE: f64 = 5.0;

/// Confidence credited per distinct fishbone factor and per populated category.
const FISHBONE_FACTOR_CREDIT: f64 = 0.1;
const FISHBONE_CATEGORY_CREDIT: f64 = 0.1;

// ============================================================================
// Parameters
// ============================================================================

/// Investigation methodology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Methodology {
    /// Iterative "why" chain.
    #[serde(rename = "5whys")]
    FiveWhys,
    /// Ishikawa cause-and-effect diagram.
    #[serde(rename = "fishbone")]
    Fishbone,
}

impl std::fmt::Display for Methodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Methodology::FiveWhys => write!(f, "5whys"),
            Methodology::Fishbone => write!(f, "fishbone"),
        }
    }
}

/// Input parameters for report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaParams {
    /// Methodology tag.
    pub methodology: Methodology,
    /// Investigation payload: an array of Whys, or a map of category to factors.
    pub data: serde_json::Value,
    /// Optional mechanism context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
}

/// A submitted investigation.
#[derive(Debug, Clone, PartialEq)]
pub enum RcaInvestigation {
    /// Ordered causal chain.
    FiveWhys(Vec<String>),
    /// Category name to contributing factors.
    Fishbone(BTreeMap<String, Vec<String>>),
}

impl RcaParams {
    /// Decode the payload according to the methodology tag.
    pub fn investigation(&self) -> EngineResult<RcaInvestigation> {
        match self.methodology {
            Methodology::FiveWhys => serde_json::from_value(self.data.clone())
                .map(RcaInvestigation::FiveWhys)
                .map_err(|e| {
                    EngineError::invalid_input("data", format!("expected an array of strings: {}", e))
                }),
            Methodology::Fishbone => serde_json::from_value(self.data.clone())
                .map(RcaInvestigation::Fishbone)
                .map_err(|e| {
                    EngineError::invalid_input(
                        "data",
                        format!("expected an object of category to string arrays: {}", e),
                    )
                }),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Generated root-cause report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaReport {
    /// Unique report ID.
    pub report_id: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Methodology used.
    pub methodology: Methodology,
    /// Mechanism context, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<Mechanism>,
    /// False when the investigation did not converge on a cause.
    pub root_cause_identified: bool,
    /// Root cause category, empty when none was identified.
    pub root_cause_category: String,
    /// Root cause statement, empty when none was identified.
    pub root_cause_description: String,
    /// The cleaned Why chain (5-Whys only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five_whys: Option<Vec<String>>,
    /// The cleaned factor map (fishbone only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fishbone_factors: Option<BTreeMap<String, Vec<String>>>,
    /// Immediate remediations.
    pub corrective_actions: Vec<String>,
    /// Systemic and procedural changes.
    pub prevention_actions: Vec<String>,
    /// Evidentiary support for the finding, 0.0-1.0.
    pub confidence_score: f64,
}

// ============================================================================
// 6M categories
// ============================================================================

/// Ishikawa 6M cause category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CauseCategory {
    /// People: training, communication, fatigue.
    Man,
    /// Equipment and tools.
    Machine,
    /// Procedures, plans, practices.
    Method,
    /// Drilling fluid and consumables.
    Material,
    /// Sensors, monitoring, data.
    Measurement,
    /// Formation and geology.
    Environment,
}

impl CauseCategory {
    const ALL: [CauseCategory; 6] = [
        CauseCategory::Man,
        CauseCategory::Machine,
        CauseCategory::Method,
        CauseCategory::Material,
        CauseCategory::Measurement,
        CauseCategory::Environment,
    ];

    /// Get the category as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CauseCategory::Man => "Man",
            CauseCategory::Machine => "Machine",
            CauseCategory::Method => "Method",
            CauseCategory::Material => "Material",
            CauseCategory::Measurement => "Measurement",
            CauseCategory::Environment => "Environment",
        }
    }

    /// Match a fishbone category label, including common synonyms.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "man" | "people" | "personnel" | "human" => Some(CauseCategory::Man),
            "machine" | "machines" | "equipment" => Some(CauseCategory::Machine),
            "method" | "methods" | "procedure" | "procedures" | "process" => {
                Some(CauseCategory::Method)
            }
            "material" | "materials" | "mud" | "fluids" => Some(CauseCategory::Material),
            "measurement" | "measurements" | "monitoring" => Some(CauseCategory::Measurement),
            "environment" | "environmental" | "formation" | "geology" => {
                Some(CauseCategory::Environment)
            }
            _ => None,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            CauseCategory::Man => &[
                "training", "experience", "fatigue", "communicat", "crew", "driller",
                "supervisor", "handover", "competen", "human", "awareness", "complacen",
                "staff", "operator",
            ],
            CauseCategory::Machine => &[
                "pump", "equipment", "motor", "top drive", "bha", "jar", "stabili", "shaker",
                "solids control", "rig", "maintenance", "bit", "tool",
            ],
            CauseCategory::Method => &[
                "procedure", "plan", "practice", "program", "policy", "standard",
                "checklist", "design", "reaming", "tripping", "wiper", "guideline",
            ],
            CauseCategory::Material => &[
                "mud", "fluid", "weight", "additive", "lubric", "viscosity", "rheolog",
                "cement", "lcm", "chemical", "inhibit", "filtrate", "filter cake",
            ],
            CauseCategory::Measurement => &[
                "sensor", "gauge", "reading", "measure", "monitor", "alarm", "calibrat",
                "data", "survey", "indicator", "pwd", "log",
            ],
            CauseCategory::Environment => &[
                "formation", "shale", "geolog", "sand", "fault", "temperature", "weather",
                "zone", "deplet", "reactive", "swell", "pore pressure", "fracture",
            ],
        }
    }

    fn corrective(&self) -> &'static [&'static str] {
        match self {
            CauseCategory::Man => &[
                "Brief the crew on the event and the warning signs that preceded it",
                "Assign a dedicated stuck-pipe watch on the drill floor for the remaining section",
            ],
            CauseCategory::Machine => &[
                "Inspect and repair the implicated equipment before resuming operations",
                "Verify BHA and jar configuration against the approved design",
            ],
            CauseCategory::Method => &[
                "Amend the active operating procedure to close the identified gap",
                "Hold a pre-job review of the revised procedure with all shifts",
            ],
            CauseCategory::Material => &[
                "Bring mud properties back within the program specification",
                "Treat the active system and confirm with a full mud check",
            ],
            CauseCategory::Measurement => &[
                "Calibrate or replace the implicated sensors",
                "Cross-check surface readings against downhole data before relying on them",
            ],
            CauseCategory::Environment => &[
                "Update the formation model with the observed hazard",
                "Adjust drilling parameters for the remainder of the hazardous interval",
            ],
        }
    }

    fn prevention(&self) -> &'static [&'static str] {
        match self {
            CauseCategory::Man => &[
                "Add stuck-pipe prevention to the competency assurance program",
                "Formalize shift handover of hole-condition trends",
            ],
            CauseCategory::Machine => &[
                "Add the failure mode to the preventive maintenance schedule",
                "Include equipment condition in the pre-spud readiness checklist",
            ],
            CauseCategory::Method => &[
                "Incorporate the lesson into the drilling program template",
                "Audit adherence to the revised procedure on the next well",
            ],
            CauseCategory::Material => &[
                "Tighten mud property limits and monitoring frequency in the fluids program",
                "Require engineering sign-off for fluid changes in hazardous intervals",
            ],
            CauseCategory::Measurement => &[
                "Define alarm thresholds for the precursor trends observed",
                "Add sensor validation to the daily operations checklist",
            ],
            CauseCategory::Environment => &[
                "Share the hazard with offset-well planning",
                "Include the interval in the pre-drill stuck-pipe risk assessment",
            ],
        }
    }

    /// Classify free text by keyword hits. `None` when nothing matches or the
    /// top categories tie.
    fn classify(text: &str) -> Option<Self> {
        let words = tokenize(text);
        let mut best: Option<(CauseCategory, usize)> = None;
        let mut tied = false;
        for category in Self::ALL {
            let hits = category
                .keywords()
                .iter()
                .filter(|k| mentions(&words, k))
                .count();
            if hits == 0 {
                continue;
            }
            match best {
                Some((_, top)) if hits < top => {}
                Some((_, top)) if hits == top => tied = true,
                _ => {
                    best = Some((category, hits));
                    tied = false;
                }
            }
        }
        if tied {
            None
        } else {
            best.map(|(c, _)| c)
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when consecutive words start with each stem of `keyword` in turn.
/// Stems only match at the start of a word, so "log" misses "geology".
fn mentions(words: &[String], keyword: &str) -> bool {
    let stems: Vec<&str> = keyword.split_whitespace().collect();
    if stems.is_empty() {
        return false;
    }
    words
        .windows(stems.len())
        .any(|run| run.iter().zip(&stems).all(|(word, stem)| word.starts_with(stem)))
}

impl std::fmt::Display for CauseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Generation
// ============================================================================

const GENERIC_CORRECTIVE: &[&str] =
    &["Address each recorded contributing factor before resuming operations"];
const GENERIC_PREVENTION: &[&str] =
    &["Add the recorded contributing factors to the well's lessons-learned register"];
const UNRESOLVED_PREVENTION: &[&str] = &[
    "Extend the investigation until the causal chain ends in a specific, controllable cause",
    "Review real-time data from the event with the drilling engineering team",
];

struct Finding {
    category: String,
    description: String,
    actions: Option<CauseCategory>,
}

fn clean(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn distinct_count(entries: &[String]) -> usize {
    entries
        .iter()
        .map(|s| s.to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn audit_five_whys(whys: &[String]) -> EngineResult<(Vec<String>, Option<Finding>, f64)> {
    let whys = clean(whys);
    if whys.len() < MIN_WHYS {
        return Err(EngineError::IncompleteInvestigation {
            reason: format!(
                "5-Whys needs at least {} non-empty entries, got {}",
                MIN_WHYS,
                whys.len()
            ),
        });
    }

    let confidence = round2((distinct_count(&whys) as f64 / WHYS_FOR_FULL_CONFIDENCE).min(1.0));

    let (terminal, earlier) = match whys.split_last() {
        Some(split) => split,
        None => return Ok((whys, None, confidence)),
    };

    let circular = earlier
        .iter()
        .any(|w| w.to_lowercase() == terminal.to_lowercase());
    if circular {
        debug!("Terminal why repeats an earlier why");
        return Ok((whys, None, confidence));
    }

    let finding = CauseCategory::classify(terminal).map(|category| Finding {
        category: category.to_string(),
        description: terminal.clone(),
        actions: Some(category),
    });

    Ok((whys, finding, confidence))
}

type FactorMap = BTreeMap<String, Vec<String>>;

fn audit_fishbone(factors: &FactorMap) -> EngineResult<(FactorMap, Option<Finding>, f64)> {
    // Synonym labels share one branch; unrecognised labels are kept trimmed.
    let mut merged = FactorMap::new();
    for (label, entries) in factors {
        let key = CauseCategory::from_label(label)
            .map(|c| c.to_string())
            .unwrap_or_else(|| label.trim().to_string());
        merged.entry(key).or_default().extend(clean(entries));
    }

    let mut cleaned = FactorMap::new();
    for (label, entries) in merged {
        let mut seen = HashSet::new();
        let unique: Vec<String> = entries
            .into_iter()
            .filter(|f| seen.insert(f.to_lowercase()))
            .collect();
        if !unique.is_empty() {
            cleaned.insert(label, unique);
        }
    }

    if cleaned.is_empty() {
        return Err(EngineError::IncompleteInvestigation {
            reason: "fishbone needs at least one category with at least one factor".to_string(),
        });
    }

    let factor_count: usize = cleaned.values().map(Vec::len).sum();
    let confidence = round2(
        (factor_count as f64 * FISHBONE_FACTOR_CREDIT
            + cleaned.len() as f64 * FISHBONE_CATEGORY_CREDIT)
            .min(1.0),
    );

    let largest = cleaned.values().map(Vec::len).max().unwrap_or(0);
    let mut leaders = cleaned.iter().filter(|(_, f)| f.len() == largest);
    let finding = match (leaders.next(), leaders.next()) {
        (Some((label, entries)), None) => {
            let known = CauseCategory::from_label(label);
            let category = known.map(|c| c.to_string()).unwrap_or_else(|| label.clone());
            Some(Finding {
                description: format!("{}: {}", category, entries.join("; ")),
                category,
                actions: known,
            })
        }
        _ => {
            debug!(largest, "Fishbone categories tie for the most factors");
            None
        }
    };

    Ok((cleaned, finding, confidence))
}

/// Generate a root-cause report from a completed investigation.
pub fn generate(params: &RcaParams) -> EngineResult<RcaReport> {
    let mechanism = params
        .mechanism
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .map(str::parse::<Mechanism>)
        .transpose()?;

    let investigation = params.investigation()?;
    generate_report(&investigation, mechanism)
}

/// Generate a report from an already-decoded investigation.
pub fn generate_report(
    investigation: &RcaInvestigation,
    mechanism: Option<Mechanism>,
) -> EngineResult<RcaReport> {
    let (methodology, five_whys, fishbone_factors, finding, confidence) = match investigation {
        RcaInvestigation::FiveWhys(whys) => {
            let (whys, finding, confidence) = audit_five_whys(whys)?;
            (Methodology::FiveWhys, Some(whys), None, finding, confidence)
        }
        RcaInvestigation::Fishbone(factors) => {
            let (factors, finding, confidence) = audit_fishbone(factors)?;
            (Methodology::Fishbone, None, Some(factors), finding, confidence)
        }
    };

    let mut corrective_actions: Vec<String> = mechanism
        .map(|m| {
            actions::plan_for(m)
                .immediate
                .into_iter()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (root_cause_category, root_cause_description, prevention_actions) = match finding {
        Some(finding) => {
            let (corrective, prevention) = match finding.actions {
                Some(c) => (c.corrective(), c.prevention()),
                None => (GENERIC_CORRECTIVE, GENERIC_PREVENTION),
            };
            corrective_actions.extend(corrective.iter().map(|s| s.to_string()));
            (
                finding.category,
                finding.description,
                prevention.iter().map(|s| s.to_string()).collect(),
            )
        }
        None => (
            String::new(),
            String::new(),
            UNRESOLVED_PREVENTION.iter().map(|s| s.to_string()).collect(),
        ),
    };

    let root_cause_identified = !root_cause_category.is_empty();
    info!(
        methodology = %methodology,
        identified = root_cause_identified,
        category = %root_cause_category,
        confidence,
        "RCA report generated"
    );

    Ok(RcaReport {
        report_id: Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        methodology,
        mechanism,
        root_cause_identified,
        root_cause_category,
        root_cause_description,
        five_whys,
        fishbone_factors,
        corrective_actions,
        prevention_actions,
        confidence_score: confidence,
    })
}
