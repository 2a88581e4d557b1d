//! The fixed set of stuck-pipe mechanisms and their diagnostic profiles.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sticking mechanism diagnosed by the classifier or selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Mechanism {
    /// Pipe held against the wall by mud overbalance across a permeable zone.
    #[serde(rename = "Differential Sticking")]
    DifferentialSticking,
    /// Junk, collapsed casing, cement blocks, or ledges mechanically jamming the string.
    #[serde(rename = "Mechanical Sticking")]
    MechanicalSticking,
    /// Cuttings accumulation from inadequate hole cleaning.
    #[serde(rename = "Hole Cleaning/Pack-Off")]
    HoleCleaning,
    /// Shale collapse, swelling, or fracturing of the borehole wall.
    #[serde(rename = "Wellbore Instability")]
    WellboreInstability,
    /// Drill pipe worn into a groove at a dogleg.
    #[serde(rename = "Key Seating")]
    KeySeating,
    /// Hole drilled under gauge by a worn bit or swelling formation.
    #[serde(rename = "Undergauge Hole")]
    UndergaugeHole,
    /// Formation fluid influx packing or flowing around the string.
    #[serde(rename = "Formation Flow/Kick")]
    FormationFlow,
    /// Loose formation or settled solids bridging the annulus.
    #[serde(rename = "Pack-Off/Bridge")]
    PackOffBridge,
}

impl Mechanism {
    /// All mechanisms, in catalog order.
    pub const ALL: [Mechanism; 8] = [
        Mechanism::DifferentialSticking,
        Mechanism::MechanicalSticking,
        Mechanism::HoleCleaning,
        Mechanism::WellboreInstability,
        Mechanism::KeySeating,
        Mechanism::UndergaugeHole,
        Mechanism::FormationFlow,
        Mechanism::PackOffBridge,
    ];

    /// Display name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mechanism::DifferentialSticking => "Differential Sticking",
            Mechanism::MechanicalSticking => "Mechanical Sticking",
            Mechanism::HoleCleaning => "Hole Cleaning/Pack-Off",
            Mechanism::WellboreInstability => "Wellbore Instability",
            Mechanism::KeySeating => "Key Seating",
            Mechanism::UndergaugeHole => "Undergauge Hole",
            Mechanism::FormationFlow => "Formation Flow/Kick",
            Mechanism::PackOffBridge => "Pack-Off/Bridge",
        }
    }

    /// Short stable key, also accepted by [`str::parse`].
    pub fn key(&self) -> &'static str {
        match self {
            Mechanism::DifferentialSticking => "differential_sticking",
            Mechanism::MechanicalSticking => "mechanical_sticking",
            Mechanism::HoleCleaning => "hole_cleaning",
            Mechanism::WellboreInstability => "wellbore_instability",
            Mechanism::KeySeating => "key_seating",
            Mechanism::UndergaugeHole => "undergauge_hole",
            Mechanism::FormationFlow => "formation_flow",
            Mechanism::PackOffBridge => "pack_off_bridge",
        }
    }

    /// One-paragraph description of the mechanism.
    pub fn description(&self) -> &'static str {
        match self {
            Mechanism::DifferentialSticking => {
                "The drillstring is held against a permeable formation by the pressure \
                 difference between the mud column and the formation pore pressure. \
                 Circulation remains unrestricted while both rotation and axial movement are lost."
            }
            Mechanism::MechanicalSticking => {
                "The string is jammed by a physical obstruction such as junk in the hole, \
                 collapsed casing, cement blocks, or ledges at formation interfaces."
            }
            Mechanism::HoleCleaning => {
                "Cuttings have accumulated in the annulus, typically as beds on the low side \
                 of deviated hole, and pack around the BHA when the string is moved or the \
                 pumps are stopped."
            }
            Mechanism::WellboreInstability => {
                "The borehole wall is failing: reactive shale swells, or mechanically \
                 unstable formations collapse into the hole because mud weight does not \
                 support the wellbore."
            }
            Mechanism::KeySeating => {
                "Rotating drill pipe has worn a groove into the wall at a dogleg. The larger \
                 BHA components jam in the groove when pulled upward."
            }
            Mechanism::UndergaugeHole => {
                "The hole is smaller than bit diameter, from a worn bit in abrasive formation \
                 or a swelling formation, and a new full-gauge bit or stiffer BHA jams on the \
                 way in."
            }
            Mechanism::FormationFlow => {
                "Formation fluids are entering the wellbore. The influx carries formation \
                 material around the string or the resulting well-control situation prevents \
                 normal pipe movement."
            }
            Mechanism::PackOffBridge => {
                "Unconsolidated formation or settled solids have bridged the annulus, \
                 restricting circulation and trapping the string."
            }
        }
    }

    /// Evidentiary indicators an engineer would expect to observe.
    pub fn indicators(&self) -> &'static [&'static str] {
        match self {
            Mechanism::DifferentialSticking => &[
                "String became stuck after being stationary",
                "Full circulation with normal pump pressure",
                "Permeable formation (sandstone) exposed across the BHA",
                "High overbalance between mud weight and pore pressure",
                "Unable to rotate or move the pipe axially",
            ],
            Mechanism::MechanicalSticking => &[
                "Sudden stop while moving the string",
                "Circulation unaffected",
                "Junk, cement, or casing damage suspected",
                "Erratic torque before sticking",
            ],
            Mechanism::HoleCleaning => &[
                "Pump pressure increase before sticking",
                "Reduced or absent returns at the shakers",
                "High angle hole with high rate of penetration",
                "Overpull and drag increasing on trips",
            ],
            Mechanism::WellboreInstability => &[
                "Large splintery or blocky cavings at the shakers",
                "Mud weight at or below pore pressure",
                "Tight hole and fill on bottom after trips",
                "Torque and drag increasing with time",
            ],
            Mechanism::KeySeating => &[
                "Stuck while pulling out of hole",
                "Pipe free to move down",
                "Known dogleg above the stuck point",
                "Long rotating hours through the build section",
            ],
            Mechanism::UndergaugeHole => &[
                "Stuck while running in hole",
                "Previous bit pulled under gauge",
                "Abrasive formation drilled on the previous run",
                "New BHA stiffer or larger than the previous one",
            ],
            Mechanism::FormationFlow => &[
                "Pit gain or flow with pumps off",
                "Gas-cut mud or connection gas",
                "Mud weight below formation pore pressure",
                "Drilling break before sticking",
            ],
            Mechanism::PackOffBridge => &[
                "Circulation restricted or lost",
                "Pump pressure spike on restart",
                "Unconsolidated formation exposed",
                "Fill encountered on connections",
            ],
        }
    }
}

impl std::fmt::Display for Mechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercase alphanumerics only, so "Hole Cleaning/Pack-Off", "hole_cleaning_pack_off"
/// and "HOLE CLEANING PACK OFF" compare equal.
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl std::str::FromStr for Mechanism {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        let found = match wanted.as_str() {
            "differential" | "differentialsticking" => Some(Mechanism::DifferentialSticking),
            "mechanical" | "mechanicalsticking" => Some(Mechanism::MechanicalSticking),
            "holecleaning" | "holecleaningpackoff" => Some(Mechanism::HoleCleaning),
            "wellboreinstability" | "instability" => Some(Mechanism::WellboreInstability),
            "keyseat" | "keyseating" => Some(Mechanism::KeySeating),
            "undergauge" | "undergaugehole" => Some(Mechanism::UndergaugeHole),
            "formationflow" | "formationflowkick" | "kick" => Some(Mechanism::FormationFlow),
            "packoff" | "packoffbridge" | "bridge" => Some(Mechanism::PackOffBridge),
            _ => None,
        };
        found.ok_or_else(|| EngineError::UnknownMechanism {
            mechanism: s.to_string(),
        })
    }
}

impl TryFrom<String> for Mechanism {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Terminal diagnosis of a decision-tree traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismResult {
    /// The diagnosed mechanism.
    pub mechanism: Mechanism,
    /// Description of the mechanism.
    pub description: String,
    /// Evidence supporting the diagnosis.
    pub indicators: Vec<String>,
}

impl From<Mechanism> for MechanismResult {
    fn from(mechanism: Mechanism) -> Self {
        Self {
            mechanism,
            description: mechanism.description().to_string(),
            indicators: mechanism
                .indicators()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Catalog entry returned by the mechanism listing.
#[derive(Debug, Clone, Serialize)]
pub struct MechanismInfo {
    /// Short stable key.
    pub key: &'static str,
    /// Display name.
    pub mechanism: Mechanism,
    /// Description of the mechanism.
    pub description: &'static str,
    /// Expected indicators.
    pub indicators: &'static [&'static str],
}

/// List every mechanism with its profile.
pub fn catalog() -> Vec<MechanismInfo> {
    Mechanism::ALL
        .iter()
        .map(|m| MechanismInfo {
            key: m.key(),
            mechanism: *m,
            description: m.description(),
            indicators: m.indicators(),
        })
        .collect()
}
