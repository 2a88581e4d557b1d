//! Mechanism-specific stuck-pipe risk scoring.
//!
//! Each mechanism owns a rule table: a set of weighted factors, each mapping
//! one operating-parameter driver onto a 1-5 level through four ascending
//! thresholds, plus a base severity with escalators. Probability is the
//! weighted mean of factor levels; severity is the base plus one per tripped
//! escalator. Both are clamped to 1-5.
//!
//! | score | `risk_level` | `risk_band` |
//! |-------|--------------|-------------|
//! | >= 20 | CRITICAL     | red         |
//! | >= 15 | HIGH         | orange      |
//! | >= 10 | HIGH         | amber       |
//! | >= 5  | MEDIUM       | yellow      |
//! | < 5   | LOW          | green       |

use serde::{Deserialize, Serialize};

use super::Mechanism;
use crate::error::{EngineError, EngineResult};

/// Contributing-factor weights always sum to this.
pub const FACTOR_WEIGHT_TOTAL: u32 = 100;

// ============================================================================
// Parameters
// ============================================================================

/// Live operating parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingParams {
    /// Mud weight, ppg.
    pub mud_weight: f64,
    /// Formation pore pressure, ppg equivalent.
    pub pore_pressure: f64,
    /// Wellbore inclination, degrees.
    pub inclination: f64,
    /// Time the string has been stationary, hours.
    pub stationary_hours: f64,
    /// Surface torque, ft-lb.
    pub torque: f64,
    /// Overpull above string weight, klb.
    pub overpull: f64,
}

/// Input parameters for a risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParams {
    /// Mechanism name or key.
    pub mechanism: String,
    /// Operating parameters.
    pub params: OperatingParams,
}

// ============================================================================
// Result Types
// ============================================================================

/// Textual risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below 5.
    Low,
    /// Score 5-9.
    Medium,
    /// Score 10-19.
    High,
    /// Score 20-25.
    Critical,
}

impl RiskLevel {
    /// Level for a composite score.
    pub fn from_score(score: u8) -> Self {
        match score {
            20.. => RiskLevel::Critical,
            10..=19 => RiskLevel::High,
            5..=9 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    /// Get the level as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Heat-map colour band of the 5x5 risk matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskBand {
    /// Score below 5.
    Green,
    /// Score 5-9.
    Yellow,
    /// Score 10-14.
    Amber,
    /// Score 15-19.
    Orange,
    /// Score 20-25.
    Red,
}

impl RiskBand {
    /// Band for a composite score.
    pub fn from_score(score: u8) -> Self {
        match score {
            20.. => RiskBand::Red,
            15..=19 => RiskBand::Orange,
            10..=14 => RiskBand::Amber,
            5..=9 => RiskBand::Yellow,
            _ => RiskBand::Green,
        }
    }
}

/// One input's share of the probability score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    /// Factor name.
    pub factor: String,
    /// Relative weight; all weights sum to [`FACTOR_WEIGHT_TOTAL`].
    pub weight: u32,
    /// Level (1-5) the driver fell into.
    pub level: u8,
    /// Driver value the level was derived from.
    pub value: f64,
}

/// Result of a risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Mechanism assessed.
    pub mechanism: Mechanism,
    /// Likelihood, 1-5.
    pub probability: u8,
    /// Consequence, 1-5.
    pub severity: u8,
    /// probability x severity, 1-25.
    pub risk_score: u8,
    /// Textual level.
    pub risk_level: RiskLevel,
    /// Heat-map band.
    pub risk_band: RiskBand,
    /// Breakdown of what drove the probability, heaviest first.
    pub contributing_factors: Vec<ContributingFactor>,
}

/// One cell of the 5x5 risk matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    /// Likelihood, 1-5.
    pub probability: u8,
    /// Consequence, 1-5.
    pub severity: u8,
    /// probability x severity.
    pub risk_score: u8,
    /// Textual level.
    pub risk_level: RiskLevel,
    /// Heat-map band.
    pub risk_band: RiskBand,
}

// ============================================================================
// Rule tables
// ============================================================================

/// Quantity derived from the operating parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    /// Mud weight above pore pressure, ppg (0 when underbalanced).
    Overbalance,
    /// Pore pressure above mud weight, ppg (0 when overbalanced).
    Underbalance,
    Inclination,
    StationaryHours,
    Torque,
    Overpull,
}

impl Driver {
    fn name(&self) -> &'static str {
        match self {
            Driver::Overbalance => "Overbalance",
            Driver::Underbalance => "Underbalance",
            Driver::Inclination => "Inclination",
            Driver::StationaryHours => "Stationary Time",
            Driver::Torque => "Torque",
            Driver::Overpull => "Overpull",
        }
    }

    fn value(&self, p: &OperatingParams) -> f64 {
        match self {
            Driver::Overbalance => (p.mud_weight - p.pore_pressure).max(0.0),
            Driver::Underbalance => (p.pore_pressure - p.mud_weight).max(0.0),
            Driver::Inclination => p.inclination,
            Driver::StationaryHours => p.stationary_hours,
            Driver::Torque => p.torque,
            Driver::Overpull => p.overpull,
        }
    }
}

struct FactorRule {
    driver: Driver,
    /// Ascending; level = 1 + number of thresholds reached.
    thresholds: [f64; 4],
    weight: u32,
}

struct Escalator {
    driver: Driver,
    at_least: f64,
}

struct RiskRules {
    factors: &'static [FactorRule],
    base_severity: u8,
    escalators: &'static [Escalator],
}

const OVERBALANCE_PPG: [f64; 4] = [0.5, 1.0, 1.5, 2.5];
const UNDERBALANCE_PPG: [f64; 4] = [0.1, 0.3, 0.6, 1.0];
const INFLUX_PPG: [f64; 4] = [0.05, 0.2, 0.5, 1.0];
const INCLINATION_DEG: [f64; 4] = [15.0, 30.0, 45.0, 60.0];
const HIGH_ANGLE_DEG: [f64; 4] = [30.0, 45.0, 60.0, 70.0];
const DOGLEG_PRONE_DEG: [f64; 4] = [10.0, 20.0, 30.0, 45.0];
const STATIONARY_HRS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];
const TORQUE_FT_LB: [f64; 4] = [5_000.0, 10_000.0, 15_000.0, 20_000.0];
const OVERPULL_KLB: [f64; 4] = [25.0, 50.0, 100.0, 150.0];

const fn factor(driver: Driver, thresholds: [f64; 4], weight: u32) -> FactorRule {
    FactorRule {
        driver,
        thresholds,
        weight,
    }
}

const fn escalate(driver: Driver, at_least: f64) -> Escalator {
    Escalator { driver, at_least }
}

static DIFFERENTIAL: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Overbalance, OVERBALANCE_PPG, 40),
        factor(Driver::StationaryHours, STATIONARY_HRS, 35),
        factor(Driver::Inclination, INCLINATION_DEG, 15),
        factor(Driver::Overpull, OVERPULL_KLB, 10),
    ],
    base_severity: 3,
    escalators: &[
        escalate(Driver::StationaryHours, 4.0),
        escalate(Driver::Overpull, 100.0),
    ],
};

static MECHANICAL: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Torque, TORQUE_FT_LB, 40),
        factor(Driver::Overpull, OVERPULL_KLB, 35),
        factor(Driver::Inclination, INCLINATION_DEG, 25),
    ],
    base_severity: 3,
    escalators: &[
        escalate(Driver::Torque, 20_000.0),
        escalate(Driver::Overpull, 150.0),
    ],
};

static HOLE_CLEANING: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Inclination, HIGH_ANGLE_DEG, 40),
        factor(Driver::Torque, TORQUE_FT_LB, 25),
        factor(Driver::StationaryHours, STATIONARY_HRS, 20),
        factor(Driver::Overpull, OVERPULL_KLB, 15),
    ],
    base_severity: 3,
    escalators: &[
        escalate(Driver::Inclination, 60.0),
        escalate(Driver::Overpull, 100.0),
    ],
};

static WELLBORE_INSTABILITY: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Underbalance, UNDERBALANCE_PPG, 45),
        factor(Driver::Inclination, INCLINATION_DEG, 35),
        factor(Driver::StationaryHours, STATIONARY_HRS, 20),
    ],
    base_severity: 4,
    escalators: &[escalate(Driver::Underbalance, 1.0)],
};

static KEY_SEATING: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Overpull, OVERPULL_KLB, 40),
        factor(Driver::Inclination, DOGLEG_PRONE_DEG, 35),
        factor(Driver::Torque, TORQUE_FT_LB, 25),
    ],
    base_severity: 2,
    escalators: &[escalate(Driver::Overpull, 100.0)],
};

static UNDERGAUGE: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Torque, TORQUE_FT_LB, 40),
        factor(Driver::Overpull, OVERPULL_KLB, 35),
        factor(Driver::Inclination, INCLINATION_DEG, 25),
    ],
    base_severity: 2,
    escalators: &[escalate(Driver::Torque, 15_000.0)],
};

static FORMATION_FLOW: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Underbalance, INFLUX_PPG, 60),
        factor(Driver::StationaryHours, STATIONARY_HRS, 25),
        factor(Driver::Overpull, OVERPULL_KLB, 15),
    ],
    base_severity: 5,
    escalators: &[],
};

static PACK_OFF: RiskRules = RiskRules {
    factors: &[
        factor(Driver::Inclination, HIGH_ANGLE_DEG, 30),
        factor(Driver::StationaryHours, STATIONARY_HRS, 30),
        factor(Driver::Torque, TORQUE_FT_LB, 20),
        factor(Driver::Overpull, OVERPULL_KLB, 20),
    ],
    base_severity: 4,
    escalators: &[escalate(Driver::StationaryHours, 2.0)],
};

fn rules_for(mechanism: Mechanism) -> &'static RiskRules {
    match mechanism {
        Mechanism::DifferentialSticking => &DIFFERENTIAL,
        Mechanism::MechanicalSticking => &MECHANICAL,
        Mechanism::HoleCleaning => &HOLE_CLEANING,
        Mechanism::WellboreInstability => &WELLBORE_INSTABILITY,
        Mechanism::KeySeating => &KEY_SEATING,
        Mechanism::UndergaugeHole => &UNDERGAUGE,
        Mechanism::FormationFlow => &FORMATION_FLOW,
        Mechanism::PackOffBridge => &PACK_OFF,
    }
}

// ============================================================================
// Scoring
// ============================================================================

fn level(value: f64, thresholds: &[f64; 4]) -> u8 {
    1 + thresholds.iter().filter(|t| value >= **t).count() as u8
}

fn validate(p: &OperatingParams) -> EngineResult<()> {
    let fields = [
        ("mud_weight", p.mud_weight),
        ("pore_pressure", p.pore_pressure),
        ("inclination", p.inclination),
        ("stationary_hours", p.stationary_hours),
        ("torque", p.torque),
        ("overpull", p.overpull),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(EngineError::invalid_input(field, "must be a finite number"));
        }
    }
    if p.mud_weight <= 0.0 {
        return Err(EngineError::invalid_input("mud_weight", "must be greater than zero"));
    }
    if p.pore_pressure <= 0.0 {
        return Err(EngineError::invalid_input(
            "pore_pressure",
            "must be greater than zero",
        ));
    }
    if !(0.0..=180.0).contains(&p.inclination) {
        return Err(EngineError::invalid_input(
            "inclination",
            "must be between 0 and 180 degrees",
        ));
    }
    for (field, value) in [
        ("stationary_hours", p.stationary_hours),
        ("torque", p.torque),
        ("overpull", p.overpull),
    ] {
        if value < 0.0 {
            return Err(EngineError::invalid_input(field, "must not be negative"));
        }
    }
    Ok(())
}

/// Split [`FACTOR_WEIGHT_TOTAL`] across `raw` in proportion, by largest remainder.
fn apportion(raw: &[u32]) -> Vec<u32> {
    let total: u32 = raw.iter().sum();
    if total == 0 {
        return vec![0; raw.len()];
    }
    let mut shares: Vec<u32> = raw
        .iter()
        .map(|r| FACTOR_WEIGHT_TOTAL * r / total)
        .collect();
    let mut order: Vec<usize> = (0..raw.len()).collect();
    // Stable: ties keep table order.
    order.sort_by_key(|&i| std::cmp::Reverse(FACTOR_WEIGHT_TOTAL * raw[i] % total));

    let deficit = FACTOR_WEIGHT_TOTAL - shares.iter().sum::<u32>();
    for &i in order.iter().take(deficit as usize) {
        shares[i] += 1;
    }
    shares
}

/// Assess stuck-pipe risk for a mechanism under the given operating parameters.
pub fn assess(params: &RiskParams) -> EngineResult<RiskResult> {
    let mechanism: Mechanism = params.mechanism.parse()?;
    assess_mechanism(mechanism, &params.params)
}

/// Assess risk for an already-parsed mechanism.
pub fn assess_mechanism(mechanism: Mechanism, p: &OperatingParams) -> EngineResult<RiskResult> {
    validate(p)?;
    let rules = rules_for(mechanism);

    let scored: Vec<(&FactorRule, f64, u8)> = rules
        .factors
        .iter()
        .map(|f| {
            let value = f.driver.value(p);
            (f, value, level(value, &f.thresholds))
        })
        .collect();

    let weight_sum: u32 = scored.iter().map(|(f, _, _)| f.weight).sum();
    let weighted: u32 = scored
        .iter()
        .map(|(f, _, lvl)| f.weight * u32::from(*lvl))
        .sum();
    // Round half up.
    let probability = ((weighted * 2 + weight_sum) / (weight_sum * 2)).clamp(1, 5) as u8;

    let tripped = rules
        .escalators
        .iter()
        .filter(|e| e.driver.value(p) >= e.at_least)
        .count() as u8;
    let severity = (rules.base_severity + tripped).clamp(1, 5);

    let risk_score = probability * severity;

    let raw: Vec<u32> = scored
        .iter()
        .map(|(f, _, lvl)| f.weight * u32::from(*lvl))
        .collect();
    let shares = apportion(&raw);
    let mut contributing_factors: Vec<ContributingFactor> = scored
        .iter()
        .zip(shares)
        .map(|((f, value, lvl), weight)| ContributingFactor {
            factor: f.driver.name().to_string(),
            weight,
            level: *lvl,
            value: *value,
        })
        .collect();
    contributing_factors.sort_by(|a, b| b.weight.cmp(&a.weight));

    Ok(RiskResult {
        mechanism,
        probability,
        severity,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        risk_band: RiskBand::from_score(risk_score),
        contributing_factors,
    })
}

/// The full 5x5 matrix, probability-major.
pub fn risk_matrix() -> Vec<MatrixCell> {
    (1..=5u8)
        .flat_map(|probability| {
            (1..=5u8).map(move |severity| {
                let risk_score = probability * severity;
                MatrixCell {
                    probability,
                    severity,
                    risk_score,
                    risk_level: RiskLevel::from_score(risk_score),
                    risk_band: RiskBand::from_score(risk_score),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quiet() -> OperatingParams {
        OperatingParams {
            mud_weight: 9.0,
            pore_pressure: 9.0,
            inclination: 0.0,
            stationary_hours: 0.0,
            torque: 0.0,
            overpull: 0.0,
        }
    }

    fn hot() -> OperatingParams {
        OperatingParams {
            mud_weight: 12.0,
            pore_pressure: 9.0,
            inclination: 20.0,
            stationary_hours: 6.0,
            torque: 0.0,
            overpull: 0.0,
        }
    }

    #[test]
    fn test_every_rule_table_weights_sum_to_total() {
        for m in Mechanism::ALL {
            let sum: u32 = rules_for(m).factors.iter().map(|f| f.weight).sum();
            assert_eq!(sum, FACTOR_WEIGHT_TOTAL, "{}", m);
        }
    }

    #[test]
    fn test_thresholds_ascending() {
        for m in Mechanism::ALL {
            for f in rules_for(m).factors {
                assert!(f.thresholds.windows(2).all(|w| w[0] < w[1]), "{}", m);
            }
        }
    }

    #[test]
    fn test_differential_high_overbalance_and_stationary() {
        let result = assess_mechanism(Mechanism::DifferentialSticking, &hot()).unwrap();
        assert_eq!(result.probability, 4);
        assert_eq!(result.severity, 4);
        assert_eq!(result.risk_score, 16);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risk_band, RiskBand::Orange);

        let names: Vec<&str> = result
            .contributing_factors
            .iter()
            .map(|f| f.factor.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Overbalance", "Stationary Time", "Inclination", "Overpull"]
        );
        let weights: Vec<u32> = result.contributing_factors.iter().map(|f| f.weight).collect();
        assert_eq!(weights, vec![48, 42, 7, 3]);
    }

    #[test]
    fn test_quiet_conditions_are_low() {
        let result = assess_mechanism(Mechanism::DifferentialSticking, &quiet()).unwrap();
        assert_eq!(result.probability, 1);
        assert_eq!(result.severity, 3);
        assert_eq!(result.risk_score, 3);
        assert_eq!(result.risk_level, RiskLevel::Low);
        let weights: Vec<u32> = result.contributing_factors.iter().map(|f| f.weight).collect();
        assert_eq!(weights, vec![40, 35, 15, 10]);
    }

    #[test]
    fn test_instability_driven_by_underbalance() {
        let mut p = quiet();
        p.inclination = 50.0;
        let balanced = assess_mechanism(Mechanism::WellboreInstability, &p).unwrap();

        p.mud_weight = 8.0;
        p.pore_pressure = 9.2;
        let under = assess_mechanism(Mechanism::WellboreInstability, &p).unwrap();

        assert!(under.probability > balanced.probability);
        assert!(under.severity > balanced.severity);
    }

    #[test]
    fn test_formation_flow_is_severe() {
        let mut p = quiet();
        p.pore_pressure = 10.5;
        let result = assess_mechanism(Mechanism::FormationFlow, &p).unwrap();
        assert_eq!(result.severity, 5);
        assert!(result.risk_score >= 15);
    }

    #[test]
    fn test_score_invariants_across_mechanisms() {
        for m in Mechanism::ALL {
            for p in [quiet(), hot()] {
                let r = assess_mechanism(m, &p).unwrap();
                assert_eq!(r.risk_score, r.probability * r.severity);
                assert!((1..=25).contains(&r.risk_score));
                assert_eq!(r.risk_level, RiskLevel::from_score(r.risk_score));
                let total: u32 = r.contributing_factors.iter().map(|f| f.weight).sum();
                assert_eq!(total, FACTOR_WEIGHT_TOTAL);
                assert!(r
                    .contributing_factors
                    .windows(2)
                    .all(|w| w[0].weight >= w[1].weight));
            }
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(19), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Critical);
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(RiskBand::from_score(4), RiskBand::Green);
        assert_eq!(RiskBand::from_score(5), RiskBand::Yellow);
        assert_eq!(RiskBand::from_score(10), RiskBand::Amber);
        assert_eq!(RiskBand::from_score(15), RiskBand::Orange);
        assert_eq!(RiskBand::from_score(20), RiskBand::Red);
    }

    #[test]
    fn test_matrix_has_five_distinct_bands() {
        let matrix = risk_matrix();
        assert_eq!(matrix.len(), 25);
        let mut bands: Vec<RiskBand> = matrix.iter().map(|c| c.risk_band).collect();
        bands.sort();
        bands.dedup();
        assert_eq!(bands.len(), 5);
        let corner = matrix.last().unwrap();
        assert_eq!((corner.probability, corner.severity, corner.risk_score), (5, 5, 25));
    }

    #[test]
    fn test_unknown_mechanism() {
        let err = assess(&RiskParams {
            mechanism: "Lost Circulation".to_string(),
            params: quiet(),
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownMechanism { .. }));
    }

    #[test]
    fn test_invalid_parameters() {
        let mut p = quiet();
        p.mud_weight = 0.0;
        assert!(matches!(
            assess_mechanism(Mechanism::KeySeating, &p),
            Err(EngineError::InvalidInput { .. })
        ));

        let mut p = quiet();
        p.inclination = 200.0;
        assert!(assess_mechanism(Mechanism::KeySeating, &p).is_err());

        let mut p = quiet();
        p.torque = -1.0;
        assert!(assess_mechanism(Mechanism::KeySeating, &p).is_err());

        let mut p = quiet();
        p.overpull = f64::NAN;
        assert!(assess_mechanism(Mechanism::KeySeating, &p).is_err());
    }

    #[test]
    fn test_apportion_sums_exactly() {
        assert_eq!(apportion(&[1, 1, 1]).iter().sum::<u32>(), 100);
        assert_eq!(apportion(&[200, 175, 30, 10]), vec![48, 42, 7, 3]);
        assert_eq!(apportion(&[0, 0]), vec![0, 0]);
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(
            serde_json::to_value(RiskLevel::Critical).unwrap(),
            serde_json::json!("CRITICAL")
        );
        assert_eq!(
            serde_json::to_value(RiskBand::Amber).unwrap(),
            serde_json::json!("amber")
        );
    }
}
