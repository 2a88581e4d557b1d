//! Recommended actions per sticking mechanism.

use serde::{Deserialize, Serialize};

use super::Mechanism;
use crate::error::EngineResult;

/// Input parameters for an action lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParams {
    /// Mechanism name or key.
    pub mechanism: String,
}

/// Categorized recommended actions for one mechanism.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPlan {
    /// Mechanism the plan applies to.
    pub mechanism: Mechanism,
    /// First response at the rig floor.
    pub immediate: Vec<&'static str>,
    /// Follow-up once the first response has been tried.
    pub short_term: Vec<&'static str>,
    /// Fallbacks if the pipe is not freed.
    pub contingency: Vec<&'static str>,
}

/// Look up the action plan for a mechanism by name.
pub fn lookup(params: &ActionParams) -> EngineResult<ActionPlan> {
    let mechanism: Mechanism = params.mechanism.parse()?;
    Ok(plan_for(mechanism))
}

/// Action plan for a parsed mechanism.
pub fn plan_for(mechanism: Mechanism) -> ActionPlan {
    let (immediate, short_term, contingency): (&[&str], &[&str], &[&str]) = match mechanism {
        Mechanism::DifferentialSticking => (
            &[
                "Apply maximum allowable torque and work it down to the stuck depth while slacking off",
                "Jar down with maximum trip load; do not jar up first",
                "Keep circulating at the maximum allowable rate",
            ],
            &[
                "Reduce mud weight to the minimum safe overbalance",
                "Spot a pipe-release pill across the stuck zone and let it soak",
                "Continue jarring down at regular intervals while the pill soaks",
            ],
            &[
                "Run a free-point survey and prepare to back off above the stuck point",
                "Consider a U-tube to lower hydrostatic pressure where well control allows",
                "Plan fishing or sidetrack operations",
            ],
        ),
        Mechanism::MechanicalSticking => (
            &[
                "Establish the direction of last movement before working the pipe",
                "Jar in the direction opposite to the movement when stuck",
                "Keep circulating and limit torque to make-up limits",
            ],
            &[
                "Work the string with moderate torque and controlled overpull",
                "Spot acid if stuck in cement or limestone",
                "Run a junk basket or magnet on the next trip",
            ],
            &[
                "Run a free-point survey and back off above the obstruction",
                "Mill or fish the junk",
                "Plan a sidetrack if fishing fails",
            ],
        ),
        Mechanism::HoleCleaning => (
            &[
                "Drop pump rate to a minimum, then stage up slowly as returns allow",
                "Apply low torque and jar down",
                "Do not pull up into the pack-off",
            ],
            &[
                "Once free, circulate bottoms up at maximum rate with rotation",
                "Pump high-viscosity or weighted sweeps",
                "Back-ream out at controlled speed",
            ],
            &[
                "Run a free-point survey and back off",
                "Review hydraulics and the cuttings transport model",
                "Plan a dedicated cleanout run",
            ],
        ),
        Mechanism::WellboreInstability => (
            &[
                "Try to establish circulation at a low rate",
                "Jar down with moderate loads",
                "Avoid excessive overpull, which can worsen collapse",
            ],
            &[
                "Raise mud weight into the stability window",
                "Improve shale inhibition of the mud system",
                "Ream carefully through tight sections",
            ],
            &[
                "Run a free-point survey and back off",
                "Case off the unstable interval on the next run",
                "Sidetrack above the unstable zone",
            ],
        ),
        Mechanism::KeySeating => (
            &[
                "Slack off and rotate the string down below the key seat",
                "Jar down; do not jar up into the key seat",
                "Keep circulating",
            ],
            &[
                "Back-ream through the key seat with low overpull",
                "Run a key-seat wiper or string reamer above the BHA",
                "Reduce dogleg severity on the remaining section",
            ],
            &[
                "Run a free-point survey and back off",
                "Open the dogleg with a hole opener",
                "Sidetrack if the key seat cannot be opened",
            ],
        ),
        Mechanism::UndergaugeHole => (
            &[
                "Jar up with maximum trip load",
                "Apply torque cautiously while jarring",
                "Keep circulating",
            ],
            &[
                "Pull out and ream the undergauge interval with a full-gauge bit",
                "Gauge every bit and stabilizer on the rig floor",
                "Ream the last stand to bottom on every trip",
            ],
            &[
                "Run a free-point survey and back off",
                "Run a reduced BHA to ream down",
                "Sidetrack if the string cannot be recovered",
            ],
        ),
        Mechanism::FormationFlow => (
            &[
                "Shut in the well following the well-control procedure",
                "Record shut-in pressures and pit gain",
                "Do not work the pipe until the well is under control",
            ],
            &[
                "Circulate out the influx with the approved kill method",
                "Weight up the mud to kill weight",
                "Resume working the pipe once the well is dead",
            ],
            &[
                "Prepare a bullhead or volumetric kill plan",
                "Back off above the stuck point once the well is secure",
                "Set a cement plug if control cannot be regained",
            ],
        ),
        Mechanism::PackOffBridge => (
            &[
                "Bleed pump pressure down and hold a low pressure",
                "Apply torque and jar down",
                "Do not apply overpull into the bridge",
            ],
            &[
                "Stage pumps up slowly as circulation improves",
                "Pump sweeps to clear the annulus",
                "Wash and ream through the bridged interval",
            ],
            &[
                "Run a free-point survey and back off",
                "Spot a pill to consolidate loose formation",
                "Sidetrack if circulation cannot be regained",
            ],
        ),
    };

    ActionPlan {
        mechanism,
        immediate: immediate.to_vec(),
        short_term: short_term.to_vec(),
        contingency: contingency.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_every_mechanism_has_all_three_lists() {
        for m in Mechanism::ALL {
            let plan = plan_for(m);
            assert_eq!(plan.mechanism, m);
            assert!(!plan.immediate.is_empty(), "{} immediate", m);
            assert!(!plan.short_term.is_empty(), "{} short_term", m);
            assert!(!plan.contingency.is_empty(), "{} contingency", m);
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let plan = lookup(&ActionParams {
            mechanism: "Key Seating".to_string(),
        })
        .unwrap();
        assert_eq!(plan.mechanism, Mechanism::KeySeating);
        assert!(plan.immediate[0].contains("below the key seat"));
    }

    #[test]
    fn test_lookup_unknown_mechanism() {
        let err = lookup(&ActionParams {
            mechanism: "Bit Balling".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownMechanism { .. }));
    }

    #[test]
    fn test_differential_jars_down_undergauge_jars_up() {
        let diff = plan_for(Mechanism::DifferentialSticking);
        assert!(diff.immediate.iter().any(|a| a.contains("Jar down")));
        let under = plan_for(Mechanism::UndergaugeHole);
        assert!(under.immediate.iter().any(|a| a.contains("Jar up")));
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(plan_for(Mechanism::FormationFlow)).unwrap();
        assert_eq!(json["mechanism"], "Formation Flow/Kick");
        assert!(json["immediate"].is_array());
        assert!(json["short_term"].is_array());
        assert!(json["contingency"].is_array());
    }
}
