//! Integration tests for the stateless engine operations
//!
//! Free point, risk, RCA and action lookups through the public API.

use serde_json::json;
use stuckpipe_engine::engine::{
    actions, free_point, rca, risk, ActionParams, FreePointParams, Mechanism, Methodology,
    OperatingParams, RcaParams, RiskBand, RiskLevel, RiskParams,
};
use stuckpipe_engine::error::EngineError;

fn five_inch(stretch: f64, pull: f64) -> FreePointParams {
    FreePointParams {
        pipe_od: 5.0,
        pipe_id: 4.276,
        pipe_grade: "S135".to_string(),
        stretch_inches: stretch,
        pull_force_lbs: pull,
    }
}

fn operating(mud_weight: f64, pore_pressure: f64, stationary_hours: f64) -> OperatingParams {
    OperatingParams {
        mud_weight,
        pore_pressure,
        inclination: 20.0,
        stationary_hours,
        torque: 0.0,
        overpull: 0.0,
    }
}

mod free_point_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_depth_scales_with_stretch() {
        let short = free_point::calculate(&five_inch(3.0, 80_000.0)).unwrap();
        let long = free_point::calculate(&five_inch(6.0, 80_000.0)).unwrap();
        assert!((long.free_point_depth_ft / short.free_point_depth_ft - 2.0).abs() < 1e-9);
        assert_eq!(short.pull_pct_of_yield, long.pull_pct_of_yield);
    }

    #[test]
    fn test_depth_inverse_to_pull() {
        let light = free_point::calculate(&five_inch(6.0, 40_000.0)).unwrap();
        let heavy = free_point::calculate(&five_inch(6.0, 80_000.0)).unwrap();
        assert!((light.free_point_depth_ft / heavy.free_point_depth_ft - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_case() {
        let result = free_point::calculate(&five_inch(6.0, 80_000.0)).unwrap();
        assert!((result.pipe_area_sqin - 5.2746).abs() < 1e-3);
        assert!((result.free_point_depth_ft - 989.0).abs() < 1.0);
        assert!(result.pull_safe);
    }

    #[test]
    fn test_degenerate_inputs_rejected() {
        for (stretch, pull) in [(0.0, 80_000.0), (6.0, 0.0), (-1.0, 80_000.0)] {
            let err = free_point::calculate(&five_inch(stretch, pull)).unwrap_err();
            assert_eq!(err.kind(), "invalid_input");
        }
    }

    #[test]
    fn test_params_from_json() {
        let params: FreePointParams = serde_json::from_value(json!({
            "pipe_od": 5.5,
            "pipe_id": 4.778,
            "pipe_grade": "G105",
            "stretch_inches": 10.0,
            "pull_force_lbs": 100000.0
        }))
        .unwrap();
        let result = free_point::calculate(&params).unwrap();
        assert!(result.free_point_depth_ft > 0.0);
    }
}

mod risk_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assess_by_name() {
        let result = risk::assess(&RiskParams {
            mechanism: "Differential Sticking".to_string(),
            params: operating(12.0, 9.0, 6.0),
        })
        .unwrap();
        assert_eq!(result.mechanism, Mechanism::DifferentialSticking);
        assert_eq!(result.risk_score, 16);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.risk_band, RiskBand::Orange);
    }

    #[test]
    fn test_more_overbalance_never_lowers_differential_risk() {
        let mut previous = 0;
        for mud_weight in [9.0, 9.5, 10.0, 11.0, 12.0, 13.0] {
            let result = risk::assess_mechanism(
                Mechanism::DifferentialSticking,
                &operating(mud_weight, 9.0, 2.0),
            )
            .unwrap();
            assert!(result.risk_score >= previous, "mud weight {}", mud_weight);
            previous = result.risk_score;
        }
    }

    #[test]
    fn test_unknown_mechanism_rejected() {
        let err = risk::assess(&RiskParams {
            mechanism: "Bit Balling".to_string(),
            params: operating(10.0, 9.0, 0.0),
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownMechanism { .. }));
    }

    #[test]
    fn test_serialized_shape() {
        let result = risk::assess(&RiskParams {
            mechanism: "key_seating".to_string(),
            params: operating(10.0, 9.0, 0.0),
        })
        .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mechanism"], "Key Seating");
        assert!(json["risk_level"].is_string());
        assert!(json["risk_band"].is_string());
        let total: u64 = json["contributing_factors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["weight"].as_u64().unwrap())
            .sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_matrix_bands() {
        let matrix = risk::risk_matrix();
        assert_eq!(matrix.len(), 25);
        let corner = matrix.last().unwrap();
        assert_eq!(corner.risk_score, 25);
        assert_eq!(corner.risk_band, RiskBand::Red);
        assert_eq!(matrix[0].risk_band, RiskBand::Green);
    }
}

mod rca_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_five_whys_report() {
        let report = rca::generate(&RcaParams {
            methodology: Methodology::FiveWhys,
            data: json!([
                "Pipe stuck during connection",
                "String was stationary for 40 minutes across the sand",
                "The connection was delayed by a top drive fault",
                "Top drive maintenance was overdue on the rig"
            ]),
            mechanism: Some("differential".to_string()),
        })
        .unwrap();

        assert!(report.root_cause_identified);
        assert_eq!(report.root_cause_category, "Machine");
        assert_eq!(report.mechanism, Some(Mechanism::DifferentialSticking));
        assert!(!report.corrective_actions.is_empty());
        assert!((0.0..=1.0).contains(&report.confidence_score));
    }

    #[test]
    fn test_two_whys_incomplete() {
        let err = rca::generate(&RcaParams {
            methodology: Methodology::FiveWhys,
            data: json!(["one", "two"]),
            mechanism: None,
        })
        .unwrap_err();
        assert_eq!(err.kind(), "incomplete_investigation");
    }

    #[test]
    fn test_fishbone_report_is_deterministic() {
        let params = RcaParams {
            methodology: Methodology::Fishbone,
            data: json!({
                "Material": ["Mud weight 1.8 ppg over pore pressure", "No lubricant in system"],
                "Method": ["Survey taken with string stationary"]
            }),
            mechanism: None,
        };
        let a = rca::generate(&params).unwrap();
        let b = rca::generate(&params).unwrap();
        assert_eq!(a.root_cause_category, "Material");
        assert_eq!(a.root_cause_category, b.root_cause_category);
        assert_eq!(a.root_cause_description, b.root_cause_description);
        assert_eq!(a.corrective_actions, b.corrective_actions);
        assert_eq!(a.prevention_actions, b.prevention_actions);
        assert_eq!(a.confidence_score, b.confidence_score);
    }

    #[test]
    fn test_methodology_tag_from_json() {
        let params: RcaParams = serde_json::from_value(json!({
            "methodology": "fishbone",
            "data": {"Man": ["Crew fatigue on night shift"]}
        }))
        .unwrap();
        assert_eq!(params.methodology, Methodology::Fishbone);
        assert!(serde_json::from_value::<RcaParams>(json!({
            "methodology": "pareto",
            "data": []
        }))
        .is_err());
    }
}

mod action_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_mechanism_resolves_by_display_name() {
        for m in Mechanism::ALL {
            let plan = actions::lookup(&ActionParams {
                mechanism: m.as_str().to_string(),
            })
            .unwrap();
            assert_eq!(plan.mechanism, m);
            assert!(!plan.immediate.is_empty());
            assert!(!plan.short_term.is_empty());
            assert!(!plan.contingency.is_empty());
        }
    }
}
