//! Free-point calculation by the stretch method.
//!
//! A known overpull is applied to the stuck string and the resulting
//! elongation at surface is measured. Only the free length stretches, so
//! Hooke's law gives that length directly:
//!
//! ```text
//! A  = pi/4 * (OD^2 - ID^2)                   [in^2]
//! L  = E * A * stretch / (pull * 12)          [ft]
//! %Y = 100 * pull / (A * yield)               [% of pipe-body yield]
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{EngineError, EngineResult};

/// Young's modulus of steel, psi.
pub const STEEL_MODULUS_PSI: f64 = 30_000_000.0;

/// Pulls above this percentage of yield risk parting the pipe.
pub const SAFE_PULL_PCT_OF_YIELD: f64 = 80.0;

const INCHES_PER_FOOT: f64 = 12.0;

/// API drill pipe grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipeGrade {
    /// 75,000 psi minimum yield.
    E75,
    /// 95,000 psi minimum yield.
    X95,
    /// 105,000 psi minimum yield.
    G105,
    /// 135,000 psi minimum yield.
    S135,
    /// 150,000 psi minimum yield.
    V150,
}

impl PipeGrade {
    /// Minimum yield strength in psi.
    pub fn min_yield_psi(&self) -> f64 {
        match self {
            PipeGrade::E75 => 75_000.0,
            PipeGrade::X95 => 95_000.0,
            PipeGrade::G105 => 105_000.0,
            PipeGrade::S135 => 135_000.0,
            PipeGrade::V150 => 150_000.0,
        }
    }

    /// Get the grade as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            PipeGrade::E75 => "E75",
            PipeGrade::X95 => "X95",
            PipeGrade::G105 => "G105",
            PipeGrade::S135 => "S135",
            PipeGrade::V150 => "V150",
        }
    }
}

impl std::fmt::Display for PipeGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PipeGrade {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
            .to_uppercase();
        match cleaned.as_str() {
            "E75" | "E" => Ok(PipeGrade::E75),
            "X95" | "X" => Ok(PipeGrade::X95),
            "G105" | "G" => Ok(PipeGrade::G105),
            "S135" | "S" => Ok(PipeGrade::S135),
            "V150" | "V" => Ok(PipeGrade::V150),
            _ => Err(EngineError::invalid_input(
                "pipe_grade",
                format!("unknown grade '{}' (expected E75, X95, G105, S135, or V150)", s),
            )),
        }
    }
}

/// Input parameters for a free-point calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreePointParams {
    /// Pipe outer diameter, in.
    pub pipe_od: f64,
    /// Pipe inner diameter, in.
    pub pipe_id: f64,
    /// Pipe grade, e.g. "S135".
    pub pipe_grade: String,
    /// Measured stretch at surface, in.
    pub stretch_inches: f64,
    /// Applied pull above string weight, lbf.
    pub pull_force_lbs: f64,
}

/// Result of a free-point calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreePointResult {
    /// Estimated depth of the free point, ft.
    pub free_point_depth_ft: f64,
    /// Pipe-body cross-sectional area, in^2.
    pub pipe_area_sqin: f64,
    /// Pull force as a percentage of pipe-body yield.
    pub pull_pct_of_yield: f64,
    /// Whether the pull is at or below the safe fraction of yield.
    pub pull_safe: bool,
}

fn require_positive(field: &str, value: f64) -> EngineResult<()> {
    if !value.is_finite() {
        return Err(EngineError::invalid_input(field, "must be a finite number"));
    }
    if value <= 0.0 {
        return Err(EngineError::invalid_input(field, "must be greater than zero"));
    }
    Ok(())
}

/// Calculate free-point depth and pull safety.
pub fn calculate(params: &FreePointParams) -> EngineResult<FreePointResult> {
    require_positive("pipe_od", params.pipe_od)?;
    require_positive("pipe_id", params.pipe_id)?;
    require_positive("stretch_inches", params.stretch_inches)?;
    require_positive("pull_force_lbs", params.pull_force_lbs)?;
    if params.pipe_od <= params.pipe_id {
        return Err(EngineError::invalid_input(
            "pipe_od",
            format!(
                "outer diameter {} must exceed inner diameter {}",
                params.pipe_od, params.pipe_id
            ),
        ));
    }
    let grade: PipeGrade = params.pipe_grade.parse()?;

    let area = PI / 4.0 * (params.pipe_od.powi(2) - params.pipe_id.powi(2));
    let depth_ft = STEEL_MODULUS_PSI * area * params.stretch_inches
        / (params.pull_force_lbs * INCHES_PER_FOOT);
    let pull_pct = 100.0 * params.pull_force_lbs / (area * grade.min_yield_psi());

    Ok(FreePointResult {
        free_point_depth_ft: depth_ft,
        pipe_area_sqin: area,
        pull_pct_of_yield: pull_pct,
        pull_safe: pull_pct <= SAFE_PULL_PCT_OF_YIELD,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(grade: &str, stretch: f64, pull: f64) -> FreePointParams {
        FreePointParams {
            pipe_od: 5.0,
            pipe_id: 4.276,
            pipe_grade: grade.to_string(),
            stretch_inches: stretch,
            pull_force_lbs: pull,
        }
    }

    #[test]
    fn test_five_inch_s135() {
        let result = calculate(&params("S135", 6.0, 80_000.0)).unwrap();

        let area = PI / 4.0 * (25.0 - 4.276f64.powi(2));
        assert!((result.pipe_area_sqin - area).abs() < 1e-9);
        assert!((result.pipe_area_sqin - 5.2746).abs() < 1e-3);

        // 30e6 * 5.2746 * 6 / (80000 * 12) ~ 989 ft
        assert!(result.free_point_depth_ft > 0.0);
        assert!((result.free_point_depth_ft - 989.0).abs() < 1.0);

        assert!((result.pull_pct_of_yield - 11.23).abs() < 0.01);
        assert!(result.pull_safe);
    }

    #[test]
    fn test_pull_safety_threshold() {
        // 85% of E75 yield on this pipe.
        let area = PI / 4.0 * (25.0 - 4.276f64.powi(2));
        let pull = 0.85 * area * 75_000.0;
        let result = calculate(&params("E75", 10.0, pull)).unwrap();
        assert!((result.pull_pct_of_yield - 85.0).abs() < 1e-9);
        assert!(!result.pull_safe);

        let pull = 0.80 * area * 75_000.0;
        let result = calculate(&params("E75", 10.0, pull)).unwrap();
        assert_eq!(result.pull_safe, result.pull_pct_of_yield <= 80.0);
    }

    #[test]
    fn test_zero_stretch_rejected() {
        let err = calculate(&params("S135", 0.0, 80_000.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "stretch_inches"));
    }

    #[test]
    fn test_zero_pull_rejected() {
        let err = calculate(&params("S135", 6.0, 0.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pull_force_lbs"));
    }

    #[test]
    fn test_negative_inputs_rejected() {
        assert!(calculate(&params("S135", -1.0, 80_000.0)).is_err());
        assert!(calculate(&params("S135", 6.0, -5.0)).is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(calculate(&params("S135", f64::NAN, 80_000.0)).is_err());
        assert!(calculate(&params("S135", 6.0, f64::INFINITY)).is_err());
    }

    #[test]
    fn test_od_not_greater_than_id_rejected() {
        let mut p = params("S135", 6.0, 80_000.0);
        p.pipe_id = 5.0;
        let err = calculate(&p).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pipe_od"));

        p.pipe_id = 5.5;
        assert!(calculate(&p).is_err());
    }

    #[test]
    fn test_unknown_grade_rejected() {
        let err = calculate(&params("P110", 6.0, 80_000.0)).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "pipe_grade"));
    }

    #[test]
    fn test_grade_parse_and_yield() {
        assert_eq!("s-135".parse::<PipeGrade>().unwrap(), PipeGrade::S135);
        assert_eq!("g105".parse::<PipeGrade>().unwrap(), PipeGrade::G105);
        assert_eq!(PipeGrade::V150.min_yield_psi(), 150_000.0);
        assert_eq!(PipeGrade::X95.to_string(), "X95");
    }

    #[test]
    fn test_higher_grade_lowers_pull_pct() {
        let e = calculate(&params("E75", 6.0, 200_000.0)).unwrap();
        let v = calculate(&params("V150", 6.0, 200_000.0)).unwrap();
        assert!(v.pull_pct_of_yield < e.pull_pct_of_yield);
        assert_eq!(v.free_point_depth_ft, e.free_point_depth_ft);
    }
}
