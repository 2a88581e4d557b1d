//! Stuck-pipe diagnostic engine.
//!
//! This module provides the diagnostic operations:
//! - [`Classifier`]: Interactive yes/no mechanism classification over a [`DecisionTree`]
//! - [`free_point`]: Free-point depth by the stretch method
//! - [`risk`]: Probability x severity risk assessment and the 5x5 matrix
//! - [`rca`]: 5-Whys and fishbone root-cause reports
//! - [`actions`]: Recommended actions per [`Mechanism`]
//!
//! Everything except the classifier is a pure function of its inputs.

pub mod actions;
mod classifier;
pub mod free_point;
mod mechanism;
pub mod rca;
pub mod risk;
mod tree;

pub use actions::{ActionParams, ActionPlan};
pub use classifier::*;
pub use free_point::{FreePointParams, FreePointResult, PipeGrade};
pub use mechanism::*;
pub use rca::{Methodology, RcaInvestigation, RcaParams, RcaReport};
pub use risk::{
    ContributingFactor, MatrixCell, OperatingParams, RiskBand, RiskLevel, RiskParams, RiskResult,
};
pub use tree::*;
