//! Weekly price-action detectors
//!
//! # Pattern Families
//!
//! - **Demand zones**: consolidation followed by a rally ([`ConsolidationZoneDetector`]).
//! - **Resistance flips**: clustered swing-high resistance that broke out and
//!   was retested as support ([`ResistanceFlipDetector`]).
//!
//! Every detector takes the immutable [`ScanConfig`] explicitly and keeps all
//! intermediate state (runs, swing points, clusters) local to the call.

pub mod helpers;

pub mod consolidation;
pub mod flip;
pub mod swing;

pub use consolidation::*;
pub use flip::*;
pub use helpers::*;
pub use swing::*;

use serde::{Deserialize, Serialize};

use crate::{config::ScanConfig, series::PriceSeries};

/// Detector for one pattern family
pub trait PatternDetector: Send + Sync {
    type Candidate;

    fn id(&self) -> &'static str;

    /// Fewest bars on which the detector can emit anything
    fn min_bars(&self, config: &ScanConfig) -> usize;

    /// Candidates in chronological order of formation
    fn detect(&self, series: &PriceSeries, config: &ScanConfig) -> Vec<Self::Candidate>;
}

/// Pattern family a scan runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    #[default]
    DemandZone,
    ResistanceFlip,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternKind::DemandZone => ConsolidationZoneDetector.id(),
            PatternKind::ResistanceFlip => ResistanceFlipDetector.id(),
        }
    }

    pub fn min_bars(self, config: &ScanConfig) -> usize {
        match self {
            PatternKind::DemandZone => ConsolidationZoneDetector.min_bars(config),
            PatternKind::ResistanceFlip => ResistanceFlipDetector.min_bars(config),
        }
    }

    /// Run this family's detector
    pub fn detect(self, series: &PriceSeries, config: &ScanConfig) -> Candidates {
        match self {
            PatternKind::DemandZone => {
                Candidates::Zones(ConsolidationZoneDetector.detect(series, config))
            }
            PatternKind::ResistanceFlip => {
                Candidates::Levels(ResistanceFlipDetector.detect(series, config))
            }
        }
    }
}

/// Every zone or level one detector run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Candidates {
    Zones(Vec<DemandZone>),
    Levels(Vec<FlippedLevel>),
}

impl Candidates {
    pub fn kind(&self) -> PatternKind {
        match self {
            Candidates::Zones(_) => PatternKind::DemandZone,
            Candidates::Levels(_) => PatternKind::ResistanceFlip,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Candidates::Zones(z) => z.len(),
            Candidates::Levels(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
