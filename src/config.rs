//! Scan configuration and parameter metadata
//!
//! [`ScanConfig`] is the single immutable object every detector and matcher
//! reads its thresholds from. [`ParamMeta`] describes each tunable so callers
//! can build configs from sparse maps or sweep parameters over a grid.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use zonescan::config::ScanConfig;
//!
//! let mut params = HashMap::new();
//! params.insert("min_rally_pct", 15.0);
//! params.insert("zone_tolerance", 0.02);
//!
//! let config = ScanConfig::with_params(&params).unwrap();
//! assert_eq!(config.min_rally_pct, 15.0);
//! assert_eq!(config.min_resistance_tests, 3);
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{detectors::PatternKind, PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Fraction of price, strictly between 0.0 and 1.0
    Ratio,
    /// Bar or count value (positive integer)
    Period,
    /// Percentage value (e.g. 10.0 = 10%)
    Percent,
}

/// Metadata for a single configuration parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
    pub name: &'static str,
    pub param_type: ParamType,
    pub default: f64,
    /// Range for sweeps: (min, max, step)
    pub range: (f64, f64, f64),
    pub description: &'static str,
}

impl ParamMeta {
    pub const fn ratio(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Ratio, default, range, description }
    }

    pub const fn period(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Period, default, range, description }
    }

    pub const fn percent(
        name: &'static str,
        default: f64,
        range: (f64, f64, f64),
        description: &'static str,
    ) -> Self {
        Self { name, param_type: ParamType::Percent, default, range, description }
    }

    /// Generate all values for a parameter sweep
    pub fn generate_grid(&self) -> Vec<f64> {
        let (min, max, step) = self.range;
        let mut values = Vec::new();
        let mut v = min;
        while v <= max + f64::EPSILON {
            values.push(v);
            v += step;
        }
        values
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: f64) -> Result<()> {
        let (min, max, _) = self.range;
        if value.is_nan() || value < min || value > max {
            return Err(PatternError::OutOfRange { field: self.name, value, min, max });
        }
        match self.param_type {
            ParamType::Period if value.fract() != 0.0 => {
                Err(PatternError::InvalidValue("Period must be a positive integer"))
            }
            _ => Ok(()),
        }
    }
}

const PARAMS: &[ParamMeta] = &[
    ParamMeta::period("lookback_years", 2.0, (1.0, 10.0, 1.0), "Years of weekly history to fetch"),
    ParamMeta::period("min_data_points", 20.0, (10.0, 100.0, 5.0), "Minimum bars required to analyse a ticker"),
    ParamMeta::ratio("zone_tolerance", 0.03, (0.005, 0.10, 0.005), "How close price must be to a demand zone"),
    ParamMeta::ratio("level_tolerance", 0.03, (0.005, 0.10, 0.005), "How far below a flipped level price may sit"),
    ParamMeta::ratio("cluster_tolerance", 0.02, (0.005, 0.05, 0.005), "Relative distance for swing highs to share a level"),
    ParamMeta::period("min_consolidation_weeks", 3.0, (2.0, 10.0, 1.0), "Minimum consecutive tight weeks"),
    ParamMeta::period("max_consolidation_weeks", 20.0, (5.0, 40.0, 5.0), "Longest consolidation run considered"),
    ParamMeta::percent("max_consolidation_range_pct", 5.0, (1.0, 15.0, 0.5), "Weekly range ceiling during consolidation"),
    ParamMeta::percent("min_rally_pct", 10.0, (5.0, 50.0, 2.5), "Rally required after consolidation"),
    ParamMeta::period("rally_lookahead_weeks", 10.0, (3.0, 26.0, 1.0), "Weeks searched for the rally"),
    ParamMeta::period("min_resistance_tests", 3.0, (1.0, 10.0, 1.0), "Swing highs needed to form resistance"),
    ParamMeta::period("swing_order", 3.0, (1.0, 10.0, 1.0), "Bars on each side a swing high must exceed"),
];

// ============================================================
// SCAN CONFIG
// ============================================================

/// Thresholds shared by every detector and matcher call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub lookback_years: u32,
    pub min_data_points: Period,
    pub pattern: PatternKind,
    pub zone_tolerance: f64,
    pub level_tolerance: f64,
    pub cluster_tolerance: f64,
    pub min_consolidation_weeks: Period,
    pub max_consolidation_weeks: Period,
    pub max_consolidation_range_pct: f64,
    pub min_rally_pct: f64,
    pub rally_lookahead_weeks: Period,
    pub min_resistance_tests: usize,
    pub swing_order: Period,
    /// Only match zones that already rallied away and came back
    pub require_zone_retest: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_years: 2,
            min_data_points: Period::new_const(20),
            pattern: PatternKind::DemandZone,
            zone_tolerance: 0.03,
            level_tolerance: 0.03,
            cluster_tolerance: 0.02,
            min_consolidation_weeks: Period::new_const(3),
            max_consolidation_weeks: Period::new_const(20),
            max_consolidation_range_pct: 5.0,
            min_rally_pct: 10.0,
            rally_lookahead_weeks: Period::new_const(10),
            min_resistance_tests: 3,
            swing_order: Period::new_const(3),
            require_zone_retest: false,
        }
    }
}

impl ScanConfig {
    /// Metadata for every tunable parameter
    pub fn param_meta() -> &'static [ParamMeta] {
        PARAMS
    }

    /// Build a config from a sparse parameter map.
    ///
    /// Missing parameters use their defaults; unknown names are rejected.
    pub fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        for (name, value) in params {
            let meta = PARAMS
                .iter()
                .find(|m| m.name == *name)
                .ok_or_else(|| PatternError::InvalidConfig(format!("unknown parameter `{name}`")))?;
            meta.validate(*value)?;
        }

        let d = Self::default();
        let config = Self {
            lookback_years: get_period(params, "lookback_years", d.lookback_years as usize)?.get()
                as u32,
            min_data_points: get_period(params, "min_data_points", d.min_data_points.get())?,
            zone_tolerance: get_ratio(params, "zone_tolerance", d.zone_tolerance)?.get(),
            level_tolerance: get_ratio(params, "level_tolerance", d.level_tolerance)?.get(),
            cluster_tolerance: get_ratio(params, "cluster_tolerance", d.cluster_tolerance)?.get(),
            min_consolidation_weeks: get_period(
                params,
                "min_consolidation_weeks",
                d.min_consolidation_weeks.get(),
            )?,
            max_consolidation_weeks: get_period(
                params,
                "max_consolidation_weeks",
                d.max_consolidation_weeks.get(),
            )?,
            max_consolidation_range_pct: params
                .get("max_consolidation_range_pct")
                .copied()
                .unwrap_or(d.max_consolidation_range_pct),
            min_rally_pct: params.get("min_rally_pct").copied().unwrap_or(d.min_rally_pct),
            rally_lookahead_weeks: get_period(
                params,
                "rally_lookahead_weeks",
                d.rally_lookahead_weeks.get(),
            )?,
            min_resistance_tests: get_period(
                params,
                "min_resistance_tests",
                d.min_resistance_tests,
            )?
            .get(),
            swing_order: get_period(params, "swing_order", d.swing_order.get())?,
            ..d
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document and validate it. Absent fields keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PatternError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_pattern(mut self, pattern: PatternKind) -> Self {
        self.pattern = pattern;
        self
    }

    /// Reject configurations no scan can run with.
    ///
    /// Must be called before any scanning starts; a failure here is fatal.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("zone_tolerance", self.zone_tolerance),
            ("level_tolerance", self.level_tolerance),
            ("cluster_tolerance", self.cluster_tolerance),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(PatternError::InvalidConfig(format!(
                    "{name} must be in (0, 1), got {value}"
                )));
            }
        }
        for (name, value) in [
            ("max_consolidation_range_pct", self.max_consolidation_range_pct),
            ("min_rally_pct", self.min_rally_pct),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PatternError::InvalidConfig(format!(
                    "{name} must be a positive percentage, got {value}"
                )));
            }
        }
        // Window and count fields size the detector loops; keep them in their sweep ranges.
        for (name, value) in [
            ("lookback_years", self.lookback_years as usize),
            ("min_data_points", self.min_data_points.get()),
            ("min_consolidation_weeks", self.min_consolidation_weeks.get()),
            ("max_consolidation_weeks", self.max_consolidation_weeks.get()),
            ("rally_lookahead_weeks", self.rally_lookahead_weeks.get()),
            ("min_resistance_tests", self.min_resistance_tests),
            ("swing_order", self.swing_order.get()),
        ] {
            let meta = PARAMS.iter().find(|m| m.name == name).ok_or_else(|| {
                PatternError::InvalidConfig(format!("no metadata for `{name}`"))
            })?;
            meta.validate(value as f64)
                .map_err(|e| PatternError::InvalidConfig(e.to_string()))?;
        }
        if self.min_consolidation_weeks > self.max_consolidation_weeks {
            return Err(PatternError::InvalidConfig(format!(
                "min_consolidation_weeks ({}) exceeds max_consolidation_weeks ({})",
                self.min_consolidation_weeks.get(),
                self.max_consolidation_weeks.get()
            )));
        }
        Ok(())
    }
}

// ============================================================
// FETCH POLICY
// ============================================================

/// Timeout and retry budget for one ticker's data fetch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchPolicy {
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Extra attempts after the first failure
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl FetchPolicy {
    pub fn no_retry(timeout: Duration) -> Self {
        Self { timeout, retries: 0, retry_delay: Duration::ZERO }
    }

    /// Total attempts including the first
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
    let value = params.get(key).copied().unwrap_or(default);
    Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
    let value = params.get(key).copied().unwrap_or(default as f64);
    Period::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================
