use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::{error::DispatchError, search::subset_space::MAX_DEPTH};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => (*num).max(1),
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

/// Exhaustive search tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchParams {
    /// Subsets one worker is expected to handle.
    pub subsets_per_worker: u64,
    pub max_workers: usize,
    /// Largest space written out as a table and shared with strided workers,
    /// larger ones are split into contiguous ranges.
    pub materialize_threshold: u64,
    pub timeout: Option<SignedDuration>,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            subsets_per_worker: 100_000,
            max_workers: 16,
            materialize_threshold: 250_000,
            timeout: Some(SignedDuration::from_mins(5)),
        }
    }
}

/// Route extension tuning.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExtensionParams {
    pub routes_per_worker: u64,
    pub max_workers: usize,
    pub timeout: Option<SignedDuration>,
}

impl Default for ExtensionParams {
    fn default() -> Self {
        ExtensionParams {
            routes_per_worker: 64,
            max_workers: 10,
            timeout: Some(SignedDuration::from_mins(5)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterBand {
    pub start_level: usize,
    pub start_order_count: usize,
}

/// Start level and cloud size for couriers taking 5 to 8 stops.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClusterBands {
    pub five: ClusterBand,
    pub six: ClusterBand,
    pub seven: ClusterBand,
    pub eight: ClusterBand,
}

impl Default for ClusterBands {
    fn default() -> Self {
        ClusterBands {
            five: ClusterBand {
                start_level: 4,
                start_order_count: 40,
            },
            six: ClusterBand {
                start_level: 4,
                start_order_count: 35,
            },
            seven: ClusterBand {
                start_level: 3,
                start_order_count: 60,
            },
            eight: ClusterBand {
                start_level: 3,
                start_order_count: 50,
            },
        }
    }
}

impl ClusterBands {
    pub fn band_for(&self, max_stops: usize) -> Option<&ClusterBand> {
        match max_stops {
            5 => Some(&self.five),
            6 => Some(&self.six),
            7 => Some(&self.seven),
            8 => Some(&self.eight),
            _ => None,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &ClusterBand)> {
        [
            (5, &self.five),
            (6, &self.six),
            (7, &self.seven),
            (8, &self.eight),
        ]
        .into_iter()
    }
}

/// Dense cloud selection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CloudParams {
    /// Orders closer than this to the cloud center belong to it, in meters.
    pub radius: f64,
    /// Smallest share of the target size a cloud must reach to be used.
    pub density: f64,
    pub bands: ClusterBands,
}

impl Default for CloudParams {
    fn default() -> Self {
        CloudParams {
            radius: 2_000.0,
            density: 0.5,
            bands: ClusterBands::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DispatchParams {
    pub search: SearchParams,
    pub extension: ExtensionParams,
    pub cloud: CloudParams,
    /// Computation units processed concurrently.
    pub unit_threads: Threads,
}

impl Default for DispatchParams {
    fn default() -> Self {
        DispatchParams {
            search: SearchParams::default(),
            extension: ExtensionParams::default(),
            cloud: CloudParams::default(),
            unit_threads: Threads::Single,
        }
    }
}

impl DispatchParams {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.search.subsets_per_worker == 0 || self.search.max_workers == 0 {
            return Err(DispatchError::validation(
                "search needs a positive worker budget and worker count",
            ));
        }

        if self.extension.routes_per_worker == 0 || self.extension.max_workers == 0 {
            return Err(DispatchError::validation(
                "extension needs a positive worker budget and worker count",
            ));
        }

        for timeout in [self.search.timeout, self.extension.timeout].into_iter().flatten() {
            if !timeout.is_positive() {
                return Err(DispatchError::validation(format!(
                    "timeout {timeout} must be positive"
                )));
            }
        }

        if !(self.cloud.radius.is_finite() && self.cloud.radius >= 0.0) {
            return Err(DispatchError::validation(format!(
                "cloud radius {} must be a nonnegative distance",
                self.cloud.radius
            )));
        }

        if !(0.0..=1.0).contains(&self.cloud.density) {
            return Err(DispatchError::validation(format!(
                "cloud density {} must be within 0..=1",
                self.cloud.density
            )));
        }

        for (max_stops, band) in self.cloud.bands.iter() {
            if band.start_level == 0 || band.start_level > max_stops.min(MAX_DEPTH) {
                return Err(DispatchError::validation(format!(
                    "start level {} of the {max_stops} stops band must be within 1..={max_stops}",
                    band.start_level
                )));
            }

            if band.start_order_count == 0 {
                return Err(DispatchError::validation(format!(
                    "the {max_stops} stops band needs a positive start order count"
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(DispatchParams::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_params() {
        let params: DispatchParams = serde_json::from_str(
            r#"{
                "search": { "max_workers": 4, "timeout": "PT30S" },
                "cloud": { "radius": 1500.0, "bands": { "eight": { "start_level": 2, "start_order_count": 80 } } },
                "unit_threads": { "multi": 3 }
            }"#,
        )
        .unwrap();

        assert_eq!(params.search.max_workers, 4);
        assert_eq!(params.search.subsets_per_worker, 100_000);
        assert_eq!(params.search.timeout, Some(SignedDuration::from_secs(30)));
        assert_eq!(params.cloud.radius, 1500.0);
        assert_eq!(params.cloud.bands.eight.start_order_count, 80);
        assert_eq!(params.cloud.bands.five, ClusterBands::default().five);
        assert_eq!(params.unit_threads, Threads::Multi(3));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_band() {
        let mut params = DispatchParams::default();
        params.cloud.bands.five.start_level = 6;

        assert!(matches!(params.validate(), Err(DispatchError::Validation(_))));
    }

    #[test]
    fn test_threads() {
        assert_eq!(Threads::Single.number_of_threads(), 1);
        assert_eq!(Threads::Multi(0).number_of_threads(), 1);
        assert!(Threads::Auto.number_of_threads() >= 1);
    }
}
