use std::env;

use crate::types::Timeframe;

/// Scheduling and staleness constants for one timeframe.
#[derive(Debug, Clone, Copy)]
pub struct TimeframePolicy {
    /// Minimum elapsed seconds before any recompute, even forced.
    pub hard_cooldown_secs: i64,
    /// Preferred cadence in seconds; requests inside
    /// hard-cooldown-to-soft-window are deferred to the next boundary.
    pub soft_window_secs: i64,
    /// Age in seconds past which the latest batch is considered stale.
    pub staleness_secs: i64,
    /// Clock boundary interval in seconds for deferred runs.
    pub boundary_secs: i64,
}

impl TimeframePolicy {
    /// Built-in defaults per timeframe.
    pub fn default_for(timeframe: Timeframe) -> Self {
        match timeframe {
            Timeframe::ThirtyMin => Self {
                hard_cooldown_secs: 600,
                soft_window_secs: 1800,
                staleness_secs: 3600,
                boundary_secs: 1800,
            },
            Timeframe::Daily => Self {
                hard_cooldown_secs: 900,
                soft_window_secs: 3600,
                staleness_secs: 3600,
                boundary_secs: 3600,
            },
            Timeframe::ThreeDay => Self {
                hard_cooldown_secs: 7200,
                soft_window_secs: 21600,
                staleness_secs: 86400,
                boundary_secs: 21600,
            },
            Timeframe::Weekly => Self {
                hard_cooldown_secs: 21600,
                soft_window_secs: 86400,
                staleness_secs: 259200,
                boundary_secs: 86400,
            },
        }
    }
}

/// Numeric knobs for the sentiment calculation pipeline.
#[derive(Debug, Clone)]
pub struct CalcConfig {
    /// Symmetric cap on per-instrument percent change.
    pub percent_cap: f64,
    /// Lower clamp for the volume weight.
    pub weight_floor: f64,
    /// Upper clamp for the volume weight.
    pub weight_ceiling: f64,
    /// Minimum contributing instruments for a full-confidence sector.
    pub min_instruments: usize,
    /// Max share of total weight one instrument may hold without a
    /// confidence penalty.
    pub dominance_ceiling: f64,
    /// Percent of final performance that maps to a sentiment score of 1.0.
    pub normalization_scale_pct: f64,
    /// Whether sectors below the minimum contributor count still populate
    /// the batch (with a confidence penalty).
    pub include_low_confidence: bool,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            percent_cap: 50.0,
            weight_floor: 0.1,
            weight_ceiling: 10.0,
            min_instruments: 3,
            dominance_ceiling: 0.5,
            normalization_scale_pct: 5.0,
            include_low_confidence: true,
        }
    }
}

/// One entry in the configured sector universe.
#[derive(Debug, Clone)]
pub struct SectorPolicy {
    /// Sector identifier.
    pub name: String,
    /// Volatility multiplier applied to raw sector performance.
    pub volatility_multiplier: f64,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Path to the SQLite batch database.
    pub db_path: String,
    /// Base URL of the upstream quote service; static fixture data is
    /// served when unset.
    pub quotes_base_url: Option<String>,
    /// Upper bound in seconds for one pipeline run.
    pub pipeline_timeout_secs: u64,
    /// Interval in seconds for the background staleness sweep.
    pub cadence_check_secs: u64,
    /// Scheduling policies, one per timeframe.
    pub policies: [(Timeframe, TimeframePolicy); 4],
    /// Sentiment calculation knobs.
    pub calc: CalcConfig,
    /// Expected sector universe, in output order, with multipliers.
    pub sectors: Vec<SectorPolicy>,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Policy for one timeframe.
    pub fn policy(&self, timeframe: Timeframe) -> TimeframePolicy {
        self.policies
            .iter()
            .find(|(t, _)| *t == timeframe)
            .map(|(_, p)| *p)
            .unwrap_or_else(|| TimeframePolicy::default_for(timeframe))
    }

    /// Names of the expected sectors in configured order.
    pub fn sector_names(&self) -> Vec<String> {
        self.sectors.iter().map(|s| s.name.clone()).collect()
    }

    /// Volatility multiplier for a sector; 1.0 when unconfigured.
    pub fn multiplier(&self, sector: &str) -> f64 {
        self.sectors
            .iter()
            .find(|s| s.name == sector)
            .map(|s| s.volatility_multiplier)
            .unwrap_or(1.0)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        // Parse sector multipliers from SECTOR_MULTIPLIERS env var
        // Format: "technology:1.3,energy:1.4,utilities:0.7"
        let sectors = env::var("SECTOR_MULTIPLIERS")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|entry| {
                        let parts: Vec<&str> = entry.split(':').collect();
                        if parts.len() == 2 {
                            parts[1].trim().parse().ok().map(|mult| SectorPolicy {
                                name: parts[0].trim().to_string(),
                                volatility_multiplier: mult,
                            })
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|v: &Vec<SectorPolicy>| !v.is_empty())
            .unwrap_or_else(default_sectors);

        let policies = Timeframe::all().map(|tf| {
            let defaults = TimeframePolicy::default_for(tf);
            let prefix = tf.key().to_uppercase();
            (
                tf,
                TimeframePolicy {
                    hard_cooldown_secs: env_parse(
                        &format!("{}_HARD_COOLDOWN_SECS", prefix),
                        defaults.hard_cooldown_secs,
                    ),
                    soft_window_secs: env_parse(
                        &format!("{}_SOFT_WINDOW_SECS", prefix),
                        defaults.soft_window_secs,
                    ),
                    staleness_secs: env_parse(
                        &format!("{}_STALENESS_SECS", prefix),
                        defaults.staleness_secs,
                    ),
                    boundary_secs: env_parse(
                        &format!("{}_BOUNDARY_SECS", prefix),
                        defaults.boundary_secs,
                    ),
                },
            )
        });

        let calc_defaults = CalcConfig::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3002),
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "sectorpulse.db".to_string()),
            quotes_base_url: env::var("QUOTES_BASE_URL").ok(),
            pipeline_timeout_secs: env_parse("PIPELINE_TIMEOUT_SECS", 300),
            cadence_check_secs: env_parse("CADENCE_CHECK_SECS", 60),
            policies,
            calc: CalcConfig {
                percent_cap: env_parse("PERCENT_CAP", calc_defaults.percent_cap),
                weight_floor: env_parse("WEIGHT_FLOOR", calc_defaults.weight_floor),
                weight_ceiling: env_parse("WEIGHT_CEILING", calc_defaults.weight_ceiling),
                min_instruments: env_parse("MIN_INSTRUMENTS", calc_defaults.min_instruments),
                dominance_ceiling: env_parse("DOMINANCE_CEILING", calc_defaults.dominance_ceiling),
                normalization_scale_pct: env_parse(
                    "NORMALIZATION_SCALE_PCT",
                    calc_defaults.normalization_scale_pct,
                ),
                include_low_confidence: env::var("INCLUDE_LOW_CONFIDENCE")
                    .ok()
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(calc_defaults.include_low_confidence),
            },
            sectors,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            db_path: "sectorpulse.db".to_string(),
            quotes_base_url: None,
            pipeline_timeout_secs: 300,
            cadence_check_secs: 60,
            policies: Timeframe::all().map(|tf| (tf, TimeframePolicy::default_for(tf))),
            calc: CalcConfig::default(),
            sectors: default_sectors(),
        }
    }
}

/// Built-in sector universe with volatility multipliers.
fn default_sectors() -> Vec<SectorPolicy> {
    [
        ("technology", 1.3),
        ("healthcare", 1.1),
        ("financials", 1.2),
        ("energy", 1.4),
        ("consumer_discretionary", 1.2),
        ("consumer_staples", 0.8),
        ("industrials", 1.0),
        ("materials", 1.1),
        ("utilities", 0.7),
        ("real_estate", 0.9),
        ("communication_services", 1.2),
    ]
    .iter()
    .map(|(name, mult)| SectorPolicy {
        name: name.to_string(),
        volatility_multiplier: *mult,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policies_cover_all_timeframes() {
        let config = Config::default();
        for tf in Timeframe::all() {
            let policy = config.policy(tf);
            assert!(policy.hard_cooldown_secs > 0);
            // Hard cooldown is always inside the soft window.
            assert!(policy.hard_cooldown_secs < policy.soft_window_secs);
        }
    }

    #[test]
    fn test_thirty_min_policy_constants() {
        let policy = TimeframePolicy::default_for(Timeframe::ThirtyMin);
        assert_eq!(policy.hard_cooldown_secs, 600);
        assert_eq!(policy.soft_window_secs, 1800);
        assert_eq!(policy.staleness_secs, 3600);
        assert_eq!(policy.boundary_secs, 1800);
    }

    #[test]
    fn test_default_sector_universe() {
        let config = Config::default();
        assert_eq!(config.sectors.len(), 11);
        assert_eq!(config.multiplier("technology"), 1.3);
        assert_eq!(config.multiplier("utilities"), 0.7);
        // Unknown sectors fall back to a neutral multiplier.
        assert_eq!(config.multiplier("unknown"), 1.0);
    }

    #[test]
    fn test_calc_defaults() {
        let calc = CalcConfig::default();
        assert_eq!(calc.percent_cap, 50.0);
        assert_eq!(calc.weight_floor, 0.1);
        assert_eq!(calc.weight_ceiling, 10.0);
        assert_eq!(calc.min_instruments, 3);
        assert!(calc.include_low_confidence);
    }
}
