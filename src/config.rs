//! Engine configuration
//!
//! Floors and rounding applied by the progression calculator. Loaded from the
//! environment (and a `.env` file when present), falling back to defaults.

use std::env;
use std::str::FromStr;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DEFAULT_MIN_LOAD: f64 = 0.0;
const DEFAULT_MIN_REPS: u32 = 0;
const DEFAULT_LOAD_PRECISION: u32 = 2;
/// f64 cannot usefully represent more decimals than this
const MAX_LOAD_PRECISION: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
  /// Derived loads never drop below this
  pub min_load: f64,
  /// Derived reps never drop below this
  pub min_reps: u32,
  /// Decimal places kept on derived loads
  pub load_precision: u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      min_load: DEFAULT_MIN_LOAD,
      min_reps: DEFAULT_MIN_REPS,
      load_precision: DEFAULT_LOAD_PRECISION,
    }
  }
}

impl EngineConfig {
  /// Read `PROGRAM_MIN_LOAD`, `PROGRAM_MIN_REPS` and `PROGRAM_LOAD_PRECISION`
  pub fn from_env() -> Self {
    dotenvy::dotenv().ok();

    let min_load = read_var("PROGRAM_MIN_LOAD", DEFAULT_MIN_LOAD);
    Self {
      min_load: if min_load.is_finite() { min_load } else { DEFAULT_MIN_LOAD },
      min_reps: read_var("PROGRAM_MIN_REPS", DEFAULT_MIN_REPS),
      load_precision: read_var("PROGRAM_LOAD_PRECISION", DEFAULT_LOAD_PRECISION)
        .min(MAX_LOAD_PRECISION),
    }
  }

  /// Round a load to the configured precision
  pub fn round_load(&self, value: f64) -> f64 {
    let scale = 10f64.powi(self.load_precision.min(MAX_LOAD_PRECISION) as i32);
    (value * scale).round() / scale
  }
}

fn read_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
  match env::var(key) {
    Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
      tracing::warn!(key, value = %raw, "Ignoring unparsable setting, using {}", default);
      default
    }),
    Err(_) => default,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  fn test_round_load() {
    let config = EngineConfig::default();
    assert_eq!(config.round_load(105.0 * 1.05), 110.25);
    assert_eq!(config.round_load(72.3456), 72.35);

    let whole = EngineConfig {
      load_precision: 0,
      ..EngineConfig::default()
    };
    assert_eq!(whole.round_load(72.5), 73.0);
  }

  #[test]
  #[serial]
  fn test_from_env_reads_overrides() {
    temp_env::with_vars(
      [
        ("PROGRAM_MIN_LOAD", Some("20")),
        ("PROGRAM_MIN_REPS", Some("1")),
        ("PROGRAM_LOAD_PRECISION", Some("1")),
      ],
      || {
        let config = EngineConfig::from_env();
        assert_eq!(config.min_load, 20.0);
        assert_eq!(config.min_reps, 1);
        assert_eq!(config.load_precision, 1);
      },
    );
  }

  #[test]
  #[serial]
  fn test_from_env_falls_back_on_garbage() {
    temp_env::with_vars(
      [
        ("PROGRAM_MIN_LOAD", Some("heavy")),
        ("PROGRAM_MIN_REPS", None),
        ("PROGRAM_LOAD_PRECISION", Some("40")),
      ],
      || {
        let config = EngineConfig::from_env();
        assert_eq!(config.min_load, DEFAULT_MIN_LOAD);
        assert_eq!(config.min_reps, DEFAULT_MIN_REPS);
        assert_eq!(config.load_precision, MAX_LOAD_PRECISION);
      },
    );
  }
}
