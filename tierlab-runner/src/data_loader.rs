//! Bar loading and data resolution for the runner.
//!
//! Resolves the `[backtest]` data source into a validated bar series:
//! 1. CSV file → parse rows into `Bar`s
//! 2. Synthetic spec → seeded random walk (tagged as synthetic)
//! 3. Apply the optional date window
//! 4. Validate the series; any defect is fatal
//!
//! Synthetic data is a developer-only debug mode. Results produced on it are
//! tagged so they are never mistaken for market history.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tierlab_core::domain::{validate_bars, Bar, InputError};
use tracing::{info, warn};

use crate::config::{BacktestSection, SyntheticSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("no bars between {start:?} and {end:?}")]
    EmptyWindow {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    #[error("no data source configured")]
    NoSource,

    #[error("invalid input series: {0}")]
    Invalid(#[from] InputError),
}

/// Result of loading bars, including data provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every bar, for run fingerprinting.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load, window and validate the bars a `[backtest]` table points at.
pub fn load_bars(section: &BacktestSection) -> Result<LoadedData, LoadError> {
    let (bars, has_synthetic) = match (&section.data, &section.synthetic) {
        (Some(path), _) => (read_bars_csv(path)?, false),
        (None, Some(spec)) => {
            warn!(
                seed = spec.seed,
                "generating synthetic bars; results will be tagged as synthetic"
            );
            (synthetic_from_spec(spec), true)
        }
        (None, None) => return Err(LoadError::NoSource),
    };

    let total = bars.len();
    let bars = filter_window(bars, section.start_date, section.end_date);
    if bars.is_empty() && total > 0 {
        return Err(LoadError::EmptyWindow {
            start: section.start_date,
            end: section.end_date,
        });
    }
    validate_bars(&bars)?;

    let dataset_hash = compute_dataset_hash(&bars);
    info!(
        bars = bars.len(),
        first = %bars[0].date,
        last = %bars[bars.len() - 1].date,
        synthetic = has_synthetic,
        "bars loaded"
    );
    Ok(LoadedData {
        bars,
        dataset_hash,
        has_synthetic,
    })
}

/// Parse a `date,open,high,low,close,volume` CSV file.
///
/// Rows are taken in file order; ordering and sanity are checked later by
/// `validate_bars`, so a bad file fails with the offending row index.
pub fn read_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_bars(file).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse bars from any CSV reader with a header row.
pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize().collect()
}

/// Write bars as CSV with the same header `read_bars` expects.
pub fn write_bars_csv<W: std::io::Write>(bars: &[Bar], writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for bar in bars {
        wtr.serialize(bar)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Keep bars whose date falls inside the inclusive window.
pub fn filter_window(
    bars: Vec<Bar>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Bar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect()
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn compute_dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

fn synthetic_from_spec(spec: &SyntheticSpec) -> Vec<Bar> {
    synthetic_bars(spec.seed, spec.bars, spec.start_price, spec.start_date)
}

/// Generate a seeded daily series with alternating trend regimes.
///
/// Every 40-120 bars the walk draws a new drift (bearish, flat or bullish)
/// and volatility, so the series contains crashes, bases and rallies.
/// Calendar days are consecutive: the market trades every day.
pub fn synthetic_bars(seed: u64, n: usize, start_price: f64, start_date: NaiveDate) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bars = Vec::with_capacity(n);
    let mut price = start_price.max(1.0);
    let mut drift = 0.0_f64;
    let mut volatility = 0.02_f64;
    let mut regime_left = 0usize;

    for i in 0..n {
        if regime_left == 0 {
            regime_left = rng.gen_range(40..=120);
            drift = [-0.006, -0.002, 0.0, 0.002, 0.006][rng.gen_range(0..5)];
            volatility = rng.gen_range(0.012..0.04);
        }
        regime_left -= 1;

        let daily_return = (drift + rng.gen_range(-volatility..volatility)).max(-0.5);
        let open = price;
        let close = (price * (1.0 + daily_return)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..volatility * 0.5));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..volatility * 0.5));
        let volume = rng.gen_range(5_000.0..50_000.0);

        bars.push(Bar {
            date: start_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume,
        });
        price = close;
    }

    bars
}
