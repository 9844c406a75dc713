/// Batch driver for AGEB code assignment: reads JSON tables, runs the
/// cascade and its repair passes, writes JSON results and a report.
use std::fs;
use std::path::{Path, PathBuf};

use ageb_core::{
    postal_locator, run_pipeline, AreaCatalog, AreaIndex, AreaUnitRow, AssignerConfig,
    AssignmentResult, BatchReport, CentroidRow, CentroidTable, CorrectionPass, Diagnostics,
    PostalNormalizer, ResolutionCascade, SourceRecord, SpatialLocator,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ageb-assign", about = "Assign AGEB codes to address records")]
struct Cli {
    /// JSON configuration (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write diagnostics and the batch summary to this JSON file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the resolution cascade only
    Assign {
        #[command(flatten)]
        tables: Tables,
        /// Output results
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Re-resolve results that are not canonical urban codes
    Correct {
        /// Area-unit rows (JSON array)
        #[arg(long)]
        areas: PathBuf,
        /// Source records (JSON array)
        #[arg(long)]
        records: PathBuf,
        /// Results to correct, aligned with the records
        #[arg(long)]
        results: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Pad 4-character postal codes and retry spatial containment
    NormalizePostal {
        #[command(flatten)]
        tables: Tables,
        /// Results to update, aligned with the records
        #[arg(long)]
        results: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        /// Where to write the records with repaired postal codes
        #[arg(long)]
        records_out: Option<PathBuf>,
    },
    /// Cascade, correction and postal normalization in sequence
    Run {
        #[command(flatten)]
        tables: Tables,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        records_out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct Tables {
    /// Area-unit rows (JSON array)
    #[arg(long)]
    areas: PathBuf,
    /// Postal-code centroid rows (JSON array)
    #[arg(long)]
    centroids: PathBuf,
    /// Source records (JSON array)
    #[arg(long)]
    records: PathBuf,
}

// ── Report ───────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report<'a> {
    diagnostics: &'a Diagnostics,
    summary: BatchReport,
}

// ── I/O helpers ──────────────────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Cannot parse {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Write failed: {}", path.display()))
}

fn load_catalog(path: &Path, config: &AssignerConfig) -> Result<AreaCatalog> {
    let rows: Vec<AreaUnitRow> = read_json(path)?;
    let catalog = AreaCatalog::from_rows(&rows, config)
        .with_context(|| format!("Unusable area-unit table {}", path.display()))?;
    info!(
        units = catalog.units.len(),
        geometry_failures = catalog.stats.geometry_failures,
        "area units loaded"
    );
    Ok(catalog)
}

fn load_centroids(path: &Path, config: &AssignerConfig) -> Result<CentroidTable> {
    let rows: Vec<CentroidRow> = read_json(path)?;
    let table = CentroidTable::from_rows(&rows, config)
        .with_context(|| format!("Unusable centroid table {}", path.display()))?;
    info!(postal_codes = table.len(), skipped = table.skipped_rows(), "centroids loaded");
    Ok(table)
}

fn load_aligned(
    records: &Path,
    results: &Path,
) -> Result<(Vec<SourceRecord>, Vec<AssignmentResult>)> {
    let recs: Vec<SourceRecord> = read_json(records)?;
    let res: Vec<AssignmentResult> = read_json(results)?;
    if recs.len() != res.len() {
        bail!(
            "{} has {} records but {} has {} results",
            records.display(),
            recs.len(),
            results.display(),
            res.len()
        );
    }
    Ok((recs, res))
}

// ── Commands ─────────────────────────────────────────────────────────────────

fn assign(
    tables: &Tables,
    config: &AssignerConfig,
) -> Result<(Vec<SourceRecord>, Vec<AssignmentResult>, Diagnostics)> {
    let catalog = load_catalog(&tables.areas, config)?;
    let centroids = load_centroids(&tables.centroids, config)?;
    let records: Vec<SourceRecord> = read_json(&tables.records)?;

    let index = AreaIndex::build(&catalog.units, false);
    let locator = SpatialLocator::build(&catalog.units, config.validate_overlaps);
    let (results, mut diagnostics) =
        ResolutionCascade::new(config, &index, &centroids, &locator).resolve_batch(&records);
    diagnostics.geometry_failures = catalog.stats.geometry_failures;
    diagnostics.overlapping_pairs = locator.overlapping_pairs();
    Ok((records, results, diagnostics))
}

fn correct(
    areas: &Path,
    records: &Path,
    results: &Path,
    config: &AssignerConfig,
) -> Result<(Vec<AssignmentResult>, Diagnostics)> {
    let catalog = load_catalog(areas, config)?;
    let (records, results) = load_aligned(records, results)?;
    let (corrected, mut diagnostics) = CorrectionPass::new(&catalog.units, config)
        .apply(&records, &results)
        .context("Correction pass failed")?;
    diagnostics.geometry_failures = catalog.stats.geometry_failures;
    Ok((corrected, diagnostics))
}

fn normalize_postal(
    tables: &Tables,
    results: &Path,
    config: &AssignerConfig,
) -> Result<(Vec<SourceRecord>, Vec<AssignmentResult>, Diagnostics)> {
    let catalog = load_catalog(&tables.areas, config)?;
    let centroids = load_centroids(&tables.centroids, config)?;
    let (records, results) = load_aligned(&tables.records, results)?;

    let locator = match postal_locator(&catalog, config) {
        Some(urban) => urban,
        None => SpatialLocator::build(&catalog.units, false),
    };
    let pass = CorrectionPass::new(&catalog.units, config);
    let mut normalizer = PostalNormalizer::new(config, &centroids, &locator);
    if config.require_urban {
        normalizer = normalizer.accepting(&pass);
    }
    let batch = normalizer
        .apply(&records, &results)
        .context("Postal normalization failed")?;
    Ok((batch.records, batch.results, batch.diagnostics))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => AssignerConfig::load(path)
            .with_context(|| format!("Cannot load config {}", path.display()))?,
        None => AssignerConfig::default(),
    };

    let (out, records_out, records, results, diagnostics) = match &cli.command {
        Command::Assign { tables, out } => {
            let (records, results, diag) = assign(tables, &config)?;
            (out, None, records, results, diag)
        }
        Command::Correct { areas, records, results, out } => {
            let (results, diag) = correct(areas, records, results, &config)?;
            (out, None, Vec::new(), results, diag)
        }
        Command::NormalizePostal { tables, results, out, records_out } => {
            let (records, results, diag) = normalize_postal(tables, results, &config)?;
            (out, records_out.as_ref(), records, results, diag)
        }
        Command::Run { tables, out, records_out } => {
            let catalog = load_catalog(&tables.areas, &config)?;
            let centroids = load_centroids(&tables.centroids, &config)?;
            let records: Vec<SourceRecord> = read_json(&tables.records)?;
            let output = run_pipeline(&records, &catalog, &centroids, &config)
                .context("Pipeline failed")?;
            (out, records_out.as_ref(), output.records, output.results, output.diagnostics)
        }
    };

    write_json(out, &results)?;
    info!(results = results.len(), path = %out.display(), "results written");

    if let Some(path) = records_out {
        write_json(path, &records)?;
    }

    if let Some(path) = &cli.report {
        let report = Report {
            diagnostics: &diagnostics,
            summary: BatchReport::summarize(&results),
        };
        write_json(path, &report)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ageb_core::{LatLon, MethodTag};

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("ageb-assign-{}", std::process::id()))
            .join(name)
    }

    fn record(id: &str) -> SourceRecord {
        SourceRecord {
            id: id.into(),
            state_name: "Ciudad de Mexico".into(),
            municipality_name: String::new(),
            neighborhood: None,
            postal_code: Some("06000".into()),
            admin_id: Some("7".into()),
            existing_code: None,
        }
    }

    #[test]
    fn results_round_trip_with_kebab_case_tags() {
        let path = scratch("round_trip/results.json");
        let results = vec![
            AssignmentResult::located("0900700010010", MethodTag::CorrectedSpatial, LatLon::new(19.4, -99.1)),
            AssignmentResult::new("0900700010031", MethodTag::DistributionByNeighborhood),
            AssignmentResult::unresolved(),
        ];
        write_json(&path, &results).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"corrected-spatial\""));
        assert!(text.contains("\"distribution-by-neighborhood\""));
        assert!(text.contains("\"unresolved\""));

        let back: Vec<AssignmentResult> = read_json(&path).unwrap();
        assert_eq!(back, results);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        let records = scratch("aligned/records.json");
        let results = scratch("aligned/results.json");
        write_json(&records, &[record("R1"), record("R2")]).unwrap();
        write_json(&results, &[AssignmentResult::unresolved()]).unwrap();

        let err = load_aligned(&records, &results).unwrap_err();
        assert!(err.to_string().contains("2 records but"), "{err}");

        write_json(&results, &[AssignmentResult::unresolved(), AssignmentResult::unresolved()])
            .unwrap();
        let (recs, res) = load_aligned(&records, &results).unwrap();
        assert_eq!((recs.len(), res.len()), (2, 2));
        let _ = fs::remove_file(&records);
        let _ = fs::remove_file(&results);
    }

    #[test]
    fn unreadable_input_names_the_path() {
        let missing = scratch("missing/none.json");
        let err = read_json::<Vec<SourceRecord>>(&missing).unwrap_err();
        assert!(err.to_string().contains("none.json"));
    }
}
