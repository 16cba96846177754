/// Mapping coverage check: lists the category codes found in one or more
/// land-cover rasters and whether the mapping table assigns each a class.
/// Run before a batch conversion to catch table gaps up front.
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use landclass_core::raster::read_categorical;
use landclass_core::{CodeHistogram, CoverageReport, MappingTable, SimpleClass};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "coverage", about = "Check land-cover rasters against a category mapping table")]
struct Args {
    /// Categorical rasters to scan
    #[arg(required_unless_present = "dump_mapping")]
    rasters: Vec<PathBuf>,

    /// Mapping table (.json or .csv); the built-in UK ESA CCI table if omitted
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Write the coverage report as JSON to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the active mapping table as JSON to this path
    #[arg(long)]
    dump_mapping: Option<PathBuf>,
}

#[derive(Serialize)]
struct RasterCoverage {
    path: PathBuf,
    #[serde(flatten)]
    report: CoverageReport,
}

#[derive(Serialize)]
struct Report {
    rasters: Vec<RasterCoverage>,
    /// Codes across all rasters; unmapped entries here are what the table lacks.
    combined: CoverageReport,
}

fn log_mapping(mapping: &MappingTable) {
    for class in SimpleClass::ALL {
        tracing::info!("  {} ({}): {:?}", class.name(), class.code(), mapping.codes_for(class));
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mapping = match &args.mapping {
        Some(p) => MappingTable::load(p)
            .with_context(|| format!("Cannot load mapping table {}", p.display()))?,
        None => MappingTable::uk_esa_cci(),
    };
    tracing::info!(mapping = mapping.name(), codes = mapping.len(), "mapping table");
    log_mapping(&mapping);

    if let Some(path) = &args.dump_mapping {
        fs::write(path, mapping.to_json_string()?)
            .with_context(|| format!("Write failed: {}", path.display()))?;
        tracing::info!(path = %path.display(), "mapping table written");
    }
    if args.rasters.is_empty() {
        return Ok(());
    }

    let mut all_codes = CodeHistogram::default();
    let mut rasters = Vec::with_capacity(args.rasters.len());
    for path in &args.rasters {
        let grid = read_categorical(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let report = mapping.coverage(&grid);
        tracing::info!(
            raster = %path.display(),
            codes = report.mapped.len() + report.unmapped.len(),
            unmapped = ?report.unmapped_codes(),
            "scanned"
        );
        all_codes.merge(&CodeHistogram::from_grid(&grid));
        rasters.push(RasterCoverage {
            path: path.clone(),
            report,
        });
    }

    let combined = mapping.coverage_of(&all_codes);
    let covered = combined.mapped.len();
    let total = covered + combined.unmapped.len();
    tracing::info!(
        "codes covered by mapping: {}/{} ({:.1}%)",
        covered,
        total,
        if total == 0 { 100.0 } else { covered as f64 / total as f64 * 100.0 }
    );

    let complete = combined.is_complete();
    let missing = combined.unmapped_codes();
    let report = Report { rasters, combined };
    if let Some(path) = &args.output {
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Write failed: {}", path.display()))?;
    }

    if !complete {
        bail!("mapping {:?} is missing codes {:?}", mapping.name(), missing);
    }
    tracing::info!("all codes are covered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclass_core::Grid;

    #[test]
    fn combined_report_sums_counts_across_rasters() {
        let a = Grid::from_rows(vec![vec![10, 10, 61]]).unwrap();
        let b = Grid::from_rows(vec![vec![10, 0], vec![61, 61]]).unwrap();
        let mut h = CodeHistogram::from_grid(&a);
        h.merge(&CodeHistogram::from_grid(&b));

        let report = MappingTable::uk_esa_cci().coverage_of(&h);
        assert_eq!(report.total_cells, 7);
        let mapped: Vec<(i32, usize)> = report.mapped.iter().map(|c| (c.code, c.cells)).collect();
        assert_eq!(mapped, vec![(0, 1), (10, 3)]);
        assert_eq!(report.unmapped_codes(), vec![61]);
        assert_eq!(report.unmapped_cells(), 3);
    }

    #[test]
    fn rasters_required_unless_dumping() {
        assert!(Args::try_parse_from(["coverage"]).is_err());
        assert!(Args::try_parse_from(["coverage", "--dump-mapping", "m.json"]).is_ok());
    }
}
