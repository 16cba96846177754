/// Land-use reclassification tool: converts categorical land-cover GeoTIFFs
/// (ESA CCI / UK scenario codes) into the 4-class Simple scheme.
///
/// Single raster:  reclassify --input scenario.tif --output scenario_simple.tif
/// Batch:          reclassify --jobs jobs.json
///
/// Any code missing from the mapping table aborts the run before an output
/// is written.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use landclass_core::raster::{read_categorical, write_classes};
use landclass_core::{
    reclassify, verify, ClassStats, Job, JobFile, MappingTable, RasterCompression, VerifyReport,
    WriteOptions,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "reclassify",
    about = "Remap categorical land-cover rasters to the Simple 4-class scheme"
)]
struct Args {
    /// Source categorical raster (single-band integer GeoTIFF)
    #[arg(short, long, requires = "output", conflicts_with = "jobs")]
    input: Option<PathBuf>,

    /// Output Simple-class raster
    #[arg(short, long, requires = "input")]
    output: Option<PathBuf>,

    /// Batch job file: { "jobs": [ { "id", "input", "output" } ] }
    #[arg(short, long)]
    jobs: Option<PathBuf>,

    /// Mapping table (.json or .csv); the built-in UK ESA CCI table if omitted
    #[arg(short, long)]
    mapping: Option<PathBuf>,

    /// Write per-raster class statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Re-read each output and check every cell against its source
    #[arg(long)]
    verify: bool,

    /// GDAL nodata value to tag outputs with (4-255; 0-3 are class codes)
    #[arg(long, value_parser = clap::value_parser!(u8).range(4..))]
    nodata: Option<u8>,

    /// Write outputs uncompressed instead of LZW
    #[arg(long)]
    no_compress: bool,
}

// ── Output summary ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct JobSummary {
    id: String,
    input: PathBuf,
    output: PathBuf,
    mapping: String,
    width: usize,
    height: usize,
    source_codes: usize,
    stats: ClassStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<VerifyReport>,
}

// ── Processing ───────────────────────────────────────────────────────────────

fn load_mapping(path: Option<&Path>) -> Result<MappingTable> {
    match path {
        Some(p) => MappingTable::load(p)
            .with_context(|| format!("Cannot load mapping table {}", p.display())),
        None => Ok(MappingTable::uk_esa_cci()),
    }
}

fn run_job(job: &Job, mapping: &MappingTable, options: &WriteOptions, check: bool) -> Result<JobSummary> {
    tracing::info!(id = %job.id, input = %job.input.display(), "converting to Simple classification");

    let source = read_categorical(&job.input)
        .with_context(|| format!("Cannot read {}", job.input.display()))?;
    let source_codes = mapping.coverage(&source).mapped.len();

    let classes = reclassify(&source, mapping)
        .with_context(|| format!("Reclassification failed for {}", job.input.display()))?;
    let codes = classes.map(|c| c.code());

    if let Some(parent) = job.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    write_classes(&job.output, &codes, options)
        .with_context(|| format!("Write failed: {}", job.output.display()))?;

    let stats = ClassStats::from_grid(&classes);
    tracing::info!(
        output = %job.output.display(),
        source_codes,
        classes = stats.present(),
        "converted"
    );
    for share in &stats.classes {
        tracing::info!(
            "  {}: {:.1}% ({} pixels)",
            share.name,
            share.percent,
            share.cells
        );
    }

    let verification = if check {
        let written = read_categorical(&job.output)
            .with_context(|| format!("Cannot re-read {}", job.output.display()))?;
        let written = written.map(|&c| c as u8);
        let report = verify(&source, &written, mapping)
            .with_context(|| format!("Verification failed for {}", job.output.display()))?;
        if !report.is_exact() {
            bail!(
                "{} differs from its source in {} cell(s) ({:.3}% correct)",
                job.output.display(),
                report.mismatches,
                report.accuracy()
            );
        }
        Some(report)
    } else {
        None
    };

    Ok(JobSummary {
        id: job.id.clone(),
        input: job.input.clone(),
        output: job.output.clone(),
        mapping: mapping.name().to_string(),
        width: source.width,
        height: source.height,
        source_codes,
        stats,
        verification,
    })
}

fn collect_jobs(args: &Args) -> Result<Vec<Job>> {
    if let Some(path) = &args.jobs {
        let file = JobFile::load(path)
            .with_context(|| format!("Cannot load job file {}", path.display()))?;
        return Ok(file.jobs);
    }
    match (&args.input, &args.output) {
        (Some(input), Some(output)) => {
            if input == output {
                bail!("--output must differ from --input");
            }
            let id = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            Ok(vec![Job {
                id,
                input: input.clone(),
                output: output.clone(),
            }])
        }
        _ => bail!("Specify --input and --output, or --jobs. Use --help for usage."),
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

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mapping = load_mapping(args.mapping.as_deref())?;
    tracing::info!(mapping = mapping.name(), codes = mapping.len(), "mapping table ready");

    let options = WriteOptions {
        compression: if args.no_compress {
            RasterCompression::None
        } else {
            RasterCompression::Lzw
        },
        nodata: args.nodata.map(|v| v.to_string()),
    };

    let jobs = collect_jobs(&args)?;
    let mut summaries = Vec::with_capacity(jobs.len());
    for job in &jobs {
        summaries.push(run_job(job, &mapping, &options, args.verify)?);
    }

    if let Some(path) = &args.stats {
        fs::write(path, serde_json::to_string_pretty(&summaries)?)
            .with_context(|| format!("Write failed: {}", path.display()))?;
        tracing::info!(path = %path.display(), "statistics written");
    }

    tracing::info!(jobs = summaries.len(), "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use landclass_core::{GeoReference, Grid, LandclassError};

    fn write_source(path: &Path, rows: Vec<Vec<u8>>) {
        let grid = Grid::from_rows(rows).unwrap().with_geo(GeoReference {
            pixel_scale: Some(vec![0.1, 0.1, 0.0]),
            tiepoints: Some(vec![0.0, 0.0, 0.0, -2.0, 55.0, 0.0]),
            ..GeoReference::default()
        });
        write_classes(path, &grid, &WriteOptions::default()).unwrap();
    }

    #[test]
    fn job_writes_remapped_raster_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scenario.tif");
        let output = dir.path().join("out").join("scenario_simple.tif");
        write_source(&input, vec![vec![10, 60, 210], vec![130, 0, 90]]);

        let job = Job { id: "scenario".into(), input, output: output.clone() };
        let summary = run_job(&job, &MappingTable::uk_esa_cci(), &WriteOptions::default(), true).unwrap();

        assert_eq!((summary.width, summary.height), (3, 2));
        assert_eq!(summary.source_codes, 6);
        assert!(summary.verification.as_ref().unwrap().is_exact());

        let written = read_categorical(&output).unwrap();
        assert_eq!(written.data, vec![1, 3, 0, 2, 0, 3]);
        assert_eq!(written.geo.tiepoints.as_deref(), Some(&[0.0, 0.0, 0.0, -2.0, 55.0, 0.0][..]));
    }

    #[test]
    fn unmapped_code_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.tif");
        let output = dir.path().join("bad_simple.tif");
        write_source(&input, vec![vec![10, 61]]);

        let job = Job { id: "bad".into(), input, output: output.clone() };
        let err = run_job(&job, &MappingTable::uk_esa_cci(), &WriteOptions::default(), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LandclassError>(),
            Some(LandclassError::UnmappedCodes { codes, .. }) if codes == &vec![61]
        ));
        assert!(!output.exists());
    }

    #[test]
    fn single_raster_arguments_become_one_job() {
        let args = Args::parse_from(["reclassify", "-i", "a/lulc.tif", "-o", "b/simple.tif"]);
        let jobs = collect_jobs(&args).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "lulc");

        let same = Args::parse_from(["reclassify", "-i", "x.tif", "-o", "x.tif"]);
        assert!(collect_jobs(&same).is_err());
    }

    #[test]
    fn input_without_output_is_rejected_by_cli() {
        assert!(Args::try_parse_from(["reclassify", "-i", "a.tif"]).is_err());
        assert!(Args::try_parse_from(["reclassify", "-i", "a.tif", "-o", "b.tif", "-j", "jobs.json"]).is_err());
    }

    #[test]
    fn nodata_cannot_be_a_class_code() {
        for value in ["0", "3"] {
            assert!(Args::try_parse_from(["reclassify", "-i", "a.tif", "-o", "b.tif", "--nodata", value]).is_err());
        }
        assert!(Args::try_parse_from(["reclassify", "-i", "a.tif", "-o", "b.tif", "--nodata", "256"]).is_err());
        let args = Args::try_parse_from(["reclassify", "-i", "a.tif", "-o", "b.tif", "--nodata", "255"]).unwrap();
        assert_eq!(args.nodata, Some(255));
    }
}
