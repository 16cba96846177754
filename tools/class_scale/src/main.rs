/// Per-class scaling of a continuous raster by Simple land-use class, e.g.
/// deposition velocity × {Other 0.25, Cropland 0.5, Grass 0.5, Forest 1.0}.
/// The class raster and the field must share a grid.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use landclass_core::raster::{read_categorical, read_continuous, write_continuous};
use landclass_core::{
    apply_class_factors, reclassify, ClassFactors, ClassStats, Grid, MappingTable, SimpleClass,
    WriteOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "class_scale", about = "Scale a continuous raster by Simple land-use class")]
struct Args {
    /// Simple-class raster (values 0-3), as written by `reclassify`
    #[arg(short, long)]
    classes: PathBuf,

    /// Continuous field to scale (f32/f64/integer GeoTIFF)
    #[arg(short, long)]
    field: PathBuf,

    /// Output f32 GeoTIFF
    #[arg(short, long)]
    output: PathBuf,

    /// Factors JSON { "other", "cropland", "grass", "forest" }; deposition
    /// velocity scaling if omitted
    #[arg(long)]
    factors: Option<PathBuf>,

    /// GDAL nodata value for the output (defaults to the field's)
    #[arg(long)]
    nodata: Option<f32>,
}

fn load_factors(path: Option<&Path>) -> Result<ClassFactors> {
    match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("Cannot read {}", p.display()))?;
            ClassFactors::from_json_str(&text)
                .with_context(|| format!("Failed to parse {}", p.display()))
        }
        None => Ok(ClassFactors::deposition_velocity()),
    }
}

/// Rewrites cells holding the current nodata value to `nodata` and retags
/// the grid with it.
fn retag_nodata(grid: &mut Grid<f32>, nodata: f32) {
    if let Some(old) = grid.geo.nodata_value() {
        for v in grid.data.iter_mut().filter(|v| **v == old) {
            *v = nodata;
        }
    }
    grid.geo.nodata = Some(nodata.to_string());
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

    let factors = load_factors(args.factors.as_deref())?;

    // Class rasters hold codes 0-3; the identity table rejects anything else.
    let raw = read_categorical(&args.classes)
        .with_context(|| format!("Cannot read {}", args.classes.display()))?;
    let classes = reclassify(&raw, &MappingTable::identity())
        .with_context(|| format!("{} is not a Simple-class raster", args.classes.display()))?;
    let field = read_continuous(&args.field)
        .with_context(|| format!("Cannot read {}", args.field.display()))?;

    let stats = ClassStats::from_grid(&classes);
    for class in SimpleClass::ALL {
        tracing::info!(
            "  Class {} ({}): {} pixels, {:.0}% scaling",
            class.code(),
            class.name(),
            stats.cells(class),
            factors.get(class) * 100.0
        );
    }

    let mut scaled = apply_class_factors(&classes, &field, &factors).with_context(|| {
        format!(
            "{} and {} are not on the same grid",
            args.classes.display(),
            args.field.display()
        )
    })?;

    if let Some(nodata) = args.nodata {
        retag_nodata(&mut scaled, nodata);
    }
    write_continuous(&args.output, &scaled, &WriteOptions::default())
        .with_context(|| format!("Write failed: {}", args.output.display()))?;
    tracing::info!(output = %args.output.display(), "scaled field written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_factors_are_deposition_velocity() {
        let f = load_factors(None).unwrap();
        assert_eq!(f, ClassFactors::deposition_velocity());
    }

    #[test]
    fn factors_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factors.json");
        fs::write(&path, r#"{ "other": 0.1, "cropland": 0.2, "grass": 0.3, "forest": 0.4 }"#).unwrap();
        let f = load_factors(Some(&path)).unwrap();
        assert_relative_eq!(f.get(SimpleClass::Grass), 0.3);
    }

    #[test]
    fn nodata_override_rewrites_masked_cells() {
        let classes = Grid::from_rows(vec![vec![SimpleClass::Other, SimpleClass::Forest]]).unwrap();
        let mut field = Grid::from_rows(vec![vec![-9999.0f32, 2.0]]).unwrap();
        field.geo.nodata = Some("-9999".to_string());

        let mut scaled = apply_class_factors(&classes, &field, &ClassFactors::default()).unwrap();
        retag_nodata(&mut scaled, -1.0);
        assert_eq!(scaled.data, vec![-1.0, 2.0]);
        assert_eq!(scaled.geo.nodata_value(), Some(-1.0));
    }

    #[test]
    fn missing_factors_file_is_an_error() {
        assert!(load_factors(Some(Path::new("/nonexistent/factors.json"))).is_err());
    }
}
