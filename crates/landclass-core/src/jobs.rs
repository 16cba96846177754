//! Batch job files: one reclassification per land-use scenario.
//!
//! ```json
//! { "jobs": [ { "id": "baseline", "input": "scenarios/baseline.tif", "output": "out/baseline_simple.tif" } ] }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LandclassError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub id: String,
    pub input: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

impl JobFile {
    /// Load and validate a job file. Relative paths are resolved against
    /// the job file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LandclassError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json_str(&text, base)
    }

    pub fn from_json_str(text: &str, base: &Path) -> Result<Self> {
        let mut file: JobFile = serde_json::from_str(text)?;
        file.validate()?;
        for job in &mut file.jobs {
            if job.input.is_relative() {
                job.input = base.join(&job.input);
            }
            if job.output.is_relative() {
                job.output = base.join(&job.output);
            }
        }
        Ok(file)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.id.trim().is_empty() {
                return Err(LandclassError::InvalidJobs("job with empty id".to_string()));
            }
            if !seen.insert(job.id.as_str()) {
                return Err(LandclassError::InvalidJobs(format!("duplicate job id {:?}", job.id)));
            }
            if job.input == job.output {
                return Err(LandclassError::InvalidJobs(format!(
                    "job {:?} would overwrite its own input",
                    job.id
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
    fn relative_paths_resolve_against_base() {
        let text = r#"{ "jobs": [
            { "id": "baseline", "input": "in/baseline.tif", "output": "/tmp/out/baseline.tif" }
        ] }"#;
        let file = JobFile::from_json_str(text, Path::new("/data/uk")).unwrap();
        assert_eq!(file.jobs[0].input, PathBuf::from("/data/uk/in/baseline.tif"));
        assert_eq!(file.jobs[0].output, PathBuf::from("/tmp/out/baseline.tif"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let text = r#"{ "jobs": [
            { "id": "a", "input": "1.tif", "output": "2.tif" },
            { "id": "a", "input": "3.tif", "output": "4.tif" }
        ] }"#;
        assert!(matches!(
            JobFile::from_json_str(text, Path::new("")),
            Err(LandclassError::InvalidJobs(_))
        ));
    }

    #[test]
    fn job_may_not_overwrite_input() {
        let text = r#"{ "jobs": [ { "id": "a", "input": "x.tif", "output": "x.tif" } ] }"#;
        assert!(JobFile::from_json_str(text, Path::new("")).is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, r#"{ "jobs": [ { "id": "s1", "input": "s1.tif", "output": "s1_simple.tif" } ] }"#)
            .unwrap();
        let file = JobFile::load(&path).unwrap();
        assert_eq!(file.jobs.len(), 1);
        assert_eq!(file.jobs[0].input, dir.path().join("s1.tif"));
    }
}
