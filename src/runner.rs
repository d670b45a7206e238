//! Batch processing loop.
//!
//! Drives the per-file pipeline: parse, transform, serialize. Files are
//! processed strictly in configured order; a failure in one file is logged
//! and recorded, and the run continues with the next.

use crate::config::TransformConfig;
use crate::document::{Document, DocumentError};
use crate::rules::{RuleEngine, RuleError};
use crate::transformer::{self, ProcessingReport, Warning};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Batch runner holding the configuration and the compiled rule table.
#[derive(Debug)]
pub struct BatchRunner {
    config: TransformConfig,
    engine: RuleEngine,
}

/// Outcome for a single input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub result: Result<FileReport, DocumentError>,
}

/// Successful result for one file.
#[derive(Debug)]
pub struct FileReport {
    /// Path the transformed document was written to
    pub output: PathBuf,
    pub report: ProcessingReport,
}

/// Outcomes for the whole run, in file order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn files_written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.files_written()
    }

    pub fn warning_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|r| r.report.warnings.len())
            .sum()
    }
}

impl BatchRunner {
    /// Compile the rule table and build a runner. Configuration errors are
    /// fatal; no file is touched.
    pub fn new(config: TransformConfig) -> Result<Self, RuleError> {
        let engine = RuleEngine::compile(&config)?;
        info!(
            tags = engine.len(),
            files = config.files.len(),
            "rule table compiled"
        );
        Ok(Self { config, engine })
    }

    /// Process every configured file.
    ///
    /// Creating the output directory happens before any file is read and is
    /// the only fatal I/O error; per-file failures are recorded in the
    /// summary and skipped.
    pub fn run(&self) -> Result<RunSummary, io::Error> {
        if !self.config.output_dir.exists() {
            info!(dir = %self.config.output_dir.display(), "creating output directory");
        }
        fs::create_dir_all(&self.config.output_dir)?;

        let mut summary = RunSummary::default();
        for input in &self.config.files {
            info!(file = %input.display(), "processing file");
            let result = self.process_file(input);
            match &result {
                Ok(file_report) => {
                    for Warning::MissingNameAttribute { tag } in &file_report.report.warnings {
                        warn!(
                            file = %input.display(),
                            tag = %tag,
                            "element has no name attribute"
                        );
                    }
                    info!(
                        file = %input.display(),
                        output = %file_report.output.display(),
                        transformed = file_report.report.total_transformed(),
                        warnings = file_report.report.warnings.len(),
                        "wrote transformed document"
                    );
                    debug!(counts = ?file_report.report.transformed, "per-tag counts");
                }
                Err(e) => {
                    warn!(file = %input.display(), error = %e, "failed to process file, skipping");
                }
            }
            summary.outcomes.push(FileOutcome {
                input: input.clone(),
                result,
            });
        }

        info!(
            written = summary.files_written(),
            failed = summary.failures(),
            warnings = summary.warning_count(),
            "run finished"
        );
        Ok(summary)
    }

    fn process_file(&self, input: &Path) -> Result<FileReport, DocumentError> {
        let mut doc = Document::parse_file(input)?;
        let report = transformer::apply(&mut doc, &self.engine, &self.config.settings);
        let output = self.output_path(input)?;
        doc.save(&output)?;
        Ok(FileReport { output, report })
    }

    /// Output path: the input's file name under the output directory.
    fn output_path(&self, input: &Path) -> Result<PathBuf, DocumentError> {
        let file_name = input.file_name().ok_or_else(|| {
            DocumentError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("input path has no file name: {}", input.display()),
            ))
        })?;
        Ok(self.config.output_dir.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenameRule;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn base_config(dir: &Path) -> TransformConfig {
        TransformConfig {
            output_dir: dir.join("out"),
            rename: vec![RenameRule {
                tag: "crosstab".to_string(),
                prefix: "Tb".to_string(),
            }],
            delete: vec!["table".to_string()],
            ..TransformConfig::default()
        }
    }

    #[test]
    fn test_run_writes_transformed_files() {
        let tmp = tempfile::tempdir().unwrap();
        let input = write_file(
            tmp.path(),
            "a.xml",
            r#"<root><crosstab name="x"/><table name="y"/><crosstab name="z"/></root>"#,
        );
        let mut config = base_config(tmp.path());
        config.files = vec![input];

        let runner = BatchRunner::new(config).unwrap();
        let summary = runner.run().unwrap();
        assert_eq!(summary.files_written(), 1);
        assert_eq!(summary.failures(), 0);

        let out = fs::read_to_string(tmp.path().join("out/a.xml")).unwrap();
        assert_eq!(
            out,
            r#"<root><crosstab name="Tb1"/><table/><crosstab name="Tb2"/></root>"#
        );
    }

    #[test]
    fn test_counters_restart_for_every_file() {
        let tmp = tempfile::tempdir().unwrap();
        let xml = r#"<root><crosstab name="x"/><crosstab name="y"/></root>"#;
        let a = write_file(tmp.path(), "a.xml", xml);
        let b = write_file(tmp.path(), "b.xml", xml);
        let mut config = base_config(tmp.path());
        config.files = vec![a, b];

        let runner = BatchRunner::new(config).unwrap();
        runner.run().unwrap();

        let expected = r#"<root><crosstab name="Tb1"/><crosstab name="Tb2"/></root>"#;
        assert_eq!(fs::read_to_string(tmp.path().join("out/a.xml")).unwrap(), expected);
        assert_eq!(fs::read_to_string(tmp.path().join("out/b.xml")).unwrap(), expected);
    }

    #[test]
    fn test_malformed_file_does_not_abort_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = write_file(tmp.path(), "bad.xml", "<root><open></root>");
        let good = write_file(tmp.path(), "good.xml", r#"<root><crosstab name="x"/></root>"#);
        let mut config = base_config(tmp.path());
        config.files = vec![bad, good];

        let runner = BatchRunner::new(config).unwrap();
        let summary = runner.run().unwrap();
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.files_written(), 1);
        assert!(summary.outcomes[0].result.is_err());
        assert!(!tmp.path().join("out/bad.xml").exists());
        assert!(tmp.path().join("out/good.xml").exists());
    }

    #[test]
    fn test_missing_input_is_a_per_file_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = base_config(tmp.path());
        config.files = vec![tmp.path().join("nope.xml")];

        let runner = BatchRunner::new(config).unwrap();
        let summary = runner.run().unwrap();
        assert_eq!(summary.failures(), 1);
        assert!(matches!(
            summary.outcomes[0].result,
            Err(DocumentError::Io(_))
        ));
    }

    #[test]
    fn test_output_directory_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let input = write_file(tmp.path(), "a.xml", "<root/>");
        let mut config = base_config(tmp.path());
        config.output_dir = tmp.path().join("deep/nested/out");
        config.files = vec![input];

        let runner = BatchRunner::new(config).unwrap();
        runner.run().unwrap();
        assert!(tmp.path().join("deep/nested/out/a.xml").exists());
    }

    #[test]
    fn test_runner_is_debug_printable() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = BatchRunner::new(base_config(tmp.path())).unwrap();
        assert!(format!("{runner:?}").contains("BatchRunner"));
    }

    #[test]
    fn test_warnings_are_collected_in_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let input = write_file(tmp.path(), "a.xml", "<root><image/><crosstab/></root>");
        let mut config = base_config(tmp.path());
        config.delete = vec!["image".to_string()];
        config.files = vec![input];

        let runner = BatchRunner::new(config).unwrap();
        let summary = runner.run().unwrap();
        assert_eq!(summary.warning_count(), 2);
    }
}
