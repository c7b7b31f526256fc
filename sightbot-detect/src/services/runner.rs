//! Detection runner
//!
//! The object-detection model is an external program. Given an image it
//! writes, into an output directory:
//! - `<output_dir>/<image file name>`: the annotated copy
//! - `<output_dir>/labels/<image stem>.txt`: one label line per object
//!
//! The label file is absent when the model finds nothing.

use async_trait::async_trait;
use serde::Deserialize;
use sightbot_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs object detection on one local image
#[async_trait]
pub trait DetectionRunner: Send + Sync {
    /// Detect objects in `source`, writing outputs below `output_dir`.
    ///
    /// # Errors
    /// `Error::DetectionFailure` if the detector could not run to completion
    async fn run(&self, source: &Path, output_dir: &Path) -> Result<()>;
}

/// Where a finished run left its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutputs {
    pub annotated_image: PathBuf,
    pub label_file: PathBuf,
}

impl DetectionOutputs {
    pub fn locate(source: &Path, output_dir: &Path) -> Self {
        let file_name = source.file_name().unwrap_or_default();
        let stem = source.file_stem().unwrap_or_default();
        let mut label_name = stem.to_os_string();
        label_name.push(".txt");

        Self {
            annotated_image: output_dir.join(file_name),
            label_file: output_dir.join("labels").join(label_name),
        }
    }
}

/// Detector command line, e.g. YOLOv5's `python detect.py --weights yolov5s.pt`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DetectorCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the detector (where its weights and data live)
    pub working_dir: Option<PathBuf>,
    /// Upper bound on detector processes running at once
    pub max_parallel_runs: usize,
}

impl Default for DetectorCommand {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec![
                "detect.py".to_string(),
                "--weights".to_string(),
                "yolov5s.pt".to_string(),
                "--data".to_string(),
                "data/coco128.yaml".to_string(),
            ],
            working_dir: None,
            max_parallel_runs: 1,
        }
    }
}

/// Runs the detector as a child process
pub struct CommandRunner {
    command: DetectorCommand,
    permits: Arc<Semaphore>,
}

impl CommandRunner {
    pub fn new(command: DetectorCommand) -> Self {
        let permits = Arc::new(Semaphore::new(command.max_parallel_runs.max(1)));
        Self { command, permits }
    }

    /// Full argument list for one run.
    ///
    /// Output goes to `<project>/<name>` with `--exist-ok`, so pointing
    /// project/name at the parent and leaf of `output_dir` lands the files
    /// exactly there.
    fn build_args(&self, source: &Path, output_dir: &Path) -> Result<Vec<String>> {
        let project = output_dir.parent().ok_or_else(|| {
            Error::DetectionFailure(format!("output dir has no parent: {}", output_dir.display()))
        })?;
        let name = output_dir.file_name().ok_or_else(|| {
            Error::DetectionFailure(format!("output dir has no name: {}", output_dir.display()))
        })?;

        let mut args = self.command.args.clone();
        args.extend([
            "--source".to_string(),
            source.display().to_string(),
            "--project".to_string(),
            project.display().to_string(),
            "--name".to_string(),
            name.to_string_lossy().into_owned(),
            "--save-txt".to_string(),
            "--exist-ok".to_string(),
        ]);
        Ok(args)
    }
}

#[async_trait]
impl DetectionRunner for CommandRunner {
    async fn run(&self, source: &Path, output_dir: &Path) -> Result<()> {
        let args = self.build_args(source, output_dir)?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::DetectionFailure("runner is shutting down".to_string()))?;

        let program = self.command.program.clone();
        let working_dir = self.command.working_dir.clone();
        tracing::debug!(program = %program, ?args, "Starting detector");

        // The detector is CPU/GPU bound; keep it off the async workers
        let output = tokio::task::spawn_blocking(move || {
            let mut cmd = Command::new(&program);
            cmd.args(&args);
            if let Some(dir) = &working_dir {
                cmd.current_dir(dir);
            }
            cmd.output()
        })
        .await
        .map_err(|e| Error::DetectionFailure(format!("Task join error: {}", e)))?
        .map_err(|e| Error::DetectionFailure(format!("Failed to start detector: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(Error::DetectionFailure(format!(
                "detector exited with {}: {}",
                output.status, tail
            )));
        }

        Ok(())
    }
}
