//! Pipeline – ties together decoding, orientation, reconciliation, planning,
//! compositing and tagging into a single `process_one` call, and owns the
//! fallback policy.
//!
//! ```text
//! Idle → Normalizing → Reconciling → Planning → Compositing → Tagging → Encoded
//!              └──────────────┴────────────┴───────────┴──────────┴──→ Fallback
//! ```
//!
//! Recoverable errors in any stage degrade to `Fallback`: the untouched
//! source file becomes the print target. Failing to read the source at all,
//! failing to write the artifact, or breaking a planning invariant is fatal.

use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compose::composite;
use crate::config::PipelineConfig;
use crate::error::{ComposeError, Result};
use crate::layout_spec::{LayoutId, LayoutSpec};
use crate::orient::normalize;
use crate::plan::{plan_slots, CompositionPlan};
use crate::reconcile::{reconcile, SlotTarget};
use crate::source::{read_source, SourceImage};
use crate::tag::{encode_jpeg, tag, ColorProfile};

/// Options the dispatcher forwards to the print spooler. Not interpreted
/// here, only carried through to the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PrintOptions {
    pub fit_to_page: bool,
    pub copies: u32,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            fit_to_page: false,
            copies: 1,
        }
    }
}

/// One print job as handed over by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub source: PathBuf,
    /// Raw layout identifier; unknown or missing values use the default.
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub options: PrintOptions,
}

impl PrintJob {
    pub fn new(id: impl Into<String>, source: impl Into<PathBuf>, layout: LayoutId) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            layout: Some(layout.as_str().to_string()),
            options: PrintOptions::default(),
        }
    }

    pub fn layout_id(&self) -> LayoutId {
        LayoutId::parse_or_default(self.layout.as_deref())
    }
}

/// Pipeline state. Each job walks these in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Normalizing,
    Reconciling,
    Planning,
    Compositing,
    Tagging,
    Encoded,
    Fallback,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Normalizing => "normalizing",
            Stage::Reconciling => "reconciling",
            Stage::Planning => "planning",
            Stage::Compositing => "compositing",
            Stage::Tagging => "tagging",
            Stage::Encoded => "encoded",
            Stage::Fallback => "fallback",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Processed,
    Fallback,
}

/// What the caller gets back: a file to print and how it came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: OutcomeStatus,
    /// Processed artifact, or the original source on fallback.
    pub path: PathBuf,
    pub layout: LayoutId,
    /// Terminal pipeline state (`encoded` or `fallback`).
    pub stage: Stage,
    /// Stage that raised the error when falling back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub rotated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u16>,
    pub options: PrintOptions,
}

impl JobOutcome {
    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// An encoded page, not yet on disk.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub jpeg: Vec<u8>,
    pub plan: CompositionPlan,
    pub rotated: bool,
}

/// A configured composition pipeline. Holds only immutable state, so one
/// instance can serve any number of concurrent jobs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    profile: ColorProfile,
}

fn enter(stage: &mut Stage, next: Stage, job_id: &str) {
    *stage = next;
    log::debug!("job {job_id}: {next}");
}

impl Pipeline {
    /// Build a pipeline, loading the configured colour profile up front.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let profile = ColorProfile::load(&config.color_profile)?;
        Ok(Self { config, profile })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the stages on already-read source bytes.
    ///
    /// `stage` tracks progress so a caller can tell where a failure happened.
    pub fn render(
        &self,
        job_id: &str,
        path: &Path,
        bytes: &[u8],
        spec: &LayoutSpec,
        stage: &mut Stage,
    ) -> Result<Rendered> {
        enter(stage, Stage::Normalizing, job_id);
        let source = SourceImage::decode(path, bytes, self.config.auto_orient)?;
        let normalized = normalize(&source.pixels, spec.orientation, self.config.rotation);

        enter(stage, Stage::Reconciling, job_id);
        let target = SlotTarget {
            width: spec.slot_width,
            height: spec.slot_height,
            ratio: spec.slot_ratio,
            policy: spec.policy,
        };
        let photo = reconcile(&normalized.image, &target, self.config.filter())?;

        enter(stage, Stage::Planning, job_id);
        let plan = plan_slots(spec)?;

        enter(stage, Stage::Compositing, job_id);
        let canvas = composite(&plan, &photo)?;

        enter(stage, Stage::Tagging, job_id);
        let raster = tag(canvas, &self.profile);
        let jpeg = encode_jpeg(&raster)?;

        Ok(Rendered {
            jpeg,
            plan,
            rotated: normalized.rotated,
        })
    }

    /// Process a single job end to end.
    ///
    /// Returns `Ok` with either a processed artifact or a fallback to the
    /// original file. Returns `Err` only when no usable output exists.
    pub fn process_one(&self, job: &PrintJob) -> Result<JobOutcome> {
        let layout = job.layout_id();
        let spec = self.config.layout_spec(layout);
        log::info!(
            "job {}: composing {} as {}",
            job.id,
            job.source.display(),
            layout
        );

        let bytes = read_source(&job.source).inspect_err(|e| {
            log::error!("job {}: {}: {e}", job.id, Stage::Failed);
        })?;

        let mut stage = Stage::Idle;
        match self.render(&job.id, &job.source, &bytes, &spec, &mut stage) {
            Ok(rendered) => {
                let path = self
                    .write_artifact(&job.id, layout, &rendered.jpeg)
                    .inspect_err(|e| {
                        log::error!("job {}: {}: {e}", job.id, Stage::Failed);
                    })?;
                log::info!(
                    "job {}: {} {} ({} bytes)",
                    job.id,
                    Stage::Encoded,
                    path.display(),
                    rendered.jpeg.len()
                );
                Ok(JobOutcome {
                    job_id: job.id.clone(),
                    status: OutcomeStatus::Processed,
                    path,
                    layout,
                    stage: Stage::Encoded,
                    failed_stage: None,
                    fallback_reason: None,
                    rotated: rendered.rotated,
                    color_profile: Some(self.profile.name.clone()),
                    dpi: Some(crate::layout_spec::PRINT_DPI),
                    options: job.options.clone(),
                })
            }
            Err(e) => self.settle(job, layout, stage, e),
        }
    }

    /// Route a stage error: recoverable ones fall back to the original file,
    /// the rest fail the job.
    fn settle(
        &self,
        job: &PrintJob,
        layout: LayoutId,
        stage: Stage,
        error: ComposeError,
    ) -> Result<JobOutcome> {
        if error.is_recoverable() {
            self.fall_back(job, layout, stage, error)
        } else {
            log::error!("job {}: {} during {stage}: {error}", job.id, Stage::Failed);
            Err(error)
        }
    }

    fn fall_back(
        &self,
        job: &PrintJob,
        layout: LayoutId,
        failed_stage: Stage,
        error: ComposeError,
    ) -> Result<JobOutcome> {
        log::warn!(
            "job {}: {failed_stage} failed ({error}), printing original {}",
            job.id,
            job.source.display()
        );
        // The original must still be there for the fallback to mean anything.
        fs::metadata(&job.source).map_err(|e| ComposeError::fs(&job.source, e))?;

        Ok(JobOutcome {
            job_id: job.id.clone(),
            status: OutcomeStatus::Fallback,
            path: job.source.clone(),
            layout,
            stage: Stage::Fallback,
            failed_stage: Some(failed_stage),
            fallback_reason: Some(error.to_string()),
            rotated: false,
            color_profile: None,
            dpi: None,
            options: job.options.clone(),
        })
    }

    /// Write `jpeg` into the output directory under a job-unique name.
    ///
    /// Bytes go to a temp file first and are persisted in one rename; the
    /// temp file is removed on every error path when it drops. A name that
    /// is already taken gets a numeric suffix instead of failing the job.
    fn write_artifact(&self, job_id: &str, layout: LayoutId, jpeg: &[u8]) -> Result<PathBuf> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|e| ComposeError::fs(dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".compose-")
            .suffix(".partial")
            .tempfile_in(dir)
            .map_err(|e| ComposeError::fs(dir, e))?;
        tmp.write_all(jpeg)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ComposeError::fs(tmp.path(), e))?;

        let stem = artifact_stem(job_id);
        let mut attempt = 0;
        loop {
            let final_path = dir.join(artifact_name(&stem, attempt, layout));
            match tmp.persist_noclobber(&final_path) {
                Ok(_) => return Ok(final_path),
                Err(e)
                    if e.error.kind() == ErrorKind::AlreadyExists
                        && attempt < MAX_NAME_ATTEMPTS =>
                {
                    log::debug!("{} exists, trying next name", final_path.display());
                    tmp = e.file;
                    attempt += 1;
                }
                Err(e) => return Err(ComposeError::fs(&final_path, e.error)),
            }
        }
    }
}

/// Suffixes tried after the plain artifact name is taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// `<job-id>-<utc timestamp>`, with the id reduced to filename-safe
/// characters.
pub fn artifact_stem(job_id: &str) -> String {
    let mut id: String = job_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if id.is_empty() {
        id.push_str("job");
    }
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    format!("{id}-{stamp}")
}

/// `<stem>-<layout>.jpg`, or `<stem>-<n>-<layout>.jpg` for `attempt` n > 0.
pub fn artifact_name(stem: &str, attempt: u32, layout: LayoutId) -> String {
    if attempt == 0 {
        format!("{stem}-{layout}.jpg")
    } else {
        format!("{stem}-{attempt}-{layout}.jpg")
    }
}

/// Convenience: process one file with the given layout and config.
pub fn process_file(path: &Path, layout: LayoutId, config: PipelineConfig) -> Result<JobOutcome> {
    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("job")
        .to_string();
    Pipeline::new(config)?.process_one(&PrintJob::new(id, path, layout))
}
