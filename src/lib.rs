//! # print-compose – deterministic photo print layouts
//!
//! This crate turns one uploaded photo plus a layout identifier into a
//! paper-sized, print-ready JPEG. The pipeline stages are:
//!
//! 1. **Decode** – read the source and apply EXIF orientation ([`source`])
//! 2. **Orient** – quarter-turn to the slot's aspect class ([`orient`])
//! 3. **Reconcile** – pad or cover-crop to the exact slot size ([`reconcile`])
//! 4. **Plan** – compute slot rectangles on the canvas ([`plan`])
//! 5. **Composite** – place the photo into every slot ([`compose`])
//! 6. **Tag** – attach ICC profile and 300 DPI, encode JPEG ([`tag`])
//!
//! [`pipeline`] orchestrates the stages and falls back to the original file
//! when processing fails. A C-compatible FFI surface is exposed via the
//! [`ffi`] module.

pub mod compose;
pub mod config;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod layout_spec;
pub mod orient;
pub mod pipeline;
pub mod plan;
pub mod reconcile;
pub mod source;
pub mod tag;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use error::{ComposeError, Result};
pub use layout_spec::{FitPolicy, LayoutId, LayoutSpec};
pub use pipeline::{process_file, JobOutcome, OutcomeStatus, Pipeline, PrintJob, Stage};
pub use plan::{compute_plan, CompositionPlan};
