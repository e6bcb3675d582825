//! # sm-composer
//!
//! Composes the deployable artifacts of a SageMaker ML platform from one
//! flat configuration object: a pipeline definition per enabled pipeline,
//! an IAM policy per role and a schedule record per enabled schedule.
//! Nothing is deployed; every document is validated and rendered locally.
//!
//! ## Usage
//!
//! ```bash
//! sm-composer validate -c platform.yaml
//! sm-composer compose -c platform.yaml -o out/ [--format yaml]
//! sm-composer policy -c platform.yaml --role training
//! sm-composer launch -c platform.yaml --pipeline training
//! sm-composer schedule set-state out/schedules/training.json --state enabled
//! ```
//!
//! ## Modules
//!
//! - `config` - Raw input, format rules, loading and resolution
//! - `features` - Feature toggles evaluated into resource groups
//! - `compose` - Job specs and SageMaker pipeline definitions
//! - `schedule` - Schedule expressions bound to composed jobs
//! - `iam` - Least-privilege policy synthesis per role
//! - `launch` - One-off job launch requests
//! - `plan` - Runs every stage and collects all validation issues
//! - `output` - JSON/YAML rendering and file output
//! - `error` - Error types and numeric codes
//!
//! ## Library use
//!
//! ```
//! use sm_composer::config::PlatformInput;
//! use sm_composer::plan::build_plan;
//!
//! let mut input = PlatformInput::new("ml-platform", "staging");
//! input.enable_training_pipeline = true;
//! input.training_image_uri =
//!     Some("123456789012.dkr.ecr.us-east-1.amazonaws.com/train:latest".to_string());
//!
//! let plan = build_plan(&input).unwrap();
//! assert_eq!(plan.pipelines.len(), 1);
//! ```

pub mod app;
pub mod cli;
pub mod compose;
pub mod config;
pub mod error;
pub mod features;
pub mod iam;
pub mod launch;
pub mod output;
pub mod plan;
pub mod schedule;

pub use error::{ComposerError, Result, ValidationError, ValidationErrors};
