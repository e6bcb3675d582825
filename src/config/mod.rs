//! Platform configuration: raw input, format rules, loading and resolution

pub mod input;
pub mod loader;
pub mod patterns;
pub mod resolver;

pub use input::{InputChannelInput, PlatformInput};
pub use loader::{apply_env_overrides, ConfigFormat, ConfigLoader};
pub use patterns::Rule;
pub use resolver::{
    resolve, resolve_lenient, Environment, ExpressionSetting, FeatureFlags, InputChannel,
    KafkaSettings, ProcessingSettings, ProjectContext, ResolvedConfig, ResourceKind,
    ResourceReference, ResourceReferences, ScheduleSettings, Settings, TrainingSettings,
};
