//! Property tests for validation and composition
//!
//! These tests use proptest for automated property verification.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use sm_composer::compose::{JobSpec, PipelineDefinition, PipelineKind};
use sm_composer::config::PlatformInput;
use sm_composer::error::ValidationKind;
use sm_composer::launch::{job_name, MAX_JOB_NAME_LEN};
use sm_composer::plan::{build_plan, validate};
use sm_composer::schedule::ScheduleExpression;
use std::collections::BTreeMap;

const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/trainer:latest";

mod project_names {
    use super::*;

    proptest! {
        #[test]
        fn prop_lowercase_names_are_accepted(name in "[a-z0-9-]{1,24}") {
            let input = PlatformInput::new(name, "dev");
            prop_assert!(validate(&input).is_ok());
        }

        #[test]
        fn prop_other_names_are_format_errors(
            head in "[a-z0-9-]{0,8}",
            bad in "[A-Z_. /]",
            tail in "[a-z0-9-]{0,8}",
        ) {
            let input = PlatformInput::new(format!("{head}{bad}{tail}"), "dev");
            let errors = validate(&input).unwrap_err();
            prop_assert!(errors
                .of_kind(ValidationKind::Format)
                .any(|e| e.field() == "project_name"));
        }
    }
}

mod definitions {
    use super::*;

    fn hyperparameters() -> impl Strategy<Value = BTreeMap<String, String>> {
        prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9.]{0,8}", 0..6)
    }

    proptest! {
        #[test]
        fn prop_training_definition_round_trips(
            instance_count in 1u32..=100,
            volume_size_gb in 1u32..=16_384,
            max_runtime_seconds in 1u64..=2_592_000,
            hyperparameters in hyperparameters(),
            network_isolation in any::<bool>(),
        ) {
            let mut input = PlatformInput::new("ml-platform", "staging");
            input.enable_training_pipeline = true;
            input.training_image_uri = Some(IMAGE.to_string());
            input.instance_count = instance_count;
            input.volume_size_gb = volume_size_gb;
            input.max_runtime_seconds = Some(max_runtime_seconds);
            input.hyperparameters = hyperparameters;
            input.enable_network_isolation = network_isolation;

            let plan = build_plan(&input).unwrap();
            let pipeline = plan.pipeline(PipelineKind::Training).unwrap();
            let json = pipeline.definition.to_json().unwrap();
            let parsed = PipelineDefinition::from_json(&json).unwrap();
            let job = JobSpec::from_definition(&parsed).unwrap();
            prop_assert_eq!(&job, &pipeline.job);
            prop_assert_eq!(job.max_runtime_seconds, max_runtime_seconds);
        }

        #[test]
        fn prop_runtime_above_ceiling_is_range_error(extra in 1u64..1_000_000) {
            let mut input = PlatformInput::new("ml-platform", "staging");
            input.enable_training_pipeline = true;
            input.training_image_uri = Some(IMAGE.to_string());
            input.max_runtime_seconds = Some(2_592_000 + extra);

            let errors = validate(&input).unwrap_err();
            prop_assert_eq!(errors.of_kind(ValidationKind::Range).count(), 1);
            prop_assert!(errors.mentions("max_runtime_seconds"));
        }
    }
}

mod schedules {
    use super::*;

    proptest! {
        #[test]
        fn prop_rate_expressions_are_canonical(
            value in 1u32..10_000,
            unit in prop::sample::select(vec!["minute", "hour", "day"]),
        ) {
            let word = if value == 1 { unit.to_string() } else { format!("{unit}s") };
            let text = format!("rate({value} {word})");
            let parsed = ScheduleExpression::parse("schedule_expression", &text).unwrap();
            prop_assert_eq!(parsed.to_string(), text);
        }

        #[test]
        fn prop_rate_plural_mismatch_rejected(value in 2u32..10_000) {
            let text = format!("rate({value} day)");
            prop_assert!(ScheduleExpression::parse("schedule_expression", &text).is_err());
        }

        #[test]
        fn prop_cron_needs_one_question_mark(minute in 0u32..60, hour in 0u32..24) {
            let day_of_week = format!("cron({minute} {hour} ? * MON-FRI *)");
            let day_of_month = format!("cron({minute} {hour} 1 * ? *)");
            let both = format!("cron({minute} {hour} ? * ? *)");
            let neither = format!("cron({minute} {hour} 1 * MON *)");
            prop_assert!(day_of_week.parse::<ScheduleExpression>().is_ok());
            prop_assert!(day_of_month.parse::<ScheduleExpression>().is_ok());
            prop_assert!(both.parse::<ScheduleExpression>().is_err());
            prop_assert!(neither.parse::<ScheduleExpression>().is_err());
        }
    }
}

mod launch_names {
    use super::*;

    proptest! {
        #[test]
        fn prop_job_names_fit_limit(prefix in "[a-z0-9-]{1,120}", secs in 0i64..4_000_000_000) {
            let now = Utc.timestamp_opt(secs, 0).unwrap();
            let name = job_name(&prefix, now);
            prop_assert!(name.len() <= MAX_JOB_NAME_LEN);
            prop_assert!(name.ends_with(&now.format("%Y%m%d-%H%M%S").to_string()));
            prop_assert!(!name.contains("--") || prefix.contains("--"));
        }
    }
}
