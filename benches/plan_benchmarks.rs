//! Performance benchmarks for plan assembly and rendering

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sm_composer::config::{InputChannelInput, PlatformInput};
use sm_composer::output::{render_plan, OutputFormat};
use sm_composer::plan::build_plan;
use std::hint::black_box;
use std::time::Duration;

const IMAGE: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com/trainer:latest";

/// Full deployment with `channels` input channels and as many hyperparameters
fn create_input(channels: usize) -> PlatformInput {
    let mut input = PlatformInput::new("ml-platform", "prod");
    input.enable_training_pipeline = true;
    input.training_image_uri = Some(IMAGE.to_string());
    input.enable_processing_pipeline = true;
    input.inference_image_uri = Some(IMAGE.to_string());
    input.inference_input_s3_path = Some("s3://ml-data/batch/in/".to_string());
    input.inference_output_s3_path = Some("s3://ml-data/batch/out/".to_string());
    input.enable_scheduling = true;
    input.schedule_expression = Some("cron(0 2 * * ? *)".to_string());
    input.s3_bucket_arn = Some("arn:aws:s3:::ml-artifacts".to_string());
    input.vpc_id = Some("vpc-0a1b".to_string());
    input.subnet_ids = vec!["subnet-01".to_string(), "subnet-02".to_string()];
    input.security_group_ids = vec!["sg-01".to_string()];
    input.input_data_config = (0..channels)
        .map(|i| InputChannelInput {
            channel_name: format!("channel{}", i),
            s3_uri: format!("s3://ml-data/channel{}/", i),
            content_type: None,
        })
        .collect();
    input.hyperparameters = (0..channels)
        .map(|i| (format!("param{}", i), i.to_string()))
        .collect();
    input
}

fn bench_build_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_plan");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(5));

    for channels in [1, 5, 20].iter() {
        let input = create_input(*channels);
        group.bench_with_input(BenchmarkId::new("channels", channels), &input, |b, input| {
            b.iter(|| build_plan(black_box(input)).unwrap())
        });
    }
    group.finish();
}

fn bench_render_plan(c: &mut Criterion) {
    let plan = build_plan(&create_input(10)).unwrap();

    let mut group = c.benchmark_group("render_plan");
    for format in [OutputFormat::Json, OutputFormat::Yaml] {
        group.bench_function(BenchmarkId::new("format", format.extension()), |b| {
            b.iter(|| render_plan(black_box(&plan), format).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_plan, bench_render_plan);
criterion_main!(benches);
