// vidlabel-core/tests/quality_tests.rs
//
// PSNR comparison through the mock spawner: command layout and parsing of
// the psnr filter summary.

use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use vidlabel_core::CoreError;
use vidlabel_core::external::mocks::{MockFfmpegSpawner, MockFfprobeExecutor};
use vidlabel_core::media::{MediaContext, Video};
use vidlabel_core::processing::QualityMeter;

fn summary(average: &str) -> FfmpegEvent {
    FfmpegEvent::Log(
        LogLevel::Info,
        format!(
            "[Parsed_psnr_0 @ 0x55d0c1a2b340] PSNR y:37.91 u:42.30 v:42.88 average:{average} min:35.02 max:41.77"
        ),
    )
}

#[test]
fn psnr_reads_filter_average() -> Result<(), Box<dyn std::error::Error>> {
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_success_expectation(
        "psnr",
        vec![FfmpegEvent::Log(LogLevel::Info, "Stream mapping:".into()), summary("38.52")],
        0,
    );
    let probe = MockFfprobeExecutor::new();
    let ctx = MediaContext::new(&probe);

    let source = Video::local("/in/a.mp4")?;
    let encoded = Video::local("/out/greyscale_a.mp4")?;
    let psnr = QualityMeter::new(&spawner, ctx).psnr(&source, &encoded)?;

    assert!((psnr - 38.52).abs() < 1e-9);
    assert_eq!(
        spawner.get_received_calls(),
        vec![vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            "/out/greyscale_a.mp4".to_string(),
            "-i".to_string(),
            "/in/a.mp4".to_string(),
            "-lavfi".to_string(),
            "[0:v][1:v]psnr=shortest=1".to_string(),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ]]
    );
    assert_eq!(probe.calls(), 0);
    Ok(())
}

#[test]
fn identical_videos_report_infinite_psnr() -> Result<(), Box<dyn std::error::Error>> {
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_success_expectation("psnr", vec![summary("inf")], 0);
    let probe = MockFfprobeExecutor::new();
    let ctx = MediaContext::new(&probe);

    let video = Video::local("/in/a.mp4")?;
    let psnr = QualityMeter::new(&spawner, ctx).psnr(&video, &video)?;
    assert!(psnr.is_infinite());
    Ok(())
}

#[test]
fn missing_summary_and_failed_run_are_errors() -> Result<(), Box<dyn std::error::Error>> {
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_success_expectation("psnr", vec![], 0);
    spawner.add_exit_error_expectation(
        "psnr",
        vec![FfmpegEvent::Log(
            LogLevel::Error,
            "Input 1 width 640 does not match input 0 width 1280.".into(),
        )],
        1,
    );
    let probe = MockFfprobeExecutor::new();
    let ctx = MediaContext::new(&probe);
    let meter = QualityMeter::new(&spawner, ctx);
    let source = Video::local("/in/a.mp4")?;
    let encoded = Video::local("/out/a.mp4")?;

    assert!(matches!(meter.psnr(&source, &encoded), Err(CoreError::MissingPsnr(_))));
    match meter.psnr(&source, &encoded) {
        Err(CoreError::Encode { output, .. }) => assert!(output.contains("does not match")),
        other => panic!("expected Encode error, got {other:?}"),
    }
    Ok(())
}
