// vidlabel-core/tests/processor_tests.rs
//
// Batch orchestration: loading from disk and from a directory-backed object
// store, flushing with per-video failures, staging resolution, upload,
// download and cleanup.

use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use vidlabel_core::config::CoreConfigBuilder;
use vidlabel_core::external::mocks::{MockFfmpegSpawner, MockFfprobeExecutor};
use vidlabel_core::processing::Processor;
use vidlabel_core::{CoreError, FsObjectStore, MediaSource, ObjectStore, VideoMetadata};

fn create_dummy_file(dir: &Path, filename: &str) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, b"dummy content").expect("Failed to create dummy file");
    path
}

fn hd() -> VideoMetadata {
    VideoMetadata {
        codec: Some("h264".into()),
        width: Some(1920),
        height: Some(1080),
        duration_secs: Some(20.0),
        frame_count: Some(600),
        bit_rate: Some(5_000_000),
        stream_count: 2,
    }
}

#[test]
fn load_local_directory_in_name_order() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    create_dummy_file(input.path(), "b.mp4");
    create_dummy_file(input.path(), "a.mp4");
    fs::create_dir(input.path().join("nested"))?;

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        MockFfmpegSpawner::new(),
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;

    let titles: Vec<&str> = videos.iter().map(|v| v.title()).collect();
    assert_eq!(titles, vec!["a.mp4", "b.mp4"]);
    assert!(videos.iter().all(|v| !v.has_pending()));
    Ok(())
}

#[test]
fn load_local_missing_path_is_an_error() {
    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        MockFfmpegSpawner::new(),
        MockFfprobeExecutor::new(),
    );
    let result = processor.load_local(Path::new("/no/such/input"));
    assert!(matches!(result, Err(CoreError::PathError(_))));
}

#[test]
fn flush_defaults_to_the_loaded_directory() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    create_dummy_file(input.path(), "a.mp4");
    let spawner = MockFfmpegSpawner::new();

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        spawner.clone(),
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let mut videos = processor.labeler().grayscale(videos);
    let outcome = processor.flush(&mut videos, None)?;

    assert!(outcome.is_clean());
    assert_eq!(outcome.output_dir, input.path());
    assert!(input.path().join("greyscale_a.mp4").is_file());
    assert_eq!(spawner.get_received_calls().len(), 1);
    Ok(())
}

#[test]
fn flush_collects_failures_and_continues() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    let out = tempdir()?;
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        create_dummy_file(input.path(), name);
    }
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_success_expectation("greyscale_a.mp4", vec![], 1);
    spawner.add_exit_error_expectation(
        "greyscale_b.mp4",
        vec![FfmpegEvent::Error("Conversion failed!".into())],
        1,
    );
    spawner.add_success_expectation("greyscale_c.mp4", vec![], 1);

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        spawner.clone(),
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let mut videos = processor.labeler().grayscale(videos);
    let outcome = processor.flush(&mut videos, Some(out.path()))?;

    assert_eq!(spawner.get_received_calls().len(), 3);
    let produced: Vec<&str> = outcome.videos.iter().map(|v| v.title()).collect();
    assert_eq!(produced, vec!["greyscale_a.mp4", "greyscale_c.mp4"]);
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].video.ends_with("b.mp4"));
    assert!(matches!(
        &outcome.failures[0].error,
        CoreError::Encode { output, .. } if output == "Conversion failed!"
    ));

    // The failed video keeps its labels for a retry; the others are reset.
    assert!(!videos[0].has_pending());
    assert!(videos[1].has_pending());
    assert!(!videos[2].has_pending());
    Ok(())
}

#[test]
fn spawn_failure_aborts_the_flush() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    let out = tempdir()?;
    create_dummy_file(input.path(), "a.mp4");
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_spawn_error_expectation(
        "greyscale",
        CoreError::CommandStart(
            "ffmpeg".into(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "ffmpeg missing"),
        ),
    );

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        spawner,
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let mut videos = processor.labeler().grayscale(videos);
    let result = processor.flush(&mut videos, Some(out.path()));
    assert!(matches!(result, Err(CoreError::CommandStart(..))));
    Ok(())
}

#[test]
fn plan_reports_commands_without_running_them() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    create_dummy_file(input.path(), "a.mp4");
    let spawner = MockFfmpegSpawner::strict();

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        spawner.clone(),
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let videos = processor.labeler().blur(videos, 10, 2);
    let commands = processor.plan(&videos, Some(Path::new("/planned/out")))?;

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].filter_graph(), Some("gblur=sigma=10:steps=2"));
    assert_eq!(
        commands[0].output(),
        Path::new("/planned/out/blurred_10x2_a.mp4")
    );
    assert!(spawner.get_received_calls().is_empty());
    assert!(!Path::new("/planned/out").exists());
    Ok(())
}

#[test]
fn scratch_staging_is_created_and_cleaned_up() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    let scratch_parent = tempdir()?;
    let source = create_dummy_file(input.path(), "a.mp4");

    let config = CoreConfigBuilder::new()
        .scratch_parent(scratch_parent.path().to_path_buf())
        .build();
    let mut processor = Processor::new(
        config,
        MockFfmpegSpawner::new(),
        MockFfprobeExecutor::with_default(hd()),
    );

    // Single videos constructed directly leave no loaded directory behind.
    let mut videos = processor
        .labeler()
        .grayscale(vec![vidlabel_core::Video::local(&source)?]);
    let outcome = processor.flush(&mut videos, None)?;

    assert!(outcome.output_dir.starts_with(scratch_parent.path()));
    assert!(outcome.output_dir.join("greyscale_a.mp4").is_file());

    processor.cleanup(None)?;
    assert!(!outcome.output_dir.exists());
    assert!(source.is_file());
    Ok(())
}

#[test]
fn cleanup_never_removes_the_loaded_directory_implicitly() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    create_dummy_file(input.path(), "a.mp4");

    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        MockFfmpegSpawner::new(),
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let mut videos = processor.labeler().grayscale(videos);
    processor.flush(&mut videos, None)?;

    processor.cleanup(None)?;
    assert!(input.path().join("a.mp4").is_file());
    assert!(input.path().join("greyscale_a.mp4").is_file());

    // An explicit path is honoured.
    let staging = tempdir()?;
    let staging_path = staging.path().to_path_buf();
    create_dummy_file(&staging_path, "x.mp4");
    fs::create_dir(staging_path.join("deeper"))?;
    File::create(staging_path.join("deeper").join("y.mp4"))?;
    processor.cleanup(Some(&staging_path))?;
    assert!(!staging_path.exists());
    Ok(())
}

#[test]
fn remote_round_trip_through_object_store() -> Result<(), Box<dyn std::error::Error>> {
    let store_root = tempdir()?;
    let out = tempdir()?;
    let local = tempdir()?;
    let seed = FsObjectStore::new(store_root.path());
    let raw = create_dummy_file(local.path(), "source.mp4");
    seed.put_object("media", "raw/a.mp4", &raw)?;
    seed.put_object("media", "raw/b.mp4", &raw)?;

    let probe = MockFfprobeExecutor::with_default(hd());
    let spawner = MockFfmpegSpawner::new();
    let mut processor = Processor::new(CoreConfigBuilder::new().build(), spawner.clone(), probe.clone())
        .with_store(Box::new(FsObjectStore::new(store_root.path())));

    let videos = processor.load_remote("media", "raw/")?;
    assert_eq!(videos.len(), 2);
    assert_eq!(
        videos[0].source(),
        &MediaSource::Remote {
            bucket: "media".into(),
            key: "raw/a.mp4".into()
        }
    );
    assert_eq!(videos[0].title(), "a.mp4");

    let videos = processor.labeler().crop(videos, 0, 0, 320, 240);
    let mut videos = videos;
    let outcome = processor.flush(&mut videos, Some(out.path()))?;
    assert!(outcome.is_clean());
    assert_eq!(probe.calls(), 2);

    // ffmpeg read through the presigned reference of the store.
    let first_input = &spawner.get_received_calls()[0][3];
    assert!(first_input.ends_with("media/raw/a.mp4"));

    let keys = processor.upload(&outcome.videos, "media", "processed/")?;
    assert_eq!(
        keys,
        vec!["processed/cropped_320x240_a.mp4", "processed/cropped_320x240_b.mp4"]
    );
    assert!(store_root
        .path()
        .join("media/processed/cropped_320x240_a.mp4")
        .is_file());

    let downloaded = processor.download(&processor.load_remote("media", "raw/")?, local.path())?;
    assert_eq!(downloaded.len(), 2);
    assert_eq!(fs::read(local.path().join("a.mp4"))?, b"dummy content");
    Ok(())
}

#[test]
fn remote_operations_need_a_store() {
    let processor = Processor::new(
        CoreConfigBuilder::new().build(),
        MockFfmpegSpawner::new(),
        MockFfprobeExecutor::new(),
    );
    assert!(matches!(
        processor.load_remote("media", "raw/"),
        Err(CoreError::Config(_))
    ));
    assert!(matches!(
        processor.upload(&[], "media", "processed/"),
        Err(CoreError::Config(_))
    ));
}

#[test]
fn mock_log_events_do_not_fail_a_successful_run() -> Result<(), Box<dyn std::error::Error>> {
    let input = tempdir()?;
    let out = tempdir()?;
    create_dummy_file(input.path(), "a.mp4");
    let spawner = MockFfmpegSpawner::strict();
    spawner.add_success_expectation(
        "format=gray",
        vec![FfmpegEvent::Log(LogLevel::Warning, "deprecated pixel format".into())],
        1,
    );
    let mut processor = Processor::new(
        CoreConfigBuilder::new().build(),
        spawner,
        MockFfprobeExecutor::with_default(hd()),
    );
    let videos = processor.load_local(input.path())?;
    let mut videos = processor.labeler().grayscale(videos);
    let outcome = processor.flush(&mut videos, Some(out.path()))?;
    assert!(outcome.is_clean());
    assert_eq!(outcome.videos.len(), 1);
    Ok(())
}
