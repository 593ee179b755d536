// vidlabel-core/tests/discovery_tests.rs

use std::fs::{self, File};
use tempfile::tempdir;
use vidlabel_core::discovery::find_processable_files;
use vidlabel_core::error::CoreError;

#[test]
fn test_find_processable_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input_dir = dir.path();

    File::create(input_dir.join("b_clip.mp4"))?;
    File::create(input_dir.join("a_clip.MOV"))?;
    File::create(input_dir.join("c_notes.txt"))?;
    fs::create_dir(input_dir.join("subdir"))?;
    File::create(input_dir.join("subdir").join("nested.mp4"))?; // not searched

    let files = find_processable_files(input_dir)?;

    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a_clip.MOV", "b_clip.mp4", "c_notes.txt"]);

    dir.close()?;
    Ok(())
}

#[test]
fn test_find_processable_files_empty() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("only_a_dir"))?;

    let result = find_processable_files(dir.path());
    assert!(matches!(result, Err(CoreError::NoFilesFound(_))));
    Ok(())
}

#[test]
fn test_find_processable_files_missing_dir() {
    let result = find_processable_files(std::path::Path::new("/definitely/not/here"));
    assert!(matches!(result, Err(CoreError::Io(_))));
}
