use std::fs;

use tempfile::TempDir;
use toolbox_engine::{ensure_output_dir, ArtifactWriter, Collision};

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("out");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn saving_again_replaces_by_default() {
    let temp = TempDir::new().unwrap();
    let writer = ArtifactWriter::new(temp.path().to_path_buf());

    let first = writer.save("photo.webp", &[1, 2, 3]).unwrap();
    assert_eq!(first.path.file_name().unwrap(), "photo.webp");
    assert_eq!(first.size, 3);

    let second = writer.save("photo.webp", &[9]).unwrap();
    assert_eq!(first.path, second.path);
    assert_eq!(fs::read(&second.path).unwrap(), vec![9]);
}

#[test]
fn keep_both_saves_numbered_copies() {
    let temp = TempDir::new().unwrap();
    let writer =
        ArtifactWriter::new(temp.path().to_path_buf()).with_collision(Collision::KeepBoth);

    let first = writer.save("scan.png", b"one").unwrap();
    let second = writer.save("scan.png", b"two").unwrap();
    let third = writer.save("scan.png", b"three").unwrap();

    assert_eq!(first.path.file_name().unwrap(), "scan.png");
    assert_eq!(second.path.file_name().unwrap(), "scan (1).png");
    assert_eq!(third.path.file_name().unwrap(), "scan (2).png");
    assert_eq!(fs::read(&first.path).unwrap(), b"one");
    assert_eq!(fs::read(&third.path).unwrap(), b"three");
}

#[test]
fn no_artifact_when_target_dir_is_a_file() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = ArtifactWriter::new(file_path.clone());
    assert!(writer.save("photo.png", b"data").is_err());
    assert!(!file_path.with_file_name("photo.png").exists());
}
