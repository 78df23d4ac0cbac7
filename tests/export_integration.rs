//! Export of a repacked plan onto disk

use blockplan::source::{describe_paths, descriptors};
use blockplan::{ExportManifest, PlanError, Planner, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tempfile::TempDir;

const BS: u64 = 1024;

fn write_inputs(dir: &TempDir, files: &[(&str, usize, u8)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|&(name, len, byte)| {
            let path = dir.path().join(name);
            std::fs::write(&path, vec![byte; len]).unwrap();
            path
        })
        .collect()
}

#[test]
fn test_export_round_trip() -> Result<()> {
    let input = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let paths = write_inputs(
        &input,
        &[("45_logo.icl", 1500, 1), ("40_boot.icl", 1024, 2), ("50.icl", 10, 3)],
    );

    let planner = Planner::builder()
        .start_block(0)
        .end_block(15)
        .block_size(BS)
        .build()?;
    let sources = describe_paths(&paths)?;
    let plan = planner.plan(descriptors(&sources))?;
    let manifest = planner
        .export(&plan.packing, &sources, out.path())?
        .expect("files were placeable");

    let names: Vec<_> = manifest.entries.iter().map(|e| e.new_name.as_str()).collect();
    assert_eq!(names, vec!["00_boot.icl", "01_logo.icl", "03.icl"]);

    for entry in &manifest.entries {
        let bytes = std::fs::read(out.path().join(&entry.new_name))?;
        assert_eq!(bytes.len() as u64, entry.size_bytes);
        assert_eq!(entry.sha256, hex::encode(Sha256::digest(&bytes)));
    }

    let logo = &manifest.entries[1];
    assert_eq!(logo.original_name, "45_logo.icl");
    assert_eq!((logo.new_start, logo.new_end), (1, Some(2)));

    assert_eq!(ExportManifest::load(out.path())?, manifest);
    assert!(chrono::DateTime::parse_from_rfc3339(&manifest.created).is_ok());
    Ok(())
}

#[test]
fn test_export_skips_unplaceable() -> Result<()> {
    let input = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let paths = write_inputs(&input, &[("0_a.bin", 1024, 1), ("1_big.bin", 4096, 2)]);

    let planner = Planner::builder()
        .start_block(0)
        .end_block(1)
        .block_size(BS)
        .build()?;
    let sources = describe_paths(&paths)?;
    let plan = planner.plan(descriptors(&sources))?;
    let manifest = planner
        .export(&plan.packing, &sources, out.path())?
        .expect("one file was placeable");

    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(manifest.unplaced, vec!["1_big.bin".to_string()]);
    assert!(!out.path().join("01_big.bin").exists());
    Ok(())
}

#[test]
fn test_export_failure_leaves_out_dir_untouched() -> Result<()> {
    let input = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let paths = write_inputs(
        &input,
        &[("0_a.bin", 1024, 1), ("1_b.bin", 1024, 2), ("2_c.bin", 1024, 3)],
    );

    let planner = Planner::builder()
        .start_block(0)
        .end_block(7)
        .block_size(BS)
        .build()?;
    let sources = describe_paths(&paths)?;
    let plan = planner.plan(descriptors(&sources))?;

    std::fs::write(&paths[2], vec![3u8; 1000])?;
    let err = planner
        .export(&plan.packing, &sources, out.path())
        .unwrap_err();
    assert!(matches!(err, PlanError::Io(_)));
    assert_eq!(std::fs::read_dir(out.path())?.count(), 0);
    assert!(ExportManifest::load(out.path()).is_err());
    Ok(())
}

#[test]
fn test_export_into_input_dir_keeps_inputs() -> Result<()> {
    let input = TempDir::new().unwrap();
    let paths = write_inputs(&input, &[("5_x.icl", 1024, 0xAA), ("32_x.icl", 1024, 0xBB)]);

    let planner = Planner::builder().block_size(BS).build()?;
    let sources = describe_paths(&paths)?;
    let plan = planner.plan(descriptors(&sources))?;

    let err = planner
        .export(&plan.packing, &sources, input.path())
        .unwrap_err();
    assert!(matches!(err, PlanError::ExportOverlapsInput { .. }));
    assert_eq!(std::fs::read(&paths[0])?, vec![0xAA; 1024]);
    assert_eq!(std::fs::read(&paths[1])?, vec![0xBB; 1024]);
    assert!(!input.path().join("33_x.icl").exists());
    Ok(())
}
