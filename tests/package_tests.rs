use gdre_rs::cipher::Key;
use gdre_rs::package::builder::PckBuilder;
use gdre_rs::package::header::{EngineVersion, PckFlags};
use gdre_rs::package::{PckContainer, PckError, VerifyReport};

/// Scenario 1: a minimal unencrypted, uncompressed package extracts every
/// entry byte-for-byte and verifies clean.
#[test]
fn minimal_package_extracts_exact_bytes_and_verifies_clean() -> Result<(), Box<dyn std::error::Error>> {
    let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
    builder.add_file("scheme://a.txt", b"hello".to_vec(), false, None);
    let binary_blob: Vec<u8> = (0u16..=255).map(|b| b as u8).collect();
    builder.add_file("scheme://b.bin", binary_blob.clone(), false, None);
    let bytes = builder.build_in_memory(PckFlags::new())?;

    let pkg = PckContainer::from_memory(bytes, None)?;
    assert_eq!(pkg.verify_all(None), VerifyReport { ok: 2, broken: 0, skipped: 0 });

    let out = tempfile::tempdir()?;
    for entry in pkg.entries() {
        pkg.extract_entry(entry, out.path(), None)?;
    }
    assert_eq!(std::fs::read(out.path().join("a.txt"))?, b"hello");
    assert_eq!(std::fs::read(out.path().join("b.bin"))?, binary_blob);
    Ok(())
}

/// Scenario 2: an encrypted package opens with the right key and is
/// rejected, with no partial output, under the wrong one.
#[test]
fn encrypted_package_requires_the_right_key_and_leaves_no_partial_files() -> Result<(), Box<dyn std::error::Error>> {
    let key = Key::from_bytes([
        0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x11,
        0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
    ]);
    let mut builder = PckBuilder::new(EngineVersion { major: 4, minor: 3, patch: 0 });
    builder.add_file("scheme://a.txt", b"hello".to_vec(), true, Some(&key));
    let bytes = builder.build_in_memory(PckFlags::new().with_encrypted_entries_present(true))?;

    let pkg = PckContainer::from_memory(bytes, None)?;
    let entry = pkg.entry("scheme://a.txt").unwrap();
    assert_eq!(pkg.read_entry(entry, Some(&key))?, b"hello");

    let wrong_key = Key::from_bytes([0x01; 32]);
    let out = tempfile::tempdir()?;
    let err = pkg.extract_entry(entry, out.path(), Some(&wrong_key)).unwrap_err();
    assert!(matches!(err, PckError::Unauthorized(_)));
    assert!(pkg.has_encryption_error());
    assert!(!out.path().join("a.txt").exists());
    Ok(())
}

/// Scenario 6: two entries that would collide on the same export
/// destination get disambiguated, and the mapping back to the original
/// source is recorded.
#[test]
fn duplicate_destinations_are_disambiguated_and_mapped() {
    use gdre_rs::exporters::LossKind;
    use gdre_rs::orchestrator::{ExportReport, ImportExporterReport};
    use std::path::PathBuf;

    let mut report = ImportExporterReport::new();
    report.push(ExportReport::ok("res://x.wav", PathBuf::from("res://.assets/x.wav"), LossKind::Lossless, vec![]));
    report.push(ExportReport::ok("res://other/x.wav", PathBuf::from("res://.assets/x.wav"), LossKind::Lossless, vec![]));

    let destinations: Vec<_> = report.entries.iter().map(|e| e.destination.clone().unwrap()).collect();
    assert_eq!(destinations[0], PathBuf::from("res://.assets/x.wav"));
    assert_ne!(destinations[1], PathBuf::from("res://.assets/x.wav"));
    assert_eq!(report.disambiguated.get(&destinations[1]), Some(&"res://other/x.wav".to_string()));
}
