use gdre_rs::project::{ImportDescriptor, ImportState};

/// Scenario 5: a descriptor whose recovered destination matches its
/// existing source path stays `NOT_DIRTY`; one whose destination differs
/// is marked `REWRITTEN` and its sidecar text reflects the new path.
#[test]
fn unchanged_destination_stays_not_dirty() {
    let mut d = ImportDescriptor::new("res://img.png", "texture", "CompressedTexture2D");
    d.mark_rewritten(None, "same-md5", "same-md5");
    assert_eq!(d.state, ImportState::NotDirty);
    assert_eq!(d.source_path, "res://img.png");
}

#[test]
fn moved_destination_is_rewritten_and_sidecar_reflects_the_new_path() {
    let mut d = ImportDescriptor::new("res://img.png", "texture", "CompressedTexture2D");
    d.mark_rewritten(Some("res://.assets/img.png".to_string()), "new-md5", "old-md5");
    assert_eq!(d.state, ImportState::Rewritten);
    assert_eq!(d.source_path, "res://.assets/img.png");
    assert!(d.to_import_text().contains("path=\"res://.assets/img.png\""));
}
