use gdre_rs::primitives::cursor::{Cursor, Writer};
use gdre_rs::variant::{self, text, DependencyTable, Variant};

/// Scenario 4: `{ "k": [1, 2.5, "s"], "v": Vector3(1, 2, 3) }` encoded to
/// binary then decoded back to text yields canonical formatting.
#[test]
fn dictionary_round_trips_through_binary_into_canonical_text() -> Result<(), Box<dyn std::error::Error>> {
    let value = Variant::Dictionary(vec![
        (
            Variant::String("k".to_string()),
            Variant::Array(vec![Variant::Int(1), Variant::Float(2.5), Variant::String("s".to_string())]),
        ),
        (
            Variant::String("v".to_string()),
            Variant::Vector3(gdre_rs::variant::value::Vector3 { x: 1.0, y: 2.0, z: 3.0 }),
        ),
    ]);

    let deps = DependencyTable::default();
    let mut w = Writer::new();
    variant::encode(&value, &mut w, 4, &deps)?;
    let bytes = w.into_inner();

    let mut c = Cursor::new(&bytes);
    let decoded = variant::decode(&mut c, 4, &deps)?;
    assert_eq!(decoded, value);

    let rendered = text::to_text(&decoded);
    assert!(rendered.contains("1, 2.5, \"s\""));
    assert!(rendered.contains("Vector3(1, 2, 3)"));
    Ok(())
}

#[test]
fn text_round_trips_back_to_the_same_variant() -> Result<(), Box<dyn std::error::Error>> {
    let value = Variant::Array(vec![Variant::Int(1), Variant::Float(2.5), Variant::String("s".to_string())]);
    let rendered = text::to_text(&value);
    let reparsed = text::from_text(&rendered)?;
    assert_eq!(reparsed, value);
    Ok(())
}
