use bytescope_load::error::LoadErrorKind;
use bytescope_load::{Catalog, Origin};

const USER_DEFINITION: &str = r##"
name = "Widget"
endianness = "big"

[[magic]]
size = 2
value = "57 44"

[[colors]]
name = "magic"
value = "#FF0000"

[[fields]]
name = "magic"
label = "Magic"
color = "magic"
size = { fixed = 2 }

[[steps]]
kind = "field"
field = "magic"
"##;

#[test]
fn system_definitions_are_loaded() {
    let catalog = Catalog::new();
    let names: Vec<_> = catalog
        .list()
        .iter()
        .map(|(origin, definition)| (*origin, definition.name().to_string()))
        .collect();

    assert_eq!(
        names,
        vec![(Origin::System, "PNG".to_string()), (Origin::System, "JPEG".to_string())]
    );
}

#[test]
fn identification_uses_magic_numbers() {
    let catalog = Catalog::new();
    catalog.load_user_str(USER_DEFINITION).unwrap();

    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    assert_eq!(catalog.identify(&png).map(|definition| definition.name().to_string()), Some("PNG".to_string()));
    assert_eq!(catalog.identify(b"WD\x00").map(|definition| definition.name().to_string()), Some("Widget".to_string()));
    assert!(catalog.identify(b"nothing").is_none());
}

#[test]
fn failed_load_leaves_catalog_unchanged() {
    let catalog = Catalog::new();
    let before = catalog.len();

    let invalid = USER_DEFINITION.replace("color = \"magic\"\nsize", "color = \"unknown\"\nsize");
    assert!(matches!(catalog.load_user_str(&invalid).unwrap_err().kind(), LoadErrorKind::Invalid(_)));
    assert_eq!(catalog.len(), before);

    catalog.load_user_str(USER_DEFINITION).unwrap();
    let duplicate = catalog.load_user_str(USER_DEFINITION).unwrap_err();
    assert!(matches!(duplicate.kind(), LoadErrorKind::AlreadyLoaded(name) if name == "Widget"));
    assert_eq!(catalog.len(), before + 1);
    assert!(catalog.get("Widget").is_some());
}

#[test]
fn directories_are_loaded_in_name_order() {
    let directory = std::env::temp_dir().join(format!("bytescope_load_test_{}", std::process::id()));
    std::fs::create_dir_all(&directory).unwrap();
    std::fs::write(directory.join("b_widget.toml"), USER_DEFINITION).unwrap();
    std::fs::write(directory.join("a_broken.toml"), "name = ").unwrap();
    std::fs::write(directory.join("notes.txt"), "ignored").unwrap();

    let catalog = Catalog::empty();
    let results = catalog.load_user_directory(&directory).unwrap();
    std::fs::remove_dir_all(&directory).unwrap();

    assert_eq!(results.len(), 2);
    let error = results[0].as_ref().unwrap_err();
    assert!(error.path().map_or(false, |path| path.ends_with("a_broken.toml")));
    assert_eq!(results[1].as_ref().unwrap().name(), "Widget");
    assert_eq!(catalog.len(), 1);
}
