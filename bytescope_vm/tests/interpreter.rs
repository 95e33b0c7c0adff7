use bytescope::annotation::{Line, MarkerKind, INVALID};
use bytescope_load::{Catalog, Definition};
use bytescope_vm::{run, RunError};
use std::sync::Arc;

fn load(text: &str) -> Arc<Definition> {
    Catalog::empty().load_user_str(text).unwrap()
}

const RECORDS: &str = r##"
name = "Records"
endianness = "little"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "kind"
label = "Kind"
color = "plain"
size = { fixed = 1 }
print = "options"
options = [{ value = 0, meaning = "End" }, { value = 1, meaning = "Number" }, { value = 2, meaning = "Text" }]

[[fields]]
name = "number"
label = "Number"
color = "plain"
size = { fixed = 2 }
print = "unsigned"
convert_endianness = true

[[fields]]
name = "length"
label = "Length"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[fields]]
name = "text"
label = "Text"
color = "plain"
size = { variable = "length" }
print = "text"

[[steps]]
kind = "loop_start"
until = { variable = "kind", equals = 0 }

[[steps]]
kind = "field"
field = "kind"
store = "kind"

[[steps]]
kind = "selection_start"

[[steps]]
kind = "match"
variable = "kind"
condition = "equals"
operand = 1

[[steps]]
kind = "field"
field = "number"

[[steps]]
kind = "match"
variable = "kind"
condition = "equals"
operand = 2

[[steps]]
kind = "field"
field = "length"
store = "length"

[[steps]]
kind = "field"
field = "text"

[[steps]]
kind = "match"
variable = "kind"
condition = "defined"

[[steps]]
kind = "selection_end"

[[steps]]
kind = "loop_end"
"##;

#[test]
fn alternatives_select_record_layout() {
    let definition = load(RECORDS);
    let walk = run(&definition, &[1, 0x34, 0x12, 2, 3, b'a', b'b', b'c', 0]);

    assert_eq!(walk.result, Ok(()));
    assert!(walk.annotations.is_complete());
    assert_eq!(walk.annotations.tagged_length(), 9);

    let values: Vec<(&str, &str)> = walk
        .annotations
        .lines()
        .iter()
        .map(|line| (line.field.as_str(), line.value.as_str()))
        .collect();

    assert_eq!(
        values,
        vec![
            ("Kind", "Number"),
            ("Number", "4660"),
            ("Kind", "Text"),
            ("Length", "3"),
            ("Text", "abc"),
            ("Kind", "End"),
        ]
    );
}

#[test]
fn oversized_length_marks_incomplete() {
    let definition = load(RECORDS);
    let walk = run(&definition, &[2, 5, b'a']);

    assert!(matches!(walk.result, Err(RunError::UnreasonableSize { available: 1, .. })));
    assert_eq!(walk.annotations.markers().len(), 1);
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Incomplete("Text".to_string()));
    assert_eq!(walk.annotations.markers()[0].offset, 2);
    assert_eq!(walk.annotations.tagged_length(), 3);
}

#[test]
fn truncated_fixed_field_stops_walk() {
    let definition = load(RECORDS);
    let walk = run(&definition, &[1, 0x34]);

    assert!(matches!(walk.result, Err(RunError::InsufficientData(_))));
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Incomplete("Number".to_string()));
    assert!(walk.annotations.ranges().iter().all(|range| range.end() <= 2));
}

const ARITHMETIC: &str = r##"
name = "Arithmetic"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "value"
label = "Value"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[steps]]
kind = "field"
field = "value"
store = "value"

[[steps]]
kind = "exec"
variable = "half"
operation = "set"
operand = "value"

[[steps]]
kind = "exec"
variable = "half"
operation = "divide"
operand = 2

[[steps]]
kind = "exec"
variable = "broken"
operation = "set"
operand = "value"

[[steps]]
kind = "exec"
variable = "broken"
operation = "modulo"
operand = 0

[[steps]]
kind = "print"
label = "Half"
value = { variable = "half" }

[[steps]]
kind = "print"
label = "Broken"
value = { variable = "broken" }

[[steps]]
kind = "print"
label = "Missing"
value = { variable = "missing" }
omit_if_undefined = true
"##;

#[test]
fn division_by_zero_fails_variable_only() {
    let definition = load(ARITHMETIC);
    let walk = run(&definition, &[7]);

    assert_eq!(walk.result, Ok(()));
    let lines = walk.annotations.lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], Line::new("broken", INVALID));
    assert_eq!(lines[2].value, "3");
    assert_eq!((lines[3].field.as_str(), lines[3].value.as_str()), ("Broken", INVALID));
}

const GUARDED: &str = r##"
name = "Guarded"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "tag"
label = "Tag"
color = "plain"
size = { fixed = 1 }
print = "hex"

[[steps]]
kind = "field"
field = "tag"
store = "tag"

[[steps]]
kind = "match"
variable = "tag"
condition = "equals"
operand = 0xFF

[[steps]]
kind = "field"
field = "tag"
"##;

#[test]
fn failed_guard_leaves_remainder_unrecognized() {
    let definition = load(GUARDED);

    let walk = run(&definition, &[0x00, 0x01]);
    assert_eq!(walk.result, Ok(()));
    assert_eq!(walk.annotations.ranges().len(), 2);
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Unrecognized);
    assert_eq!(walk.annotations.markers()[0].offset, 1);

    let walk = run(&definition, &[0xFF, 0x01]);
    assert!(walk.annotations.is_complete());
    assert_eq!(walk.annotations.lines()[1].value, "01");
}

const LOOPS: &str = r##"
name = "Loops"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "count"
label = "Count"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[fields]]
name = "item"
label = "Item"
color = "plain"
size = { fixed = 1 }

[[fields]]
name = "trailer"
label = "Trailer"
color = "plain"
size = { fixed = 1 }

[[steps]]
kind = "field"
field = "count"
store = "count"

[[steps]]
kind = "loop_start"
limit = "count"

[[steps]]
kind = "field"
field = "item"

[[steps]]
kind = "loop_end"

[[steps]]
kind = "field"
field = "trailer"

[[steps]]
kind = "loop_start"

[[steps]]
kind = "print"
label = "Idle"
value = { literal = "iteration" }

[[steps]]
kind = "loop_end"
"##;

#[test]
fn loops_stop_at_limit_and_without_progress() {
    let definition = load(LOOPS);
    let walk = run(&definition, &[2, 0xA, 0xB, 0xC, 0xD]);

    let labels: Vec<_> = walk.annotations.ranges().iter().map(|range| range.label.as_str()).collect();
    assert_eq!(labels, vec!["Count", "Item", "Item", "Trailer", "Unrecognized data"]);
    assert_eq!(walk.annotations.lines().iter().filter(|line| line.field == "Idle").count(), 1);
    assert_eq!(walk.annotations.markers()[0].offset, 4);
}

#[test]
fn variable_endianness_is_resolved_during_walk() {
    let definition = load(
        r##"
name = "Ordered"
endianness = { variable = { variable = "order", big_endian_value = 0x4D4D } }

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "order"
label = "Byte order"
color = "plain"
size = { fixed = 2 }
print = "text"

[[fields]]
name = "value"
label = "Value"
color = "plain"
size = { fixed = 2 }
print = "unsigned"
convert_endianness = true

[[steps]]
kind = "field"
field = "order"
store = "order"

[[steps]]
kind = "field"
field = "value"
"##,
    );

    let value = |buffer: &[u8]| run(&definition, buffer).annotations.lines()[1].value.clone();
    assert_eq!(value(b"MM\x01\x00"), "256");
    assert_eq!(value(b"II\x01\x00"), "1");
}

#[test]
fn png_chunks_are_walked() {
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.extend_from_slice(&[0, 0, 0, 13]);
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 8, 6, 0, 0, 0]);
    png.extend_from_slice(&[0x1F, 0x15, 0xC4, 0x89]);
    png.extend_from_slice(&[0, 0, 0, 0]);
    png.extend_from_slice(b"IEND");
    png.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);

    let catalog = Catalog::new();
    let definition = catalog.identify(&png).unwrap();
    let walk = run(&definition, &png);

    assert_eq!(walk.result, Ok(()));
    assert!(walk.annotations.is_complete());
    assert_eq!(walk.annotations.tagged_length(), png.len());
    assert!(walk
        .annotations
        .lines()
        .iter()
        .any(|line| line.field == "Color type" && line.value == "Truecolor with alpha"));
    assert!(walk
        .annotations
        .ranges()
        .iter()
        .any(|range| range.navigation_label.as_deref() == Some("IHDR")));
}

#[test]
fn jpeg_exif_payload_is_embedded() {
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1, 0x00, 12];
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(b"II*\0");
    jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x03, 0x01]);
    jpeg.extend_from_slice(&[0x12, 0x34, 0xFF, 0xD9]);

    let catalog = Catalog::new();
    let definition = catalog.identify(&jpeg).unwrap();
    assert_eq!(definition.name(), "JPEG");

    let walk = run(&definition, &jpeg);
    assert_eq!(walk.result, Ok(()));
    assert!(walk.annotations.is_complete());

    let embedded = walk.annotations.embedded_files();
    assert_eq!(embedded.len(), 1);
    assert_eq!((embedded[0].offset, embedded[0].size), (12, 4));
}

#[test]
fn counter_loops_run_until_condition_is_met() {
    let definition = load(
        r##"
name = "Counter"
endianness = "big"

[[steps]]
kind = "exec"
variable = "i"
operation = "set"
operand = 0

[[steps]]
kind = "loop_start"
until = { variable = "i", equals = 3 }

[[steps]]
kind = "exec"
variable = "i"
operation = "add"
operand = 1

[[steps]]
kind = "print"
label = "Iteration"
value = { variable = "i" }

[[steps]]
kind = "loop_end"
"##,
    );

    let walk = run(&definition, &[7]);
    let iterations: Vec<_> = walk
        .annotations
        .lines()
        .iter()
        .filter(|line| line.field == "Iteration")
        .map(|line| line.value.as_str())
        .collect();

    assert_eq!(walk.result, Ok(()));
    assert_eq!(iterations, vec!["1", "2", "3"]);
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Unrecognized);
}

#[test]
fn failed_limit_variable_ends_loop() {
    let definition = load(
        r##"
name = "Countdown"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "count"
label = "Count"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[fields]]
name = "item"
label = "Item"
color = "plain"
size = { fixed = 1 }
print = "hex"

[[steps]]
kind = "field"
field = "count"
store = "count"

[[steps]]
kind = "loop_start"
limit = "count"

[[steps]]
kind = "field"
field = "item"
store = "item"

[[steps]]
kind = "selection_start"

[[steps]]
kind = "match"
variable = "item"
condition = "equals"
operand = 0xFF

[[steps]]
kind = "exec"
variable = "count"
operation = "divide"
operand = 0

[[steps]]
kind = "selection_end"

[[steps]]
kind = "loop_end"
"##,
    );

    let walk = run(&definition, &[5, 0x01, 0xFF, 0x02, 0x03, 0x04]);

    assert_eq!(walk.result, Ok(()));
    assert_eq!(walk.annotations.ranges().iter().filter(|range| range.label == "Item").count(), 2);
    assert!(walk.annotations.lines().contains(&Line::new("count", INVALID)));
    assert_eq!(walk.annotations.markers().len(), 1);
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Unrecognized);
    assert_eq!(walk.annotations.markers()[0].offset, 3);
}

#[test]
fn nested_selections_are_claimed_separately() {
    let definition = load(
        r##"
name = "Nested"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "tag"
label = "Tag"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[fields]]
name = "sub"
label = "Subtag"
color = "plain"
size = { fixed = 1 }
print = "unsigned"

[[steps]]
kind = "field"
field = "tag"
store = "tag"

[[steps]]
kind = "selection_start"

[[steps]]
kind = "match"
variable = "tag"
condition = "equals"
operand = 1

[[steps]]
kind = "field"
field = "sub"
store = "sub"

[[steps]]
kind = "selection_start"

[[steps]]
kind = "match"
variable = "sub"
condition = "equals"
operand = 1

[[steps]]
kind = "print"
label = "Inner"
value = { literal = "one" }

[[steps]]
kind = "match"
variable = "sub"
condition = "defined"

[[steps]]
kind = "print"
label = "Inner"
value = { literal = "other" }

[[steps]]
kind = "selection_end"

[[steps]]
kind = "match"
variable = "tag"
condition = "defined"

[[steps]]
kind = "print"
label = "Outer"
value = { literal = "fallback" }

[[steps]]
kind = "selection_end"
"##,
    );

    let described = |buffer: &[u8]| -> Vec<(String, String)> {
        run(&definition, buffer)
            .annotations
            .lines()
            .iter()
            .map(|line| (line.field.clone(), line.value.clone()))
            .collect()
    };

    let pair = |field: &str, value: &str| (field.to_string(), value.to_string());
    assert_eq!(
        described(&[1, 2]),
        vec![pair("Tag", "1"), pair("Subtag", "2"), pair("Inner", "other")]
    );
    assert_eq!(described(&[1, 1]), vec![pair("Tag", "1"), pair("Subtag", "1"), pair("Inner", "one")]);
    assert_eq!(described(&[3]), vec![pair("Tag", "3"), pair("Outer", "fallback")]);
}

#[test]
fn terminated_fields_scan_for_their_terminator() {
    let definition = load(
        r##"
name = "Strings"
endianness = "big"

[[colors]]
name = "plain"
value = "#61AFEF"

[[fields]]
name = "keyword"
label = "Keyword"
color = "plain"
size = { terminated = 0 }
print = "text"

[[steps]]
kind = "field"
field = "keyword"

[[steps]]
kind = "field"
field = "keyword"
"##,
    );

    let walk = run(&definition, b"Title\0Author\0");
    assert_eq!(walk.result, Ok(()));
    assert!(walk.annotations.is_complete());
    let lengths: Vec<_> = walk.annotations.ranges().iter().map(|range| range.length).collect();
    assert_eq!(lengths, vec![6, 7]);
    assert_eq!(walk.annotations.lines()[0].value, "Title");

    let walk = run(&definition, b"Title\0Auth");
    assert_eq!(walk.result, Err(RunError::MissingTerminator { terminator: 0, offset: 6 }));
    assert_eq!(walk.annotations.markers()[0].kind, MarkerKind::Incomplete("Keyword".to_string()));
    assert_eq!(walk.annotations.markers()[0].offset, 6);
}
