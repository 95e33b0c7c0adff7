use bytescope::number::Endianness;
use bytescope_inspect::{inspect, inspect_recursive, Format};
use bytescope_load::Catalog;
use bytescope_samples::{cpio, gif, tar, tiff, Entry};

#[test]
fn formats_are_identified() {
    let catalog = Catalog::new();
    let samples = [
        (cpio::archive(cpio::Variant::BinaryLittleEndian, &[]), "cpio (binary, little endian)"),
        (cpio::archive(cpio::Variant::NewAsciiCrc, &[]), "cpio (new ASCII with checksum)"),
        (tar::archive(&[Entry::file("a", "b")]), "tar"),
        (gif::image(None, &[gif::Frame::new(1, 1)]), "GIF"),
        (tiff::exif(Endianness::Big), "TIFF"),
    ];

    for (sample, name) in samples {
        let inspection = inspect(&catalog, &sample);
        assert_eq!(inspection.format_name(), Some(name));
        assert!(inspection.annotations.is_complete(), "{}: {:?}", name, inspection.annotations.markers());
        assert!(inspection.stop_reason.is_none());
    }
}

#[test]
fn unknown_buffers_are_unrecognized() {
    let inspection = inspect(&Catalog::new(), b"plain text");
    assert!(inspection.format.is_none());
    assert_eq!(inspection.annotations.markers().len(), 1);
    assert_eq!(inspection.annotations.tagged_length(), 10);
}

#[test]
fn user_definitions_are_tried_last() {
    let catalog = Catalog::new();
    catalog
        .load_user_str(
            r##"
name = "Greeting"
endianness = "big"

[[magic]]
offset = 0
size = 2
value = "68 69"

[[colors]]
name = "text"
value = "#98C379"

[[fields]]
name = "greeting"
label = "Greeting"
color = "text"
size = "remaining"
print = "text"

[[steps]]
kind = "field"
field = "greeting"
"##,
        )
        .unwrap();

    let inspection = inspect(&catalog, b"hi there");
    assert!(matches!(inspection.format, Some(Format::Definition(_))));
    assert_eq!(inspection.format_name(), Some("Greeting"));
    assert_eq!(inspection.annotations.lines()[0].value, "hi there");
}

#[test]
fn archive_members_are_inspected() {
    let catalog = Catalog::new();
    let image = gif::image(Some(1), &[gif::Frame::new(2, 2)]);
    let inner = tar::archive(&[Entry::file("image.gif", image.clone())]);
    let outer = cpio::archive(cpio::Variant::NewAscii, &[Entry::file("inner.tar", inner), Entry::file("notes", "plain")]);

    let inspection = inspect_recursive(&catalog, &outer, 4);
    assert_eq!(inspection.embedded.len(), 2);

    let (file, tar) = &inspection.embedded[0];
    assert_eq!(file.name, "inner.tar");
    assert_eq!(tar.format_name(), Some("tar"));
    assert_eq!(tar.embedded.len(), 1);
    assert_eq!(tar.embedded[0].1.format_name(), Some("GIF"));
    assert!(tar.embedded[0].1.annotations.is_complete());
    assert_eq!(tar.embedded[0].0.size, image.len());

    let (file, notes) = &inspection.embedded[1];
    assert_eq!(file.name, "notes");
    assert!(notes.format.is_none());

    let shallow = inspect_recursive(&catalog, &outer, 1);
    assert!(shallow.embedded[0].1.embedded.is_empty());
    assert!(inspect_recursive(&catalog, &outer, 0).embedded.is_empty());
}

#[test]
fn jpeg_exif_payload_is_inspected() {
    let exif = tiff::exif(Endianness::Little);
    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&(2 + 6 + exif.len() as u16).to_be_bytes());
    jpeg.extend_from_slice(b"Exif\0\0");
    jpeg.extend_from_slice(&exif);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);

    let inspection = inspect_recursive(&Catalog::new(), &jpeg, 1);
    assert_eq!(inspection.format_name(), Some("JPEG"));
    assert!(inspection.stop_reason.is_none());
    assert_eq!(inspection.embedded.len(), 1);

    let (file, tiff) = &inspection.embedded[0];
    assert_eq!((file.offset, file.size), (12, exif.len()));
    assert_eq!(tiff.format_name(), Some("TIFF"));

    let exposure = tiff
        .annotations
        .tab("EXIF")
        .and_then(|tab| tab.lines.iter().find(|line| line.field == "ExposureTime"));
    assert_eq!(exposure.map(|line| line.value.as_str()), Some("1/250"));
}
