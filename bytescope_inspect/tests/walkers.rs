use bytescope::annotation::{palette, Annotations, MarkerKind};
use bytescope::number::Endianness;
use bytescope_inspect::walker::{cpio, gif, tar, tiff};
use bytescope_samples::Entry;

fn labelled<'a>(annotations: &'a Annotations, label: &'a str) -> impl Iterator<Item = &'a bytescope::TaggedRange> + 'a {
    annotations.ranges().iter().filter(move |range| range.label == label)
}

fn line<'a>(lines: &'a [bytescope::annotation::Line], field: &str) -> Option<&'a str> {
    lines.iter().find(|line| line.field == field).map(|line| line.value.as_str())
}

#[test]
fn cpio_headers_match_width_table() {
    let variants = bytescope_samples::cpio::Variant::ALL.into_iter().zip(cpio::Variant::ALL);
    for (sample, variant) in variants {
        let archive = bytescope_samples::cpio::archive(sample, &[Entry::file("hello.txt", "Hello!")]);
        let annotations = cpio::walk(&archive, variant);
        let header_length = variant.header_length();

        assert_eq!(header_length, sample.header_length());
        assert!(annotations.is_complete(), "{:?}: {:?}", variant, annotations.markers());

        let header: Vec<_> = annotations.ranges().iter().filter(|range| range.end() <= header_length).collect();
        assert_eq!(header.iter().map(|range| range.length).sum::<usize>(), header_length);
        assert_eq!(header.len(), if header_length == 110 { 14 } else { 11 });

        let embedded = annotations.embedded_files();
        assert_eq!(embedded.len(), 1);
        assert_eq!((embedded[0].name.as_str(), embedded[0].size), ("hello.txt", 6));
        assert_eq!(&archive[embedded[0].offset..embedded[0].offset + 6], b"Hello!");

        let lines = annotations.lines();
        assert_eq!(line(lines, "Mode"), Some("Regular file (rw-r--r--)"));
        assert_eq!(line(lines, "Modification time"), Some("2020-09-13 12:26:40 UTC"));
        assert_eq!(line(lines, "Entries"), Some("1"));
        assert!(lines.iter().any(|line| line.field == "Entry" && line.value == "TRAILER!!!"));
    }
}

#[test]
fn cpio_checksums_are_verified() {
    let archive = bytescope_samples::cpio::archive(bytescope_samples::cpio::Variant::NewAsciiCrc, &[Entry::file("a", "abc")]);
    let annotations = cpio::walk(&archive, cpio::Variant::NewAsciiCrc);
    assert_eq!(line(annotations.lines(), "Checksum verification"), Some("matches contents"));

    let mut corrupted = archive.clone();
    let contents = corrupted.windows(3).position(|window| window == b"abc").unwrap();
    corrupted[contents] = b'x';
    let annotations = cpio::walk(&corrupted, cpio::Variant::NewAsciiCrc);
    assert!(line(annotations.lines(), "Checksum verification").unwrap().starts_with("expected"));
}

#[test]
fn trailer_name_with_contents_is_a_file() {
    let archive = bytescope_samples::cpio::archive(
        bytescope_samples::cpio::Variant::NewAscii,
        &[Entry::file(bytescope_samples::cpio::TRAILER, "not the end")],
    );
    let annotations = cpio::walk(&archive, cpio::Variant::NewAscii);

    assert!(annotations.is_complete(), "{:?}", annotations.markers());
    assert_eq!(annotations.tagged_length(), archive.len());
    assert_eq!(line(annotations.lines(), "Entries"), Some("1"));
    assert_eq!(annotations.embedded_files().len(), 1);
    assert_eq!(labelled(&annotations, "File contents").count(), 1);
}

#[test]
fn bytes_after_cpio_trailer_are_padding() {
    let mut archive = bytescope_samples::cpio::archive(bytescope_samples::cpio::Variant::OldAscii, &[Entry::directory("dir")]);
    let length = archive.len();
    archive.resize(512, 0);

    let annotations = cpio::walk(&archive, cpio::Variant::OldAscii);
    assert!(annotations.is_complete());
    assert!(annotations.embedded_files().is_empty());
    let padding: Vec<_> = labelled(&annotations, "Trailing padding").collect();
    assert_eq!(padding.len(), 1);
    assert_eq!((padding[0].offset, padding[0].length), (length, 512 - length));
    assert_eq!(padding[0].color, palette::PADDING);
}

#[test]
fn tar_contents_are_padded_to_blocks() {
    for length in [0usize, 1, 100, 511, 512, 513, 1500] {
        let archive = bytescope_samples::tar::archive(&[Entry::file("data.bin", vec![0x55; length])]);
        let annotations = tar::walk(&archive);

        assert!(annotations.is_complete(), "{}: {:?}", length, annotations.markers());
        let contents: usize = labelled(&annotations, "File contents").map(|range| range.length).sum();
        let padding: usize = labelled(&annotations, "Padding").map(|range| range.length).sum();
        assert_eq!(contents, length);
        assert_eq!(contents + padding, (length + 511) / 512 * 512);
        assert_eq!(padding == 0, length % 512 == 0);
        assert_eq!(annotations.tagged_length(), archive.len());
    }
}

#[test]
fn tar_headers_are_described() {
    let archive = bytescope_samples::tar::archive(&[Entry::directory("docs"), Entry::file("docs/readme.txt", "read me")]);
    let annotations = tar::walk(&archive);
    let lines = annotations.lines();

    assert!(annotations.is_complete());
    assert_eq!(line(lines, "Entries"), Some("2"));
    assert_eq!(line(lines, "Type"), Some("Directory"));
    assert_eq!(line(lines, "Owner name"), Some("user"));
    assert!(lines.iter().filter(|line| line.field == "Checksum").all(|line| line.value.ends_with("(valid)")));

    let embedded = annotations.embedded_files();
    assert_eq!(embedded.len(), 1);
    assert_eq!((embedded[0].name.as_str(), embedded[0].offset), ("docs/readme.txt", 1024));
}

#[test]
fn gif_color_tables_alternate_colors() {
    for size in 0..8u8 {
        let image = bytescope_samples::gif::image(Some(size), &[bytescope_samples::gif::Frame::new(2, 2)]);
        let annotations = gif::walk(&image);
        assert!(annotations.is_complete(), "{}: {:?}", size, annotations.markers());

        let entries: Vec<_> = annotations
            .ranges()
            .iter()
            .filter(|range| range.label.starts_with("Global color "))
            .collect();

        assert_eq!(entries.len(), 1 << (size + 1));
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.length, 3);
            assert_eq!(entry.color, palette::alternating(index));
            assert!(entry.additional_color.is_some());
        }
    }
}

#[test]
fn gif_blocks_are_described() {
    let mut frame = bytescope_samples::gif::Frame::new(4, 3);
    frame.local_color_table = Some(2);
    let image = bytescope_samples::gif::image(None, &[frame, bytescope_samples::gif::Frame::new(4, 3)]);
    let annotations = gif::walk(&image);
    let lines = annotations.lines();

    assert!(annotations.is_complete());
    assert_eq!(annotations.tagged_length(), image.len());
    assert_eq!(line(lines, "Frames"), Some("2"));
    assert_eq!(line(lines, "Comment"), Some(bytescope_samples::gif::COMMENT));
    assert_eq!(line(lines, "Application extension"), Some("NETSCAPE2.0"));
    assert_eq!(line(lines, "Disposal method"), Some("Restore to background color"));
    assert_eq!(line(lines, "Size"), Some("4x3"));
    assert_eq!(annotations.ranges().iter().filter(|range| range.label.starts_with("Local color ")).count(), 8);
}

#[test]
fn tiff_values_are_read_inline_or_at_offsets() {
    for endianness in [Endianness::Big, Endianness::Little] {
        let buffer = bytescope_samples::tiff::exif(endianness);
        let annotations = tiff::walk(&buffer);
        assert!(annotations.is_complete(), "{:?}", annotations.markers());

        let lines = annotations.lines();
        assert_eq!(line(lines, "Byte order"), Some(endianness.name()));
        assert_eq!(line(lines, "ImageWidth"), Some("64"));
        assert_eq!(line(lines, "Make"), Some(bytescope_samples::tiff::MAKE));
        assert_eq!(line(lines, "XResolution"), Some("72/1"));

        let make: Vec<_> = labelled(&annotations, "Make").map(|range| (range.offset, range.length)).collect();
        assert_eq!(make, vec![(8 + 2 + 12 + 8, 4), (74, 10)]);

        // The entries following an out-of-line value are read right after the entry that referenced it.
        let next = labelled(&annotations, "Next IFD offset").next().unwrap();
        assert_eq!(next.offset, 8 + 2 + 5 * 12);

        let exif = &annotations.tab("EXIF").unwrap().lines;
        assert_eq!(line(exif, "ExposureTime"), Some("1/250"));
        assert_eq!(line(exif, "FNumber"), Some("28/10"));
        assert_eq!(line(exif, "ISOSpeedRatings"), Some("100"));

        let gps = &annotations.tab("GPSInfo").unwrap().lines;
        assert_eq!(line(gps, "GPSVersionID"), Some("2, 3, 0, 0"));
        assert_eq!(line(gps, "GPSLatitudeRef"), Some("N"));
    }
}

#[test]
fn tiff_entry_count_past_end_stops_directory() {
    let buffer = bytescope_samples::tiff::unknown_tags(Endianness::Big, 1000, 3);
    let annotations = tiff::walk(&buffer);

    assert_eq!(labelled(&annotations, "Tag").count(), 3);
    assert_eq!(annotations.markers().len(), 1);
    assert_eq!(annotations.markers()[0].kind, MarkerKind::Incomplete("IFD entry".to_string()));
    assert!(annotations.ranges().iter().all(|range| range.end() <= buffer.len()));
    assert!(annotations.tagged_length() <= buffer.len());
}

#[test]
fn tiff_unknown_tag_flood_is_cut_short() {
    let buffer = bytescope_samples::tiff::unknown_tags(Endianness::Little, 150, 150);
    let annotations = tiff::walk(&buffer);

    assert_eq!(labelled(&annotations, "Tag").count(), tiff::UNKNOWN_TAG_LIMIT);
    assert_eq!(annotations.markers().len(), 1);

    let marker = &annotations.markers()[0];
    assert_eq!(marker.kind, MarkerKind::Unrecognized);
    assert_eq!(marker.offset, 8 + 2 + tiff::UNKNOWN_TAG_LIMIT * 12);
    assert_eq!(marker.offset + marker.length, buffer.len());

    let buffer = bytescope_samples::tiff::unknown_tags(Endianness::Little, 100, 100);
    assert!(tiff::walk(&buffer).is_complete());
}

#[test]
fn short_buffers_produce_markers() {
    let samples: [(&str, Vec<u8>, fn(&[u8]) -> Annotations); 4] = [
        (
            "cpio",
            bytescope_samples::cpio::archive(bytescope_samples::cpio::Variant::NewAscii, &[]),
            |bytes| cpio::walk(bytes, cpio::Variant::NewAscii),
        ),
        ("tar", bytescope_samples::tar::archive(&[Entry::file("a", "b")]), tar::walk),
        ("GIF", bytescope_samples::gif::image(Some(0), &[]), gif::walk),
        ("TIFF", bytescope_samples::tiff::exif(Endianness::Little), tiff::walk),
    ];

    for (name, sample, walk) in samples {
        for length in 0..sample.len().min(600) {
            let prefix = &sample[..length];
            let annotations = walk(prefix);
            assert!(!annotations.is_complete(), "{} truncated to {} bytes", name, length);
            assert!(annotations.ranges().iter().all(|range| range.end() <= length));
        }
    }
}
