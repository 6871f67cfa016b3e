//! End-to-end runs through the public API with real ZIPs and real images.

use image::{ImageFormat, RgbImage};
use std::io::{Cursor, Read, Write};
use unitpack::archive::ArchiveInput;
use unitpack::config::PipelineConfig;
use unitpack::imaging::CanonicalFormat;
use unitpack::package::{MANIFEST_VERSION, read_data_package};
use unitpack::pipeline::{PipelineInput, ProgressEvent, run};
use zip::write::SimpleFileOptions;

fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([x as u8, y as u8, 200]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

fn zip_of(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, bytes) in files {
        writer
            .start_file(path.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// One archive holding `Harbor` (two images + text) and `Market` (one image).
fn batch_archive() -> ArchiveInput {
    let bytes = zip_of(&[
        (
            "2024/Harbor/images/P+ID7+Harbor - 2.png",
            image_bytes(6, 4, ImageFormat::Png),
        ),
        (
            "2024/Harbor/images/P+ID7+Harbor - 1.jpg",
            image_bytes(8, 8, ImageFormat::Jpeg),
        ),
        ("2024/Harbor/text/body.txt", b"Boats at dawn.".to_vec()),
        (
            "2024/Market/pics/P+ID8+Market.png",
            image_bytes(3, 3, ImageFormat::Png),
        ),
    ]);
    ArchiveInput::new("batch.zip", bytes)
}

fn input(archives: Vec<ArchiveInput>) -> PipelineInput {
    PipelineInput { archives }
}

fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[test]
fn full_run_produces_all_three_artifacts() {
    let result = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);

    assert!(result.success);
    assert_eq!(result.error, None);
    assert_eq!(result.summary.archives_processed, 1);
    assert_eq!(result.summary.total_units_found, 2);
    assert_eq!(result.parsed_units.len(), 2);

    let harbor = &result.parsed_units[0];
    assert_eq!(harbor.index, 1);
    assert_eq!(harbor.identifier, "ID7");
    assert_eq!(harbor.title, "Harbor");
    assert_eq!(harbor.content, "Boats at dawn.");
    let names: Vec<&str> = harbor
        .images
        .iter()
        .map(|i| i.original_name.as_str())
        .collect();
    assert_eq!(names, vec!["P+ID7+Harbor - 1.jpg", "P+ID7+Harbor - 2.png"]);

    let market = &result.parsed_units[1];
    assert_eq!(market.index, 2);
    assert_eq!(market.content, "");

    assert!(result.repackaged_archive.is_some());
    assert!(result.tabular_export.is_some());
    assert!(result.data_package.is_some());
}

#[test]
fn canonical_images_decode_with_original_dimensions() {
    let result = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);
    let harbor = &result.parsed_units[0];

    let first = image::load_from_memory_with_format(
        &harbor.images[0].canonical_bytes,
        ImageFormat::Png,
    )
    .unwrap();
    assert_eq!((first.width(), first.height()), (8, 8));

    let second = image::load_from_memory_with_format(
        &harbor.images[1].canonical_bytes,
        ImageFormat::Png,
    )
    .unwrap();
    assert_eq!((second.width(), second.height()), (6, 4));
}

#[test]
fn bmp_canonical_format_is_honoured() {
    let mut config = PipelineConfig::default();
    config.images.canonical_format = CanonicalFormat::Bmp;
    let result = run(&input(vec![batch_archive()]), &config, None);

    let bytes = &result.parsed_units[0].images[0].canonical_bytes;
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Bmp);

    let package = read_data_package(result.data_package.as_ref().unwrap()).unwrap();
    assert!(package.files.keys().all(|path| path.ends_with(".bmp")));
}

#[test]
fn tabular_export_has_one_column_per_image() {
    let result = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);
    let csv_bytes = result.tabular_export.unwrap();
    assert!(csv_bytes.starts_with(b"\xEF\xBB\xBF"));

    let mut reader = csv::Reader::from_reader(&csv_bytes[3..]);
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(
        header,
        vec!["index", "identifier", "title", "content", "image_1", "image_2"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][0], "1");
    assert_eq!(&rows[0][4], "P+ID7+Harbor - 1.jpg");
    assert_eq!(&rows[1][2], "Market");
    assert_eq!(&rows[1][5], "");
}

#[test]
fn data_package_round_trips_canonical_bytes() {
    let result = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);
    let package = read_data_package(result.data_package.as_ref().unwrap()).unwrap();

    assert_eq!(package.manifest.version, MANIFEST_VERSION);
    assert_eq!(package.manifest.generated_units, 2);
    for (unit, parsed) in package.manifest.units.iter().zip(&result.parsed_units) {
        assert_eq!(unit.index, parsed.index);
        assert_eq!(unit.identifier, parsed.identifier);
        assert_eq!(unit.images.len(), parsed.images.len());
        for (path, image) in unit.images.iter().zip(&parsed.images) {
            assert_eq!(package.files[path], image.canonical_bytes);
        }
    }
}

#[test]
fn repackaged_archive_keeps_raw_files_under_unit_folders() {
    let result = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);
    let bytes = result.repackaged_archive.unwrap();
    assert_eq!(
        zip_names(&bytes),
        vec![
            "batch_Harbor/images/P+ID7+Harbor - 1.jpg",
            "batch_Harbor/images/P+ID7+Harbor - 2.png",
            "batch_Harbor/text/body.txt",
            "batch_Market/pics/P+ID8+Market.png",
        ]
    );

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
    let mut text = String::new();
    archive
        .by_name("batch_Harbor/text/body.txt")
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "Boats at dawn.");
}

#[test]
fn corrupt_archive_does_not_stop_the_batch() {
    let broken = ArchiveInput::new("broken.zip", b"not a zip at all".to_vec());
    let result = run(
        &input(vec![broken, batch_archive()]),
        &PipelineConfig::default(),
        None,
    );

    assert!(result.success);
    assert_eq!(result.summary.archives_processed, 1);
    assert_eq!(result.summary.total_units_found, 2);
}

#[test]
fn corrupt_image_is_dropped_but_unit_survives() {
    let bytes = zip_of(&[
        ("U/images/a+B+C - 1.jpg", b"truncated jpeg".to_vec()),
        ("U/images/a+B+C - 2.png", image_bytes(2, 2, ImageFormat::Png)),
    ]);
    let result = run(
        &input(vec![ArchiveInput::new("one.zip", bytes)]),
        &PipelineConfig::default(),
        None,
    );

    assert_eq!(result.parsed_units.len(), 1);
    assert_eq!(result.parsed_units[0].images.len(), 1);
    assert_eq!(result.parsed_units[0].images[0].order, 2);
}

#[test]
fn archive_without_units_is_a_successful_empty_run() {
    let bytes = zip_of(&[("readme.txt", b"nothing here".to_vec())]);
    let result = run(
        &input(vec![ArchiveInput::new("empty.zip", bytes)]),
        &PipelineConfig::default(),
        None,
    );

    assert!(result.success);
    assert_eq!(result.summary.total_units_found, 0);
    assert!(result.error.unwrap().contains("No qualifying folder structures"));
    assert!(result.repackaged_archive.is_none());
    assert!(result.tabular_export.is_none());
    assert!(result.data_package.is_none());
}

#[test]
fn empty_input_fails() {
    let result = run(&input(vec![]), &PipelineConfig::default(), None);
    assert!(!result.success);
    assert!(result.error.is_some());
}

#[test]
fn progress_reaches_100_without_going_backwards() {
    let (tx, rx) = std::sync::mpsc::channel();
    let archives = vec![batch_archive(), batch_archive(), batch_archive()];
    run(&input(archives), &PipelineConfig::default(), Some(tx));

    let events: Vec<ProgressEvent> = rx.iter().collect();
    assert!(!events.is_empty());
    assert!(events.windows(2).all(|w| w[0].percent <= w[1].percent));
    assert_eq!(events.last().unwrap().percent, 100);
}

#[test]
fn identical_input_gives_identical_output() {
    let first = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);
    let second = run(&input(vec![batch_archive()]), &PipelineConfig::default(), None);

    assert_eq!(first.parsed_units, second.parsed_units);
    assert_eq!(first.tabular_export, second.tabular_export);
    assert_eq!(
        read_data_package(first.data_package.as_ref().unwrap())
            .unwrap()
            .manifest,
        read_data_package(second.data_package.as_ref().unwrap())
            .unwrap()
            .manifest
    );
}
