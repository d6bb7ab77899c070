use std::path::Path;

use diagnosis_roi::{
    BatchDriver, BoundingBox, DiagnosisExtractor, Error, PipelineConfig, Preset, RawWord,
    RegionKind, TextRecognizer,
};
use image::{GrayImage, ImageFormat, Rgb, RgbImage};

#[derive(Clone, Default)]
struct FakeOcr {
    words: Vec<RawWord>,
    fail: bool,
}

impl FakeOcr {
    fn with_word(text: &str, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            words: vec![RawWord {
                text: text.to_string(),
                bounds: BoundingBox::new(x, y, width, height),
            }],
            fail: false,
        }
    }
}

impl TextRecognizer for FakeOcr {
    fn recognize_words(&self, _image: &GrayImage) -> diagnosis_roi::Result<Vec<RawWord>> {
        if self.fail {
            return Err(Error::Ocr("engine crashed".to_string()));
        }
        Ok(self.words.clone())
    }

    fn detect_orientation(&self, _image: &RgbImage) -> diagnosis_roi::Result<String> {
        Ok("Page number: 0\nOrientation in degrees: 0\nRotate: 0\n".to_string())
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn without_skew() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.skew.enabled = false;
    config
}

fn driver(config: PipelineConfig, ocr: FakeOcr) -> BatchDriver {
    let extractor = DiagnosisExtractor::builder()
        .config(config)
        .recognizer(ocr)
        .build()
        .expect("Failed to build extractor");
    BatchDriver::new(extractor)
}

fn blank_page(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
        .save(path)
        .expect("Failed to write test page");
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[test]
fn label_on_large_page_yields_one_crop() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("form.png"), 1000, 1000);

    let driver = driver(
        PipelineConfig::default(),
        FakeOcr::with_word("Diagnosis", 100, 200, 150, 30),
    );
    let report = driver.process(input.path(), output.path()).unwrap();

    assert_eq!(file_names(output.path()), vec!["form_roi_0.png"]);
    assert_eq!(report.written.len(), 1);
    assert!(report.skipped.is_empty());

    let offset_x = PipelineConfig::default().locator.offset_x;
    let crop = image::open(output.path().join("form_roi_0.png")).unwrap();
    assert_eq!(crop.width() as i32, 1000 - (100 + offset_x));
    assert_eq!(crop.height(), 100);
}

#[test]
fn extraction_reports_label_rectangle() {
    init_logging();
    let extractor = DiagnosisExtractor::builder()
        .config(without_skew())
        .recognizer(FakeOcr::with_word("Diagnosis", 100, 200, 150, 30))
        .draw_markers(true)
        .build()
        .unwrap();
    let page = RgbImage::from_pixel(1000, 1000, Rgb([255, 255, 255]));
    let extraction = extractor.extract(page).unwrap();

    let offset_x = extractor.config().locator.offset_x;
    assert_eq!(extraction.regions.len(), 1);
    assert_eq!(extraction.regions[0].kind, RegionKind::Label);
    assert_eq!(
        extraction.regions[0].rect,
        BoundingBox::from_corners(100 + offset_x, 160, 1000, 260)
    );
    assert_eq!(extraction.rois.len(), 1);

    let annotated = extraction.annotated.unwrap();
    assert_eq!(
        annotated.get_pixel((100 + offset_x) as u32, 160),
        &Rgb([0, 255, 0])
    );
    // Crops come from the unmarked page.
    assert!(extraction.rois[0]
        .pixels
        .pixels()
        .all(|p| p == &Rgb([255, 255, 255])));
}

#[test]
fn unreadable_file_is_skipped_and_batch_continues() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("page_1.png"), 400, 300);
    std::fs::write(input.path().join("page_2.png"), b"definitely not a png").unwrap();
    blank_page(&input.path().join("page_3.jpg"), 500, 400);

    let report = driver(without_skew(), FakeOcr::default())
        .process(input.path(), output.path())
        .unwrap();

    assert_eq!(
        file_names(output.path()),
        vec!["page_1_roi_0.png", "page_3_roi_0.png"]
    );
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("page_2.png"));
}

#[test]
fn png_content_with_jpg_extension_is_processed() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let scan = input.path().join("scan.jpg");
    RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]))
        .save_with_format(&scan, ImageFormat::Png)
        .unwrap();

    let report = driver(without_skew(), FakeOcr::default())
        .process(input.path(), output.path())
        .unwrap();

    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(report.processed, vec![scan]);
    assert_eq!(file_names(output.path()), vec!["scan_roi_0.png"]);
}

#[test]
fn extract_path_reads_files_directly() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.png");
    blank_page(&page, 400, 300);

    let extractor = DiagnosisExtractor::builder()
        .config(without_skew())
        .recognizer(FakeOcr::default())
        .build()
        .unwrap();
    let extraction = extractor.extract_path(&page).unwrap();
    assert_eq!(extraction.rois.len(), 1);
    assert_eq!(extraction.rois[0].kind, RegionKind::Fallback);
    assert!(extractor.extract_path(dir.path().join("missing.png")).is_err());
}

#[test]
fn weak_match_on_large_page_writes_nothing() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("large.png"), 800, 800);

    let report = driver(without_skew(), FakeOcr::with_word("Dx", 100, 200, 40, 30))
        .process(input.path(), output.path())
        .unwrap();

    assert!(file_names(output.path()).is_empty());
    assert_eq!(report.processed.len(), 1);
}

#[test]
fn weak_match_on_small_page_still_writes_fallback() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("small.png"), 400, 300);

    driver(without_skew(), FakeOcr::with_word("Dx", 10, 20, 40, 30))
        .process(input.path(), output.path())
        .unwrap();

    assert_eq!(file_names(output.path()), vec!["small_roi_0.png"]);
    // 35%..100% of the width by 10% of the height, raised to the 60px floor.
    let crop = image::open(output.path().join("small_roi_0.png")).unwrap();
    assert_eq!((crop.width(), crop.height()), (260, 60));
}

#[test]
fn every_written_crop_meets_minimum_size() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("tiny.png"), 120, 90);
    blank_page(&input.path().join("wide.png"), 1200, 700);

    let report = driver(
        without_skew(),
        FakeOcr::with_word("Diagnosis:", 1100, 10, 60, 12),
    )
    .process(input.path(), output.path())
    .unwrap();

    assert_eq!(report.processed.len(), 2);
    // The label sits so far right that its field falls off the page.
    assert_eq!(report.dropped_rois, 1);
    for path in &report.written {
        let crop = image::open(path).unwrap();
        assert!(crop.width() >= 60 && crop.height() >= 60, "{path:?}");
    }
}

#[test]
fn ocr_failure_skips_only_that_page() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("a.png"), 400, 300);

    let report = driver(
        without_skew(),
        FakeOcr {
            fail: true,
            ..FakeOcr::default()
        },
    )
    .process(input.path(), output.path())
    .unwrap();

    assert!(report.processed.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.contains("engine crashed"));
}

#[test]
fn optional_outputs_are_written_next_to_crops() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("form.png"), 1000, 1000);

    let mut config = without_skew();
    config.output.draw_markers = true;
    config.output.write_annotated = true;
    config.output.write_tokens = true;
    driver(config, FakeOcr::with_word("  Diagnosis ", 100, 200, 150, 30))
        .process(input.path(), output.path())
        .unwrap();

    assert_eq!(
        file_names(output.path()),
        vec!["form_annotated.png", "form_roi_0.png", "form_tokens.json"]
    );
    let tokens: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output.path().join("form_tokens.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(tokens[0]["text"], "Diagnosis");
    assert_eq!(tokens[0]["box"]["x"], 100);
    assert_eq!(tokens[0]["box"]["height"], 30);
}

#[test]
fn upload_preset_trusts_labels_on_small_pages() {
    init_logging();
    let extractor = DiagnosisExtractor::builder()
        .preset(Preset::Upload)
        .recognizer(FakeOcr::with_word("Diagnosis", 20, 100, 80, 20))
        .build()
        .unwrap();
    let extraction = extractor
        .extract(RgbImage::from_pixel(500, 400, Rgb([255, 255, 255])))
        .unwrap();
    assert_eq!(extraction.regions.len(), 1);
    assert_eq!(extraction.regions[0].kind, RegionKind::Label);
    assert_eq!(extraction.rois[0].rect, BoundingBox::new(220, 60, 280, 90));
}

#[test]
fn skew_correction_keeps_page_geometry() {
    init_logging();
    let extractor = DiagnosisExtractor::builder()
        .recognizer(FakeOcr::default())
        .build()
        .unwrap();
    let mut page = RgbImage::from_pixel(300, 200, Rgb([255, 255, 255]));
    for y in [50, 90, 130] {
        for x in 40..260 {
            for dy in 0..6 {
                page.put_pixel(x, y + dy, Rgb([0, 0, 0]));
            }
        }
    }
    let extraction = extractor.extract(page).unwrap();
    assert_eq!(extraction.rois.len(), 1);
    assert_eq!(extraction.rois[0].rect, BoundingBox::new(105, 50, 195, 20));
}

#[test]
#[ignore = "needs a local tesseract install"]
fn default_process_runs_with_tesseract() {
    init_logging();
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    blank_page(&input.path().join("blank.png"), 400, 300);
    let report = diagnosis_roi::process(input.path(), output.path()).unwrap();
    assert_eq!(report.processed.len(), 1);
}
