use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use tracing::instrument;

use crate::{DiagnosisExtractor, Extraction, Result};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    pub written: Vec<PathBuf>,
    pub skipped: Vec<SkippedImage>,
    pub dropped_rois: usize,
}

pub struct BatchDriver {
    extractor: DiagnosisExtractor,
}

impl BatchDriver {
    pub fn new(extractor: DiagnosisExtractor) -> Self {
        Self { extractor }
    }

    /// Images are handled one at a time in file name order. A file that cannot
    /// be decoded or processed is logged and skipped; failing to list the input
    /// or to write into the output directory aborts the batch.
    #[instrument(
        skip(self, input, output),
        fields(input = ?input.as_ref(), output = ?output.as_ref())
    )]
    pub fn process(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<BatchReport> {
        let output = output.as_ref();
        std::fs::create_dir_all(output)?;

        let mut report = BatchReport::default();
        for path in input_images(input.as_ref())? {
            let name = path
                .file_name()
                .map(|it| it.to_string_lossy().into_owned())
                .unwrap_or_default();

            let extraction = match self.extractor.extract_path(&path) {
                Ok(extraction) => extraction,
                Err(err) => {
                    log::warn!("Skipping {name}: {err}");
                    report.skipped.push(SkippedImage {
                        path,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let stem = path
                .file_stem()
                .map(|it| it.to_string_lossy().into_owned())
                .unwrap_or_default();
            report
                .written
                .extend(self.write_outputs(output, &stem, &extraction)?);
            report.dropped_rois += extraction.dropped();

            log::info!(
                "Processed: {name} ({} of {} regions written)",
                extraction.rois.len(),
                extraction.regions.len()
            );
            report.processed.push(path);
        }
        Ok(report)
    }

    fn write_outputs(
        &self,
        output: &Path,
        stem: &str,
        extraction: &Extraction,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(extraction.rois.len() + 2);
        for roi in &extraction.rois {
            let path = output.join(format!("{stem}_roi_{}.png", roi.index));
            roi.pixels.save(&path)?;
            log::debug!("Wrote {:?} region to {path:?}", roi.kind);
            written.push(path);
        }

        let options = self.extractor.config().output;
        if options.write_annotated {
            if let Some(annotated) = &extraction.annotated {
                let path = output.join(format!("{stem}_annotated.png"));
                annotated.save(&path)?;
                written.push(path);
            }
        }
        if options.write_tokens {
            let path = output.join(format!("{stem}_tokens.json"));
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, &extraction.tokens)?;
            written.push(path);
        }
        Ok(written)
    }
}

pub fn input_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// Processes `input` into `output` with the default batch tuning and a
/// Tesseract engine.
pub fn process(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<BatchReport> {
    let extractor = DiagnosisExtractor::builder().build()?;
    BatchDriver::new(extractor).process(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_supported_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.png", "c.PNG", "notes.txt", "d.jpeg"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names = input_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "b.jpg", "c.PNG"]);
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(input_images(dir.path().join("missing")).is_err());
    }
}
