//! File and directory processing on top of [`WatermarkEngine`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::engine::{WatermarkEngine, WatermarkMode};
use crate::error::Result;

/// Options controlling batch processing behavior.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Which watermark to remove.
    pub mode: WatermarkMode,
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            success: false,
            message,
        }
    }
}

/// Read `input`, restore it and write PNG bytes to `output`.
fn restore_file(
    engine: &WatermarkEngine,
    input: &Path,
    output: &Path,
    mode: WatermarkMode,
) -> Result<()> {
    let bytes = std::fs::read(input)?;
    let restored = engine.restore_bytes(&bytes, mode)?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, restored)?;
    Ok(())
}

/// Process a single image file: read, restore, write.
///
/// The output is always PNG, in [`WatermarkMode::None`] too. Failures are
/// reported in the returned [`ProcessResult`].
#[must_use]
pub fn process_file(
    engine: &WatermarkEngine,
    input: &Path,
    output: &Path,
    opts: &ProcessOptions,
) -> ProcessResult {
    if let Err(e) = restore_file(engine, input, output, opts.mode) {
        return ProcessResult::failed(input, format!("Failed to process: {e}"));
    }

    log::debug!("{} -> {}", input.display(), output.display());
    ProcessResult {
        path: input.to_path_buf(),
        success: true,
        message: match opts.mode {
            WatermarkMode::None => "Converted to PNG unchanged".to_string(),
            mode => format!("Removed {mode} watermark"),
        },
    }
}

/// Process all supported images in a directory.
///
/// Outputs keep the input stem and get a `.png` extension. Inputs sharing a
/// stem keep their extension too (`shot.jpg` becomes `shot_jpg.png`). Uses
/// parallel iteration when the `cli` feature is enabled (via rayon); every
/// file owns its own pixel buffer.
#[must_use]
pub fn process_directory(
    engine: &WatermarkEngine,
    input_dir: &Path,
    output_dir: &Path,
    opts: &ProcessOptions,
) -> Vec<ProcessResult> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
        Ok(rd) => rd
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| is_supported_image(p))
            .collect(),
        Err(e) => {
            return vec![ProcessResult::failed(
                input_dir,
                format!("Failed to read directory: {e}"),
            )];
        }
    };
    entries.sort();

    if !output_dir.exists() {
        if let Err(e) = std::fs::create_dir_all(output_dir) {
            return vec![ProcessResult::failed(
                output_dir,
                format!("Failed to create output directory: {e}"),
            )];
        }
    }

    let jobs: Vec<(&PathBuf, Option<String>)> =
        entries.iter().zip(output_file_names(&entries)).collect();
    let run = |(input_path, name): &(&PathBuf, Option<String>)| match name {
        Some(name) => process_file(engine, input_path, &output_dir.join(name), opts),
        None => ProcessResult::failed(
            input_path,
            "Output name collides with another input".to_string(),
        ),
    };

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(run).collect()
    }

    #[cfg(not(feature = "cli"))]
    {
        jobs.iter().map(run).collect()
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// Output names for `inputs`, in order: `{stem}.png`, or `{stem}_{ext}.png`
/// when several inputs share a stem. Names that still clash are `None`.
fn output_file_names(inputs: &[PathBuf]) -> Vec<Option<String>> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *stem_counts.entry(file_stem(input)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = file_stem(input);
            let name = if stem_counts[&stem] > 1 {
                let ext = input
                    .extension()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_lowercase();
                format!("{stem}_{ext}.png")
            } else {
                format!("{stem}.png")
            };
            taken.insert(name.clone()).then_some(name)
        })
        .collect()
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cleaned.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = file_stem(input);
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alpha_map::tests::synthetic_source;
    use crate::alpha_map::AlphaMapCache;
    use crate::codec::{ImageCodec, PixelBuffer, PngCodec};
    use crate::error::Error;

    fn engine() -> WatermarkEngine {
        WatermarkEngine::new(AlphaMapCache::new(synthetic_source()))
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        let img = PixelBuffer::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
        std::fs::write(path, PngCodec.encode(&img).unwrap()).unwrap();
    }

    #[test]
    fn default_output_path_appends_cleaned_suffix() {
        let p = default_output_path(Path::new("/tmp/photo.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/photo_cleaned.png"));

        let p = default_output_path(Path::new("image.png"));
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "image_cleaned.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("photo.jpg")));
        assert!(is_supported_image(Path::new("photo.JPEG")));
        assert!(is_supported_image(Path::new("photo.png")));
        assert!(is_supported_image(Path::new("photo.webp")));
        assert!(is_supported_image(Path::new("photo.bmp")));
    }

    #[test]
    fn is_supported_image_rejects_unsupported_formats() {
        assert!(!is_supported_image(Path::new("photo.gif")));
        assert!(!is_supported_image(Path::new("photo.txt")));
        assert!(!is_supported_image(Path::new("photo")));
    }

    #[test]
    fn process_file_writes_png_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.png");
        write_png(&input, 640, 480);
        let output = dir.path().join("out/export_cleaned.png");

        let opts = ProcessOptions {
            mode: WatermarkMode::NotebookLm,
            ..ProcessOptions::default()
        };
        let result = process_file(&engine(), &input, &output, &opts);
        assert!(result.success, "{}", result.message);

        let written = PngCodec.decode(&std::fs::read(&output).unwrap()).unwrap();
        assert_eq!(written.dimensions(), (640, 480));
    }

    #[test]
    fn process_file_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_file(
            &engine(),
            &dir.path().join("missing.png"),
            &dir.path().join("out.png"),
            &ProcessOptions::default(),
        );
        assert!(!result.success);
        assert!(result.message.contains("I/O error"), "{}", result.message);

        let err = restore_file(
            &engine(),
            &dir.path().join("missing.png"),
            &dir.path().join("out.png"),
            WatermarkMode::NotebookLm,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn none_mode_still_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("photo.jpg");
        let img = image::RgbImage::from_pixel(64, 48, image::Rgb([200, 40, 40]));
        img.save_with_format(&input, image::ImageFormat::Jpeg).unwrap();
        let output = default_output_path(&input);

        let opts = ProcessOptions {
            mode: WatermarkMode::None,
            ..ProcessOptions::default()
        };
        let result = process_file(&engine(), &input, &output, &opts);
        assert!(result.success, "{}", result.message);

        let written = std::fs::read(&output).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), image::ImageFormat::Png);
    }

    #[test]
    fn shared_stems_keep_their_extension() {
        let names = output_file_names(&[
            PathBuf::from("a.jpg"),
            PathBuf::from("a.png"),
            PathBuf::from("a_jpg.png"),
            PathBuf::from("b.webp"),
        ]);
        assert_eq!(
            names,
            vec![
                Some("a_jpg.png".to_string()),
                Some("a_png.png".to_string()),
                None,
                Some("b.png".to_string()),
            ]
        );
    }

    #[test]
    fn same_stem_inputs_get_distinct_outputs() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("shot.png"), 320, 240);
        let jpeg = image::RgbImage::from_pixel(320, 240, image::Rgb([40, 80, 120]));
        jpeg.save_with_format(dir.path().join("shot.jpg"), image::ImageFormat::Jpeg)
            .unwrap();
        let out_dir = dir.path().join("cleaned");

        let opts = ProcessOptions {
            mode: WatermarkMode::NotebookLm,
            ..ProcessOptions::default()
        };
        let results = process_directory(&engine(), dir.path(), &out_dir, &opts);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));

        let mut written: Vec<String> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(written, ["shot_jpg.png", "shot_png.png"]);
    }

    #[test]
    fn process_directory_handles_each_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("a.png"), 300, 200);
        write_png(&dir.path().join("b.png"), 1200, 1100);
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
        std::fs::write(dir.path().join("broken.jpg"), "not a jpeg").unwrap();
        let out_dir = dir.path().join("cleaned");

        let results = process_directory(&engine(), dir.path(), &out_dir, &ProcessOptions::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);
        assert!(out_dir.join("a.png").exists());
        assert!(out_dir.join("b.png").exists());
        assert!(!out_dir.join("broken.png").exists());
    }
}
