use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use reqwest::Client;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{debug, info};

use super::ImageFormatter;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },
    #[error("downloaded content is not an image ({mime_type})")]
    NotAnImage { mime_type: String },
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
    #[error("temporary file error: {0}")]
    Io(#[from] io::Error),
    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Longest side of the output; `0` keeps the original size.
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

/// Re-encoded JPEG on disk. The file is removed when this value is dropped.
#[derive(Debug)]
pub struct BaselineImage {
    path: TempPath,
    width: u32,
    height: u32,
    byte_size: u64,
}

impl BaselineImage {
    pub fn new(path: TempPath, width: u32, height: u32, byte_size: u64) -> Self {
        Self {
            path,
            width,
            height,
            byte_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    if max_dimension == 0 || (image.width() <= max_dimension && image.height() <= max_dimension) {
        return image;
    }
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Writes `bytes` to a scratch file in `media_dir`, decodes it and stores an 8-bit RGB
/// JPEG next to it. The scratch file never outlives this call.
pub fn convert_to_baseline(
    bytes: &[u8],
    media_dir: &Path,
    options: &FormatOptions,
) -> Result<BaselineImage, FormatError> {
    if let Some(kind) = infer::get(bytes) {
        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(FormatError::NotAnImage {
                mime_type: kind.mime_type().to_string(),
            });
        }
    }

    fs::create_dir_all(media_dir)?;

    let mut raw = tempfile::Builder::new()
        .prefix("anime_")
        .tempfile_in(media_dir)?;
    raw.write_all(bytes)?;
    raw.flush()?;

    let decoded = ImageReader::open(raw.path())?
        .with_guessed_format()?
        .decode()
        .map_err(FormatError::Decode)?;
    let rgb = downscale(DynamicImage::ImageRgb8(decoded.to_rgb8()), options.max_dimension);

    let mut output = tempfile::Builder::new()
        .prefix("anime_rgb_")
        .suffix(".jpg")
        .tempfile_in(media_dir)?;
    {
        let mut writer = BufWriter::new(output.as_file_mut());
        let encoder = JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality);
        rgb.write_with_encoder(encoder)
            .map_err(FormatError::Encode)?;
        writer.flush()?;
    }
    let byte_size = output.as_file().metadata()?.len();
    drop(raw);

    Ok(BaselineImage::new(
        output.into_temp_path(),
        rgb.width(),
        rgb.height(),
        byte_size,
    ))
}

#[derive(Clone)]
pub struct BaselineFormatter {
    http: Client,
    media_dir: PathBuf,
    options: FormatOptions,
}

impl BaselineFormatter {
    pub fn new(http: Client, media_dir: PathBuf, options: FormatOptions) -> Self {
        Self {
            http,
            media_dir,
            options,
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FormatError> {
        let download_error = |reason: String| FormatError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| download_error(err.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("status {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|err| download_error(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ImageFormatter for BaselineFormatter {
    async fn materialize(&self, source_url: &str) -> Result<BaselineImage, FormatError> {
        let bytes = self.download(source_url).await?;
        debug!(url = source_url, size = bytes.len(), "Downloaded image for re-encoding");

        let media_dir = self.media_dir.clone();
        let options = self.options;
        let image =
            tokio::task::spawn_blocking(move || convert_to_baseline(&bytes, &media_dir, &options))
                .await??;

        let (width, height) = image.dimensions();
        info!(
            url = source_url,
            path = %image.path().display(),
            width,
            height,
            byte_size = image.byte_size(),
            "Re-encoded image to baseline JPEG"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ColorType, ImageFormat, Rgba, RgbaImage};

    use super::*;

    const OPTIONS: FormatOptions = FormatOptions {
        max_dimension: 4096,
        jpeg_quality: 90,
    };

    fn rgba_png(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn converts_rgba_png_to_rgb_jpeg() {
        let dir = tempfile::tempdir().unwrap();

        let baseline = convert_to_baseline(&rgba_png(64, 32), dir.path(), &OPTIONS).unwrap();

        assert_eq!(baseline.dimensions(), (64, 32));
        assert!(baseline.byte_size() > 0);
        assert_eq!(
            baseline.path().extension().and_then(|ext| ext.to_str()),
            Some("jpg")
        );
        let decoded = ImageReader::open(baseline.path())
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(decoded.format(), Some(ImageFormat::Jpeg));
        assert_eq!(decoded.decode().unwrap().color(), ColorType::Rgb8);
        // only the output survives the call
        assert_eq!(file_count(dir.path()), 1);
    }

    #[test]
    fn output_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let baseline = convert_to_baseline(&rgba_png(8, 8), dir.path(), &OPTIONS).unwrap();
        let path = baseline.path().to_path_buf();
        assert!(path.exists());

        drop(baseline);

        assert!(!path.exists());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn downscales_to_max_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let options = FormatOptions {
            max_dimension: 40,
            jpeg_quality: 80,
        };

        let baseline = convert_to_baseline(&rgba_png(100, 50), dir.path(), &options).unwrap();

        assert_eq!(baseline.dimensions(), (40, 20));
    }

    #[test]
    fn rejects_non_image_content() {
        let dir = tempfile::tempdir().unwrap();

        let err = convert_to_baseline(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n", dir.path(), &OPTIONS)
            .unwrap_err();

        assert!(matches!(err, FormatError::NotAnImage { .. }));
    }

    #[test]
    fn corrupted_download_fails_and_leaves_no_files() {
        let dir = tempfile::tempdir().unwrap();

        let err = convert_to_baseline(b"definitely not an image", dir.path(), &OPTIONS)
            .unwrap_err();

        assert!(matches!(err, FormatError::Decode(_)));
        assert_eq!(file_count(dir.path()), 0);
    }
}
