use std::io::Cursor;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, ImageFormat, ImageReader};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ImageConfig;
use crate::error::{ClientError, ClientResult};

pub const JPEG_MIME: &str = "image/jpeg";
pub const SUPPORTED_IMAGE_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Where a captured photo lives.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Bytes),
}

/// A recompressed copy of the source, written next to nothing else it owns.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub path: PathBuf,
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn content_type(&self) -> &'static str {
        JPEG_MIME
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "meal.jpg".into())
    }
}

/// Downscales the source so its long edge fits `cfg.max_edge` and re-encodes
/// it as JPEG. The source is never touched; the result is a fresh file.
#[instrument(skip_all)]
pub async fn prepare_image(cfg: &ImageConfig, source: ImageSource) -> ClientResult<PreparedImage> {
    let cfg = cfg.clone();
    tokio::task::spawn_blocking(move || prepare_blocking(&cfg, source))
        .await
        .map_err(|e| ClientError::image(format!("image task failed: {e}")))?
}

fn prepare_blocking(cfg: &ImageConfig, source: ImageSource) -> ClientResult<PreparedImage> {
    let data = match source {
        ImageSource::Path(p) => std::fs::read(&p)
            .map(Bytes::from)
            .map_err(|e| ClientError::image(format!("read {}: {e}", p.display())))?,
        ImageSource::Bytes(b) => b,
    };
    if data.is_empty() {
        return Err(ClientError::image("empty image"));
    }

    let reader = ImageReader::new(Cursor::new(&data[..]))
        .with_guessed_format()
        .map_err(ClientError::image)?;
    let format = reader.format();
    if format.and_then(mime_for_format).is_none() {
        return Err(ClientError::image(format!(
            "unsupported image format {:?}, expected one of {:?}",
            format, SUPPORTED_IMAGE_TYPES
        )));
    }
    let img = reader.decode().map_err(ClientError::image)?;

    let (src_w, src_h) = (img.width(), img.height());
    let (w, h) = fit_within(src_w, src_h, cfg.max_edge);
    let img = if (w, h) == (src_w, src_h) {
        img
    } else {
        img.resize_exact(w, h, FilterType::Triangle)
    };

    let rgb = img.to_rgb8();
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, cfg.jpeg_quality)
        .encode_image(&rgb)
        .map_err(ClientError::image)?;

    if encoded.len() > cfg.max_bytes {
        return Err(ClientError::image(format!(
            "encoded image is {} bytes, limit is {}",
            encoded.len(),
            cfg.max_bytes
        )));
    }

    let ext = ext_from_mime(JPEG_MIME).unwrap_or("bin");
    let path = cfg
        .output_dir
        .join(format!("meal-{}.{}", Uuid::new_v4(), ext));
    write_atomically(&path, &encoded)?;

    info!(
        src_w,
        src_h,
        width = w,
        height = h,
        bytes = encoded.len(),
        "image prepared"
    );
    Ok(PreparedImage {
        path,
        bytes: Bytes::from(encoded),
        width: w,
        height: h,
    })
}

// The final name only appears once the whole file is on disk.
fn write_atomically(path: &Path, data: &[u8]) -> ClientResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| ClientError::image(format!("create {}: {e}", dir.display())))?;

    let tmp = path.with_extension("part");
    let res = std::fs::write(&tmp, data).and_then(|_| std::fs::rename(&tmp, path));
    if let Err(e) = res {
        if let Err(rm) = std::fs::remove_file(&tmp) {
            debug!(error = %rm, path = %tmp.display(), "temp file cleanup");
        }
        warn!(error = %e, path = %path.display(), "writing prepared image failed");
        return Err(ClientError::image(format!("write {}: {e}", path.display())));
    }
    Ok(())
}

/// Largest size with the same aspect ratio whose long edge is `<= max_edge`.
/// Never upscales.
pub fn fit_within(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let long = width.max(height);
    if long <= max_edge || long == 0 {
        return (width, height);
    }
    let scale = |v: u32| {
        let scaled = (u64::from(v) * u64::from(max_edge) + u64::from(long) / 2) / u64::from(long);
        u32::try_from(scaled).unwrap_or(max_edge).max(1)
    };
    (scale(width), scale(height))
}

pub(crate) fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        _ => None,
    }
}

pub(crate) fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        _ => None,
    }
}
