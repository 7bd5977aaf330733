use super::{Gallery, GalleryError, MediumKind};
use crate::index::MediaRow;
use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder, codecs::png::PngEncoder};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Subdirectory under the configured cache root that holds every
/// exported file; cleanCache removes it wholesale.
const CACHE_SUBDIR: &str = "photo_gallery";

/// Encodings the export path can produce. Anything else is answered
/// with no file at all rather than a partial conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Jpeg,
    Png,
    Webp,
}

impl ExportFormat {
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }
}

impl Gallery {
    /// Resolves a medium to an on-disk file. Images are handed out by
    /// their original backing path when no conversion is needed and
    /// transcoded once into the export cache otherwise; videos always
    /// materialize a cache copy. Cached files are reused on later calls.
    pub async fn get_file(
        &self,
        medium_id: &str,
        kind: Option<MediumKind>,
        mime_type: Option<&str>,
    ) -> Result<Option<PathBuf>, GalleryError> {
        let Some((kind, row)) = self.resolve_row(medium_id, kind).await? else {
            return Ok(None);
        };

        let native = match self.index.native_path(kind, medium_id).await {
            Ok(path) => path,
            Err(e) => {
                debug!("no native path for {}: {}", medium_id, e);
                None
            }
        };

        // No conversion requested, or the source already matches.
        let wants_source = match mime_type {
            None => true,
            Some(requested) => row.mime_type.as_deref() == Some(requested),
        };
        if kind == MediumKind::Video {
            // Videos are never transcoded; a conversion request that
            // does not match the container cannot be honored.
            if !wants_source {
                debug!("cannot transcode video {}", medium_id);
                return Ok(None);
            }
            return match native {
                Some(path) => self.copy_video(medium_id, &path).await.map(Some),
                None => Ok(None),
            };
        }
        if wants_source && let Some(path) = native {
            return Ok(Some(path));
        }

        let format = match mime_type {
            Some(requested) => match ExportFormat::from_mime_type(requested) {
                Some(format) => format,
                None => {
                    debug!("unsupported export mime type {}", requested);
                    return Ok(None);
                }
            },
            // Source file unavailable and no target given: fall back to
            // a cached JPEG rendition.
            None => ExportFormat::Jpeg,
        };

        self.export_image(kind, medium_id, format).await
    }

    /// Deletes the whole export cache directory. A cache that was never
    /// populated is not an error.
    pub async fn clean_cache(&self) -> Result<(), GalleryError> {
        let dir = self.cache_dir();
        let removed = tokio::task::spawn_blocking(move || match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        })
        .await
        .map_err(|e| std::io::Error::other(e))??;

        if removed {
            info!("export cache cleared");
        }
        Ok(())
    }

    pub(crate) fn cache_dir(&self) -> PathBuf {
        self.config.cache_directory.join(CACHE_SUBDIR)
    }

    async fn export_image(
        &self,
        kind: MediumKind,
        medium_id: &str,
        format: ExportFormat,
    ) -> Result<Option<PathBuf>, GalleryError> {
        let target = self
            .cache_dir()
            .join(format!("{}.{}", sanitize_id(medium_id), format.extension()));
        if target.is_file() {
            debug!("export cache hit for {}", medium_id);
            return Ok(Some(target));
        }

        let original = match self.index.open_original(kind, medium_id).await {
            Ok(Some(image)) => image,
            Ok(None) => return Ok(None),
            Err(e) => {
                debug!("export source unavailable for {}: {}", medium_id, e);
                return Ok(None);
            }
        };

        let quality = self.config.thumbnail.jpeg_quality.unwrap_or(100);
        let written = tokio::task::spawn_blocking(move || -> Result<PathBuf, GalleryError> {
            write_export(&original, format, quality, &target)?;
            Ok(target)
        })
        .await
        .map_err(|e| std::io::Error::other(e))??;

        info!(
            "exported {} as {} to {}",
            medium_id,
            format.extension(),
            written.display()
        );
        Ok(Some(written))
    }

    /// Materializes a video into the cache. There is no portable direct
    /// handle for video assets, so the bytes are copied once and the
    /// cached file is handed out from then on.
    async fn copy_video(&self, medium_id: &str, source: &Path) -> Result<PathBuf, GalleryError> {
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "bin".to_string());
        let target = self
            .cache_dir()
            .join(format!("{}.{}", sanitize_id(medium_id), extension));
        if target.is_file() {
            debug!("export cache hit for {}", medium_id);
            return Ok(target);
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(source, &target).await?;
        info!("exported video {} to {}", medium_id, target.display());
        Ok(target)
    }

    async fn resolve_row(
        &self,
        medium_id: &str,
        kind: Option<MediumKind>,
    ) -> Result<Option<(MediumKind, MediaRow)>, GalleryError> {
        match kind {
            Some(kind) => Ok(self
                .row_soft(kind, medium_id)
                .await?
                .map(|row| (kind, row))),
            None => {
                if let Some(row) = self.row_soft(MediumKind::Image, medium_id).await? {
                    return Ok(Some((MediumKind::Image, row)));
                }
                Ok(self
                    .row_soft(MediumKind::Video, medium_id)
                    .await?
                    .map(|row| (MediumKind::Video, row)))
            }
        }
    }
}

/// Flattens a medium identifier into a single path component. Platform
/// ids may contain slashes.
pub(crate) fn sanitize_id(id: &str) -> String {
    id.replace('/', "__")
}

fn write_export(
    image: &DynamicImage,
    format: ExportFormat,
    jpeg_quality: u8,
    target: &Path,
) -> Result<(), GalleryError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bytes = match format {
        ExportFormat::Jpeg => {
            let rgb = image.to_rgb8();
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, jpeg_quality).write_image(
                &rgb,
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )?;
            out
        }
        ExportFormat::Png => {
            let rgb = image.to_rgb8();
            let mut out = Vec::new();
            PngEncoder::new(&mut out).write_image(
                &rgb,
                rgb.width(),
                rgb.height(),
                image::ExtendedColorType::Rgb8,
            )?;
            out
        }
        ExportFormat::Webp => {
            let rgb = image.to_rgb8();
            let encoder = webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height());
            encoder.encode(jpeg_quality as f32).to_vec()
        }
    };

    std::fs::write(target, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_format_covers_the_three_targets() {
        assert_eq!(
            ExportFormat::from_mime_type("image/jpeg"),
            Some(ExportFormat::Jpeg)
        );
        assert_eq!(
            ExportFormat::from_mime_type("image/png"),
            Some(ExportFormat::Png)
        );
        assert_eq!(
            ExportFormat::from_mime_type("image/webp"),
            Some(ExportFormat::Webp)
        );
        assert_eq!(ExportFormat::from_mime_type("image/gif"), None);
        assert_eq!(ExportFormat::from_mime_type("video/mp4"), None);
    }

    #[test]
    fn ids_with_slashes_become_one_path_component() {
        assert_eq!(sanitize_id("DCIM/100APPLE/IMG_0001"), "DCIM__100APPLE__IMG_0001");
        assert_eq!(sanitize_id("plain"), "plain");
    }
}
