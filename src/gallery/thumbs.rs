use super::{ALL_ALBUM_ID, Gallery, GalleryError, MediumKind};
use crate::index::{MediaRow, MediaSelection, compare_rows};
use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// A fully resolved thumbnail request: target dimensions with defaults
/// already applied.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRequest {
    pub width: u32,
    pub height: u32,
    pub high_quality: bool,
}

/// Seam over the two historical thumbnail code paths. One implementation
/// is chosen at gallery construction from capability configuration; the
/// choice never varies per call.
pub trait ThumbnailStrategy: Send + Sync {
    fn render(&self, original: &DynamicImage, request: ThumbnailRequest) -> DynamicImage;
    fn name(&self) -> &'static str;
}

/// Renders at exactly the requested size, aspect-fill with a center crop.
pub struct ExactSizeStrategy;

impl ThumbnailStrategy for ExactSizeStrategy {
    fn render(&self, original: &DynamicImage, request: ThumbnailRequest) -> DynamicImage {
        original.resize_to_fill(request.width, request.height, FilterType::Lanczos3)
    }

    fn name(&self) -> &'static str {
        "exact-size"
    }
}

/// Legacy fixed tiers: the request's dimensions are ignored and only the
/// quality flag selects between the MINI tier (aspect-preserving) and the
/// MICRO tier (square center crop).
pub struct FixedTierStrategy {
    pub mini: (u32, u32),
    pub micro: (u32, u32),
}

impl ThumbnailStrategy for FixedTierStrategy {
    fn render(&self, original: &DynamicImage, request: ThumbnailRequest) -> DynamicImage {
        if request.high_quality {
            original.thumbnail(self.mini.0, self.mini.1)
        } else {
            original.resize_to_fill(self.micro.0, self.micro.1, FilterType::Triangle)
        }
    }

    fn name(&self) -> &'static str {
        "fixed-tier"
    }
}

impl Gallery {
    /// On-demand thumbnail for one medium. Output is always JPEG
    /// (quality 100 by default) regardless of the source container; any
    /// failure to produce pixels collapses to `None`.
    pub async fn get_thumbnail(
        &self,
        medium_id: &str,
        kind: Option<MediumKind>,
        width: Option<u32>,
        height: Option<u32>,
        high_quality: bool,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        let request = self.thumbnail_request(width, height, high_quality);
        match kind {
            Some(kind) => self.thumbnail_for(kind, medium_id, request).await,
            None => {
                if let Some(bytes) = self
                    .thumbnail_for(MediumKind::Image, medium_id, request)
                    .await?
                {
                    return Ok(Some(bytes));
                }
                self.thumbnail_for(MediumKind::Video, medium_id, request)
                    .await
            }
        }
    }

    /// Thumbnail of the newest (or oldest) medium in an album, delegating
    /// to the single-medium resolver once a candidate is picked.
    pub async fn get_album_thumbnail(
        &self,
        album_id: &str,
        kind: Option<MediumKind>,
        newest: bool,
        width: Option<u32>,
        height: Option<u32>,
        high_quality: bool,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        let request = self.thumbnail_request(width, height, high_quality);
        match kind {
            Some(kind) => match self.album_edge_row(kind, album_id, newest).await? {
                Some(row) => self.thumbnail_for(kind, &row.id, request).await,
                None => Ok(None),
            },
            None => {
                let image = self
                    .album_edge_row(MediumKind::Image, album_id, newest)
                    .await?;
                let video = self
                    .album_edge_row(MediumKind::Video, album_id, newest)
                    .await?;

                match (image, video) {
                    (Some(image), Some(video)) => {
                        if prefer_image(newest, &image, &video) {
                            self.thumbnail_for(MediumKind::Image, &image.id, request)
                                .await
                        } else {
                            self.thumbnail_for(MediumKind::Video, &video.id, request)
                                .await
                        }
                    }
                    (Some(image), None) => {
                        self.thumbnail_for(MediumKind::Image, &image.id, request)
                            .await
                    }
                    (None, Some(video)) => {
                        self.thumbnail_for(MediumKind::Video, &video.id, request)
                            .await
                    }
                    (None, None) => Ok(None),
                }
            }
        }
    }

    fn thumbnail_request(
        &self,
        width: Option<u32>,
        height: Option<u32>,
        high_quality: bool,
    ) -> ThumbnailRequest {
        let defaults = if high_quality {
            self.config.thumbnail.high
        } else {
            self.config.thumbnail.normal
        };
        ThumbnailRequest {
            width: width.unwrap_or(defaults.width),
            height: height.unwrap_or(defaults.height),
            high_quality,
        }
    }

    async fn thumbnail_for(
        &self,
        kind: MediumKind,
        medium_id: &str,
        request: ThumbnailRequest,
    ) -> Result<Option<Vec<u8>>, GalleryError> {
        let original = match self.index.open_original(kind, medium_id).await {
            Ok(Some(image)) => image,
            Ok(None) => return Ok(None),
            Err(e) => {
                debug!("thumbnail source unavailable for {}: {}", medium_id, e);
                return Ok(None);
            }
        };

        let strategy = Arc::clone(&self.thumbnailer);
        let quality = self.config.thumbnail.jpeg_quality.unwrap_or(100);
        let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, GalleryError> {
            let rendered = strategy.render(&original, request);
            encode_jpeg(&rendered, quality)
        })
        .await
        .map_err(|e| GalleryError::Io(std::io::Error::other(e)))?;

        match encoded {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                debug!("thumbnail encode failed for {}: {}", medium_id, e);
                Ok(None)
            }
        }
    }

    /// First row of the album in the requested direction.
    async fn album_edge_row(
        &self,
        kind: MediumKind,
        album_id: &str,
        newest: bool,
    ) -> Result<Option<MediaRow>, GalleryError> {
        let selection = MediaSelection {
            bucket: (album_id != ALL_ALBUM_ID).then(|| album_id.to_string()),
            newest,
            skip: None,
            take: Some(1),
        };
        Ok(self.query_soft(kind, &selection).await?.into_iter().next())
    }
}

/// Candidate choice for an unfiltered album thumbnail: creation date
/// first, then modification date; a full tie goes to the image. The
/// image preference on ties is deliberate and kept from the original
/// behavior.
fn prefer_image(newest: bool, image: &MediaRow, video: &MediaRow) -> bool {
    match compare_rows(image, video) {
        Ordering::Greater => newest,
        Ordering::Less => !newest,
        Ordering::Equal => true,
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, GalleryError> {
    let rgb = image.to_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.write_image(
        &rgb,
        rgb.width(),
        rgb.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(added: Option<i64>, modified: Option<i64>) -> MediaRow {
        MediaRow {
            id: "t".to_string(),
            kind: MediumKind::Image,
            filename: None,
            title: None,
            mime_type: None,
            width: 0,
            height: 0,
            size_bytes: None,
            orientation_degrees: 0,
            duration_ms: 0,
            date_added: added,
            date_modified: modified,
        }
    }

    #[test]
    fn newer_candidate_wins_when_newest() {
        let image = row(Some(10), None);
        let video = row(Some(20), None);
        assert!(!prefer_image(true, &image, &video));
        assert!(prefer_image(false, &image, &video));
    }

    #[test]
    fn modification_date_breaks_creation_ties() {
        let image = row(Some(10), Some(5));
        let video = row(Some(10), Some(6));
        assert!(!prefer_image(true, &image, &video));
        assert!(prefer_image(false, &image, &video));
    }

    #[test]
    fn full_tie_prefers_the_image() {
        let image = row(Some(10), Some(5));
        let video = row(Some(10), Some(5));
        assert!(prefer_image(true, &image, &video));
        assert!(prefer_image(false, &image, &video));
    }

    #[test]
    fn exact_size_strategy_hits_the_requested_dimensions() {
        let original = DynamicImage::new_rgb8(400, 100);
        let rendered = ExactSizeStrategy.render(
            &original,
            ThumbnailRequest {
                width: 96,
                height: 96,
                high_quality: false,
            },
        );
        assert_eq!((rendered.width(), rendered.height()), (96, 96));
    }

    #[test]
    fn fixed_tier_strategy_ignores_the_requested_dimensions() {
        let strategy = FixedTierStrategy {
            mini: (512, 384),
            micro: (96, 96),
        };
        let original = DynamicImage::new_rgb8(1024, 1024);

        let micro = strategy.render(
            &original,
            ThumbnailRequest {
                width: 300,
                height: 300,
                high_quality: false,
            },
        );
        assert_eq!((micro.width(), micro.height()), (96, 96));

        let mini = strategy.render(
            &original,
            ThumbnailRequest {
                width: 300,
                height: 300,
                high_quality: true,
            },
        );
        // Aspect preserved within the MINI tier bounds.
        assert!(mini.width() <= 512 && mini.height() <= 384);
    }
}
