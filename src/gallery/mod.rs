// Gallery facade - canonical records, album enumeration, paginated
// listings, thumbnails, file export and deletion over a media index.
mod albums;
mod error;
mod export;
mod media;
mod normalize;
mod thumbs;
mod types;

pub use error::GalleryError;
pub use export::ExportFormat;
pub use thumbs::{ExactSizeStrategy, FixedTierStrategy, ThumbnailRequest, ThumbnailStrategy};
pub use types::{
    ALL_ALBUM_ID, ALL_ALBUM_NAME, AlbumRecord, MediaPage, MediumKind, MediumRecord,
};

use crate::GalleryConfig;
use crate::index::{DeleteDisposition, DeleteTicket, IndexError, MediaIndex};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub type SharedGallery = Arc<Gallery>;

pub struct Gallery {
    config: GalleryConfig,
    index: Arc<dyn MediaIndex>,
    thumbnailer: Arc<dyn ThumbnailStrategy>,
}

/// Answer to a delete request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum DeleteOutcome {
    /// The medium is gone.
    Deleted,
    /// No such medium.
    NotFound,
    /// The index wants an out-of-band confirmation; resubmit the ticket
    /// via `confirm_delete` to finish.
    Pending { ticket: DeleteTicket },
}

impl Gallery {
    /// Builds the facade over an index. The thumbnail strategy is picked
    /// here, once, from configuration.
    pub fn new(config: GalleryConfig, index: Arc<dyn MediaIndex>) -> Gallery {
        let thumbnailer: Arc<dyn ThumbnailStrategy> = if config.exact_thumbnail_sizing {
            Arc::new(ExactSizeStrategy)
        } else {
            Arc::new(FixedTierStrategy {
                mini: (config.thumbnail.high.width, config.thumbnail.high.height),
                micro: (config.thumbnail.normal.width, config.thumbnail.normal.height),
            })
        };
        debug!("thumbnail strategy: {}", thumbnailer.name());

        Gallery {
            config,
            index,
            thumbnailer,
        }
    }

    /// Deletes one medium. Without a kind filter the image index is
    /// tried first, then the video index; the first index that knows
    /// the id decides the outcome.
    pub async fn delete_medium(
        &self,
        medium_id: &str,
        kind: Option<MediumKind>,
    ) -> Result<DeleteOutcome, GalleryError> {
        let kinds: &[MediumKind] = match kind {
            Some(MediumKind::Image) => &[MediumKind::Image],
            Some(MediumKind::Video) => &[MediumKind::Video],
            None => &[MediumKind::Image, MediumKind::Video],
        };

        for &attempted in kinds {
            match self.index.delete(attempted, medium_id).await {
                Ok(DeleteDisposition::Deleted) => {
                    info!("deleted {} {}", attempted.as_str(), medium_id);
                    return Ok(DeleteOutcome::Deleted);
                }
                Ok(DeleteDisposition::NeedsConfirmation(ticket)) => {
                    debug!("delete of {} needs confirmation", medium_id);
                    return Ok(DeleteOutcome::Pending { ticket });
                }
                Ok(DeleteDisposition::NotFound) => continue,
                Err(IndexError::Unavailable(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(DeleteOutcome::NotFound)
    }

    /// Second half of a gated delete.
    pub async fn confirm_delete(&self, ticket: DeleteTicket) -> Result<bool, GalleryError> {
        let done = self.index.confirm_delete(ticket).await?;
        if done {
            info!("confirmed pending delete");
        }
        Ok(done)
    }
}
