use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod api;
pub mod gallery;
pub mod index;
pub mod worker;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub library: LibraryConfig,
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

/// Where the filesystem-backed media index looks for media.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    pub source_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryConfig {
    pub cache_directory: PathBuf,
    pub thumbnail: ThumbnailConfig,
    /// When false the legacy fixed-tier thumbnail strategy is used instead
    /// of exact requested sizing.
    #[serde(default = "default_true")]
    pub exact_thumbnail_sizing: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    /// Default target for normal-quality requests (also the MICRO tier).
    pub normal: ImageSizeConfig,
    /// Default target for high-quality requests (also the MINI tier).
    pub high: ImageSizeConfig,
    pub jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ImageSizeConfig {
    pub width: u32,
    pub height: u32,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "Shashin".to_string(),
                log_level: "info".to_string(),
            },
            library: LibraryConfig {
                source_directory: PathBuf::from("photos"),
            },
            gallery: GalleryConfig::default(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            cache_directory: PathBuf::from("cache"),
            thumbnail: ThumbnailConfig {
                normal: ImageSizeConfig {
                    width: 96,
                    height: 96,
                },
                high: ImageSizeConfig {
                    width: 512,
                    height: 384,
                },
                jpeg_quality: Some(100),
            },
            exact_thumbnail_sizing: true,
        }
    }
}
