// End-to-end tests over a real directory tree: export cache, thumbnails
// and the two-phase delete, all through the filesystem index.
use image::{Rgb, RgbImage};
use shashin::GalleryConfig;
use shashin::gallery::{DeleteOutcome, Gallery, MediumKind};
use shashin::index::FsMediaIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const PHOTO: &str = "alpha/photo1.jpg";
const CLIP: &str = "alpha/clip.mp4";

struct Fixture {
    library: TempDir,
    _cache: TempDir,
    gallery: Gallery,
}

impl Fixture {
    fn library_path(&self, id: &str) -> PathBuf {
        self.library.path().join(id)
    }
}

fn write_photo(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let pixels = RgbImage::from_pixel(width, height, Rgb([180, 40, 40]));
    pixels.save(path).unwrap();
}

fn fixture() -> Fixture {
    let library = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    write_photo(&library.path().join(PHOTO), 320, 200);
    std::fs::write(library.path().join(CLIP), b"not really mpeg4").unwrap();

    let config = GalleryConfig {
        cache_directory: cache.path().to_path_buf(),
        ..GalleryConfig::default()
    };
    let index = Arc::new(FsMediaIndex::new(library.path().to_path_buf()));
    Fixture {
        library,
        _cache: cache,
        gallery: Gallery::new(config, index),
    }
}

#[tokio::test]
async fn original_file_is_handed_out_directly() {
    let fx = fixture();

    let path = fx
        .gallery
        .get_file(PHOTO, Some(MediumKind::Image), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, fx.library_path(PHOTO));

    // A matching target mime also skips the cache.
    let path = fx
        .gallery
        .get_file(PHOTO, None, Some("image/jpeg"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, fx.library_path(PHOTO));
}

#[tokio::test]
async fn png_transcode_lands_in_the_cache_and_is_reused() {
    let fx = fixture();

    let cached = fx
        .gallery
        .get_file(PHOTO, None, Some("image/png"))
        .await
        .unwrap()
        .unwrap();
    assert!(cached.starts_with(fx._cache.path().join("photo_gallery")));
    assert_eq!(cached.extension().unwrap(), "png");

    let decoded = image::open(&cached).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 200));

    // Scribble over the cached file; a second call must reuse it
    // untouched instead of re-encoding.
    std::fs::write(&cached, b"sentinel").unwrap();
    let again = fx
        .gallery
        .get_file(PHOTO, None, Some("image/png"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, cached);
    assert_eq!(std::fs::read(&cached).unwrap(), b"sentinel");
}

#[tokio::test]
async fn webp_transcode_is_supported() {
    let fx = fixture();

    let cached = fx
        .gallery
        .get_file(PHOTO, None, Some("image/webp"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.extension().unwrap(), "webp");
    assert!(std::fs::metadata(&cached).unwrap().len() > 0);
}

#[tokio::test]
async fn clean_cache_removes_everything_and_allows_regeneration() {
    let fx = fixture();

    let cached = fx
        .gallery
        .get_file(PHOTO, None, Some("image/png"))
        .await
        .unwrap()
        .unwrap();
    assert!(cached.is_file());

    fx.gallery.clean_cache().await.unwrap();
    assert!(!cached.exists());

    // A second clean on an empty cache is not an error.
    fx.gallery.clean_cache().await.unwrap();

    let regenerated = fx
        .gallery
        .get_file(PHOTO, None, Some("image/png"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(regenerated, cached);
    assert!(regenerated.is_file());
}

#[tokio::test]
async fn unsupported_target_mime_yields_no_file() {
    let fx = fixture();
    let result = fx
        .gallery
        .get_file(PHOTO, None, Some("image/gif"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn videos_materialize_a_cache_copy() {
    let fx = fixture();

    let path = fx.gallery.get_file(CLIP, None, None).await.unwrap().unwrap();
    assert!(path.starts_with(fx._cache.path().join("photo_gallery")));
    assert_eq!(path.extension().unwrap(), "mp4");
    assert_eq!(std::fs::read(&path).unwrap(), b"not really mpeg4");

    // A matching container mime lands on the same copy.
    let again = fx
        .gallery
        .get_file(CLIP, None, Some("video/mp4"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again, path);

    // Videos cannot be transcoded.
    let none = fx
        .gallery
        .get_file(CLIP, None, Some("image/png"))
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn missing_medium_yields_no_file() {
    let fx = fixture();
    let result = fx.gallery.get_file("alpha/gone.jpg", None, None).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn thumbnail_comes_back_as_a_jpeg_at_the_default_size() {
    let fx = fixture();

    let bytes = fx
        .gallery
        .get_thumbnail(PHOTO, None, None, None, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        image::guess_format(&bytes).unwrap(),
        image::ImageFormat::Jpeg
    );
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (96, 96));

    // High quality switches to the larger default target.
    let bytes = fx
        .gallery
        .get_thumbnail(PHOTO, None, None, None, true)
        .await
        .unwrap()
        .unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (512, 384));
}

#[tokio::test]
async fn delete_removes_the_backing_file() {
    let fx = fixture();
    let target = fx.library_path("alpha/doomed.jpg");
    write_photo(&target, 8, 8);

    let outcome = fx
        .gallery
        .delete_medium("alpha/doomed.jpg", Some(MediumKind::Image))
        .await
        .unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted));
    assert!(!target.exists());

    let outcome = fx
        .gallery
        .delete_medium("alpha/doomed.jpg", None)
        .await
        .unwrap();
    assert!(matches!(outcome, DeleteOutcome::NotFound));
}

#[tokio::test]
async fn readonly_delete_needs_a_confirmation_round_trip() {
    let fx = fixture();
    let target = fx.library_path("beta/locked.jpg");
    write_photo(&target, 8, 8);

    let mut permissions = std::fs::metadata(&target).unwrap().permissions();
    permissions.set_readonly(true);
    std::fs::set_permissions(&target, permissions).unwrap();

    let outcome = fx
        .gallery
        .delete_medium("beta/locked.jpg", None)
        .await
        .unwrap();
    let DeleteOutcome::Pending { ticket } = outcome else {
        panic!("expected a pending delete");
    };
    assert!(target.exists());

    assert!(fx.gallery.confirm_delete(ticket).await.unwrap());
    assert!(!target.exists());
}
