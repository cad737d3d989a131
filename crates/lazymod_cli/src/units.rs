//! Demo extension units bundled with the CLI.

use lazymod_core::{
    ConfigBuilder, Context, DecodeFormat, ExtensionUnit, FnLoaderFactory, LoaderFactory,
    Pipeline, UnitError, UnitResult,
};
use std::sync::Arc;

/// Context attribute naming the thumbnail cache directory.
pub const CACHE_DIR_ATTRIBUTE: &str = "cache_dir";

const THUMBNAIL_DISK_CACHE_BYTES: u64 = 64 * 1024 * 1024;

/// Photo reference in the Flickr static URL scheme.
pub struct FlickrPhoto {
    pub farm: u32,
    pub server: String,
    pub id: String,
    pub secret: String,
}

fn flickr_url(photo: &FlickrPhoto) -> Option<String> {
    Some(format!(
        "https://farm{}.staticflickr.com/{}/{}_{}.jpg",
        photo.farm, photo.server, photo.id, photo.secret
    ))
}

/// Forces full-color decoding and resolves Flickr photos to URLs.
#[derive(Default)]
pub struct FlickrUnit;

impl FlickrUnit {
    pub const ID: &'static str = "demo.flickr.FlickrUnit";
}

impl ExtensionUnit for FlickrUnit {
    fn apply_options(&self, _context: &Context, builder: &mut ConfigBuilder) -> UnitResult {
        builder.set_decode_format(DecodeFormat::AlwaysArgb8888)?;
        Ok(())
    }

    fn register_components(&self, _context: &Context, pipeline: &mut Pipeline) -> UnitResult {
        let factory: Arc<dyn LoaderFactory<FlickrPhoto, String>> =
            Arc::new(FnLoaderFactory::<FlickrPhoto, String>::new(flickr_url));
        pipeline.register(factory)?;
        Ok(())
    }
}

/// Sizes the disk cache when the host provides a cache directory.
#[derive(Default)]
pub struct ThumbnailCacheUnit;

impl ThumbnailCacheUnit {
    pub const ID: &'static str = "demo.cache.ThumbnailCacheUnit";
}

impl ExtensionUnit for ThumbnailCacheUnit {
    fn apply_options(&self, context: &Context, builder: &mut ConfigBuilder) -> UnitResult {
        if context.attribute(CACHE_DIR_ATTRIBUTE).is_none() {
            return Err(
                UnitError::new("context has no cache directory").with_code("missing_cache_dir")
            );
        }
        builder.set_disk_cache_bytes(THUMBNAIL_DISK_CACHE_BYTES)?;
        builder.set_disk_cache_threads(2)?;
        Ok(())
    }

    fn register_components(&self, _context: &Context, _pipeline: &mut Pipeline) -> UnitResult {
        Ok(())
    }
}
