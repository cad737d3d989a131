//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire demo units into the global pipeline and print what they configured.
//! - Optionally read unit declarations from a manifest file (first argument).
//!
//! # Environment
//! - `LAZYMOD_LOG_DIR`: absolute directory for rolling logs; logging is off when unset.
//! - `LAZYMOD_LOG_LEVEL`: log level, defaults to the build-mode default.

mod units;

use lazymod_core::{
    default_log_level, global, init_logging, Context, ManifestDiscovery, StaticDiscovery,
    UnitCatalog, UnitDiscovery,
};
use std::process::ExitCode;
use units::{FlickrPhoto, FlickrUnit, ThumbnailCacheUnit};

fn catalog() -> Result<UnitCatalog, String> {
    let mut catalog = UnitCatalog::new();
    catalog
        .register_default::<FlickrUnit>(FlickrUnit::ID)
        .map_err(|err| err.to_string())?;
    catalog
        .register_default::<ThumbnailCacheUnit>(ThumbnailCacheUnit::ID)
        .map_err(|err| err.to_string())?;
    Ok(catalog)
}

fn run() -> Result<(), String> {
    if let Ok(log_dir) = std::env::var("LAZYMOD_LOG_DIR") {
        let level =
            std::env::var("LAZYMOD_LOG_LEVEL").unwrap_or_else(|_| default_log_level().to_string());
        init_logging(&level, &log_dir)?;
    }

    let catalog = catalog()?;
    let discovery: Box<dyn UnitDiscovery> = match std::env::args().nth(1) {
        Some(manifest_path) => Box::new(ManifestDiscovery::from_path(manifest_path, catalog)),
        None => Box::new(StaticDiscovery::all_of(catalog)),
    };
    global::install(discovery).map_err(|err| err.to_string())?;

    let context = Context::new("lazymod.cli").with_attribute(
        units::CACHE_DIR_ATTRIBUTE,
        std::env::temp_dir().join("lazymod-cache").display().to_string(),
    );
    let pipeline = global::get(&context).map_err(|err| err.to_string())?;

    println!("lazymod_core version={}", lazymod_core::core_version());
    println!("pipeline instance_id={}", pipeline.instance_id());
    println!("pipeline state={}", global::state());
    println!("config {}", pipeline.config().to_json());
    println!(
        "config decode_format={} disk_cache_bytes={} source_threads={}",
        pipeline.config().decode_format().as_str(),
        pipeline.config().disk_cache_bytes(),
        pipeline.config().source_threads()
    );
    for key in pipeline.component_keys() {
        println!("component {key}");
    }
    if let Some(loader) = pipeline.build_loader::<FlickrPhoto, String>(&context) {
        let photo = FlickrPhoto {
            farm: 1,
            server: "2".to_string(),
            id: "3".to_string(),
            secret: "abc".to_string(),
        };
        println!("flickr url={}", loader.fetch(&photo).unwrap_or_default());
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("lazymod: {err}");
            ExitCode::FAILURE
        }
    }
}
