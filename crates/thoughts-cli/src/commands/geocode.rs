use std::path::Path;
use std::sync::Arc;

use thoughts_core::geocode::{
    bucket_key, GeocodeCache, GeocodePipeline, NominatimClient, ReverseGeocoder,
};

use crate::cli::GeocodeCommands;
use crate::commands::common::{endpoint_config, open_kv};
use crate::error::CliError;

pub async fn run_geocode(command: GeocodeCommands, db_path: &Path) -> Result<(), CliError> {
    let kv = open_kv(db_path)?;
    let client = NominatimClient::new(endpoint_config()?.nominatim_url)?;

    match command {
        GeocodeCommands::Lookup { lat, lon } => {
            let cache = GeocodeCache::load(kv);
            match lookup_place(&cache, &client, lat, lon).await? {
                Some(name) => println!("{name}"),
                None => println!("No place name found"),
            }
        }
        GeocodeCommands::ClearCache => {
            let pipeline = GeocodePipeline::new(Arc::new(client), kv);
            let count = pipeline.cache().len();
            pipeline.clear_cache();
            println!("Cleared {count} cached place name(s)");
        }
    }

    Ok(())
}

/// Cache-first lookup; only found names are cached.
pub async fn lookup_place(
    cache: &GeocodeCache,
    geocoder: &dyn ReverseGeocoder,
    lat: f64,
    lon: f64,
) -> Result<Option<String>, CliError> {
    let key = bucket_key(lat, lon);
    if let Some(name) = cache.get(&key) {
        return Ok(Some(name));
    }

    let name = geocoder.reverse(lat, lon).await?;
    if let Some(name) = &name {
        cache.insert(&key, name);
    }
    Ok(name)
}
