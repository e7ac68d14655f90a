use tracing::debug;

use crate::{
    models::{ProviderType, WatchProvider},
    tmdb::{ProviderEntry, ProviderRegions, RegionProviders},
};

/// Search URL prefixes for services whose TMDB provider id is known.
const SEARCH_URLS: &[(i64, &str)] = &[
    (8, "https://www.netflix.com/search?q="),
    (9, "https://www.primevideo.com/search/ref=atv_sr_sug_10?phrase="),
    (337, "https://www.disneyplus.com/search?q="),
    (384, "https://play.max.com/search?q="),
    (350, "https://tv.apple.com/search?term="),
    (149, "https://ver.movistarplus.es/busqueda/?texto="),
    (63, "https://www.filmin.es/buscar/"),
    (35, "https://rakuten.tv/es/search?content=movie&search="),
    (3, "https://play.google.com/store/search?q="),
    (188, "https://www.youtube.com/results?search_query="),
    (283, "https://www.crunchyroll.com/search?q="),
    (531, "https://www.paramountplus.com/search/?q="),
    (1773, "https://www.skyshowtime.com/search?term="),
    (2357, "https://www.atresplayer.com/buscador/?text="),
    (541, "https://www.rtve.es/play/buscar/?q="),
];

fn search_prefix_by_name(name: &str) -> Option<&'static str> {
    let normalized: String =
        name.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
    let id = match normalized.as_str() {
        "netflix" => 8,
        "amazonprimevideo" | "primevideo" => 9,
        "disneyplus" | "disney+" => 337,
        "hbomax" | "max" => 384,
        "appletv+" | "appletv" => 350,
        _ => return None,
    };
    SEARCH_URLS.iter().find(|(pid, _)| *pid == id).map(|(_, url)| *url)
}

/// Direct search link on the provider's own site, or `fallback` (usually the
/// region's TMDB watch page) when the service is unknown.
pub fn direct_provider_url(
    provider_id: i64,
    provider_name: &str,
    movie_title: &str,
    fallback: Option<&str>,
) -> Option<String> {
    let prefix = SEARCH_URLS
        .iter()
        .find(|(id, _)| *id == provider_id)
        .map(|(_, url)| *url)
        .or_else(|| search_prefix_by_name(provider_name));

    match prefix {
        Some(prefix) => Some(format!("{prefix}{}", urlencoding::encode(movie_title))),
        None => fallback.map(str::to_string),
    }
}

/// Preferred region first, then the fallback, else nothing.
pub fn pick_region<'a>(
    regions: &'a ProviderRegions,
    preferred: &str,
    fallback: &str,
) -> Option<(&'a str, &'a RegionProviders)> {
    [preferred, fallback].into_iter().find_map(|code| {
        regions.results.get_key_value(code).map(|(k, v)| (k.as_str(), v))
    })
}

/// Flattens one region into stream, rent and buy entries with direct links.
pub fn flatten(region: &RegionProviders, movie_title: &str) -> Vec<WatchProvider> {
    let groups: [(&[ProviderEntry], ProviderType); 3] = [
        (&region.flatrate, ProviderType::Stream),
        (&region.rent, ProviderType::Rent),
        (&region.buy, ProviderType::Buy),
    ];

    groups
        .into_iter()
        .flat_map(|(entries, provider_type)| {
            let mut entries = entries.to_vec();
            entries.sort_by_key(|e| e.display_priority);
            entries.into_iter().map(move |e| WatchProvider {
                link: direct_provider_url(
                    e.provider_id,
                    &e.provider_name,
                    movie_title,
                    region.link.as_deref(),
                ),
                provider_id: e.provider_id,
                provider_name: e.provider_name,
                logo_path: e.logo_path,
                provider_type,
            })
        })
        .collect()
}

/// Region selection plus flattening; empty when neither region is listed.
pub fn resolve(
    regions: &ProviderRegions,
    preferred: &str,
    fallback: &str,
    movie_title: &str,
) -> Vec<WatchProvider> {
    match pick_region(regions, preferred, fallback) {
        Some((code, region)) => {
            debug!(region = code, "watch providers region selected");
            flatten(region, movie_title)
        },
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str, priority: i32) -> ProviderEntry {
        ProviderEntry {
            provider_id: id,
            provider_name: name.to_string(),
            logo_path: None,
            display_priority: priority,
        }
    }

    #[test]
    fn known_ids_get_search_links() {
        assert_eq!(
            direct_provider_url(8, "Netflix", "El Padrino", None).as_deref(),
            Some("https://www.netflix.com/search?q=El%20Padrino")
        );
        assert_eq!(
            direct_provider_url(63, "Filmin", "Amélie", Some("https://tmdb")).as_deref(),
            Some("https://www.filmin.es/buscar/Am%C3%A9lie")
        );
    }

    #[test]
    fn unknown_ids_fall_back_to_name_then_link() {
        assert_eq!(
            direct_provider_url(9999, "Apple TV", "Dune", None).as_deref(),
            Some("https://tv.apple.com/search?term=Dune")
        );
        assert_eq!(
            direct_provider_url(9999, "Mubi", "Dune", Some("https://www.themoviedb.org/movie/1/watch"))
                .as_deref(),
            Some("https://www.themoviedb.org/movie/1/watch")
        );
        assert_eq!(direct_provider_url(9999, "Mubi", "Dune", None), None);
    }

    #[test]
    fn prefers_region_then_fallback() {
        let mut regions = ProviderRegions::default();
        regions.results.insert(
            "US".into(),
            RegionProviders { flatrate: vec![entry(8, "Netflix", 0)], ..Default::default() },
        );
        let (code, _) = pick_region(&regions, "ES", "US").unwrap();
        assert_eq!(code, "US");

        regions.results.insert("ES".into(), RegionProviders::default());
        let (code, _) = pick_region(&regions, "ES", "US").unwrap();
        assert_eq!(code, "ES");

        assert!(resolve(&ProviderRegions::default(), "ES", "US", "x").is_empty());
    }

    #[test]
    fn flatten_orders_by_type_and_priority() {
        let region = RegionProviders {
            link: Some("https://tmdb/watch".into()),
            flatrate: vec![entry(337, "Disney Plus", 2), entry(8, "Netflix", 1)],
            rent: vec![entry(3, "Google Play Movies", 0)],
            buy: vec![entry(7777, "Tienda", 0)],
        };
        let flat = flatten(&region, "Coco");
        let names: Vec<_> = flat.iter().map(|p| p.provider_name.as_str()).collect();
        assert_eq!(names, ["Netflix", "Disney Plus", "Google Play Movies", "Tienda"]);
        assert_eq!(flat[2].provider_type, ProviderType::Rent);
        assert_eq!(flat[3].link.as_deref(), Some("https://tmdb/watch"));
    }
}
