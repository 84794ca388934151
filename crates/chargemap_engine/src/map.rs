//! Standalone Leaflet map of a search result

use std::io::Write;
use std::path::{Path, PathBuf};

use chargemap_core::{AccessType, GeoPoint, SearchHit};
use serde::Serialize;
use thiserror::Error;

const LEAFLET_VERSION: &str = "1.9.4";
const ORIGIN_COLOR: &str = "blue";

#[derive(Error, Debug)]
pub enum MapError {
    #[error("nothing to show: search for stations first")]
    NothingToShow,
    #[error("failed to write map document: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to open {} in a viewer: {reason}", path.display())]
    Viewer { path: PathBuf, reason: String },
}

pub fn marker_color(access: AccessType) -> &'static str {
    match access {
        AccessType::Public => "green",
        AccessType::Private => "orange",
        AccessType::Provider => "purple",
    }
}

#[derive(Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    color: &'static str,
    popup: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn popup(hit: &SearchHit) -> String {
    let station = &hit.station;
    format!(
        "<b>{}</b><br>{}<br>Distance: {} km<br>Available: {}/{} slots<br>Power: {} kW<br>Price: ${}/kWh",
        escape_html(&station.name),
        escape_html(&station.address),
        hit.rounded_distance(),
        station.available_slots,
        station.total_slots,
        station.max_power,
        station.price_per_kwh,
    )
}

/// Render the result set as a self-contained HTML page.
///
/// Fails with [`MapError::NothingToShow`] when `hits` is empty.
pub fn render_map(origin: GeoPoint, hits: &[SearchHit], zoom: u8) -> Result<String, MapError> {
    if hits.is_empty() {
        return Err(MapError::NothingToShow);
    }

    let mut markers = Vec::with_capacity(hits.len() + 1);
    markers.push(Marker {
        lat: origin.latitude,
        lon: origin.longitude,
        color: ORIGIN_COLOR,
        popup: "Your Location".to_string(),
    });
    markers.extend(hits.iter().map(|hit| Marker {
        lat: hit.station.latitude,
        lon: hit.station.longitude,
        color: marker_color(hit.station.access_type),
        popup: popup(hit),
    }));

    // "</" would close the script element early
    let data = serde_json::to_string(&markers)
        .map_err(std::io::Error::other)?
        .replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Charging stations near {lat:.4}, {lon:.4}</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const map = L.map('map').setView([{lat}, {lon}], {zoom});
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  maxZoom: 19,
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
const markers = {data};
for (const m of markers) {{
  L.circleMarker([m.lat, m.lon], {{ radius: 9, color: m.color, fillColor: m.color, fillOpacity: 0.8 }})
    .bindPopup(m.popup, {{ maxWidth: 300 }})
    .addTo(map);
}}
</script>
</body>
</html>
"#,
        lat = origin.latitude,
        lon = origin.longitude,
        leaflet = LEAFLET_VERSION,
        zoom = zoom,
        data = data,
    ))
}

/// Write the document to a new temporary `.html` file that outlives the process.
pub fn write_temp_document(html: &str) -> Result<PathBuf, MapError> {
    let mut file = tempfile::Builder::new()
        .prefix("chargemap-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(html.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| MapError::Io(e.error))?;
    Ok(path)
}

/// Hand the document to the platform viewer without waiting for it to exit.
pub fn open_in_viewer(path: PathBuf) -> Result<PathBuf, MapError> {
    launch_with(path, |path| open::that_detached(path))
}

fn launch_with(
    path: PathBuf,
    launch: impl FnOnce(&Path) -> std::io::Result<()>,
) -> Result<PathBuf, MapError> {
    match launch(&path) {
        Ok(()) => Ok(path),
        Err(e) => Err(MapError::Viewer {
            path,
            reason: e.to_string(),
        }),
    }
}
