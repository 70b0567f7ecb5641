//! Boundary + road-network ingestion from OpenStreetMap services.
//!
//! The boundary polygon comes from Nominatim (place-name geocoding with
//! `polygon_geojson=1`); the road network comes from an Overpass query
//! clipped to a simplified and slightly dilated copy of that polygon. A
//! restricted (drivable-highway) query falls back to an unrestricted one
//! when it yields no ways.

use crate::config::Config;
use crate::ingest::error::IngestError;
use crate::layout::{DataLayout, BOUNDARY_FILE, ROADS_FILE};
use crate::snapshots::{new_snapshot, today_snapshot_id};
use geo::{coord, Area, Centroid, MapCoords, MultiPolygon, Simplify};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use haversine::{distance, Location, Units};
use log::{info, warn};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
const USER_AGENT: &str = concat!("raingrid/", env!("CARGO_PKG_VERSION"));

/// Douglas-Peucker tolerance applied before the road query, in degrees.
const SIMPLIFY_EPSILON_DEG: f64 = 0.001;
/// Outward margin so clipping does not drop edges on the boundary itself.
const BUFFER_DEG: f64 = 0.001;

/// Drivable highway classes for the restricted road query.
const DRIVE_FILTER: &str = "motorway|motorway_link|trunk|trunk_link|primary|primary_link|\
secondary|secondary_link|tertiary|tertiary_link|unclassified|residential|living_street|service";

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    display_name: String,
    geojson: Geometry,
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
}

/// An undirected road segment between two OSM nodes.
#[derive(Debug, Clone, PartialEq)]
struct RoadEdge {
    way_id: i64,
    source: i64,
    target: i64,
    highway: String,
    length_m: f64,
}

/// Minimal road graph: node coordinates plus segment edges, enough to
/// serialize a GraphML artifact downstream consumers can load.
#[derive(Debug, Default)]
struct RoadGraph {
    nodes: BTreeMap<i64, (f64, f64)>,
    edges: Vec<RoadEdge>,
}

/// OSM client with an explicit request timeout set at construction.
pub struct GeodataClient {
    client: reqwest::Client,
}

impl GeodataClient {
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(IngestError::ClientBuild)?;
        Ok(Self { client })
    }

    /// Geocodes a place name to its boundary polygon.
    async fn geocode_boundary(&self, place: &str) -> Result<MultiPolygon<f64>, IngestError> {
        let results: Vec<GeocodeResult> = self
            .client
            .get(NOMINATIM_URL)
            .query(&[
                ("q", place),
                ("format", "jsonv2"),
                ("polygon_geojson", "1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| IngestError::NetworkRequest(NOMINATIM_URL.to_string(), e))?
            .error_for_status()
            .map_err(|e| status_error(NOMINATIM_URL, e))?
            .json()
            .await
            .map_err(|e| IngestError::JsonDecode(NOMINATIM_URL.to_string(), e))?;

        let first = results
            .into_iter()
            .next()
            .ok_or_else(|| IngestError::PlaceNotFound(place.to_string()))?;
        info!("Geocoded '{}' to '{}'", place, first.display_name);
        boundary_from_geometry(place, first.geojson)
    }

    async fn fetch_roads(
        &self,
        clip: &MultiPolygon<f64>,
        restricted: bool,
    ) -> Result<RoadGraph, IngestError> {
        let query = overpass_query(clip, restricted);
        let response: OverpassResponse = self
            .client
            .post(OVERPASS_URL)
            .form(&[("data", query)])
            .send()
            .await
            .map_err(|e| IngestError::NetworkRequest(OVERPASS_URL.to_string(), e))?
            .error_for_status()
            .map_err(|e| status_error(OVERPASS_URL, e))?
            .json()
            .await
            .map_err(|e| IngestError::JsonDecode(OVERPASS_URL.to_string(), e))?;
        Ok(build_graph(response.elements))
    }
}

fn status_error(url: &str, e: reqwest::Error) -> IngestError {
    if let Some(status) = e.status() {
        IngestError::HttpStatus {
            url: url.to_string(),
            status,
            source: e,
        }
    } else {
        IngestError::NetworkRequest(url.to_string(), e)
    }
}

/// Requires Polygon/MultiPolygon; city-level place names often geocode to a
/// point, which is the classic failure this error reports.
fn boundary_from_geometry(
    place: &str,
    geometry: Geometry,
) -> Result<MultiPolygon<f64>, IngestError> {
    let geometry = geo::Geometry::<f64>::try_from(geometry)
        .map_err(|e| IngestError::GeometryConversion(e.to_string()))?;
    info!("Boundary geometry type: {}", geometry_type_name(&geometry));
    match geometry {
        geo::Geometry::Polygon(p) => Ok(MultiPolygon(vec![p])),
        geo::Geometry::MultiPolygon(mp) => Ok(mp),
        other => Err(IngestError::UnexpectedGeometry {
            place: place.to_string(),
            geometry_type: geometry_type_name(&other).to_string(),
        }),
    }
}

fn geometry_type_name(g: &geo::Geometry<f64>) -> &'static str {
    match g {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}

/// Simplified + dilated copy of the boundary used to clip the road query.
fn clip_polygon(boundary: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    dilate(&boundary.simplify(SIMPLIFY_EPSILON_DEG), BUFFER_DEG)
}

/// Pushes every vertex away from its polygon's centroid by `distance`
/// degrees. Not a true buffer, but an adequate outward margin for clipping.
fn dilate(mp: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    MultiPolygon(
        mp.0.iter()
            .map(|poly| {
                let Some(center) = poly.centroid() else {
                    return poly.clone();
                };
                poly.map_coords(|c| {
                    let dx = c.x - center.x();
                    let dy = c.y - center.y();
                    let len = (dx * dx + dy * dy).sqrt();
                    if len == 0.0 {
                        c
                    } else {
                        coord! {
                            x: c.x + dx / len * distance,
                            y: c.y + dy / len * distance,
                        }
                    }
                })
            })
            .collect(),
    )
}

/// Overpass `poly:` filter from the largest member polygon's exterior ring,
/// as "lat lon lat lon ..." pairs.
fn poly_filter(mp: &MultiPolygon<f64>) -> String {
    let largest = mp
        .0
        .iter()
        .max_by(|a, b| {
            a.unsigned_area()
                .partial_cmp(&b.unsigned_area())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    let Some(largest) = largest else {
        return String::new();
    };

    let coords: Vec<_> = largest.exterior().coords().collect();
    // The exterior ring repeats its first coordinate; Overpass wants it open.
    let open = if coords.len() > 1 && coords.first() == coords.last() {
        &coords[..coords.len() - 1]
    } else {
        &coords[..]
    };
    let mut filter = String::new();
    for c in open {
        if !filter.is_empty() {
            filter.push(' ');
        }
        let _ = write!(filter, "{} {}", c.y, c.x);
    }
    filter
}

fn overpass_query(clip: &MultiPolygon<f64>, restricted: bool) -> String {
    let poly = poly_filter(clip);
    let way_selector = if restricted {
        format!(r#"way["highway"~"^({DRIVE_FILTER})$"]"#)
    } else {
        r#"way["highway"]"#.to_string()
    };
    format!(
        "[out:json][timeout:180];({way_selector}(poly:\"{poly}\"););(._;>;);out body;"
    )
}

/// Assembles node coordinates and per-segment edges from Overpass elements.
fn build_graph(elements: Vec<OverpassElement>) -> RoadGraph {
    let mut graph = RoadGraph::default();
    let mut ways = Vec::new();
    for element in elements {
        match element {
            OverpassElement::Node { id, lat, lon } => {
                graph.nodes.insert(id, (lat, lon));
            }
            OverpassElement::Way { id, nodes, tags } => ways.push((id, nodes, tags)),
        }
    }

    for (way_id, nodes, tags) in ways {
        let highway = tags.get("highway").cloned().unwrap_or_default();
        for pair in nodes.windows(2) {
            let (Some(&(lat_a, lon_a)), Some(&(lat_b, lon_b))) =
                (graph.nodes.get(&pair[0]), graph.nodes.get(&pair[1]))
            else {
                continue;
            };
            let length_m = distance(
                Location {
                    latitude: lat_a,
                    longitude: lon_a,
                },
                Location {
                    latitude: lat_b,
                    longitude: lon_b,
                },
                Units::Kilometers,
            ) * 1000.0;
            graph.edges.push(RoadEdge {
                way_id,
                source: pair[0],
                target: pair[1],
                highway: highway.clone(),
                length_m,
            });
        }
    }
    graph
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl RoadGraph {
    /// Serializes the graph as GraphML with node `x`/`y` coordinates and
    /// edge `osmid`/`highway`/`length` attributes.
    fn to_graphml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
        out.push_str("  <key id=\"d0\" for=\"node\" attr.name=\"y\" attr.type=\"double\"/>\n");
        out.push_str("  <key id=\"d1\" for=\"node\" attr.name=\"x\" attr.type=\"double\"/>\n");
        out.push_str("  <key id=\"d2\" for=\"edge\" attr.name=\"osmid\" attr.type=\"long\"/>\n");
        out.push_str("  <key id=\"d3\" for=\"edge\" attr.name=\"highway\" attr.type=\"string\"/>\n");
        out.push_str("  <key id=\"d4\" for=\"edge\" attr.name=\"length\" attr.type=\"double\"/>\n");
        out.push_str("  <graph edgedefault=\"undirected\">\n");
        for (id, (lat, lon)) in &self.nodes {
            let _ = writeln!(
                out,
                "    <node id=\"{id}\"><data key=\"d0\">{lat}</data><data key=\"d1\">{lon}</data></node>"
            );
        }
        for edge in &self.edges {
            let _ = writeln!(
                out,
                "    <edge source=\"{}\" target=\"{}\"><data key=\"d2\">{}</data><data key=\"d3\">{}</data><data key=\"d4\">{:.3}</data></edge>",
                edge.source,
                edge.target,
                edge.way_id,
                xml_escape(&edge.highway),
                edge.length_m
            );
        }
        out.push_str("  </graph>\n</graphml>\n");
        out
    }
}

fn boundary_feature_collection(place: &str, boundary: &MultiPolygon<f64>) -> GeoJson {
    let mut properties = serde_json::Map::new();
    properties.insert("place".into(), place.into());
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: vec![Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(boundary))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }],
        foreign_members: None,
    })
}

/// Fetches boundary + roads and writes both into a new dated snapshot.
pub async fn run_ingest_geodata(root: &Path, config: &Config) -> Result<(), IngestError> {
    let client = GeodataClient::new(Duration::from_secs(config.http.geodata_timeout_secs))?;

    info!("Fetching boundary polygon for: {}", config.place);
    let boundary = client.geocode_boundary(&config.place).await?;

    let layout = DataLayout::new(root);
    let snapshot_dir = new_snapshot(&layout.geodata_base(), &today_snapshot_id())?;

    let boundary_path = snapshot_dir.join(BOUNDARY_FILE);
    std::fs::write(
        &boundary_path,
        boundary_feature_collection(&config.place, &boundary).to_string(),
    )
    .map_err(|e| IngestError::FileWrite(boundary_path.clone(), e))?;
    info!("Boundary saved: {}", boundary_path.display());

    let clip = clip_polygon(&boundary);
    info!("Downloading roads from Overpass (can take a few minutes)...");
    let mut graph = client.fetch_roads(&clip, true).await?;
    if graph.edges.is_empty() {
        warn!("Drive network empty for this polygon; falling back to all highway types");
        graph = client.fetch_roads(&clip, false).await?;
    }
    if graph.edges.is_empty() {
        return Err(IngestError::EmptyRoadNetwork);
    }

    let roads_path = snapshot_dir.join(ROADS_FILE);
    std::fs::write(&roads_path, graph.to_graphml())
        .map_err(|e| IngestError::FileWrite(roads_path.clone(), e))?;
    info!("Roads saved: {}", roads_path.display());
    info!("Nodes: {}, Edges: {}", graph.nodes.len(), graph.edges.len());
    Ok(())
}
