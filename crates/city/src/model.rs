//! City data model: locations, roads, and the per-kind/per-class parameter
//! tables every derived system reads. Tables live here so the procedural
//! crates stay free of domain knowledge.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Everything a location can be. The kind decides footprint, decoration,
/// coloring, and how strongly it flattens the terrain around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Building,
    Park,
    Museum,
    Restaurant,
    Shop,
    School,
    Hospital,
    Library,
    Cafe,
    Hotel,
}

impl LocationKind {
    /// Footprint as full extents (width, height, depth).
    pub fn footprint(&self) -> Vec3 {
        match self {
            LocationKind::Building => Vec3::new(2.0, 4.0, 2.0),
            LocationKind::Hospital => Vec3::new(3.0, 3.0, 3.0),
            LocationKind::School => Vec3::new(3.0, 2.0, 3.0),
            LocationKind::Hotel => Vec3::new(2.0, 5.0, 2.0),
            LocationKind::Shop | LocationKind::Restaurant | LocationKind::Cafe => {
                Vec3::new(2.0, 1.5, 2.0)
            }
            LocationKind::Library | LocationKind::Museum => Vec3::new(2.5, 2.0, 2.5),
            LocationKind::Park => Vec3::new(2.0, 2.0, 2.0),
        }
    }

    /// Radius of the terrain-flattening falloff around this location.
    pub fn flatten_radius(&self) -> f32 {
        match self {
            LocationKind::School | LocationKind::Hospital => 10.0,
            LocationKind::Park => 6.0,
            _ => 8.0,
        }
    }

    /// Obstacle radius used by scatter placement (vegetation, furniture).
    pub fn obstacle_radius(&self) -> f32 {
        match self {
            LocationKind::School | LocationKind::Hospital => 4.0,
            LocationKind::Park => 3.0,
            _ => 2.0,
        }
    }

    /// Parks have no walls, roof, or windows.
    pub fn has_structure(&self) -> bool {
        !matches!(self, LocationKind::Park)
    }

    /// Default wall tint when the location carries no explicit color.
    pub fn default_color(&self) -> [f32; 4] {
        match self {
            LocationKind::Park => hex_color("#4ade80").unwrap_or([0.3, 0.9, 0.5, 1.0]),
            LocationKind::Hospital => hex_color("#f8fafc").unwrap_or([0.9; 4]),
            LocationKind::Museum | LocationKind::Library => {
                hex_color("#d6c9a8").unwrap_or([0.8, 0.76, 0.64, 1.0])
            }
            _ => hex_color("#60a5fa").unwrap_or([0.4, 0.65, 0.98, 1.0]),
        }
    }
}

/// A named place in the city. Immutable snapshot data owned by the caller;
/// the scene only derives geometry from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: LocationKind,
    /// World position; y is normally 0 (ground anchored).
    pub position: [f32; 3],
    /// Optional hex tint like `"#60a5fa"`.
    #[serde(default)]
    pub color: Option<String>,
    /// Sector tag used by external filtering only.
    #[serde(default)]
    pub zone: Option<String>,
}

impl Location {
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn plan_position(&self) -> Vec2 {
        Vec2::new(self.position[0], self.position[2])
    }

    /// Wall tint: explicit color when present and parsable, else the kind default.
    pub fn wall_color(&self) -> [f32; 4] {
        self.color
            .as_deref()
            .and_then(hex_color)
            .unwrap_or_else(|| self.kind.default_color())
    }
}

/// Road importance class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadClass {
    Main,
    Secondary,
    Residential,
}

impl RoadClass {
    /// Surface stroke width.
    pub fn draw_width(&self) -> f32 {
        match self {
            RoadClass::Main => 2.5,
            RoadClass::Secondary => 2.0,
            RoadClass::Residential => 1.5,
        }
    }

    /// Half-width of the terrain-flattening strip.
    pub fn flatten_half_width(&self) -> f32 {
        match self {
            RoadClass::Main => 8.0,
            RoadClass::Secondary => 6.0,
            RoadClass::Residential => 5.0,
        }
    }

    /// Half-width used as a scatter-placement obstacle.
    pub fn obstacle_half_width(&self) -> f32 {
        match self {
            RoadClass::Main => 3.0,
            RoadClass::Secondary => 2.0,
            RoadClass::Residential => 1.5,
        }
    }

    /// Dry-weather surface color.
    pub fn surface_color(&self) -> [f32; 4] {
        match self {
            RoadClass::Main => hex_color("#0f172a").unwrap_or([0.06, 0.09, 0.16, 1.0]),
            RoadClass::Secondary => hex_color("#334155").unwrap_or([0.2, 0.25, 0.33, 1.0]),
            RoadClass::Residential => hex_color("#64748b").unwrap_or([0.39, 0.45, 0.55, 1.0]),
        }
    }
}

/// A road between two locations. Endpoints reference `Location::id`; roads
/// whose endpoints are missing from the active set are skipped everywhere,
/// never treated as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Road {
    pub id: String,
    pub from: String,
    pub to: String,
    pub class: RoadClass,
    /// Advisory only; real length comes from the endpoint positions.
    #[serde(default)]
    pub distance: f32,
}

/// Weather state, shared by every weather-sensitive system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Clear,
    Rain,
    Snow,
}

/// The full city snapshot handed to the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityData {
    #[serde(default)]
    pub name: String,
    pub locations: Vec<Location>,
    pub roads: Vec<Road>,
}

impl CityData {
    /// Load a city from a RON file. Missing or invalid files fall back to
    /// the built-in demo city.
    pub fn load_or_demo(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(city) => return city,
                Err(e) => log::warn!("Invalid city file {:?}: {}, using demo city", path, e),
            }
        }
        Self::demo()
    }

    /// Index from location id to slot, for road endpoint resolution.
    pub fn location_index(&self) -> HashMap<&str, usize> {
        self.locations
            .iter()
            .enumerate()
            .map(|(i, l)| (l.id.as_str(), i))
            .collect()
    }

    /// Resolve a road's endpoints against the active location set. `None`
    /// means the road is dropped (sector filtering hides locations).
    pub fn resolve_road(&self, road: &Road) -> Option<(&Location, &Location)> {
        let index = self.location_index();
        let from = &self.locations[*index.get(road.from.as_str())?];
        let to = &self.locations[*index.get(road.to.as_str())?];
        Some((from, to))
    }

    /// Roads with both endpoints present, paired with those endpoints.
    pub fn active_roads(&self) -> Vec<(&Road, &Location, &Location)> {
        let index = self.location_index();
        self.roads
            .iter()
            .filter_map(|road| {
                let from = &self.locations[*index.get(road.from.as_str())?];
                let to = &self.locations[*index.get(road.to.as_str())?];
                Some((road, from, to))
            })
            .collect()
    }

    /// World-space bounding box of the active location set (for the minimap
    /// snapshot and the visibility octree). Empty set gives a small box
    /// around the origin.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for l in &self.locations {
            let p = l.position();
            if !p.is_finite() {
                continue;
            }
            min = min.min(p);
            max = max.max(p + Vec3::new(0.0, l.kind.footprint().y, 0.0));
        }
        if min.x > max.x {
            (Vec3::splat(-1.0), Vec3::splat(1.0))
        } else {
            (min, max)
        }
    }

    /// Read-only plan-view snapshot for minimap/analytics collaborators.
    pub fn map_snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            bounds: self.bounds(),
            entries: self
                .locations
                .iter()
                .map(|l| MapEntry {
                    id: l.id.clone(),
                    plan_position: l.plan_position(),
                    kind: l.kind,
                    color: l.wall_color(),
                })
                .collect(),
        }
    }

    /// Built-in demo project: a small mixed district with a park core,
    /// two main arterials, and residential spurs.
    pub fn demo() -> Self {
        fn loc(id: &str, name: &str, kind: LocationKind, x: f32, z: f32) -> Location {
            Location {
                id: id.to_string(),
                name: name.to_string(),
                description: String::new(),
                kind,
                position: [x, 0.0, z],
                color: None,
                zone: None,
            }
        }
        fn road(id: &str, from: &str, to: &str, class: RoadClass) -> Road {
            Road {
                id: id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
                class,
                distance: 0.0,
            }
        }

        Self {
            name: "Demo District".to_string(),
            locations: vec![
                loc("plaza", "Central Plaza", LocationKind::Park, 0.0, 0.0),
                loc("tower-a", "North Tower", LocationKind::Building, -18.0, -22.0),
                loc("tower-b", "South Tower", LocationKind::Building, 14.0, 26.0),
                loc("hotel", "Grand Hotel", LocationKind::Hotel, 26.0, -12.0),
                loc("hospital", "City Hospital", LocationKind::Hospital, -30.0, 10.0),
                loc("school", "Riverside School", LocationKind::School, -8.0, 32.0),
                loc("museum", "History Museum", LocationKind::Museum, 22.0, 8.0),
                loc("library", "Public Library", LocationKind::Library, -24.0, -6.0),
                loc("market", "Old Market", LocationKind::Shop, 8.0, -16.0),
                loc("bistro", "Corner Bistro", LocationKind::Restaurant, -4.0, -28.0),
                loc("cafe", "Morning Cafe", LocationKind::Cafe, 12.0, 14.0),
                loc("east-park", "East Green", LocationKind::Park, 36.0, 20.0),
            ],
            roads: vec![
                road("r1", "tower-a", "plaza", RoadClass::Main),
                road("r2", "plaza", "tower-b", RoadClass::Main),
                road("r3", "plaza", "hospital", RoadClass::Secondary),
                road("r4", "plaza", "museum", RoadClass::Secondary),
                road("r5", "museum", "hotel", RoadClass::Secondary),
                road("r6", "tower-a", "library", RoadClass::Residential),
                road("r7", "tower-a", "bistro", RoadClass::Residential),
                road("r8", "tower-b", "school", RoadClass::Residential),
                road("r9", "museum", "east-park", RoadClass::Residential),
                road("r10", "market", "plaza", RoadClass::Residential),
                road("r11", "cafe", "museum", RoadClass::Residential),
            ],
        }
    }
}

/// Minimap/analytics snapshot: bounds plus plan positions. Never mutated.
#[derive(Debug, Clone)]
pub struct MapSnapshot {
    pub bounds: (Vec3, Vec3),
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub id: String,
    pub plan_position: Vec2,
    pub kind: LocationKind,
    pub color: [f32; 4],
}

/// Parse `#rgb` or `#rrggbb` into linear-ish rgba.
pub fn hex_color(s: &str) -> Option<[f32; 4]> {
    let s = s.strip_prefix('#')?;
    let (r, g, b) = match s.len() {
        3 => {
            let v = u32::from_str_radix(s, 16).ok()?;
            (
                (((v >> 8) & 0xf) * 17) as f32,
                (((v >> 4) & 0xf) * 17) as f32,
                ((v & 0xf) * 17) as f32,
            )
        }
        6 => {
            let v = u32::from_str_radix(s, 16).ok()?;
            (
                ((v >> 16) & 0xff) as f32,
                ((v >> 8) & 0xff) as f32,
                (v & 0xff) as f32,
            )
        }
        _ => return None,
    };
    Some([r / 255.0, g / 255.0, b / 255.0, 1.0])
}

/// Blend a color toward another by `t`.
pub fn lerp_color(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_color_parses_both_forms() {
        let c = hex_color("#60a5fa").unwrap();
        assert!((c[0] - 0x60 as f32 / 255.0).abs() < 1e-5);
        assert!((c[2] - 0xfa as f32 / 255.0).abs() < 1e-5);
        let short = hex_color("#fff").unwrap();
        assert_eq!(short, [1.0, 1.0, 1.0, 1.0]);
        assert!(hex_color("60a5fa").is_none());
        assert!(hex_color("#xyz").is_none());
    }

    #[test]
    fn roads_with_missing_endpoints_are_dropped() {
        let mut city = CityData::demo();
        city.roads.push(Road {
            id: "ghost".to_string(),
            from: "plaza".to_string(),
            to: "nowhere".to_string(),
            class: RoadClass::Main,
            distance: 1.0,
        });
        let ghost = city.roads.iter().find(|r| r.id == "ghost").unwrap();
        assert!(city.resolve_road(ghost).is_none());
        assert!(city
            .active_roads()
            .iter()
            .all(|(road, _, _)| road.id != "ghost"));
    }

    #[test]
    fn bounds_cover_positions_and_heights() {
        let city = CityData::demo();
        let (min, max) = city.bounds();
        for l in &city.locations {
            let p = l.position();
            assert!(p.x >= min.x && p.x <= max.x);
            assert!(p.z >= min.z && p.z <= max.z);
        }
        // Hotel is 5 tall, so the box must reach at least that high.
        assert!(max.y >= 5.0);
    }

    #[test]
    fn empty_city_has_fallback_bounds() {
        let city = CityData {
            name: String::new(),
            locations: Vec::new(),
            roads: Vec::new(),
        };
        let (min, max) = city.bounds();
        assert!(min.x < max.x);
        assert!(city.active_roads().is_empty());
        assert!(city.map_snapshot().entries.is_empty());
    }

    #[test]
    fn footprints_match_kind_table() {
        assert_eq!(LocationKind::Building.footprint(), Vec3::new(2.0, 4.0, 2.0));
        assert_eq!(LocationKind::Hotel.footprint(), Vec3::new(2.0, 5.0, 2.0));
        assert_eq!(LocationKind::Hospital.flatten_radius(), 10.0);
        assert_eq!(LocationKind::Park.flatten_radius(), 6.0);
        assert!(!LocationKind::Park.has_structure());
    }

    #[test]
    fn city_data_roundtrips_through_ron() {
        let city = CityData::demo();
        let text = ron::to_string(&city).unwrap();
        let back: CityData = ron::from_str(&text).unwrap();
        assert_eq!(back.locations.len(), city.locations.len());
        assert_eq!(back.roads.len(), city.roads.len());
    }
}
