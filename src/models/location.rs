use serde::Serialize;

use crate::geo::GeoPoint;

/// A named area offered by the manual location picker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PresetArea {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl PresetArea {
    pub fn point(&self) -> GeoPoint {
        GeoPoint { lat: self.lat, lon: self.lon }
    }
}

/// Areas for callers without geolocation. First entry is the default.
pub const PRESET_AREAS: &[PresetArea] = &[
    PresetArea { name: "台北車站", lat: 25.0478, lon: 121.5170 },
    PresetArea { name: "信義區", lat: 25.0330, lon: 121.5654 },
    PresetArea { name: "大安區", lat: 25.0268, lon: 121.5434 },
    PresetArea { name: "中山區", lat: 25.0640, lon: 121.5330 },
    PresetArea { name: "內湖區", lat: 25.0836, lon: 121.5920 },
    PresetArea { name: "士林區", lat: 25.0928, lon: 121.5246 },
    PresetArea { name: "板橋區", lat: 25.0116, lon: 121.4637 },
    PresetArea { name: "新店區", lat: 24.9676, lon: 121.5419 },
    PresetArea { name: "桃園區", lat: 24.9937, lon: 121.3010 },
    PresetArea { name: "台中西屯區", lat: 24.1815, lon: 120.6468 },
    PresetArea { name: "高雄前鎮區", lat: 22.5955, lon: 120.3075 },
];

/// Look up a preset area by exact name.
pub fn find_area(name: &str) -> Option<&'static PresetArea> {
    let name = name.trim();
    PRESET_AREAS.iter().find(|a| a.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_points_are_valid_coordinates() {
        for area in PRESET_AREAS {
            assert!(GeoPoint::new(area.lat, area.lon).is_ok(), "{}", area.name);
        }
    }

    #[test]
    fn find_area_by_name() {
        let area = find_area(" 信義區 ").unwrap();
        assert_eq!(area.lat, 25.0330);
        assert!(find_area("火星").is_none());
    }

    #[test]
    fn default_area_is_first() {
        assert_eq!(PRESET_AREAS[0].name, "台北車站");
    }
}
