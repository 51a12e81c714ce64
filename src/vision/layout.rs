// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Layout types produced by segmentation and consumed by recognition and
//! rendering

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form tags attached to lines and regions
pub type Tags = BTreeMap<String, String>;

/// Tag key holding the line/region type
pub const TYPE_TAG: &str = "type";

/// Fallback type for lines without a `type` tag
pub const UNDEFINED_LINE_TYPE: &str = "undefined";

/// Integer pixel coordinate
///
/// Serialized as a `[x, y]` pair. Fractional input coordinates are truncated
/// toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self {
            x: x.trunc() as i32,
            y: y.trunc() as i32,
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(point: Point) -> Self {
        (point.x, point.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A detected text line
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LineDescriptor {
    /// Closed polygon around the line
    pub boundary: Vec<Point>,
    /// Open polyline along the writing direction
    #[serde(default)]
    pub baseline: Option<Vec<Point>>,
    #[serde(default)]
    pub tags: Tags,
}

impl LineDescriptor {
    /// `tags["type"]`, or `"undefined"`
    pub fn line_type(&self) -> &str {
        self.tags
            .get(TYPE_TAG)
            .map(String::as_str)
            .unwrap_or(UNDEFINED_LINE_TYPE)
    }
}

/// A detected layout region (paragraph, margin note, ...)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionDescriptor {
    /// Key of the region group this region was listed under
    #[serde(default, skip_serializing)]
    pub region_type: String,
    pub boundary: Vec<Point>,
    #[serde(default)]
    pub tags: Tags,
}

impl RegionDescriptor {
    /// `tags["type"]`, or the region type key
    pub fn display_type(&self) -> &str {
        self.tags
            .get(TYPE_TAG)
            .map(String::as_str)
            .unwrap_or(self.region_type.as_str())
    }
}

/// Regions grouped by type
///
/// Group order is the order the segmenter produced; it is never sorted. The
/// serialized form is a JSON object, read and written in that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionMap {
    groups: Vec<(String, Vec<RegionDescriptor>)>,
}

impl RegionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region to its type group, creating the group on first use
    pub fn push(&mut self, region_type: &str, mut region: RegionDescriptor) {
        region.region_type = region_type.to_string();
        match self.groups.iter_mut().find(|(key, _)| key == region_type) {
            Some((_, regions)) => regions.push(region),
            None => self.groups.push((region_type.to_string(), vec![region])),
        }
    }

    /// Iterate `(region_type, regions)` in production order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[RegionDescriptor])> {
        self.groups
            .iter()
            .map(|(key, regions)| (key.as_str(), regions.as_slice()))
    }

    pub fn get(&self, region_type: &str) -> Option<&[RegionDescriptor]> {
        self.groups
            .iter()
            .find(|(key, _)| key == region_type)
            .map(|(_, regions)| regions.as_slice())
    }

    /// Total regions across all types
    pub fn region_count(&self) -> usize {
        self.groups.iter().map(|(_, regions)| regions.len()).sum()
    }
}

impl Serialize for RegionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (key, regions) in &self.groups {
            map.serialize_entry(key, regions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RegionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegionMapVisitor;

        impl<'de> Visitor<'de> for RegionMapVisitor {
            type Value = RegionMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of region type to region list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RegionMap, A::Error> {
                let mut map = RegionMap::new();
                while let Some((key, regions)) =
                    access.next_entry::<String, Vec<RegionDescriptor>>()?
                {
                    for region in regions {
                        map.push(&key, region);
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(RegionMapVisitor)
    }
}

/// Segmentation output for one image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutResult {
    #[serde(default)]
    pub lines: Vec<LineDescriptor>,
    #[serde(default)]
    pub regions: RegionMap,
}

/// Recognition output for one line
///
/// Geometry and tags are the matching line's, carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePrediction {
    pub line_index: usize,
    pub text: String,
    pub boundary: Vec<Point>,
    pub baseline: Option<Vec<Point>>,
    pub tags: Tags,
}

impl LinePrediction {
    pub fn from_line(line_index: usize, text: String, line: &LineDescriptor) -> Self {
        Self {
            line_index,
            text,
            boundary: line.boundary.clone(),
            baseline: line.baseline.clone(),
            tags: line.tags.clone(),
        }
    }

    pub fn line_type(&self) -> &str {
        self.tags
            .get(TYPE_TAG)
            .map(String::as_str)
            .unwrap_or(UNDEFINED_LINE_TYPE)
    }

    /// Baseline only when present and non-empty
    pub fn visible_baseline(&self) -> Option<&[Point]> {
        self.baseline.as_deref().filter(|points| !points.is_empty())
    }
}

/// Format points as `[(x, y), (x, y)]`
pub fn format_points(points: &[Point]) -> String {
    let inner: Vec<String> = points.iter().map(Point::to_string).collect();
    format!("[{}]", inner.join(", "))
}
