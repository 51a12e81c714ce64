// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Listing entries shown next to the annotated page

use serde::{Deserialize, Serialize};

use super::layout::{format_points, LinePrediction, Point, RegionMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Line,
    Region,
}

/// One displayed field, always ordered boundary, baseline, prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum DisplayField {
    Boundary(Vec<Point>),
    Baseline(Vec<Point>),
    Prediction(String),
}

impl DisplayField {
    /// `  - Boundary: [(x, y), ...]` style markdown item
    pub fn to_markdown(&self) -> String {
        match self {
            DisplayField::Boundary(points) => format!("  - Boundary: {}", format_points(points)),
            DisplayField::Baseline(points) => format!("  - Baseline: {}", format_points(points)),
            DisplayField::Prediction(text) => format!("  - Prediction: {}", text),
        }
    }
}

/// A listed line or region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayLine {
    pub kind: EntryKind,
    /// 1-based; regions restart at 1 for every region type
    pub index: usize,
    pub label: String,
    pub entry_type: String,
    pub fields: Vec<DisplayField>,
}

impl DisplayLine {
    pub fn line(prediction: &LinePrediction, draw_baselines: bool) -> Self {
        let mut fields = vec![DisplayField::Boundary(prediction.boundary.clone())];
        if draw_baselines {
            if let Some(baseline) = prediction.visible_baseline() {
                fields.push(DisplayField::Baseline(baseline.to_vec()));
            }
        }
        fields.push(DisplayField::Prediction(prediction.text.clone()));

        let index = prediction.line_index + 1;
        Self {
            kind: EntryKind::Line,
            index,
            label: format!("Line {}", index),
            entry_type: prediction.line_type().to_string(),
            fields,
        }
    }

    pub fn region(index: usize, entry_type: &str, boundary: &[Point]) -> Self {
        Self {
            kind: EntryKind::Region,
            index,
            label: format!("Region {}", index),
            entry_type: entry_type.to_string(),
            fields: vec![DisplayField::Boundary(boundary.to_vec())],
        }
    }

    /// Markdown items: the header carries the first field, later fields
    /// stand alone
    pub fn markdown_items(&self) -> Vec<String> {
        let header = format!("**{}** (type: {}):", self.label, self.entry_type);
        let mut fields = self.fields.iter();

        let mut items = vec![match fields.next() {
            Some(first) => format!("{}\n{}", header, first.to_markdown()),
            None => header,
        }];
        items.extend(fields.map(DisplayField::to_markdown));
        items
    }

    pub fn text(&self) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            DisplayField::Prediction(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Lines in prediction order, then regions in map order
pub fn build_entries(
    predictions: &[LinePrediction],
    regions: &RegionMap,
    draw_baselines: bool,
) -> Vec<DisplayLine> {
    let mut entries: Vec<DisplayLine> = predictions
        .iter()
        .map(|prediction| DisplayLine::line(prediction, draw_baselines))
        .collect();

    for (_, group) in regions.iter() {
        for (idx, region) in group.iter().enumerate() {
            entries.push(DisplayLine::region(
                idx + 1,
                region.display_type(),
                &region.boundary,
            ));
        }
    }

    entries
}

pub fn markdown_items(entries: &[DisplayLine]) -> Vec<String> {
    entries.iter().flat_map(DisplayLine::markdown_items).collect()
}

/// All items separated by blank lines
pub fn to_markdown(entries: &[DisplayLine]) -> String {
    markdown_items(entries).join("\n\n")
}
