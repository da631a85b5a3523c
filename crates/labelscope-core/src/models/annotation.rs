use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

// ─── Segment ───────────────────────────────────────────────

/// A named, colored label class within a segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Numeric label id; voxels carrying this value belong to the segment.
    pub id: u32,
    pub name: String,
    pub color: [u8; 3],
}

impl Segment {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: default_color(id),
        }
    }

    pub fn with_color(mut self, color: [u8; 3]) -> Self {
        self.color = color;
        self
    }
}

/// Distinct display colors assigned to segments the host did not color.
const PALETTE: [[u8; 3]; 8] = [
    [221, 84, 84],
    [77, 228, 121],
    [166, 70, 235],
    [60, 150, 250],
    [240, 183, 61],
    [58, 217, 217],
    [235, 118, 196],
    [150, 205, 75],
];

fn default_color(id: u32) -> [u8; 3] {
    PALETTE[id as usize % PALETTE.len()]
}

// ─── PointAnnotation ───────────────────────────────────────

/// A single user click, recorded in world space and cached in voxel space
/// once a display-set transform is known. Lifetime is scoped to one
/// interactive session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAnnotation {
    /// Sortable id, time-ordered at millisecond granularity.
    pub id: Ulid,
    /// Segment this click is attributed to.
    pub segment_id: u32,
    pub world: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voxel: Option<[i32; 3]>,
    pub created_at: DateTime<Utc>,
}

impl PointAnnotation {
    pub fn new(segment_id: u32, world: [f64; 3]) -> Self {
        Self {
            id: Ulid::new(),
            segment_id,
            world,
            voxel: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_default_colors_differ() {
        let a = Segment::new(1, "liver");
        let b = Segment::new(2, "tumor");
        assert_ne!(a.color, b.color);
        assert_eq!(Segment::new(1, "liver").color, a.color);
    }

    #[test]
    fn annotation_ids_are_unique() {
        let first = PointAnnotation::new(1, [0.0, 0.0, 0.0]);
        let second = PointAnnotation::new(1, [1.0, 1.0, 1.0]);
        assert_ne!(first.id, second.id);
        assert!(first.created_at <= second.created_at);
    }
}
