use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ulid::Ulid;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::geometry::ImageTransform;
use crate::models::{PointAnnotation, Segment};

// ─── PointSession ──────────────────────────────────────────

/// Owned per-session point state, keyed by segment id.
///
/// The panel controller owns exactly one session and lends it to the active
/// tab; nothing else holds a reference. Points never outlive the session.
#[derive(Debug, Clone)]
pub struct PointSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    segments: BTreeMap<u32, Segment>,
    points: BTreeMap<u32, Vec<PointAnnotation>>,
    active_segment: Option<u32>,
}

impl PointSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            segments: BTreeMap::new(),
            points: BTreeMap::new(),
            active_segment: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    // ─── Segments ──────────────────────────────────────────

    /// Insert or replace a segment. The first segment added becomes active.
    pub fn upsert_segment(&mut self, segment: Segment) {
        let id = segment.id;
        self.segments.insert(id, segment);
        if self.active_segment.is_none() {
            self.active_segment = Some(id);
        }
    }

    /// Remove a segment and every point attributed to it.
    pub fn remove_segment(&mut self, id: u32) -> Option<Segment> {
        self.points.remove(&id);
        let removed = self.segments.remove(&id);
        if self.active_segment == Some(id) {
            self.active_segment = self.segments.keys().next().copied();
        }
        removed
    }

    pub fn segment(&self, id: u32) -> Option<&Segment> {
        self.segments.get(&id)
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    pub fn set_active_segment(&mut self, id: u32) -> Result<()> {
        if !self.segments.contains_key(&id) {
            return Err(CoreError::SegmentNotFound(id));
        }
        self.active_segment = Some(id);
        Ok(())
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        self.active_segment.and_then(|id| self.segments.get(&id))
    }

    // ─── Points ────────────────────────────────────────────

    /// Record a click for a segment. The segment must exist before points
    /// can be attributed to it.
    pub fn add_point(&mut self, segment_id: u32, world: [f64; 3]) -> Result<Ulid> {
        if !self.segments.contains_key(&segment_id) {
            return Err(CoreError::SegmentNotFound(segment_id));
        }
        let point = PointAnnotation::new(segment_id, world);
        let id = point.id;
        self.points.entry(segment_id).or_default().push(point);
        Ok(id)
    }

    pub fn remove_point(&mut self, id: Ulid) -> bool {
        for points in self.points.values_mut() {
            if let Some(pos) = points.iter().position(|p| p.id == id) {
                points.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn points_for(&self, segment_id: u32) -> &[PointAnnotation] {
        self.points
            .get(&segment_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_points(&self) -> usize {
        self.points.values().map(Vec::len).sum()
    }

    /// Drop every point, keeping segments and the active selection.
    pub fn clear_points(&mut self) {
        self.points.clear();
    }

    /// Cache voxel coordinates on every point using the given transform.
    pub fn resolve_voxels(&mut self, transform: &ImageTransform) {
        for points in self.points.values_mut() {
            for point in points.iter_mut() {
                point.voxel = Some(transform.world_to_voxel(point.world));
            }
        }
    }

    /// Partition all points for interactive inference: the active segment's
    /// points are foreground, every other segment's points are background.
    pub fn partition(&self, transform: &ImageTransform) -> Result<PointPartition> {
        let active = self.active_segment.ok_or(CoreError::NoActiveSegment)?;

        let mut partition = PointPartition::default();
        for (&segment_id, points) in &self.points {
            let voxels = points
                .iter()
                .map(|p| p.voxel.unwrap_or_else(|| transform.world_to_voxel(p.world)));
            if segment_id == active {
                partition.foreground.extend(voxels);
            } else {
                partition.background.extend(voxels);
            }
        }
        Ok(partition)
    }
}

impl Default for PointSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Voxel-space point sets for one interactive inference request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointPartition {
    pub foreground: Vec<[i32; 3]>,
    pub background: Vec<[i32; 3]>,
}

impl PointPartition {
    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty() && self.background.is_empty()
    }
}
