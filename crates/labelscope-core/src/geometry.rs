use serde::{Deserialize, Serialize};

/// Affine mapping between the host's world space (mm) and voxel index space.
///
/// `direction` rows are the unit world-space vectors of the index axes, so
/// `world = origin + Σ index[k] * spacing[k] * direction[k]`. Rows must be
/// orthonormal; the inverse mapping uses the transpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub direction: [[f64; 3]; 3],
}

impl ImageTransform {
    pub fn new(origin: [f64; 3], spacing: [f64; 3]) -> Self {
        Self {
            origin,
            spacing,
            direction: IDENTITY,
        }
    }

    pub fn with_direction(mut self, direction: [[f64; 3]; 3]) -> Self {
        self.direction = direction;
        self
    }

    /// Unit spacing at the world origin.
    pub fn identity() -> Self {
        Self::new([0.0; 3], [1.0; 3])
    }

    /// Continuous index coordinate of a world-space point.
    pub fn world_to_index(&self, world: [f64; 3]) -> [f64; 3] {
        let d = [
            world[0] - self.origin[0],
            world[1] - self.origin[1],
            world[2] - self.origin[2],
        ];
        let mut index = [0.0; 3];
        for k in 0..3 {
            let row = self.direction[k];
            index[k] = (row[0] * d[0] + row[1] * d[1] + row[2] * d[2]) / self.spacing[k];
        }
        index
    }

    /// Nearest voxel of a world-space point.
    pub fn world_to_voxel(&self, world: [f64; 3]) -> [i32; 3] {
        let index = self.world_to_index(world);
        [
            index[0].round() as i32,
            index[1].round() as i32,
            index[2].round() as i32,
        ]
    }

    /// World-space position of a continuous index coordinate.
    pub fn index_to_world(&self, index: [f64; 3]) -> [f64; 3] {
        let mut world = self.origin;
        for k in 0..3 {
            let row = self.direction[k];
            let step = index[k] * self.spacing[k];
            world[0] += step * row[0];
            world[1] += step * row[1];
            world[2] += step * row[2];
        }
        world
    }

    /// Whether a voxel lies inside a volume of the given shape.
    pub fn voxel_in_bounds(voxel: [i32; 3], shape: [usize; 3]) -> bool {
        voxel
            .iter()
            .zip(shape.iter())
            .all(|(&v, &s)| v >= 0 && (v as usize) < s)
    }
}

const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl Default for ImageTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_maps_world_to_same_index() {
        let t = ImageTransform::identity();
        assert_eq!(t.world_to_voxel([2.4, 3.6, 9.0]), [2, 4, 9]);
        assert_eq!(t.index_to_world([2.0, 4.0, 9.0]), [2.0, 4.0, 9.0]);
    }

    #[test]
    fn spacing_and_origin_applied() {
        let t = ImageTransform::new([10.0, -20.0, 5.0], [2.0, 2.0, 4.0]);
        assert_eq!(t.world_to_voxel([14.0, -16.0, 13.0]), [2, 2, 2]);

        let world = t.index_to_world([2.0, 2.0, 2.0]);
        assert_eq!(world, [14.0, -16.0, 13.0]);
    }

    #[test]
    fn flipped_axes_round_trip() {
        // LPS-style flip on the first two axes.
        let t = ImageTransform::new([100.0, 80.0, -50.0], [1.5, 1.5, 3.0])
            .with_direction([[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 1.0]]);

        let index = [12.0, 7.0, 21.0];
        let back = t.world_to_index(t.index_to_world(index));
        for k in 0..3 {
            assert!((back[k] - index[k]).abs() < 1e-9);
        }
    }

    #[test]
    fn bounds_check() {
        assert!(ImageTransform::voxel_in_bounds([0, 0, 0], [64, 64, 32]));
        assert!(ImageTransform::voxel_in_bounds([63, 63, 31], [64, 64, 32]));
        assert!(!ImageTransform::voxel_in_bounds([64, 0, 0], [64, 64, 32]));
        assert!(!ImageTransform::voxel_in_bounds([0, -1, 0], [64, 64, 32]));
    }
}
