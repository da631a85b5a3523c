use serde::{Deserialize, Serialize};

// ─── MaskBuffer ────────────────────────────────────────────

/// Scalar element storage for a decoded mask, matching the element type the
/// server encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaskBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
}

impl MaskBuffer {
    /// Number of scalar elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::I16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type name as the wire format spells it.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::U8(_) => "uint8",
            Self::U16(_) => "uint16",
            Self::I16(_) => "int16",
        }
    }
}

// ─── SegmentationMask ──────────────────────────────────────

/// A volumetric label mask returned by the server, ready to hand to the
/// host's segmentation loader. Ownership transfers to the host once loaded;
/// the panel holds no lasting reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationMask {
    pub buffer: MaskBuffer,
    /// Voxel counts per axis, fastest-varying axis first.
    pub shape: [usize; 3],
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    /// Label classes present in the buffer, as named by the model.
    pub segments: Vec<SegmentDescriptor>,
}

impl SegmentationMask {
    pub fn voxel_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Buffer length matches the shape.
    pub fn is_consistent(&self) -> bool {
        self.buffer.len() == self.voxel_count()
    }
}

/// Display metadata for one label class inside a mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub label: u32,
    pub name: String,
    pub color: [u8; 3],
    /// Marked on the segment the user is currently editing.
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency_check() {
        let mask = SegmentationMask {
            buffer: MaskBuffer::U8(vec![0; 24]),
            shape: [2, 3, 4],
            spacing: [1.0; 3],
            origin: [0.0; 3],
            segments: Vec::new(),
        };
        assert_eq!(mask.voxel_count(), 24);
        assert!(mask.is_consistent());

        let truncated = SegmentationMask {
            buffer: MaskBuffer::U8(vec![0; 23]),
            ..mask
        };
        assert!(!truncated.is_consistent());
    }
}
