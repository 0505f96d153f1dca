//! Grid & Block Model (C1): voxel footprints, reference points, rotations.

use std::collections::HashSet;

use super::types::{BlockId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Crane,
    Trestle,
    HeightAware,
    Unknown,
}

impl Default for BlockType {
    fn default() -> Self {
        BlockType::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    fn next(self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }
}

/// A fabricated assembly carried as a unit, represented by its 2D voxel footprint.
#[derive(Debug)]
pub struct VoxelBlock {
    pub id: BlockId,
    footprint: Vec<(i64, i64)>,
    actual_reference: (i64, i64),
    pub rotation: Rotation,
    pub block_type: BlockType,
    pub position: Option<Position>,
    pub width: i64,
    pub height: i64,
}

impl VoxelBlock {
    /// Builds a block from its local footprint cells and a reference cell that must
    /// be one of them. Panics if the footprint is empty or the reference is not a
    /// footprint cell — both are construction-time invariants, not runtime failures.
    pub fn new(
        id: impl Into<BlockId>,
        footprint: Vec<(i64, i64)>,
        actual_reference: (i64, i64),
        block_type: BlockType,
    ) -> Self {
        assert!(!footprint.is_empty(), "block footprint must be non-empty");
        assert!(
            footprint.contains(&actual_reference),
            "reference cell must belong to the footprint"
        );
        let (width, height) = bounding_box(&footprint);
        Self {
            id: id.into(),
            footprint,
            actual_reference,
            rotation: Rotation::Deg0,
            block_type,
            position: None,
            width,
            height,
        }
    }

    pub fn footprint(&self) -> &[(i64, i64)] {
        &self.footprint
    }

    pub fn actual_reference(&self) -> (i64, i64) {
        self.actual_reference
    }

    pub fn area(&self) -> usize {
        self.footprint.len()
    }

    pub fn is_crane(&self) -> bool {
        self.block_type == BlockType::Crane
    }

    pub fn is_trestle(&self) -> bool {
        matches!(self.block_type, BlockType::Trestle)
    }

    /// World cells occupied if the block's reference sits at `(pos_x, pos_y)`.
    pub fn footprint_at(&self, pos_x: i64, pos_y: i64) -> Vec<(i64, i64)> {
        let (ref_x, ref_y) = self.actual_reference;
        self.footprint
            .iter()
            .map(|&(vx, vy)| (pos_x - ref_x + vx, pos_y - ref_y + vy))
            .collect()
    }

    /// Footprint cells that have at least one 4-neighbour outside the footprint.
    pub fn boundary_cells(&self) -> Vec<(i64, i64)> {
        let set: HashSet<(i64, i64)> = self.footprint.iter().copied().collect();
        self.footprint
            .iter()
            .copied()
            .filter(|&(x, y)| {
                let neighbours = [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)];
                neighbours.iter().any(|n| !set.contains(n))
            })
            .collect()
    }

    /// World boundary cells, given the block's recorded position.
    pub fn world_boundary_cells(&self) -> Vec<(i64, i64)> {
        let Some(pos) = self.position else {
            return Vec::new();
        };
        let (ref_x, ref_y) = self.actual_reference;
        self.boundary_cells()
            .into_iter()
            .map(|(vx, vy)| (pos.x - ref_x + vx, pos.y - ref_y + vy))
            .collect()
    }

    /// Rotates the block in place by `delta` (90, 180 or 270 degrees), updating the
    /// footprint, reference point, rotation and bounding-box extents. Rotation is
    /// exact on integer coordinates: rotate each local cell about the origin, then
    /// translate the whole footprint (reference included) into the non-negative
    /// quadrant.
    pub fn rotate(&mut self, delta: u32) {
        assert!(
            matches!(delta, 90 | 180 | 270),
            "rotation delta must be 90, 180 or 270"
        );
        let steps = delta / 90;
        for _ in 0..steps {
            self.rotate_90();
        }
    }

    fn rotate_90(&mut self) {
        // (x, y) -> (-y, x), then shift to the non-negative quadrant.
        let rotated: Vec<(i64, i64)> = self.footprint.iter().map(|&(x, y)| (-y, x)).collect();
        let rotated_ref = {
            let (rx, ry) = self.actual_reference;
            (-ry, rx)
        };

        let min_x = rotated.iter().map(|c| c.0).min().unwrap();
        let min_y = rotated.iter().map(|c| c.1).min().unwrap();

        self.footprint = rotated
            .into_iter()
            .map(|(x, y)| (x - min_x, y - min_y))
            .collect();
        self.actual_reference = (rotated_ref.0 - min_x, rotated_ref.1 - min_y);
        self.rotation = self.rotation.next();
        let (width, height) = bounding_box(&self.footprint);
        self.width = width;
        self.height = height;
    }

    pub fn rotation_degrees(&self) -> u32 {
        self.rotation.degrees()
    }
}

/// Cloning always yields an unplaced value: a clone is a new candidate, not a
/// second reference to a seated one.
impl Clone for VoxelBlock {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            footprint: self.footprint.clone(),
            actual_reference: self.actual_reference,
            rotation: self.rotation,
            block_type: self.block_type,
            position: None,
            width: self.width,
            height: self.height,
        }
    }
}

fn bounding_box(footprint: &[(i64, i64)]) -> (i64, i64) {
    let min_x = footprint.iter().map(|c| c.0).min().unwrap();
    let max_x = footprint.iter().map(|c| c.0).max().unwrap();
    let min_y = footprint.iter().map(|c| c.1).min().unwrap();
    let max_y = footprint.iter().map(|c| c.1).max().unwrap();
    (max_x - min_x + 1, max_y - min_y + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: &str) -> VoxelBlock {
        VoxelBlock::new(
            id,
            vec![(0, 0), (1, 0), (0, 1), (1, 1)],
            (0, 0),
            BlockType::Unknown,
        )
    }

    #[test]
    fn footprint_at_translates_by_reference_delta() {
        let b = square("A");
        let mut world = b.footprint_at(8, 0);
        world.sort();
        assert_eq!(world, vec![(8, 0), (8, 1), (9, 0), (9, 1)]);
    }

    #[test]
    fn rotating_360_degrees_restores_shape() {
        let mut b = square("A");
        let original_footprint = {
            let mut f = b.footprint().to_vec();
            f.sort();
            f
        };
        let original_ref = b.actual_reference();
        let (ow, oh) = (b.width, b.height);

        for _ in 0..4 {
            b.rotate(90);
        }

        let mut rotated_footprint = b.footprint().to_vec();
        rotated_footprint.sort();
        assert_eq!(rotated_footprint, original_footprint);
        assert_eq!(b.actual_reference(), original_ref);
        assert_eq!((b.width, b.height), (ow, oh));
        assert_eq!(b.rotation, Rotation::Deg0);
    }

    #[test]
    fn rotating_90_swaps_width_and_height() {
        let mut b = VoxelBlock::new(
            "A",
            vec![(0, 0), (1, 0), (2, 0)],
            (0, 0),
            BlockType::Unknown,
        );
        assert_eq!((b.width, b.height), (3, 1));
        b.rotate(90);
        assert_eq!((b.width, b.height), (1, 3));
    }

    #[test]
    fn clone_resets_position_to_none() {
        let mut b = square("A");
        b.position = Some(Position::new(3, 4));
        let cloned = b.clone();
        assert!(cloned.position.is_none());
        assert_eq!(cloned.footprint(), b.footprint());
    }

    #[test]
    fn boundary_cells_exclude_interior() {
        // 3x3 block: only the ring is boundary, the center cell is interior.
        let mut footprint = Vec::new();
        for x in 0..3 {
            for y in 0..3 {
                footprint.push((x, y));
            }
        }
        let b = VoxelBlock::new("A", footprint, (0, 0), BlockType::Unknown);
        let boundary = b.boundary_cells();
        assert_eq!(boundary.len(), 8);
        assert!(!boundary.contains(&(1, 1)));
    }
}
