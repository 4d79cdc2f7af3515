use crate::error::DioramaError;
use crate::model::Mesh;
use cgmath::{Vector3 as Vec3, Zero};

/// 按行优先排列的顶点网格（`rows` 行 × `columns` 列）
#[derive(Debug, Clone)]
pub struct GridMesh {
    columns: usize,
    rows: usize,
    pub mesh: Mesh,
}

impl GridMesh {
    /// 在 XY 平面上生成以原点为中心的平面，第一行位于 y = +height/2
    pub fn plane(
        width: f32,
        height: f32,
        width_segments: usize,
        height_segments: usize,
    ) -> Result<Self, DioramaError> {
        let width_segments = width_segments.max(1);
        let height_segments = height_segments.max(1);
        let columns = width_segments + 1;
        let rows = height_segments + 1;
        let segment_w = width / width_segments as f32;
        let segment_h = height / height_segments as f32;

        let mut positions = Vec::with_capacity(columns * rows);
        for row in 0..rows {
            let y = height / 2.0 - row as f32 * segment_h;
            for col in 0..columns {
                let x = col as f32 * segment_w - width / 2.0;
                positions.push(Vec3::new(x, y, 0.0));
            }
        }

        let mut indices = Vec::with_capacity(width_segments * height_segments * 2);
        for row in 0..height_segments {
            for col in 0..width_segments {
                let a = row * columns + col;
                let b = (row + 1) * columns + col;
                let c = (row + 1) * columns + col + 1;
                let d = row * columns + col + 1;
                // 逆时针，法线朝 +Z
                indices.push([a, b, d]);
                indices.push([b, c, d]);
            }
        }

        let mut grid = Self::from_positions(columns, rows, positions)?;
        grid.mesh.indices = indices;
        grid.mesh.normals.fill(Vec3::unit_z());
        Ok(grid)
    }

    /// 接管外部顶点，只有位置，没有索引
    pub fn from_positions(
        columns: usize,
        rows: usize,
        positions: Vec<Vec3<f32>>,
    ) -> Result<Self, DioramaError> {
        if columns == 0 || rows == 0 {
            return Err(DioramaError::EmptyGrid { columns, rows });
        }
        let grid = Self {
            columns,
            rows,
            mesh: Mesh {
                normals: vec![Vec3::zero(); positions.len()],
                positions,
                indices: Vec::new(),
            },
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.positions.len()
    }

    pub fn validate(&self) -> Result<(), DioramaError> {
        let expected = self.columns * self.rows;
        if self.mesh.positions.len() != expected {
            return Err(DioramaError::GridMismatch {
                columns: self.columns,
                rows: self.rows,
                expected,
                actual: self.mesh.positions.len(),
            });
        }
        Ok(())
    }

    pub fn row_col(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }

    /// 外圈：第一行/最后一行/第一列/最后一列
    pub fn is_boundary(&self, index: usize) -> bool {
        let (row, col) = self.row_col(index);
        row == 0 || row + 1 == self.rows || col == 0 || col + 1 == self.columns
    }

    pub fn compute_vertex_normals(&mut self) {
        if self.mesh.indices.is_empty() {
            self.mesh.indices = Self::grid_indices(self.columns, self.rows);
        }
        self.mesh.compute_vertex_normals();
    }

    fn grid_indices(columns: usize, rows: usize) -> Vec<[usize; 3]> {
        let mut indices = Vec::new();
        for row in 0..rows.saturating_sub(1) {
            for col in 0..columns.saturating_sub(1) {
                let a = row * columns + col;
                let b = a + columns;
                indices.push([a, b, a + 1]);
                indices.push([b, b + 1, a + 1]);
            }
        }
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_layout() {
        let grid = GridMesh::plane(4.0, 2.0, 4, 2).unwrap();
        assert_eq!(grid.columns(), 5);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.vertex_count(), 15);
        assert_eq!(grid.mesh.indices.len(), 16);

        let first = grid.mesh.positions[0];
        assert_eq!((first.x, first.y), (-2.0, 1.0));
        let last = grid.mesh.positions[14];
        assert_eq!((last.x, last.y), (2.0, -1.0));
    }

    #[test]
    fn boundary_is_outer_ring() {
        let grid = GridMesh::plane(3.0, 3.0, 3, 3).unwrap();
        let interior: Vec<usize> = (0..grid.vertex_count())
            .filter(|&i| !grid.is_boundary(i))
            .collect();
        assert_eq!(interior, vec![5, 6, 9, 10]);
    }

    #[test]
    fn mismatched_positions_rejected() {
        let positions = vec![Vec3::zero(); 7];
        match GridMesh::from_positions(3, 3, positions) {
            Err(DioramaError::GridMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 9);
                assert_eq!(actual, 7);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_grid_rejected() {
        assert!(matches!(
            GridMesh::from_positions(0, 4, Vec::new()),
            Err(DioramaError::EmptyGrid { .. })
        ));
    }

    #[test]
    fn adopted_grid_gets_indices_for_normals() {
        let plane = GridMesh::plane(2.0, 2.0, 2, 2).unwrap();
        let mut grid = GridMesh::from_positions(3, 3, plane.mesh.positions.clone()).unwrap();
        grid.compute_vertex_normals();
        assert_eq!(grid.mesh.indices.len(), 8);
        assert!(grid.mesh.normals.iter().all(|n| (n.z - 1.0).abs() < 1e-6));
    }
}
