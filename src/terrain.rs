use crate::error::DioramaError;
use crate::noise_field::Noise2D;
use crate::plane::GridMesh;
use tracing::debug;

pub const DEFAULT_AMPLITUDE: f32 = 0.1;

/// 把噪声高度场烘焙进平面网格，外圈顶点保持 z = 0 以便与相邻几何拼接
#[derive(Debug, Clone, Copy)]
pub struct TerrainDisplacer {
    pub amplitude: f32,
}

impl Default for TerrainDisplacer {
    fn default() -> Self {
        Self {
            amplitude: DEFAULT_AMPLITUDE,
        }
    }
}

impl TerrainDisplacer {
    pub fn new(amplitude: f32) -> Self {
        Self { amplitude }
    }

    /// `offset` 只平移噪声采样的 x，用来让多块平面互不重复。
    /// z 是覆盖写入的，同样的噪声和 offset 重复调用结果不变。
    pub fn displace(
        &self,
        grid: &mut GridMesh,
        noise: &dyn Noise2D,
        offset: f32,
    ) -> Result<(), DioramaError> {
        grid.validate()?;

        let mut interior = 0usize;
        for i in 0..grid.vertex_count() {
            let boundary = grid.is_boundary(i);
            let p = &mut grid.mesh.positions[i];
            p.z = if boundary {
                0.0
            } else {
                interior += 1;
                noise.sample(p.x + offset, p.y) * self.amplitude
            };
        }

        grid.compute_vertex_normals();
        debug!(
            columns = grid.columns(),
            rows = grid.rows(),
            interior,
            offset,
            "地形位移完成"
        );
        Ok(())
    }
}
