use cgmath::{Vector2 as Vec2, Vector3 as Vec3};

/// 带颜色与法线的顶点（世界空间）
#[derive(Debug, Clone, Copy)]
pub struct ColoredVertex {
    pub pos: Vec3<f32>,
    pub color: Vec3<f32>,
    pub normal: Vec3<f32>,
}

/// 光栅化阶段的 2D 点（带颜色和深度）
#[derive(Debug, Clone, Copy)]
pub struct RasterPoint {
    pub pos: Vec2<f32>,
    pub world_pos: Vec3<f32>,
    pub color: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub z: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertices: [ColoredVertex; 3],
}

impl Triangle {
    /// 面法线，未归一化（长度为面积的两倍，用于面积加权）
    pub fn face_normal(p0: Vec3<f32>, p1: Vec3<f32>, p2: Vec3<f32>) -> Vec3<f32> {
        (p1 - p0).cross(p2 - p0)
    }

    pub fn new(v0: ColoredVertex, v1: ColoredVertex, v2: ColoredVertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }
}
