pub mod post_effect;
pub mod shading;

use crate::camera::Camera;
use crate::framebuffer::{FrameBuffer, pack_color};
use crate::model::Mesh;
use crate::rasterizer;
use crate::vertex::RasterPoint;
use cgmath::{InnerSpace, Matrix, Matrix4 as Mat4, SquareMatrix, Vector2 as Vec2, Vector3 as Vec3};
use shading::{FragmentData, FragmentShader, Light};

pub struct Viewport {
    pub w: f32,
    pub h: f32,
}

pub struct Renderer {
    pub(crate) camera: Camera,
    pub(crate) framebuffer: FrameBuffer,
    pub(crate) viewport: Viewport,
    pub(crate) light: Light,
}

impl Renderer {
    pub fn new(camera: Camera, w: usize, h: usize) -> Self {
        Self {
            camera,
            framebuffer: FrameBuffer::new(w, h),
            viewport: Viewport {
                w: w as f32,
                h: h as f32,
            },
            light: Light::default(),
        }
    }

    /// 裁剪空间 -> 屏幕空间；w 过小（在相机后方/近平面内）返回 None
    fn project(&self, view_proj: &Mat4<f32>, world: Vec3<f32>) -> Option<(Vec2<f32>, f32)> {
        let clip = view_proj * world.extend(1.0);
        if clip.w <= self.camera.get_frustum().near() * 0.5 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let screen_x = (ndc.x + 1.0) * 0.5 * self.viewport.w;
        let screen_y = self.viewport.h - (ndc.y + 1.0) * 0.5 * self.viewport.h;
        Some((Vec2::new(screen_x, screen_y), (ndc.z + 1.0) * 0.5))
    }

    pub fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        model: &Mat4<f32>,
        color: Vec3<f32>,
        shader: &dyn FragmentShader,
    ) {
        let normal_matrix = model
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Mat4::identity);
        let view_proj = self.camera.get_view_proj_mat();

        for triangle in mesh.triangles(color) {
            //顶点变换 + 简单裁剪：任一顶点在近平面内就丢弃整个三角形
            let mut points = Vec::with_capacity(3);
            for v in &triangle.vertices {
                let world_pos = (model * v.pos.extend(1.0)).truncate();
                let Some((pos, z)) = self.project(&view_proj, world_pos) else {
                    break;
                };
                points.push(RasterPoint {
                    pos,
                    world_pos,
                    color: v.color,
                    normal: (normal_matrix * v.normal.extend(0.0)).truncate(),
                    z,
                });
            }
            if let [a, b, c] = points[..] {
                self.rasterize_triangle(&[a, b, c], shader);
            }
        }
    }

    pub fn rasterize_triangle(&mut self, points: &[RasterPoint; 3], shader: &dyn FragmentShader) {
        let screen = [points[0].pos, points[1].pos, points[2].pos];
        let (min_x, min_y, max_x, max_y) =
            rasterizer::get_box(&screen, self.framebuffer.width, self.framebuffer.height);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if !rasterizer::is_inside_triangle(&screen, &p) {
                    continue;
                }
                let Some((u, v, w)) = rasterizer::get_barycentric_coords(&screen, &p) else {
                    continue;
                };

                let depth = points[0].z * u + points[1].z * v + points[2].z * w;
                if depth < 0.0 || depth >= self.framebuffer.depth[y * self.framebuffer.width + x] {
                    continue;
                }

                let fragment = FragmentData {
                    world_pos: points[0].world_pos * u
                        + points[1].world_pos * v
                        + points[2].world_pos * w,
                    normal: points[0].normal * u + points[1].normal * v + points[2].normal * w,
                    color: points[0].color * u + points[1].color * v + points[2].color * w,
                    camera_pos: self.camera.eye,
                };
                let c = shader.shade(fragment);
                self.framebuffer
                    .put_pixel(x, y, pack_color(c.x, c.y, c.z), depth);
            }
        }
    }

    /// 粒子画成深度测试的小方块，越远越小
    pub fn draw_particles(&mut self, positions: &[Vec3<f32>], color: u32, size: f32) {
        let view_proj = self.camera.get_view_proj_mat();
        for &p in positions {
            let Some((screen, z)) = self.project(&view_proj, p) else {
                continue;
            };
            let distance = (p - self.camera.eye).magnitude().max(0.1);
            let radius = ((size * self.viewport.h / distance) as i32).max(1);
            let (cx, cy) = (screen.x as i32, screen.y as i32);
            for dy in -radius / 2..=radius / 2 {
                for dx in -radius / 2..=radius / 2 {
                    let (x, y) = (cx + dx, cy + dy);
                    if x >= 0 && y >= 0 {
                        self.framebuffer.put_pixel(x as usize, y as usize, color, z);
                    }
                }
            }
        }
    }
}
