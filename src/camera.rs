use cgmath::{Deg, Matrix4 as Mat4, Point3, Rad, Vector3 as Vec3};

#[derive(Debug)]
pub struct Frustum {
    near: f32,
    mat: Mat4<f32>,
}

impl Frustum {
    #[rustfmt::skip]
    pub fn new(near: f32, aspect: f32, far: f32, fovy: Rad<f32>) -> Self {
        let tan_half_fovy = (fovy.0 / 2.0).tan();
        let a = 1.0 / (aspect * tan_half_fovy);
        let b = 1.0 / tan_half_fovy;
        let c = -(far + near) / (far - near);
        let d = -2.0 * far * near / (far - near);

        // projection
        let mat = Mat4::new(
            a,    0.0,   0.0,   0.0,
            0.0,  b,     0.0,   0.0,
            0.0,  0.0,   c,    -1.0,
            0.0,  0.0,   d,     0.0,
        );

        Self { near, mat }
    }

    pub fn get_mat(&self) -> &Mat4<f32> {
        &self.mat
    }

    pub fn near(&self) -> f32 {
        self.near
    }
}

/// 绕目标点水平环绕的相机
pub struct Camera {
    frustum: Frustum,
    pub(crate) eye: Vec3<f32>,
    pub(crate) target: Vec3<f32>,
    up: Vec3<f32>,
}

impl Camera {
    pub fn new(near: f32, far: f32, aspect: f32, fovy: Deg<f32>) -> Self {
        Self {
            frustum: Frustum::new(near, aspect, far, fovy.into()),
            eye: Vec3::new(0.0, 2.0, 6.0),
            target: Vec3::new(0.0, 0.0, 0.0),
            up: Vec3::new(0.0, 1.0, 0.0),
        }
    }

    pub fn get_frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn eye(&self) -> Vec3<f32> {
        self.eye
    }

    pub fn set_position(&mut self, position: Vec3<f32>) {
        self.eye = position;
    }

    pub fn look_at(&mut self, target: Vec3<f32>) {
        self.target = target;
    }

    /// 保持高度和水平距离，绕目标点 Y 轴旋转
    pub fn orbit(&mut self, angle: Rad<f32>) {
        let offset = self.eye - self.target;
        let (s, c) = angle.0.sin_cos();
        let rotated = Vec3::new(
            offset.x * c + offset.z * s,
            offset.y,
            -offset.x * s + offset.z * c,
        );
        self.eye = self.target + rotated;
    }

    pub fn get_view_mat(&self) -> Mat4<f32> {
        let eye = Point3::new(self.eye.x, self.eye.y, self.eye.z);
        let target = Point3::new(self.target.x, self.target.y, self.target.z);
        Mat4::look_at_rh(eye, target, self.up)
    }

    pub fn get_view_proj_mat(&self) -> Mat4<f32> {
        self.frustum.get_mat() * self.get_view_mat()
    }
}
