use cgmath::{ElementWise, InnerSpace, Vector3 as Vec3};

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub direction: Vec3<f32>,
    pub color: Vec3<f32>,
    pub intensity: f32,
    pub ambient_strength: f32,
    pub ambient_color: Vec3<f32>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: Vec3::new(-0.4, -1.0, -0.3).normalize(),
            color: Vec3::new(1.0, 0.96, 0.88),
            intensity: 1.0,
            ambient_strength: 0.35,
            ambient_color: Vec3::new(0.55, 0.7, 1.0), // 水下偏蓝的环境光
        }
    }
}

impl Light {
    pub fn set_light(&mut self, color: [f32; 3], direction: [f32; 3]) {
        self.color = Vec3::new(color[0], color[1], color[2]);
        self.direction = Vec3::new(direction[0], direction[1], direction[2]).normalize();
    }
}

#[derive(Debug)]
pub struct FragmentData {
    pub world_pos: Vec3<f32>,
    pub normal: Vec3<f32>,
    pub color: Vec3<f32>,
    pub camera_pos: Vec3<f32>,
}

pub trait FragmentShader: Sync {
    // 输入插值后的片元数据，输出 0.0 ~ 1.0 的颜色
    fn shade(&self, data: FragmentData) -> Vec3<f32>;
}

fn clamp_color(c: Vec3<f32>) -> Vec3<f32> {
    Vec3::new(c.x.clamp(0.0, 1.0), c.y.clamp(0.0, 1.0), c.z.clamp(0.0, 1.0))
}

/// 漫反射 + 环境光，双面
pub struct LambertShader {
    pub light: Light,
}

impl FragmentShader for LambertShader {
    fn shade(&self, data: FragmentData) -> Vec3<f32> {
        let ambient = self.light.ambient_color * self.light.ambient_strength;
        let diff = data.normal.normalize().dot(-self.light.direction).abs();
        let diffuse = self.light.color * self.light.intensity * diff;
        clamp_color(data.color.mul_element_wise(ambient + diffuse))
    }
}

/// 分层漫反射 + 阶梯高光，用于水面
pub struct ToonShader {
    pub light: Light,
    pub shininess: f32,
}

impl FragmentShader for ToonShader {
    fn shade(&self, data: FragmentData) -> Vec3<f32> {
        let ambient = self.light.ambient_color * self.light.ambient_strength;
        let normal = data.normal.normalize();
        let light_dir = self.light.direction;

        let diff = normal.dot(-light_dir).max(0.0);
        let band = if diff > 0.6 {
            1.1
        } else if diff > 0.2 {
            0.8
        } else {
            0.5
        };
        let diffuse = self.light.color * self.light.intensity * band;

        let view_dir = (data.camera_pos - data.world_pos).normalize();
        let half_dir = (-light_dir + view_dir).normalize();
        let spec = normal.dot(half_dir).max(0.0).powf(self.shininess);
        let spec = (spec * 4.0).floor() / 4.0;

        clamp_color(data.color.mul_element_wise(ambient + diffuse) + self.light.color * spec)
    }
}
