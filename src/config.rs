use crate::error::DioramaError;
use serde::Deserialize;
use serde_json::from_reader;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// 场景 JSON，所有字段都有默认值，可以只写需要覆盖的部分
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub terrain: TerrainConfig,
    pub water: WaterConfig,
    pub particles: ParticleConfig,
    pub glitch: GlitchConfig,
    pub axolotl: Option<ModelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fovy: f32,
    /// 自动环绕速度，度/秒
    pub orbit_speed: f32,
    /// 故障结束后依次切换的机位
    pub viewpoints: Vec<[f32; 3]>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 5.5],
            target: [0.0, 0.4, 0.0],
            fovy: 45.0,
            orbit_speed: 6.0,
            viewpoints: vec![[4.0, 1.6, 4.0], [-4.5, 2.4, 3.0], [0.0, 3.0, -5.0]],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub color: [f32; 3],
    pub direction: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 0.96, 0.88],
            direction: [-0.4, -1.0, -0.3],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// 单块沙地边长
    pub size: f32,
    pub segments: usize,
    pub amplitude: f32,
    pub noise_seed: u32,
    pub noise_frequency: f32,
    /// 每块沙地一个噪声偏移
    pub offsets: Vec<f32>,
    pub scroll_speed: f32,
    pub color: [f32; 3],
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 8.0,
            segments: 64,
            amplitude: crate::terrain::DEFAULT_AMPLITUDE,
            noise_seed: 1,
            noise_frequency: 1.0,
            offsets: vec![0.0, 8.0],
            scroll_speed: 0.4,
            color: [0.86, 0.76, 0.55],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub height: f32,
    pub color: [f32; 3],
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            height: 3.2,
            color: [0.25, 0.55, 0.8],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self { count: 120, seed: 7 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlitchConfig {
    pub enabled: bool,
    pub seed: u64,
    /// 每帧都强故障
    pub go_wild: bool,
}

impl Default for GlitchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 2024,
            go_wild: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub path: String,
    #[serde(default)]
    pub position: [f32; 3],
    /// 模型最长边缩放到的长度
    #[serde(default = "default_model_size")]
    pub size: f32,
    #[serde(default = "default_model_color")]
    pub color: [f32; 3],
}

fn default_model_size() -> f32 {
    1.5
}

fn default_model_color() -> [f32; 3] {
    [0.95, 0.6, 0.7]
}

impl SceneConfig {
    pub fn validate(&self) -> Result<(), DioramaError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(DioramaError::Config("窗口尺寸必须大于 0".into()));
        }
        if self.terrain.segments == 0 {
            return Err(DioramaError::Config("terrain.segments 必须大于 0".into()));
        }
        if !(self.terrain.size > 0.0) {
            return Err(DioramaError::Config("terrain.size 必须为正数".into()));
        }
        if self.terrain.offsets.is_empty() {
            return Err(DioramaError::Config("terrain.offsets 至少需要一个".into()));
        }
        if !(self.camera.fovy > 0.0 && self.camera.fovy < 180.0) {
            return Err(DioramaError::Config("camera.fovy 必须在 (0, 180) 内".into()));
        }
        Ok(())
    }
}

pub fn parse_json(path: &Path) -> Result<SceneConfig, DioramaError> {
    let file = File::open(path)?;
    let config: SceneConfig = from_reader(file)?;
    config.validate()?;
    info!(path = %path.display(), "成功读取场景配置");
    Ok(config)
}
