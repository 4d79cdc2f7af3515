use crate::camera::Camera;
use crate::config::{ModelConfig, SceneConfig};
use crate::error::DioramaError;
use crate::model::{Mesh, PendingAsset, load_obj};
use crate::noise_field::SimplexNoise;
use crate::particles::BubbleField;
use crate::plane::GridMesh;
use crate::renderer::Renderer;
use crate::renderer::post_effect::{GateEdge, GatedEffect, GlitchEffect, TransientEffectGate};
use crate::renderer::shading::{LambertShader, ToonShader};
use crate::terrain::TerrainDisplacer;
use cgmath::{Deg, InnerSpace, Matrix4 as Mat4, Rad, Vector3 as Vec3};
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use tracing::{debug, info};

const BACKGROUND_TOP: u32 = 0xFF0B3A5C;
const BACKGROUND_BOTTOM: u32 = 0xFF02121F;
const BUBBLE_COLOR: u32 = 0xFFD8F4FF;

/// 可以整体平移的物体
struct Actor {
    mesh: Mesh,
    start: Vec3<f32>,
    position: Vec3<f32>,
    color: Vec3<f32>,
}

impl Actor {
    fn model_matrix(&self) -> Mat4<f32> {
        Mat4::from_translation(self.position)
    }
}

/// 故障回调可以修改的那部分场景
pub struct Stage {
    camera: Camera,
    sand: Vec<Actor>,
    axolotl: Option<Actor>,
    viewpoints: Vec<Vec3<f32>>,
    next_viewpoint: usize,
    tile_size: f32,
    time: f32,
}

impl Stage {
    #[cfg(test)]
    fn sand_positions(&self) -> Vec<Vec3<f32>> {
        self.sand.iter().map(|tile| tile.position).collect()
    }

    #[cfg(test)]
    fn sand_starts(&self) -> Vec<Vec3<f32>> {
        self.sand.iter().map(|tile| tile.start).collect()
    }

    fn reset_positions(&mut self) {
        for actor in self.sand.iter_mut().chain(self.axolotl.as_mut()) {
            actor.position = actor.start;
        }
        debug!("物体位置已复位");
    }

    /// 机位与目标重合时 look_at 退化，作为回调错误返回
    fn advance_viewpoint(&mut self) -> Result<(), DioramaError> {
        if self.viewpoints.is_empty() {
            return Ok(());
        }
        let eye = self.viewpoints[self.next_viewpoint];
        self.next_viewpoint = (self.next_viewpoint + 1) % self.viewpoints.len();
        if (eye - self.camera.target).magnitude2() < 1e-6 {
            return Err(DioramaError::Callback(format!(
                "机位 {:?} 与相机目标重合",
                eye
            )));
        }
        self.camera.set_position(eye);
        debug!(?eye, "切换机位");
        Ok(())
    }

    /// 沙地沿 -X 滚动，移出左侧后接到最右侧。
    /// 不论一帧滚动多远，中心都落在 (最右起点 - 总长, 最右起点] 内
    fn scroll_sand(&mut self, distance: f32) {
        let span = self.tile_size * self.sand.len() as f32;
        if span <= 0.0 {
            return;
        }
        let right = span / 2.0 - self.tile_size / 2.0;
        for tile in self.sand.iter_mut() {
            let x = tile.position.x - distance;
            tile.position.x = right - (right - x).rem_euclid(span);
        }
    }
}

pub struct Scene {
    stage: Stage,
    glitch: Option<GatedEffect<GlitchEffect, Stage>>,
    water: GridMesh,
    water_color: Vec3<f32>,
    water_height: f32,
    bubbles: BubbleField,
    scroll_speed: f32,
    orbit_speed: Deg<f32>,
}

fn load_axolotl(config: &ModelConfig) -> Result<Actor, DioramaError> {
    let mut slot = PendingAsset::new(config.path.clone());
    let size = config.size;
    slot.on_loaded(move |mesh: &mut Mesh| mesh.fit_to(size));
    slot.complete(load_obj(Path::new(&config.path))?);

    let mesh = slot
        .into_inner()
        .ok_or_else(|| DioramaError::Config(format!("模型未就绪: {}", config.path)))?;
    let start = Vec3::from(config.position);
    Ok(Actor {
        mesh,
        start,
        position: start,
        color: config.color.into(),
    })
}

impl Scene {
    pub fn build(config: &SceneConfig) -> Result<Self, DioramaError> {
        config.validate()?;
        let terrain = &config.terrain;

        // 每块沙地用不同偏移烘焙一次，避免看起来完全相同
        let noise = SimplexNoise::new(terrain.noise_seed, terrain.noise_frequency);
        let displacer = TerrainDisplacer::new(terrain.amplitude);
        let count = terrain.offsets.len();
        let mut sand = Vec::with_capacity(count);
        for (i, &offset) in terrain.offsets.iter().enumerate() {
            let mut grid = GridMesh::plane(
                terrain.size,
                terrain.size,
                terrain.segments,
                terrain.segments,
            )?;
            displacer.displace(&mut grid, &noise, offset)?;
            let x = (i as f32 - (count as f32 - 1.0) / 2.0) * terrain.size;
            let start = Vec3::new(x, 0.0, 0.0);
            sand.push(Actor {
                mesh: grid.mesh,
                start,
                position: start,
                color: terrain.color.into(),
            });
        }
        info!(tiles = count, segments = terrain.segments, "沙地烘焙完成");

        let axolotl = config.axolotl.as_ref().map(load_axolotl).transpose()?;

        let aspect = config.window.width as f32 / config.window.height as f32;
        let mut camera = Camera::new(0.1, 60.0, aspect, Deg(config.camera.fovy));
        camera.set_position(config.camera.position.into());
        camera.look_at(config.camera.target.into());

        let stage = Stage {
            camera,
            sand,
            axolotl,
            viewpoints: config.camera.viewpoints.iter().map(|&v| v.into()).collect(),
            next_viewpoint: 0,
            tile_size: terrain.size,
            time: 0.0,
        };

        let glitch = config.glitch.enabled.then(|| {
            let gate = TransientEffectGate::new()
                .on_enter(|stage: &mut Stage| {
                    stage.reset_positions();
                    Ok(())
                })
                .on_leave(|stage: &mut Stage| stage.advance_viewpoint());
            let mut effect = GlitchEffect::new(config.glitch.seed);
            effect.go_wild = config.glitch.go_wild;
            GatedEffect::new(effect, gate)
        });

        let half = terrain.size * count as f32 / 2.0;
        let water_height = config.water.height;
        let bubbles = BubbleField::new(
            config.particles.count,
            Vec3::new(-half.min(4.0), 0.0, -3.0),
            Vec3::new(half.min(4.0), water_height, 3.0),
            config.particles.seed,
        );

        Ok(Self {
            stage,
            glitch,
            water: GridMesh::plane(half * 2.0, terrain.size, 8, 8)?,
            water_color: config.water.color.into(),
            water_height,
            bubbles,
            scroll_speed: terrain.scroll_speed,
            orbit_speed: Deg(config.camera.orbit_speed),
        })
    }

    /// 每帧调用一次，严格顺序执行
    pub fn update(&mut self, dt: f32) -> Result<Option<GateEdge>, DioramaError> {
        let stage = &mut self.stage;
        stage.time += dt;
        stage.scroll_sand(self.scroll_speed * dt);
        if let Some(axolotl) = stage.axolotl.as_mut() {
            axolotl.position.y = axolotl.start.y + (stage.time * 1.5).sin() * 0.1;
        }
        stage.camera.orbit(Rad::from(self.orbit_speed * dt));
        self.bubbles.update(dt);

        match self.glitch.as_mut() {
            Some(glitch) => glitch.tick(&mut self.stage),
            None => Ok(None),
        }
    }

    pub fn render(&mut self, renderer: &mut Renderer) {
        renderer.camera.set_position(self.stage.camera.eye());
        renderer.camera.look_at(self.stage.camera.target);
        renderer
            .framebuffer
            .clear_gradient(BACKGROUND_TOP, BACKGROUND_BOTTOM);

        let lay_flat = Mat4::from_angle_x(Rad(-FRAC_PI_2));
        let lambert = LambertShader {
            light: renderer.light,
        };
        for tile in &self.stage.sand {
            let model = tile.model_matrix() * lay_flat;
            renderer.draw_mesh(&tile.mesh, &model, tile.color, &lambert);
        }
        if let Some(axolotl) = &self.stage.axolotl {
            let model = axolotl.model_matrix();
            renderer.draw_mesh(&axolotl.mesh, &model, axolotl.color, &lambert);
        }

        let toon = ToonShader {
            light: renderer.light,
            shininess: 16.0,
        };
        let water_model =
            Mat4::from_translation(Vec3::new(0.0, self.water_height, 0.0)) * lay_flat;
        renderer.draw_mesh(&self.water.mesh, &water_model, self.water_color, &toon);

        renderer.draw_particles(self.bubbles.positions(), BUBBLE_COLOR, 0.012);

        if let Some(glitch) = self.glitch.as_mut() {
            glitch.effect_mut().apply(&mut renderer.framebuffer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.terrain.segments = 6;
        config.particles.count = 10;
        config.window.width = 32;
        config.window.height = 24;
        config
    }

    #[test]
    fn sand_tiles_are_baked_side_by_side() {
        let scene = Scene::build(&small_config()).unwrap();
        let starts = scene.stage.sand_starts();
        assert_eq!(starts.len(), 2);
        assert_eq!(starts[0].x, -4.0);
        assert_eq!(starts[1].x, 4.0);
        // 内部顶点被抬起，外圈保持平整
        let mesh = &scene.stage.sand[0].mesh;
        assert!(mesh.positions.iter().any(|p| p.z != 0.0));
        assert_eq!(mesh.positions[0].z, 0.0);
    }

    #[test]
    fn sand_scrolls_and_wraps_without_glitch() {
        let mut config = small_config();
        config.glitch.enabled = false;
        let mut scene = Scene::build(&config).unwrap();

        assert_eq!(scene.update(1.0).unwrap(), None);
        let moved = scene.stage.sand_positions();
        assert!((moved[0].x - (-4.4)).abs() < 1e-5);

        // 跑过一整圈后仍在包络内
        for _ in 0..100 {
            scene.update(0.5).unwrap();
        }
        for p in scene.stage.sand_positions() {
            assert!(p.x >= -12.0 - 1e-4 && p.x <= 8.0 + 1e-4, "{p:?}");
        }
    }

    #[test]
    fn glitch_enter_resets_and_leave_moves_camera() {
        let mut scene = Scene::build(&small_config()).unwrap();

        // 第一帧就是一次强故障：滚动后立刻被复位
        assert_eq!(scene.update(0.5).unwrap(), Some(GateEdge::Enter));
        assert_eq!(scene.stage.sand_positions(), scene.stage.sand_starts());

        let mut leave = None;
        for frame in 0..300 {
            if scene.update(1.0 / 60.0).unwrap() == Some(GateEdge::Leave) {
                leave = Some(frame);
                break;
            }
        }
        assert!(leave.is_some());
        let eye = scene.stage.camera.eye();
        assert_eq!(eye, Vec3::new(4.0, 1.6, 4.0));
    }

    #[test]
    fn long_frame_keeps_tiles_in_strip() {
        let mut config = small_config();
        config.glitch.enabled = false;
        let mut scene = Scene::build(&config).unwrap();

        for dt in [100.0, 0.0, 37.3, 1000.0] {
            scene.update(dt).unwrap();
            let mut xs: Vec<f32> = scene.stage.sand_positions().iter().map(|p| p.x).collect();
            for &x in &xs {
                assert!((-12.0..=4.0).contains(&x), "dt={dt} x={x}");
            }
            // 两块沙地始终首尾相接
            xs.sort_by(|a, b| a.total_cmp(b));
            assert!((xs[1] - xs[0] - 8.0).abs() < 1e-3, "{xs:?}");
        }
    }

    #[test]
    fn start_positions_survive_zero_scroll() {
        let mut config = small_config();
        config.glitch.enabled = false;
        let mut scene = Scene::build(&config).unwrap();
        scene.update(0.0).unwrap();
        assert_eq!(scene.stage.sand_positions(), scene.stage.sand_starts());
    }

    #[test]
    fn degenerate_viewpoint_fails_the_leave_frame() {
        let mut config = small_config();
        config.camera.viewpoints = vec![config.camera.target];
        let mut scene = Scene::build(&config).unwrap();
        let before = scene.stage.camera.eye();

        assert_eq!(scene.update(0.0).unwrap(), Some(GateEdge::Enter));
        let err = loop {
            match scene.update(0.0) {
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(matches!(err, DioramaError::Callback(_)));
        assert!((scene.stage.camera.eye() - before).magnitude() < 1e-5);
        // 门已经回到空闲，下一帧照常运行
        assert_eq!(scene.update(0.0).unwrap(), None);
    }

    #[test]
    fn go_wild_from_config_keeps_glitch_on() {
        let mut config = small_config();
        config.glitch.go_wild = true;
        let mut scene = Scene::build(&config).unwrap();
        assert_eq!(scene.update(0.1).unwrap(), Some(GateEdge::Enter));
        for _ in 0..300 {
            assert_eq!(scene.update(1.0 / 60.0).unwrap(), None);
        }
    }

    #[test]
    fn render_draws_something() {
        let config = small_config();
        let mut scene = Scene::build(&config).unwrap();
        let camera = Camera::new(0.1, 60.0, 32.0 / 24.0, Deg(45.0));
        let mut renderer = Renderer::new(camera, 32, 24);
        scene.update(1.0 / 60.0).unwrap();
        scene.render(&mut renderer);
        assert!(renderer.framebuffer.depth.iter().any(|&d| d < 1.0));
    }

    #[test]
    fn missing_axolotl_model_fails_build() {
        let mut config = small_config();
        config.axolotl = Some(ModelConfig {
            path: "missing/axolotl.obj".into(),
            position: [0.0, 1.0, 0.0],
            size: 1.0,
            color: [1.0, 0.5, 0.6],
        });
        assert!(matches!(Scene::build(&config), Err(DioramaError::Obj(_))));
    }
}
