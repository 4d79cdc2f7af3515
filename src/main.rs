mod camera;
mod config;
mod error;
mod framebuffer;
mod model;
mod noise_field;
mod particles;
mod plane;
mod rasterizer;
mod renderer;
mod scene;
mod terrain;
mod vertex;

use std::path::PathBuf;

use cgmath::Deg;
use clap::Parser;
use minifb::{Key, Window, WindowOptions};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::camera::Camera;
use crate::config::SceneConfig;
use crate::renderer::Renderer;
use crate::scene::Scene;

const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "axolotl-diorama", about = "软件光栅化的美西螈水族箱")]
struct Cli {
    /// 场景 JSON，不传则使用默认场景
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 离线渲染的帧数
    #[arg(short, long, default_value_t = 120)]
    frames: u32,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    out_dir: PathBuf,

    /// 超采样倍数
    #[arg(long, default_value_t = 2)]
    ssaa: usize,

    /// 打开窗口实时预览，而不是写图片
    #[arg(long)]
    preview: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = match &cli.config {
        Some(path) => config::parse_json(path)?,
        None => SceneConfig::default(),
    };
    let ssaa = cli.ssaa.max(1);
    if ssaa != cli.ssaa {
        warn!("SSAA 倍数至少为 1，已改为 1");
    }

    let mut scene = Scene::build(&config)?;
    let (width, height) = (config.window.width, config.window.height);
    let camera = Camera::new(
        0.1,
        60.0,
        width as f32 / height as f32,
        Deg(config.camera.fovy),
    );
    let mut renderer = Renderer::new(camera, width * ssaa, height * ssaa);
    renderer
        .light
        .set_light(config.light.color, config.light.direction);
    info!(width, height, ssaa, "初始化完成");

    if cli.preview {
        run_preview(&mut scene, &mut renderer, width, height, ssaa)?;
    } else {
        std::fs::create_dir_all(&cli.out_dir)?;
        for i in 0..cli.frames {
            if let Some(edge) = scene.update(FRAME_DT)? {
                info!(frame = i, ?edge, "故障效果切换");
            }
            scene.render(&mut renderer);
            let path = cli.out_dir.join(format!("frame_{:04}.png", i));
            renderer
                .framebuffer
                .ssaa(ssaa)
                .save_to_image(&path.to_string_lossy())?;
        }
        info!(frames = cli.frames, out_dir = %cli.out_dir.display(), "已渲染完成");
    }

    Ok(())
}

fn run_preview(
    scene: &mut Scene,
    renderer: &mut Renderer,
    width: usize,
    height: usize,
    ssaa: usize,
) -> Result<(), error::DioramaError> {
    let mut window = Window::new("axolotl diorama", width, height, WindowOptions::default())?;
    window.set_target_fps(60);

    while window.is_open() && !window.is_key_down(Key::Escape) {
        if let Some(edge) = scene.update(FRAME_DT)? {
            info!(?edge, "故障效果切换");
        }
        scene.render(renderer);
        let frame = renderer.framebuffer.ssaa(ssaa);
        window.update_with_buffer(&frame.data, frame.width, frame.height)?;
    }
    Ok(())
}
