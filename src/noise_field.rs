//! 二维噪声采样。地形只依赖 [`Noise2D`]，具体实现可替换。

use noise::{NoiseFn, OpenSimplex};

/// 纯函数：(x, y) -> 标量，通常落在 [-1, 1]
pub trait Noise2D {
    fn sample(&self, x: f32, y: f32) -> f32;
}

impl<F> Noise2D for F
where
    F: Fn(f32, f32) -> f32,
{
    fn sample(&self, x: f32, y: f32) -> f32 {
        self(x, y)
    }
}

/// 带种子和频率的 OpenSimplex 噪声
pub struct SimplexNoise {
    simplex: OpenSimplex,
    frequency: f64,
}

impl SimplexNoise {
    pub fn new(seed: u32, frequency: f32) -> Self {
        Self {
            simplex: OpenSimplex::new(seed),
            frequency: frequency as f64,
        }
    }
}

impl Noise2D for SimplexNoise {
    fn sample(&self, x: f32, y: f32) -> f32 {
        self.simplex
            .get([x as f64 * self.frequency, y as f64 * self.frequency]) as f32
    }
}
