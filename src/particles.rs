use cgmath::Vector3 as Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 水中上浮的气泡，越过顶部后回到底部
pub struct BubbleField {
    positions: Vec<Vec3<f32>>,
    speeds: Vec<f32>,
    phases: Vec<f32>,
    min: Vec3<f32>,
    max: Vec3<f32>,
    time: f32,
}

impl BubbleField {
    pub fn new(count: usize, min: Vec3<f32>, max: Vec3<f32>, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample = |lo: f32, hi: f32| if hi > lo { rng.random_range(lo..hi) } else { lo };

        let positions = (0..count)
            .map(|_| {
                Vec3::new(
                    sample(min.x, max.x),
                    sample(min.y, max.y),
                    sample(min.z, max.z),
                )
            })
            .collect();
        let speeds = (0..count).map(|_| sample(0.2, 0.6)).collect();
        let phases = (0..count)
            .map(|_| sample(0.0, std::f32::consts::TAU))
            .collect();

        Self {
            positions,
            speeds,
            phases,
            min,
            max,
            time: 0.0,
        }
    }

    pub fn positions(&self) -> &[Vec3<f32>] {
        &self.positions
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        let height = self.max.y - self.min.y;
        for ((p, &speed), &phase) in self.positions.iter_mut().zip(&self.speeds).zip(&self.phases) {
            p.y += speed * dt;
            // 左右轻微摆动
            p.x += (self.time * 2.0 + phase).sin() * 0.05 * dt;
            p.x = p.x.clamp(self.min.x, self.max.x);
            if p.y > self.max.y && height > 0.0 {
                p.y -= height;
            }
        }
    }
}
