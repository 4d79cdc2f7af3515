use rayon::prelude::*;

pub const CLEAR_DEPTH: f32 = 1.0;

#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub depth: Vec<f32>,
}

pub fn pack_color(r: f32, g: f32, b: f32) -> u32 {
    let r = (r.clamp(0.0, 1.0) * 255.0) as u32;
    let g = (g.clamp(0.0, 1.0) * 255.0) as u32;
    let b = (b.clamp(0.0, 1.0) * 255.0) as u32;
    0xFF000000 | r << 16 | g << 8 | b
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            data: vec![0; width * height],
            depth: vec![CLEAR_DEPTH; width * height],
        }
    }

    #[cfg(test)]
    pub fn clear(&mut self, color: u32) {
        self.data.fill(color);
        self.depth.fill(CLEAR_DEPTH);
    }

    /// 竖直渐变背景（上 -> 下）
    pub fn clear_gradient(&mut self, top: u32, bottom: u32) {
        let height = self.height.max(2) as f32 - 1.0;
        for (y, row) in self.data.chunks_mut(self.width.max(1)).enumerate() {
            let t = y as f32 / height;
            row.fill(lerp_color(top, bottom, t));
        }
        self.depth.fill(CLEAR_DEPTH);
    }

    pub fn put_pixel(&mut self, x: usize, y: usize, color: u32, depth: f32) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if depth < self.depth[idx] {
                self.data[idx] = color;
                self.depth[idx] = depth;
            }
        }
    }

    pub fn ssaa(&self, factor: usize) -> Self {
        let factor = factor.max(1);
        let new_width = self.width / factor;
        let new_height = self.height / factor;
        let mut new_data = vec![0; new_width * new_height];
        let count = (factor * factor) as u32;

        // 每个输出行独立，按行并行
        new_data
            .par_chunks_mut(new_width.max(1))
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let (mut a, mut r, mut g, mut b) = (0u32, 0u32, 0u32, 0u32);
                    for dy in 0..factor {
                        for dx in 0..factor {
                            let src_idx = (y * factor + dy) * self.width + x * factor + dx;
                            let color = self.data[src_idx];
                            a += (color >> 24) & 0xFF;
                            r += (color >> 16) & 0xFF;
                            g += (color >> 8) & 0xFF;
                            b += color & 0xFF;
                        }
                    }
                    *out = (a / count) << 24 | (r / count) << 16 | (g / count) << 8 | b / count;
                }
            });

        Self {
            width: new_width,
            height: new_height,
            data: new_data,
            depth: vec![CLEAR_DEPTH; new_width * new_height],
        }
    }

    pub fn save_to_image(&self, filepath: &str) -> Result<(), image::ImageError> {
        use image::{ImageBuffer, Rgba};

        let mut img = ImageBuffer::new(self.width as u32, self.height as u32);
        for (i, color) in self.data.iter().enumerate() {
            let a = ((color >> 24) & 0xFF) as u8;
            let r = ((color >> 16) & 0xFF) as u8;
            let g = ((color >> 8) & 0xFF) as u8;
            let b = (color & 0xFF) as u8;
            img.put_pixel(
                (i % self.width) as u32,
                (i / self.width) as u32,
                Rgba([r, g, b, a]),
            );
        }
        img.save(filepath)
    }
}

fn lerp_color(a: u32, b: u32, t: f32) -> u32 {
    let channel = |shift: u32| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        ((ca + (cb - ca) * t).round() as u32) << shift
    };
    0xFF000000 | channel(16) | channel(8) | channel(0)
}
