use crate::error::DioramaError;
use crate::framebuffer::FrameBuffer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// 随时间驱动、每帧给出是否生效的效果
pub trait TransientEffect {
    /// 推进一帧
    fn advance(&mut self);
    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEdge {
    Enter,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Active,
}

pub type GateCallback<C> = Box<dyn FnMut(&mut C) -> Result<(), DioramaError>>;

/// 把电平信号（本帧是否生效）转成边沿事件：进入/离开各触发一次。
///
/// 状态先于回调更新：回调返回错误时错误原样返回，
/// 但门的状态已经切换，下一帧不会重复触发同一边沿。
pub struct TransientEffectGate<C> {
    fired: bool,
    on_enter: Option<GateCallback<C>>,
    on_leave: Option<GateCallback<C>>,
}

impl<C> Default for TransientEffectGate<C> {
    fn default() -> Self {
        Self {
            fired: false,
            on_enter: None,
            on_leave: None,
        }
    }
}

impl<C> TransientEffectGate<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut C) -> Result<(), DioramaError> + 'static,
    {
        self.on_enter = Some(Box::new(callback));
        self
    }

    pub fn on_leave<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut C) -> Result<(), DioramaError> + 'static,
    {
        self.on_leave = Some(Box::new(callback));
        self
    }

    pub fn state(&self) -> GateState {
        if self.is_fired() {
            GateState::Active
        } else {
            GateState::Idle
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired
    }

    pub fn update(&mut self, active: bool, ctx: &mut C) -> Result<Option<GateEdge>, DioramaError> {
        match (active, self.fired) {
            (true, false) => {
                self.fired = true;
                if let Some(callback) = self.on_enter.as_mut() {
                    callback(ctx)?;
                }
                Ok(Some(GateEdge::Enter))
            }
            (false, true) => {
                self.fired = false;
                if let Some(callback) = self.on_leave.as_mut() {
                    callback(ctx)?;
                }
                Ok(Some(GateEdge::Leave))
            }
            _ => Ok(None),
        }
    }
}

/// 效果 + 自己的边沿检测状态，不依赖继承
pub struct GatedEffect<E, C> {
    effect: E,
    gate: TransientEffectGate<C>,
}

impl<E: TransientEffect, C> GatedEffect<E, C> {
    pub fn new(effect: E, gate: TransientEffectGate<C>) -> Self {
        Self { effect, gate }
    }

    #[cfg(test)]
    pub fn effect(&self) -> &E {
        &self.effect
    }

    pub fn effect_mut(&mut self) -> &mut E {
        &mut self.effect
    }

    pub fn tick(&mut self, ctx: &mut C) -> Result<Option<GateEdge>, DioramaError> {
        self.effect.advance();
        let edge = self.gate.update(self.effect.is_active(), ctx)?;
        if let Some(edge) = edge {
            debug!(?edge, state = ?self.gate.state(), "效果状态切换");
        }
        Ok(edge)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlitchStrength {
    Off,
    Weak,
    Strong,
}

/// 故障效果：每隔随机 120~240 帧爆发一次强故障，
/// 之后该周期的前五分之一保持弱故障，其余时间关闭
pub struct GlitchEffect {
    rng: StdRng,
    frame: u32,
    trigger: u32,
    strength: GlitchStrength,
    pub go_wild: bool,
}

impl GlitchEffect {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let trigger = Self::roll_trigger(&mut rng);
        Self {
            rng,
            frame: 0,
            trigger,
            strength: GlitchStrength::Off,
            go_wild: false,
        }
    }

    fn roll_trigger(rng: &mut StdRng) -> u32 {
        rng.random_range(120..=240)
    }

    pub fn trigger(&self) -> u32 {
        self.trigger
    }

    pub fn strength(&self) -> GlitchStrength {
        self.strength
    }

    /// 对帧缓冲施加故障，关闭时什么都不做
    pub fn apply(&mut self, framebuffer: &mut FrameBuffer) {
        let row_chance = match self.strength() {
            GlitchStrength::Off => return,
            GlitchStrength::Weak => 0.1,
            GlitchStrength::Strong => 0.3,
        };
        glitch_pixels(framebuffer, &mut self.rng, row_chance);
    }
}

impl TransientEffect for GlitchEffect {
    fn advance(&mut self) {
        if self.frame % self.trigger == 0 || self.go_wild {
            self.strength = GlitchStrength::Strong;
            self.frame = 0;
            self.trigger = Self::roll_trigger(&mut self.rng);
            debug!(next = self.trigger(), "强故障");
        } else if self.frame % self.trigger < self.trigger / 5 {
            self.strength = GlitchStrength::Weak;
        } else {
            self.strength = GlitchStrength::Off;
        }
        self.frame += 1;
    }

    fn is_active(&self) -> bool {
        self.strength != GlitchStrength::Off
    }
}

fn swap_channels(color: u32, a: u32, b: u32) -> u32 {
    let ca = (color >> a) & 0xFF;
    let cb = (color >> b) & 0xFF;
    let cleared = color & !(0xFF << a) & !(0xFF << b);
    cleared | ca << b | cb << a
}

fn glitch_pixels(framebuffer: &mut FrameBuffer, rng: &mut StdRng, row_chance: f64) {
    let width = framebuffer.width;
    let height = framebuffer.height;
    if width < 2 || height == 0 {
        return;
    }

    // 克隆原始数据用于读取
    let original_data = framebuffer.data.clone();

    for y in 0..height {
        if rng.random_bool(row_chance) {
            // 水平偏移量，影响若干连续行
            let offset = rng.random_range(-8..8);
            let affect_rows = rng.random_range(1..=10);

            // 行内随机区间 [start_x, end_x)
            let start_x = rng.random_range(0..width);
            let segment_width = rng.random_range(1..=(width / 4).max(1));
            let end_x = (start_x + segment_width).min(width);
            let invert = rng.random_bool(0.3);
            let swap = if !invert && rng.random_bool(0.3) {
                Some(rng.random_range(0..3))
            } else {
                None
            };

            for current_y in (y..y + affect_rows).take_while(|&cy| cy < height) {
                for x in start_x..end_x {
                    let src_x = (x as i32 + offset).clamp(0, width as i32 - 1) as usize;
                    let mut color = original_data[current_y * width + src_x];
                    if invert {
                        color ^= 0x00FFFFFF;
                    } else if let Some(pair) = swap {
                        color = match pair {
                            0 => swap_channels(color, 16, 8),
                            1 => swap_channels(color, 16, 0),
                            _ => swap_channels(color, 8, 0),
                        };
                    }
                    framebuffer.data[current_y * width + x] = color;
                }
            }
        } else {
            // 不偏移的行随机抖动个别像素
            for x in 0..width {
                if rng.random_bool(0.02) {
                    let rand_x = (x as i32 + rng.random_range(-3..3)).clamp(0, width as i32 - 1);
                    let rand_y = (y as i32 + rng.random_range(-1..=1)).clamp(0, height as i32 - 1);
                    framebuffer.data[y * width + x] =
                        original_data[rand_y as usize * width + rand_x as usize];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging_gate() -> TransientEffectGate<Vec<&'static str>> {
        TransientEffectGate::new()
            .on_enter(|log: &mut Vec<&'static str>| {
                log.push("enter");
                Ok(())
            })
            .on_leave(|log: &mut Vec<&'static str>| {
                log.push("leave");
                Ok(())
            })
    }

    #[test]
    fn edges_fire_once_per_streak() {
        let mut gate = logging_gate();
        let mut log = Vec::new();
        let frames = [false, false, true, true, false, true];
        let mut edges = Vec::new();
        for active in frames {
            edges.push(gate.update(active, &mut log).unwrap());
        }

        assert_eq!(log, vec!["enter", "leave", "enter"]);
        assert_eq!(
            edges,
            vec![
                None,
                None,
                Some(GateEdge::Enter),
                None,
                Some(GateEdge::Leave),
                Some(GateEdge::Enter),
            ]
        );
        assert_eq!(gate.state(), GateState::Active);
    }

    #[test]
    fn no_callbacks_is_silent() {
        let mut gate: TransientEffectGate<()> = TransientEffectGate::new();
        for active in [true, false, false, true, true, false] {
            assert!(gate.update(active, &mut ()).is_ok());
        }
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn enter_error_propagates_after_state_change() {
        let mut gate: TransientEffectGate<u32> = TransientEffectGate::new()
            .on_enter(|calls: &mut u32| {
                *calls += 1;
                Err(DioramaError::Callback("boom".into()))
            });
        let mut calls = 0;

        let err = gate.update(true, &mut calls).unwrap_err();
        assert!(matches!(err, DioramaError::Callback(_)));
        assert!(gate.is_fired());

        // 仍处于 Active，不会再次进入
        assert_eq!(gate.update(true, &mut calls).unwrap(), None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn leave_error_propagates_after_state_change() {
        let mut gate: TransientEffectGate<u32> = TransientEffectGate::new()
            .on_enter(|_: &mut u32| Ok(()))
            .on_leave(|calls: &mut u32| {
                *calls += 1;
                Err(DioramaError::Callback("leave".into()))
            });
        let mut calls = 0;

        assert_eq!(gate.update(true, &mut calls).unwrap(), Some(GateEdge::Enter));
        let err = gate.update(false, &mut calls).unwrap_err();
        assert!(matches!(err, DioramaError::Callback(_)));
        assert_eq!(gate.state(), GateState::Idle);

        assert_eq!(gate.update(false, &mut calls).unwrap(), None);
        assert_eq!(calls, 1);
    }

    struct Scripted {
        frames: Vec<bool>,
        cursor: usize,
    }

    impl TransientEffect for Scripted {
        fn advance(&mut self) {
            self.cursor += 1;
        }

        fn is_active(&self) -> bool {
            self.frames[self.cursor - 1]
        }
    }

    #[test]
    fn gated_effect_drives_gate_from_effect() {
        let effect = Scripted {
            frames: vec![false, true, true, false],
            cursor: 0,
        };
        let mut gated = GatedEffect::new(effect, logging_gate());
        let mut log = Vec::new();
        for _ in 0..4 {
            gated.tick(&mut log).unwrap();
        }
        assert_eq!(log, vec!["enter", "leave"]);
        assert_eq!(gated.effect().cursor, 4);
    }

    #[test]
    fn glitch_schedule() {
        let mut glitch = GlitchEffect::new(42);
        glitch.advance();
        assert_eq!(glitch.strength(), GlitchStrength::Strong);

        let trigger = glitch.trigger();
        assert!((120..=240).contains(&trigger));
        for _ in 1..trigger / 5 {
            glitch.advance();
            assert_eq!(glitch.strength(), GlitchStrength::Weak);
        }
        glitch.advance();
        assert!(!glitch.is_active());

        // 走完整个周期再次爆发
        for _ in trigger / 5 + 1..trigger {
            glitch.advance();
            assert!(!glitch.is_active());
        }
        glitch.advance();
        assert_eq!(glitch.strength(), GlitchStrength::Strong);
    }

    #[test]
    fn go_wild_stays_strong() {
        let mut glitch = GlitchEffect::new(1);
        glitch.go_wild = true;
        for _ in 0..50 {
            glitch.advance();
            assert_eq!(glitch.strength(), GlitchStrength::Strong);
        }
    }

    #[test]
    fn inactive_glitch_leaves_pixels() {
        let mut glitch = GlitchEffect::new(3);
        let mut fb = FrameBuffer::new(16, 16);
        fb.clear(0xFF336699);
        glitch.apply(&mut fb);
        assert!(fb.data.iter().all(|&c| c == 0xFF336699));
    }

    #[test]
    fn channel_swap() {
        assert_eq!(swap_channels(0xFF112233, 16, 0), 0xFF332211);
        assert_eq!(swap_channels(0xFF112233, 8, 0), 0xFF113322);
    }
}
