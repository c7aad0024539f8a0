//! Velocity-based scroll interpolation.

/// Interpolates a scroll position towards a target offset.
///
/// `speed = distance / duration`; the position advances on every [`tick`]
/// and snaps to the target on overshoot. A new request arriving while a
/// scroll is in flight first snaps to the previous target.
///
/// [`tick`]: ScrollAnimator::tick
#[derive(Debug, Clone)]
pub struct ScrollAnimator {
    position: f32,
    target: f32,
    /// Units per millisecond.
    speed: f32,
    duration_ms: u32,
    last_tick_ms: Option<u64>,
}

impl ScrollAnimator {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            position: 0.0,
            target: 0.0,
            speed: 0.0,
            duration_ms,
            last_tick_ms: None,
        }
    }

    /// Start scrolling towards `target`.
    ///
    /// Jumps longer than `max_travel` start `max_travel` away from the target.
    pub fn scroll_to(&mut self, target: f32, max_travel: f32) {
        if self.is_animating() {
            self.position = self.target;
        }

        let distance = target - self.position;
        if max_travel > 0.0 && distance.abs() > max_travel {
            self.position = target - max_travel * distance.signum();
        }

        self.target = target;
        if self.duration_ms == 0 {
            self.snap();
        } else {
            self.speed = (self.target - self.position) / self.duration_ms as f32;
        }
    }

    /// Move to `target` without animating.
    pub fn jump_to(&mut self, target: f32) {
        self.target = target;
        self.snap();
    }

    /// Advance by the time elapsed since the previous tick.
    pub fn tick(&mut self, now_ms: u64) {
        let elapsed = self
            .last_tick_ms
            .map(|last| now_ms.saturating_sub(last))
            .unwrap_or(0);
        self.last_tick_ms = Some(now_ms);

        if !self.is_animating() {
            return;
        }

        self.position += self.speed * elapsed as f32;
        let overshot = (self.speed < 0.0 && self.position <= self.target)
            || (self.speed > 0.0 && self.position >= self.target);
        if overshot {
            self.snap();
        }
    }

    fn snap(&mut self) {
        self.position = self.target;
        self.speed = 0.0;
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_animating(&self) -> bool {
        self.speed != 0.0
    }
}
