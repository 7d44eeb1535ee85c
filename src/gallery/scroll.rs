/// Horizontal scroll state shared by the input controller and the frame loop.
///
/// Each field has exactly one writer: `target` and `position` are written by
/// [`InputController`](super::InputController), `current` and `last` by the
/// frame update. Neither side performs a read-modify-write on the other's
/// fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    ease: f32,
    current: f32,
    target: f32,
    last: f32,
    position: f32,
}

/// Direction of travel of the track during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl ScrollState {
    pub fn new(ease: f32) -> Self {
        Self {
            ease,
            current: 0.0,
            target: 0.0,
            last: 0.0,
            position: 0.0,
        }
    }

    pub fn ease(&self) -> f32 {
        self.ease
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn last(&self) -> f32 {
        self.last
    }

    /// Scroll value captured when the active drag started.
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Per-frame scroll delta fed to the wave shader.
    pub fn speed(&self) -> f32 {
        self.current - self.last
    }

    pub(crate) fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub(crate) fn set_position(&mut self, position: f32) {
        self.position = position;
    }

    /// Moves `current` one eased step toward `target` and reports which way
    /// the track travelled relative to the previous frame.
    pub(crate) fn advance(&mut self) -> Direction {
        self.current = lerp(self.current, self.target, self.ease);
        if self.current > self.last {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    /// Records the end of a frame.
    pub(crate) fn commit(&mut self) {
        self.last = self.current;
    }
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_eases_toward_target() {
        let mut scroll = ScrollState::new(0.5);
        scroll.set_target(10.0);
        assert_eq!(scroll.advance(), Direction::Right);
        assert_eq!(scroll.current(), 5.0);
        assert_eq!(scroll.speed(), 5.0);
        scroll.commit();
        assert_eq!(scroll.last(), 5.0);
        assert_eq!(scroll.speed(), 0.0);
    }

    #[test]
    fn stationary_frames_count_as_left() {
        let mut scroll = ScrollState::new(0.05);
        assert_eq!(scroll.advance(), Direction::Left);
    }

    #[test]
    fn converges_without_overshoot() {
        let mut scroll = ScrollState::new(0.05);
        scroll.set_target(-4.0);
        for _ in 0..500 {
            assert_eq!(scroll.advance(), Direction::Left);
            scroll.commit();
            assert!(scroll.current() >= -4.0);
        }
        assert!((scroll.current() + 4.0).abs() < 1e-3);
    }
}
