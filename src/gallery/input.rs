use crate::device::DeviceProfile;

use super::scroll::ScrollState;

/// Weight of the newest sample in the smoothed drag velocity.
const VELOCITY_SMOOTHING: f32 = 0.8;

/// Why a settle pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleReason {
    Release,
    Wheel,
}

/// A request to snap the scroll target after `delay_ms`.
///
/// Scheduling a new request replaces any pending one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleRequest {
    pub reason: SettleReason,
    pub delay_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    start_x: f32,
    last_x: f32,
    last_time_ms: f64,
    velocity: f32,
}

/// Turns pointer, touch and wheel input into scroll target updates.
///
/// Handlers only ever write `target` and `position` of the [`ScrollState`];
/// `current` belongs to the frame loop.
#[derive(Debug, Clone)]
pub struct InputController {
    profile: DeviceProfile,
    drag: Option<Drag>,
}

impl InputController {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Smoothed drag velocity in px/ms, zero when idle.
    pub fn velocity(&self) -> f32 {
        self.drag.map(|drag| drag.velocity).unwrap_or(0.0)
    }

    pub fn pointer_down(&mut self, x: f32, now_ms: f64, scroll: &mut ScrollState) {
        scroll.set_position(scroll.current());
        self.drag = Some(Drag {
            start_x: x,
            last_x: x,
            last_time_ms: now_ms,
            velocity: 0.0,
        });
    }

    pub fn pointer_move(&mut self, x: f32, now_ms: f64, scroll: &mut ScrollState) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let elapsed = (now_ms - drag.last_time_ms) as f32;
        if elapsed > 0.0 {
            let instant = (x - drag.last_x) / elapsed;
            drag.velocity =
                instant * VELOCITY_SMOOTHING + drag.velocity * (1.0 - VELOCITY_SMOOTHING);
        }
        drag.last_x = x;
        drag.last_time_ms = now_ms;

        let distance = (drag.start_x - x) * self.profile.drag_sensitivity;
        scroll.set_target(scroll.position() + distance);
    }

    /// Ends a drag. Fast touch releases carry on with an inertia kick before
    /// the settle pass is scheduled.
    pub fn pointer_up(&mut self, scroll: &mut ScrollState) -> Option<SettleRequest> {
        let drag = self.drag.take()?;
        if let Some(inertia) = self.profile.inertia {
            if drag.velocity.abs() > inertia.threshold {
                scroll.set_target(scroll.target() + drag.velocity * -inertia.factor);
            }
        }
        Some(SettleRequest {
            reason: SettleReason::Release,
            delay_ms: self.profile.drag_settle_delay_ms,
        })
    }

    pub fn wheel(&mut self, delta_y: f32, scroll: &mut ScrollState) -> SettleRequest {
        scroll.set_target(scroll.target() + delta_y * self.profile.wheel_multiplier);
        SettleRequest {
            reason: SettleReason::Wheel,
            delay_ms: self.profile.wheel_debounce_ms,
        }
    }

    /// Snaps the target to the nearest multiple of `unit`, keeping its sign.
    ///
    /// Reads the target at call time, so a settle that fires after further
    /// input snaps the newest value.
    pub fn settle(scroll: &mut ScrollState, unit: f32) {
        if unit <= 0.0 {
            return;
        }
        let target = scroll.target();
        let item = (target.abs() / unit).round() * unit;
        scroll.set_target(if target < 0.0 { -item } else { item });
    }
}
