//! Device classification and the tuning constants that depend on it.
//!
//! Every mobile/desktop difference in the gallery lives in [`DeviceProfile`],
//! which is built once when a gallery mounts and then handed to the scene,
//! the media layout and the input controller.

use crate::config::CardSize;

/// Viewports at or below this width are treated as mobile.
pub const MOBILE_BREAKPOINT_PX: u32 = 768;

const MOBILE_USER_AGENTS: &[&str] = &[
    "Android",
    "webOS",
    "iPhone",
    "iPad",
    "iPod",
    "BlackBerry",
    "IEMobile",
    "Opera Mini",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    /// Classifies a device from its viewport width and, when running in a
    /// browser, its user agent string.
    pub fn detect(viewport_width: u32, user_agent: Option<&str>) -> Self {
        let narrow = viewport_width <= MOBILE_BREAKPOINT_PX;
        let mobile_agent = user_agent
            .map(|agent| MOBILE_USER_AGENTS.iter().any(|needle| agent.contains(needle)))
            .unwrap_or(false);
        if narrow || mobile_agent {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Mobile => "mobile",
        }
    }
}

/// Subdivision of the image plane mesh used by the wave vertex shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneSegments {
    pub width: u32,
    pub height: u32,
}

/// Base plane dimensions for one card size preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardDimensions {
    pub width: f32,
    pub height: f32,
    pub reference_height: f32,
    pub padding: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTable {
    pub small: CardDimensions,
    pub normal: CardDimensions,
    pub large: CardDimensions,
}

impl CardTable {
    pub fn get(&self, size: CardSize) -> CardDimensions {
        match size {
            CardSize::Small => self.small,
            CardSize::Normal => self.normal,
            CardSize::Large => self.large,
        }
    }
}

/// Velocity kick applied when a touch drag is released quickly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertia {
    /// Minimum release speed in px/ms.
    pub threshold: f32,
    /// Scroll units added per px/ms of release speed.
    pub factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleTuning {
    /// Caption plane height as a fraction of the image plane height.
    pub height_ratio: f32,
    pub font_scale: f32,
}

/// Tuning constants selected from the device class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceProfile {
    pub class: DeviceClass,
    pub fov_degrees: f32,
    pub segments: PlaneSegments,
    pub scroll_ease: f32,
    pub drag_sensitivity: f32,
    pub wheel_multiplier: f32,
    pub drag_settle_delay_ms: f64,
    pub wheel_debounce_ms: f64,
    pub inertia: Option<Inertia>,
    pub cards: CardTable,
    pub title: TitleTuning,
}

impl DeviceProfile {
    pub const DESKTOP: DeviceProfile = DeviceProfile {
        class: DeviceClass::Desktop,
        fov_degrees: 45.0,
        segments: PlaneSegments {
            width: 100,
            height: 50,
        },
        scroll_ease: 0.05,
        drag_sensitivity: 0.05,
        wheel_multiplier: 0.004,
        drag_settle_delay_ms: 120.0,
        wheel_debounce_ms: 200.0,
        inertia: None,
        cards: CardTable {
            small: card(500.0, 650.0, 1500.0, 1.5),
            normal: card(700.0, 900.0, 1500.0, 2.0),
            large: card(900.0, 1150.0, 1500.0, 2.5),
        },
        title: TitleTuning {
            height_ratio: 0.15,
            font_scale: 1.0,
        },
    };

    pub const MOBILE: DeviceProfile = DeviceProfile {
        class: DeviceClass::Mobile,
        fov_degrees: 60.0,
        segments: PlaneSegments {
            width: 40,
            height: 20,
        },
        scroll_ease: 0.08,
        drag_sensitivity: 0.03,
        wheel_multiplier: 0.002,
        drag_settle_delay_ms: 60.0,
        wheel_debounce_ms: 100.0,
        inertia: Some(Inertia {
            threshold: 0.3,
            factor: 6.0,
        }),
        cards: CardTable {
            small: card(400.0, 520.0, 1200.0, 0.8),
            normal: card(550.0, 720.0, 1200.0, 1.0),
            large: card(700.0, 900.0, 1200.0, 1.3),
        },
        title: TitleTuning {
            height_ratio: 0.12,
            font_scale: 0.8,
        },
    };

    pub fn for_class(class: DeviceClass) -> Self {
        match class {
            DeviceClass::Desktop => Self::DESKTOP,
            DeviceClass::Mobile => Self::MOBILE,
        }
    }

    pub fn detect(viewport_width: u32, user_agent: Option<&str>) -> Self {
        Self::for_class(DeviceClass::detect(viewport_width, user_agent))
    }

    pub fn is_touch(&self) -> bool {
        self.class == DeviceClass::Mobile
    }
}

const fn card(width: f32, height: f32, reference_height: f32, padding: f32) -> CardDimensions {
    CardDimensions {
        width,
        height,
        reference_height,
        padding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_viewports_are_mobile() {
        assert_eq!(DeviceClass::detect(768, None), DeviceClass::Mobile);
        assert_eq!(DeviceClass::detect(769, None), DeviceClass::Desktop);
    }

    #[test]
    fn mobile_user_agents_win_over_width() {
        let agent = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        assert_eq!(DeviceClass::detect(1366, Some(agent)), DeviceClass::Mobile);
        let desktop = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";
        assert_eq!(DeviceClass::detect(1366, Some(desktop)), DeviceClass::Desktop);
    }

    #[test]
    fn profiles_differ_where_touch_matters() {
        let desktop = DeviceProfile::DESKTOP;
        let mobile = DeviceProfile::MOBILE;
        assert!(mobile.fov_degrees > desktop.fov_degrees);
        assert!(mobile.drag_sensitivity < desktop.drag_sensitivity);
        assert!(mobile.wheel_debounce_ms < desktop.wheel_debounce_ms);
        assert!(mobile.drag_settle_delay_ms < desktop.drag_settle_delay_ms);
        assert!(mobile.inertia.is_some() && desktop.inertia.is_none());
        for size in CardSize::ALL {
            assert_ne!(desktop.cards.get(size).padding, mobile.cards.get(size).padding);
        }
    }
}
