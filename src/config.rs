use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading gallery options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest {path}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown card size `{0}` (expected small, normal or large)")]
    CardSize(String),
    #[error("invalid color `{0}`")]
    Color(String),
    #[error("invalid font `{0}`: expected a size such as `24px`")]
    Font(String),
}

/// One image card supplied by the hosting page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub text: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GalleryItem {
    pub fn new(text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: image.into(),
            description: None,
        }
    }
}

/// Card size preset selecting the base plane dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    Small,
    #[default]
    Normal,
    Large,
}

impl CardSize {
    pub const ALL: [CardSize; 3] = [CardSize::Small, CardSize::Normal, CardSize::Large];

    pub fn next(self) -> Self {
        match self {
            CardSize::Small => CardSize::Normal,
            CardSize::Normal => CardSize::Large,
            CardSize::Large => CardSize::Small,
        }
    }
}

impl FromStr for CardSize {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "small" => Ok(CardSize::Small),
            "normal" => Ok(CardSize::Normal),
            "large" => Ok(CardSize::Large),
            _ => Err(ConfigError::CardSize(value.to_string())),
        }
    }
}

impl fmt::Display for CardSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CardSize::Small => "small",
            CardSize::Normal => "normal",
            CardSize::Large => "large",
        })
    }
}

/// Visual configuration of a gallery. Any change forces a full remount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryConfig {
    pub bend: f32,
    pub text_color: String,
    pub border_radius: f32,
    pub font: String,
    pub font_file: Option<String>,
    pub spacing: Option<f32>,
    pub card_size: CardSize,
}

pub const DEFAULT_FONT: &str = "bold 24px 'Inter', sans-serif";

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            bend: -2.0,
            text_color: "#ffffff".to_string(),
            border_radius: 0.05,
            font: DEFAULT_FONT.to_string(),
            font_file: None,
            spacing: None,
            card_size: CardSize::Normal,
        }
    }
}

/// Items plus configuration, the full input of a gallery widget.
///
/// Items are shared behind an [`Arc`] so that identity comparison decides
/// whether a new set of options replaces the mounted gallery.
#[derive(Debug, Clone)]
pub struct GalleryOptions {
    pub items: Arc<[GalleryItem]>,
    pub config: GalleryConfig,
}

impl GalleryOptions {
    pub fn new(items: Vec<GalleryItem>, config: GalleryConfig) -> Self {
        Self {
            items: Arc::from(items),
            config,
        }
    }

    /// Returns true when `other` would render a different gallery.
    pub fn requires_remount(&self, other: &GalleryOptions) -> bool {
        !Arc::ptr_eq(&self.items, &other.items) || self.config != other.config
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Manifest {
    Items(Vec<GalleryItem>),
    Full {
        items: Vec<GalleryItem>,
        #[serde(flatten)]
        config: GalleryConfig,
    },
}

impl GalleryOptions {
    /// Parses a manifest that is either a bare item array or an object with
    /// `items` and configuration keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let manifest: Manifest = serde_json::from_str(json)?;
        Ok(match manifest {
            Manifest::Items(items) => Self::new(items, GalleryConfig::default()),
            Manifest::Full { items, config } => Self::new(items, config),
        })
    }

    /// Loads a manifest from disk, resolving relative image and font paths
    /// against the manifest's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let options = Self::from_json(&json).map_err(|source| ConfigError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(options.resolved_against(base))
    }

    fn resolved_against(self, base: &Path) -> Self {
        let items: Vec<GalleryItem> = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.image = resolve_source(base, &item.image);
                item
            })
            .collect();
        let mut config = self.config;
        config.font_file = config.font_file.map(|file| resolve_source(base, &file));
        Self::new(items, config)
    }
}

fn resolve_source(base: &Path, source: &str) -> String {
    if is_remote(source) || Path::new(source).is_absolute() {
        return source.to_string();
    }
    base.join(source).to_string_lossy().into_owned()
}

/// Returns true for sources that must be fetched over the network.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://") || source.starts_with("//")
}

/// Parses a CSS-like color (`#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`
/// or a handful of names) into RGBA bytes.
pub fn parse_color(value: &str) -> Result<[u8; 4], ConfigError> {
    let trimmed = value.trim();
    let invalid = || ConfigError::Color(value.to_string());
    if let Some(hex) = trimmed.strip_prefix('#') {
        let expand = |c: u8| -> Result<u8, ConfigError> {
            let digit = (c as char).to_digit(16).ok_or_else(invalid)? as u8;
            Ok(digit * 17)
        };
        let pair = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        return match hex.len() {
            3 => {
                let bytes = hex.as_bytes();
                Ok([expand(bytes[0])?, expand(bytes[1])?, expand(bytes[2])?, 255])
            }
            6 | 8 if hex.is_ascii() => {
                let alpha = if hex.len() == 8 { pair(&hex[6..8])? } else { 255 };
                Ok([pair(&hex[0..2])?, pair(&hex[2..4])?, pair(&hex[4..6])?, alpha])
            }
            _ => Err(invalid()),
        };
    }
    if let Some(body) = trimmed
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels = body
            .split(',')
            .map(|part| part.trim().parse::<u8>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        return match channels.as_slice() {
            [r, g, b] => Ok([*r, *g, *b, 255]),
            _ => Err(invalid()),
        };
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "white" => Ok([255, 255, 255, 255]),
        "black" => Ok([0, 0, 0, 255]),
        "red" => Ok([255, 0, 0, 255]),
        "green" => Ok([0, 128, 0, 255]),
        "blue" => Ok([0, 0, 255, 255]),
        _ => Err(invalid()),
    }
}

/// Parsed form of a CSS font shorthand such as `bold 24px 'Inter', sans-serif`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub bold: bool,
    pub size_px: f32,
    pub family: String,
}

impl FromStr for FontSpec {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut bold = false;
        let mut size_px = None;
        let mut tokens = value.split_whitespace();
        for token in tokens.by_ref() {
            if let Some(size) = token.strip_suffix("px") {
                let size = size
                    .parse::<f32>()
                    .map_err(|_| ConfigError::Font(value.to_string()))?;
                size_px = Some(size);
                break;
            }
            match token {
                "bold" | "bolder" => bold = true,
                weight => {
                    if let Ok(weight) = weight.parse::<u32>() {
                        bold = weight >= 600;
                    }
                }
            }
        }
        let size_px = size_px
            .filter(|size| *size > 0.0)
            .ok_or_else(|| ConfigError::Font(value.to_string()))?;
        let family = tokens.collect::<Vec<_>>().join(" ");
        Ok(Self {
            bold,
            size_px,
            family,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_item_array() {
        let options =
            GalleryOptions::from_json(r#"[{"text": "A", "image": "a.png"}]"#).unwrap();
        assert_eq!(options.items.len(), 1);
        assert_eq!(options.config, GalleryConfig::default());
    }

    #[test]
    fn parses_full_manifest_with_camel_case_keys() {
        let json = r##"{
            "items": [{"text": "A", "image": "a.png", "description": "first"}],
            "bend": 0,
            "textColor": "#000",
            "cardSize": "large",
            "spacing": 3.5
        }"##;
        let options = GalleryOptions::from_json(json).unwrap();
        assert_eq!(options.items[0].description.as_deref(), Some("first"));
        assert_eq!(options.config.bend, 0.0);
        assert_eq!(options.config.text_color, "#000");
        assert_eq!(options.config.card_size, CardSize::Large);
        assert_eq!(options.config.spacing, Some(3.5));
        assert_eq!(options.config.border_radius, 0.05);
    }

    #[test]
    fn resolves_relative_paths_but_keeps_urls() {
        let options = GalleryOptions::new(
            vec![
                GalleryItem::new("A", "img/a.png"),
                GalleryItem::new("B", "https://cdn.example.com/b.png"),
            ],
            GalleryConfig {
                font_file: Some("fonts/Inter.ttf".into()),
                ..GalleryConfig::default()
            },
        )
        .resolved_against(Path::new("/site"));
        assert_eq!(options.items[0].image, "/site/img/a.png");
        assert_eq!(options.items[1].image, "https://cdn.example.com/b.png");
        assert_eq!(options.config.font_file.as_deref(), Some("/site/fonts/Inter.ttf"));
    }

    #[test]
    fn remount_follows_item_identity_and_config() {
        let options = GalleryOptions::new(
            vec![GalleryItem::new("A", "a.png")],
            GalleryConfig::default(),
        );
        let same = options.clone();
        assert!(!options.requires_remount(&same));

        let copied_items = GalleryOptions::new(options.items.to_vec(), options.config.clone());
        assert!(options.requires_remount(&copied_items));

        let mut bent = options.clone();
        bent.config.bend = 3.0;
        assert!(options.requires_remount(&bent));
    }

    #[test]
    fn parses_colors() {
        assert_eq!(parse_color("#ffffff").unwrap(), [255, 255, 255, 255]);
        assert_eq!(parse_color("#f00").unwrap(), [255, 0, 0, 255]);
        assert_eq!(parse_color("#11223380").unwrap(), [0x11, 0x22, 0x33, 0x80]);
        assert_eq!(parse_color("rgb(1, 2, 3)").unwrap(), [1, 2, 3, 255]);
        assert_eq!(parse_color("Black").unwrap(), [0, 0, 0, 255]);
        assert!(parse_color("#12").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn parses_font_shorthand() {
        let font: FontSpec = DEFAULT_FONT.parse().unwrap();
        assert!(font.bold);
        assert_eq!(font.size_px, 24.0);
        assert_eq!(font.family, "'Inter', sans-serif");

        let light: FontSpec = "300 18px monospace".parse().unwrap();
        assert!(!light.bold);
        assert_eq!(light.size_px, 18.0);

        assert!("bold monospace".parse::<FontSpec>().is_err());
    }

    #[test]
    fn card_size_parses_case_insensitively() {
        assert_eq!("LARGE".parse::<CardSize>().unwrap(), CardSize::Large);
        assert!("huge".parse::<CardSize>().is_err());
        assert_eq!(CardSize::Large.next(), CardSize::Small);
    }
}
