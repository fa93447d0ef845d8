use serde::{Deserialize, Serialize};

use crate::{
    damage::FlushPolicy,
    error::{Error, Result},
    geom::Insets,
    render::Color,
};

/// Serde mirror of [`Insets`], which lives in a crate without serde.
#[derive(Serialize, Deserialize)]
#[serde(remote = "Insets")]
struct InsetsDef {
    /// Left edge.
    left: u32,
    /// Top edge.
    top: u32,
    /// Right edge.
    right: u32,
    /// Bottom edge.
    bottom: u32,
}

/// Decoration metrics and colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Frame thickness around framed windows.
    #[serde(with = "InsetsDef")]
    pub insets: Insets,
    /// Width of one title glyph, used to size the title hit area.
    pub glyph_width: u32,
    /// Frame fill for unfocused windows.
    pub frame_color: Color,
    /// Frame fill for the window holding native focus.
    pub focused_frame_color: Color,
    /// Title text color.
    pub title_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            insets: Insets::new(2, 20, 2, 2),
            glyph_width: 8,
            frame_color: Color::rgb(0x60, 0x60, 0x60),
            focused_frame_color: Color::rgb(0x30, 0x50, 0x90),
            title_color: Color::rgb(0xff, 0xff, 0xff),
        }
    }
}

/// Toolkit settings. Every field has a default, so a partial JSON document
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum distinct damage regions per window.
    pub damage_capacity: usize,
    /// How queued damage becomes draw passes.
    pub flush_policy: FlushPolicy,
    /// Minimum time between two flushes while events keep arriving.
    pub min_flush_interval_ms: u64,
    /// Two title clicks closer than this toggle minimization.
    pub double_click_ms: u64,
    /// Side of the square bottom-right resize handle.
    pub resize_corner: u32,
    /// Decoration settings.
    pub theme: Theme,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            damage_capacity: 8,
            flush_policy: FlushPolicy::default(),
            min_flush_interval_ms: 16,
            double_click_ms: 400,
            resize_corner: 12,
            theme: Theme::default(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON configuration.
    pub fn from_json(s: &str) -> Result<Self> {
        let c: Self = serde_json::from_str(s)?;
        c.validate()?;
        Ok(c)
    }

    /// Reject settings the toolkit cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.damage_capacity == 0 {
            return Err(Error::InvalidArgument(
                "damage_capacity must be positive".into(),
            ));
        }
        if self.theme.glyph_width == 0 {
            return Err(Error::InvalidArgument(
                "theme.glyph_width must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_documents_fill_defaults() -> Result<()> {
        let c = Config::from_json(r#"{"damage_capacity": 3, "flush_policy": "individual"}"#)?;
        assert_eq!(c.damage_capacity, 3);
        assert_eq!(c.flush_policy, FlushPolicy::Individual);
        assert_eq!(c.theme, Theme::default());
        assert_eq!(c.double_click_ms, 400);

        let c = Config::from_json(r#"{"theme": {"insets": {"left": 1, "top": 1, "right": 1, "bottom": 1}}}"#)?;
        assert_eq!(c.theme.insets, Insets::new(1, 1, 1, 1));
        assert_eq!(c.theme.glyph_width, 8);
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_json(r#"{"damage_capacity": 0}"#),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Config::from_json("{not json"),
            Err(Error::Config(_))
        ));
    }
}
