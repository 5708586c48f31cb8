//! Dark palette tokens and the style builders every component draws from.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub background: &'static str,
    pub surface: &'static str,
    pub surface_variant: &'static str,
    pub primary: &'static str,
    pub primary_variant: &'static str,
    pub secondary: &'static str,
    pub secondary_variant: &'static str,
    pub accent: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub success: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub text_muted: &'static str,
    pub border: &'static str,
    pub border_light: &'static str,
}

pub const DARK_THEME: Palette = Palette {
    background: "#0a0a0a",
    surface: "#1a1a1a",
    surface_variant: "#2a2a2a",
    primary: "#3b82f6",
    primary_variant: "#1d4ed8",
    secondary: "#10b981",
    secondary_variant: "#059669",
    accent: "#8b5cf6",
    error: "#ef4444",
    warning: "#f59e0b",
    success: "#10b981",
    text_primary: "#ffffff",
    text_secondary: "#a1a1aa",
    text_muted: "#71717a",
    border: "#27272a",
    border_light: "#3f3f46",
};

pub const FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

/// Append a two-digit hex alpha to a `#rrggbb` color.
#[must_use]
pub fn with_alpha(color: &str, alpha: &str) -> String {
    format!("{color}{alpha}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pseudo {
    Hover,
    Focus,
    Placeholder,
}

impl Pseudo {
    #[must_use]
    pub fn selector_suffix(self) -> &'static str {
        match self {
            Self::Hover => ":hover",
            Self::Focus => ":focus",
            Self::Placeholder => "::placeholder",
        }
    }
}

/// Style properties keyed in snake_case, plus per-pseudo-state overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Style {
    pub props: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub states: BTreeMap<Pseudo, BTreeMap<String, String>>,
}

impl Style {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn on(mut self, state: Pseudo, key: &str, value: impl Into<String>) -> Self {
        self.states
            .entry(state)
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    /// Overlay `other` on top of `self`; `other` wins on conflicting keys.
    #[must_use]
    pub fn merge(mut self, other: Style) -> Self {
        self.props.extend(other.props);
        for (state, props) in other.states {
            self.states.entry(state).or_default().extend(props);
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty() && self.states.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }
}

/// Render snake_case properties as a CSS declaration list.
#[must_use]
pub fn css_declarations(props: &BTreeMap<String, String>) -> String {
    props
        .iter()
        .map(|(k, v)| format!("{}: {v}", k.replace('_', "-")))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ButtonVariant {
    #[default]
    Primary,
    Secondary,
    Outline,
}

#[must_use]
pub fn base_style() -> Style {
    Style::new()
        .set("background_color", DARK_THEME.background)
        .set("color", DARK_THEME.text_primary)
        .set("font_family", FONT_FAMILY)
}

#[must_use]
pub fn container_style() -> Style {
    Style::new()
        .set("background_color", DARK_THEME.surface)
        .set("border_radius", "12px")
        .set("border", format!("1px solid {}", DARK_THEME.border))
        .set("padding", "1.5rem")
        .set("box_shadow", "0 4px 6px -1px rgb(0 0 0 / 0.1)")
}

#[must_use]
pub fn button_style(variant: ButtonVariant) -> Style {
    let base = Style::new()
        .set("border_radius", "8px")
        .set("padding", "0.75rem 1.5rem")
        .set("font_weight", "500")
        .set("transition", "all 0.2s ease")
        .set("border", "none")
        .set("cursor", "pointer")
        .on(Pseudo::Hover, "transform", "translateY(-1px)");

    match variant {
        ButtonVariant::Primary => base
            .set("background_color", DARK_THEME.primary)
            .set("color", "white")
            .on(Pseudo::Hover, "background_color", DARK_THEME.primary_variant),
        ButtonVariant::Secondary => base
            .set("background_color", DARK_THEME.secondary)
            .set("color", "white")
            .on(Pseudo::Hover, "background_color", DARK_THEME.secondary_variant),
        ButtonVariant::Outline => base
            .set("background_color", "transparent")
            .set("color", DARK_THEME.text_primary)
            .set("border", format!("1px solid {}", DARK_THEME.border_light))
            .on(Pseudo::Hover, "background_color", DARK_THEME.surface_variant),
    }
}

#[must_use]
pub fn input_style() -> Style {
    Style::new()
        .set("background_color", DARK_THEME.surface_variant)
        .set("border", format!("1px solid {}", DARK_THEME.border_light))
        .set("border_radius", "8px")
        .set("padding", "0.75rem 1rem")
        .set("color", DARK_THEME.text_primary)
        .on(Pseudo::Placeholder, "color", DARK_THEME.text_muted)
        .on(Pseudo::Focus, "border_color", DARK_THEME.primary)
        .on(Pseudo::Focus, "outline", "none")
        .on(
            Pseudo::Focus,
            "box_shadow",
            format!("0 0 0 3px {}", with_alpha(DARK_THEME.primary, "20")),
        )
}

#[must_use]
pub fn card_style() -> Style {
    Style::new()
        .set("background_color", DARK_THEME.surface)
        .set("border", format!("1px solid {}", DARK_THEME.border))
        .set("border_radius", "12px")
        .set("padding", "1.5rem")
        .set(
            "box_shadow",
            "0 4px 6px -1px rgb(0 0 0 / 0.1), 0 2px 4px -1px rgb(0 0 0 / 0.06)",
        )
        .on(
            Pseudo::Hover,
            "box_shadow",
            "0 10px 15px -3px rgb(0 0 0 / 0.1), 0 4px 6px -2px rgb(0 0 0 / 0.05)",
        )
        .on(Pseudo::Hover, "transform", "translateY(-2px)")
        .on(Pseudo::Hover, "transition", "all 0.2s ease")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_variants_differ_in_background() {
        let primary = button_style(ButtonVariant::Primary);
        let outline = button_style(ButtonVariant::Outline);
        assert_eq!(primary.get("background_color"), Some(DARK_THEME.primary));
        assert_eq!(outline.get("background_color"), Some("transparent"));
        assert_eq!(
            outline.get("border"),
            Some(format!("1px solid {}", DARK_THEME.border_light).as_str())
        );
    }

    #[test]
    fn test_hover_state_keeps_shared_transform() {
        let secondary = button_style(ButtonVariant::Secondary);
        let hover = &secondary.states[&Pseudo::Hover];
        assert_eq!(hover["transform"], "translateY(-1px)");
        assert_eq!(hover["background_color"], DARK_THEME.secondary_variant);
    }

    #[test]
    fn test_merge_overrides_and_extends() {
        let merged = button_style(ButtonVariant::Outline).merge(
            Style::new()
                .set("color", DARK_THEME.error)
                .on(Pseudo::Hover, "background_color", "#ef444410"),
        );
        assert_eq!(merged.get("color"), Some(DARK_THEME.error));
        let hover = &merged.states[&Pseudo::Hover];
        assert_eq!(hover["background_color"], "#ef444410");
        assert_eq!(hover["transform"], "translateY(-1px)");
    }

    #[test]
    fn test_css_declarations_kebab_case() {
        let style = Style::new()
            .set("background_color", "#000")
            .set("padding", "1rem");
        assert_eq!(
            css_declarations(&style.props),
            "background-color: #000; padding: 1rem"
        );
    }

    #[test]
    fn test_input_focus_ring_uses_alpha() {
        let focus = &input_style().states[&Pseudo::Focus];
        assert_eq!(focus["box_shadow"], "0 0 0 3px #3b82f620");
    }
}
