//! Themed building blocks shared by both pages.

use crate::models::Priority;
use crate::theme::{
    ButtonVariant, DARK_THEME, Pseudo, Style, button_style, card_style, input_style, with_alpha,
};
use crate::view::{Element, Node};

/// Route that dismisses the message boxes.
pub const CLEAR_MESSAGES_ROUTE: &str = "/messages/clear";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpinnerSize {
    Sm,
    #[default]
    Md,
    Lg,
    Xl,
}

impl SpinnerSize {
    #[must_use]
    pub fn dimension(self) -> &'static str {
        match self {
            Self::Sm => "1rem",
            Self::Md => "1.5rem",
            Self::Lg => "2rem",
            Self::Xl => "3rem",
        }
    }
}

#[must_use]
pub fn vstack(gap: &str) -> Element {
    Element::new("div")
        .css("display", "flex")
        .css("flex_direction", "column")
        .css("gap", gap)
}

#[must_use]
pub fn hstack(gap: &str) -> Element {
    Element::new("div")
        .css("display", "flex")
        .css("align_items", "center")
        .css("gap", gap)
}

#[must_use]
pub fn heading(level: &'static str, content: impl Into<String>, size: &str) -> Element {
    Element::new(level)
        .css("font_size", size)
        .css("font_weight", "600")
        .css("color", DARK_THEME.text_primary)
        .css("margin", "0")
        .child(content.into())
}

#[must_use]
pub fn label(content: impl Into<String>, color: &str) -> Element {
    Element::new("span").css("color", color).child(content.into())
}

#[must_use]
pub fn themed_button(content: impl Into<String>, variant: ButtonVariant) -> Element {
    Element::new("button")
        .attr("type", "submit")
        .style(button_style(variant))
        .child(content.into())
}

/// A one-button POST form carrying `fields` as hidden inputs.
#[must_use]
pub fn action_form(action: &str, fields: &[(&str, String)], button: Element) -> Element {
    Element::new("form")
        .attr("method", "post")
        .attr("action", action)
        .css("display", "inline")
        .css("margin", "0")
        .children(fields.iter().map(|(name, value)| {
            Element::new("input")
                .attr("type", "hidden")
                .attr("name", *name)
                .attr("value", value.clone())
                .into()
        }))
        .child(button)
}

#[must_use]
pub fn themed_input(name: &str, placeholder: &str, value: &str) -> Element {
    Element::new("input")
        .attr("type", "text")
        .attr("name", name)
        .attr("placeholder", placeholder)
        .attr("value", value)
        .style(input_style())
}

#[must_use]
pub fn themed_textarea(name: &str, placeholder: &str, value: &str) -> Element {
    Element::new("textarea")
        .attr("name", name)
        .attr("placeholder", placeholder)
        .attr("rows", "3")
        .style(input_style())
        .css("resize", "vertical")
        .css("font_family", "inherit")
        .child(value)
}

/// A `<select>` over `(value, label)` pairs.
#[must_use]
pub fn themed_select(name: &str, options: &[(&str, &str)], selected: &str) -> Element {
    Element::new("select")
        .attr("name", name)
        .style(input_style())
        .children(options.iter().map(|(value, text)| {
            Element::new("option")
                .attr("value", *value)
                .flag("selected", *value == selected)
                .child(*text)
                .into()
        }))
}

#[must_use]
pub fn themed_card(children: impl IntoIterator<Item = Node>) -> Element {
    Element::new("div").style(card_style()).children(children)
}

#[must_use]
pub fn loading_spinner(size: SpinnerSize) -> Element {
    let dim = size.dimension();
    Element::new("div")
        .attr("role", "status")
        .attr("aria-label", "Loading")
        .css("width", dim)
        .css("height", dim)
        .css("border", format!("2px solid {}", DARK_THEME.border))
        .css("border_top", format!("2px solid {}", DARK_THEME.primary))
        .css("border_radius", "50%")
        .css("animation", "spin 1s linear infinite")
}

fn message_box(icon: &str, message: &str, color: &str) -> Element {
    hstack("0.75rem")
        .attr("role", "alert")
        .css("background_color", with_alpha(color, "20"))
        .css("border", format!("1px solid {color}"))
        .css("border_radius", "8px")
        .css("padding", "1rem")
        .css("color", color)
        .child(label(icon, color))
        .child(label(message, color).css("flex", "1"))
        .child(action_form(
            CLEAR_MESSAGES_ROUTE,
            &[],
            Element::new("button")
                .attr("type", "submit")
                .attr("aria-label", "Dismiss")
                .css("background", "none")
                .css("border", "none")
                .css("cursor", "pointer")
                .css("color", color)
                .child("×"),
        ))
}

#[must_use]
pub fn error_message(message: &str) -> Element {
    message_box("⚠", message, DARK_THEME.error)
}

#[must_use]
pub fn success_message(message: &str) -> Element {
    message_box("✓", message, DARK_THEME.success)
}

#[must_use]
pub fn page_header(title: &str, subtitle: Option<&str>) -> Element {
    vstack("0.5rem")
        .css("align_items", "center")
        .css("text_align", "center")
        .css("margin_bottom", "2rem")
        .child(
            heading("h1", title, "2.5rem")
                .css("font_weight", "bold")
                .css("background", format!(
                    "linear-gradient(135deg, {}, {})",
                    DARK_THEME.primary, DARK_THEME.accent
                ))
                .css("background_clip", "text")
                .css("-webkit-background-clip", "text")
                .css("color", "transparent"),
        )
        .maybe_child(subtitle.map(|s| {
            Element::new("p")
                .css("font_size", "1.125rem")
                .css("color", DARK_THEME.text_secondary)
                .css("margin", "0")
                .child(s)
        }))
}

/// Top bar with the app name and `(label, href)` links.
#[must_use]
pub fn navigation_bar(brand: &str, links: &[(&str, &str)]) -> Element {
    Element::new("nav")
        .css("display", "flex")
        .css("justify_content", "space-between")
        .css("align_items", "center")
        .css("padding", "1rem 2rem")
        .css("background_color", DARK_THEME.surface)
        .css("border_bottom", format!("1px solid {}", DARK_THEME.border))
        .child(heading("h2", brand, "1.5rem").css("font_weight", "bold"))
        .child(hstack("1.5rem").children(links.iter().map(|(text, href)| {
            Element::new("a")
                .attr("href", *href)
                .style(
                    Style::new()
                        .set("color", DARK_THEME.text_secondary)
                        .set("text_decoration", "none")
                        .on(Pseudo::Hover, "color", DARK_THEME.text_primary),
                )
                .child(*text)
                .into()
        })))
}

/// Dashed placeholder box shown when a list is empty.
#[must_use]
pub fn empty_state(message: &str) -> Element {
    Element::new("div")
        .css("border", format!("2px dashed {}", DARK_THEME.border))
        .css("border_radius", "12px")
        .css("padding", "2rem")
        .css("text_align", "center")
        .css("color", DARK_THEME.text_muted)
        .child(message)
}

#[must_use]
pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => DARK_THEME.text_muted,
        Priority::Medium => DARK_THEME.warning,
        Priority::High => DARK_THEME.error,
    }
}

#[must_use]
pub fn priority_badge(priority: Priority) -> Element {
    let color = priority_color(priority);
    Element::new("span")
        .css("background_color", with_alpha(color, "20"))
        .css("color", color)
        .css("border", format!("1px solid {color}"))
        .css("border_radius", "9999px")
        .css("padding", "0.125rem 0.625rem")
        .css("font_size", "0.75rem")
        .css("text_transform", "uppercase")
        .child(priority.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::render_fragment;

    #[test]
    fn test_spinner_sizes() {
        assert_eq!(loading_spinner(SpinnerSize::Sm).style.get("width"), Some("1rem"));
        assert_eq!(loading_spinner(SpinnerSize::Md).style.get("height"), Some("1.5rem"));
        assert_eq!(loading_spinner(SpinnerSize::Lg).style.get("width"), Some("2rem"));
        assert_eq!(loading_spinner(SpinnerSize::Xl).style.get("width"), Some("3rem"));
    }

    #[test]
    fn test_priority_badge_colors() {
        assert_eq!(priority_color(Priority::Low), DARK_THEME.text_muted);
        assert_eq!(priority_color(Priority::Medium), DARK_THEME.warning);
        let badge = priority_badge(Priority::High);
        assert_eq!(badge.style.get("color"), Some(DARK_THEME.error));
        assert_eq!(Node::from(badge).text_content(), "high");
    }

    #[test]
    fn test_action_form_hidden_fields() {
        let form = action_form(
            "/todos/toggle",
            &[("id", "7".to_string())],
            themed_button("Toggle", ButtonVariant::Outline),
        );
        let (html, rules) = render_fragment(&form.into());
        assert!(html.contains("method=\"post\""));
        assert!(html.contains("action=\"/todos/toggle\""));
        assert!(html.contains("<input name=\"id\" type=\"hidden\" value=\"7\">"));
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_select_marks_selected_option() {
        let select = themed_select("priority", &[("low", "Low"), ("high", "High")], "high");
        let (html, _) = render_fragment(&select.into());
        assert!(html.contains("<option value=\"low\">Low</option>"));
        assert!(html.contains("<option selected value=\"high\">High</option>"));
    }

    #[test]
    fn test_message_boxes_carry_dismiss_form() {
        let node: Node = error_message("Title is required").into();
        assert!(node.text_content().contains("Title is required"));
        let form = node.find(&|el| el.tag == "form").unwrap();
        assert_eq!(form.attrs["action"], CLEAR_MESSAGES_ROUTE);

        let ok = success_message("Saved");
        assert_eq!(ok.style.get("color"), Some(DARK_THEME.success));
    }

    #[test]
    fn test_empty_state_is_dashed() {
        let el = empty_state("No todos found");
        assert_eq!(
            el.style.get("border"),
            Some(format!("2px dashed {}", DARK_THEME.border).as_str())
        );
    }
}
