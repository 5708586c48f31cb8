//! The task manager page, projected from a [`TodoSession`].

use crate::components::{
    SpinnerSize, action_form, empty_state, error_message, heading, hstack, label,
    loading_spinner, navigation_bar, page_header, priority_badge, success_message, themed_button,
    themed_card, themed_input, themed_select, themed_textarea, vstack,
};
use crate::models::Todo;
use crate::theme::{ButtonVariant, DARK_THEME, Pseudo, Style, base_style};
use crate::todo::TodoSession;
use crate::view::{Element, Node};

pub const TITLE: &str = "Task Manager";

pub const ADD_ROUTE: &str = "/todos";
pub const FILTER_ROUTE: &str = "/filters";

#[must_use]
pub fn toggle_route(id: i64) -> String {
    format!("/todos/{id}/toggle")
}

#[must_use]
pub fn delete_route(id: i64) -> String {
    format!("/todos/{id}/delete")
}

const PRIORITY_OPTIONS: &[(&str, &str)] = &[("low", "Low"), ("medium", "Medium"), ("high", "High")];

fn add_form(session: &TodoSession) -> Node {
    let submit =
        themed_button("Add Task", ButtonVariant::Primary).flag("disabled", session.is_loading);

    themed_card([
        heading("h3", "Add New Task", "1.25rem").into(),
        Element::new("form")
            .attr("method", "post")
            .attr("action", ADD_ROUTE)
            .css("display", "flex")
            .css("flex_direction", "column")
            .css("gap", "1rem")
            .css("margin_top", "1rem")
            .child(themed_input("title", "What needs to be done?", &session.new_todo_title))
            .child(themed_textarea(
                "description",
                "Add a description (optional)",
                &session.new_todo_description,
            ))
            .child(
                hstack("1rem")
                    .child(themed_select(
                        "priority",
                        PRIORITY_OPTIONS,
                        session.new_todo_priority.as_str(),
                    ))
                    .child(submit)
                    .maybe_child(session.is_loading.then(|| loading_spinner(SpinnerSize::Sm))),
            )
            .into(),
    ])
    .into()
}

fn stat(title: &str, value: usize, color: &str) -> Node {
    vstack("0.25rem")
        .css("align_items", "center")
        .css("flex", "1")
        .child(
            Element::new("span")
                .css("font_size", "2rem")
                .css("font_weight", "bold")
                .css("color", color)
                .child(value.to_string()),
        )
        .child(label(title, DARK_THEME.text_secondary))
        .into()
}

fn stats(session: &TodoSession) -> Node {
    let counts = session.todos_count();
    themed_card([hstack("1rem")
        .child(stat("Total", counts.total, DARK_THEME.primary))
        .child(stat("Pending", counts.pending, DARK_THEME.warning))
        .child(stat("Completed", counts.completed, DARK_THEME.success))
        .into()])
    .into()
}

fn filters(session: &TodoSession) -> Node {
    themed_card([
        heading("h3", "Filter Tasks", "1.25rem").into(),
        Element::new("form")
            .attr("method", "post")
            .attr("action", FILTER_ROUTE)
            .css("display", "flex")
            .css("gap", "1rem")
            .css("margin_top", "1rem")
            .child(themed_select(
                "status",
                &[("all", "All Tasks"), ("pending", "Pending"), ("completed", "Completed")],
                session.filter_status.as_str(),
            ))
            .child(themed_select(
                "priority",
                &[
                    ("all", "All Priorities"),
                    ("low", "Low"),
                    ("medium", "Medium"),
                    ("high", "High"),
                ],
                session.filter_priority.as_str(),
            ))
            .child(themed_button("Apply", ButtonVariant::Outline))
            .into(),
    ])
    .into()
}

fn todo_item(todo: &Todo) -> Node {
    let (mark, mark_color) = if todo.completed {
        ("✓", DARK_THEME.success)
    } else {
        ("○", DARK_THEME.text_muted)
    };
    let toggle = action_form(
        &toggle_route(todo.id),
        &[],
        Element::new("button")
            .attr("type", "submit")
            .attr("aria-label", "Toggle completed")
            .css("background", "none")
            .css("border", format!("2px solid {mark_color}"))
            .css("border_radius", "50%")
            .css("width", "2rem")
            .css("height", "2rem")
            .css("cursor", "pointer")
            .css("color", mark_color)
            .child(mark),
    );

    let mut title = Element::new("span")
        .css("font_size", "1.125rem")
        .css("font_weight", "500")
        .child(todo.title.as_str());
    if todo.completed {
        title = title
            .css("text_decoration", "line-through")
            .css("color", DARK_THEME.text_muted);
    } else {
        title = title.css("color", DARK_THEME.text_primary);
    }

    let body = vstack("0.25rem")
        .css("flex", "1")
        .child(title)
        .maybe_child(
            todo.description
                .as_deref()
                .map(|d| label(d, DARK_THEME.text_secondary).css("font_size", "0.875rem")),
        )
        .child(
            label(
                todo.created_at.chars().take(10).collect::<String>(),
                DARK_THEME.text_muted,
            )
            .css("font_size", "0.75rem"),
        );

    let delete = action_form(
        &delete_route(todo.id),
        &[],
        themed_button("Delete", ButtonVariant::Outline).style(
            Style::new()
                .set("color", DARK_THEME.error)
                .set("padding", "0.5rem 1rem")
                .on(Pseudo::Hover, "background_color", format!("{}20", DARK_THEME.error)),
        ),
    );

    themed_card([hstack("1rem")
        .child(toggle)
        .child(body)
        .child(priority_badge(todo.priority))
        .child(delete)
        .into()])
    .attr("data-todo-id", todo.id.to_string())
    .into()
}

fn todo_list(session: &TodoSession) -> Node {
    let items: Vec<Node> = session.filtered_todos().map(todo_item).collect();
    if items.is_empty() {
        return empty_state("No todos found").into();
    }
    vstack("0.75rem").children(items).into()
}

/// The whole page for one session.
#[must_use]
pub fn todo_page(session: &TodoSession) -> Node {
    let main = vstack("1.5rem")
        .css("max_width", "800px")
        .css("margin", "0 auto")
        .css("padding", "2rem 1rem")
        .child(page_header(
            TITLE,
            Some("Organize your tasks efficiently with our beautiful todo app"),
        ))
        .maybe_child(session.error_message.as_deref().map(error_message))
        .maybe_child(session.success_message.as_deref().map(success_message))
        .child(add_form(session))
        .child(stats(session))
        .child(filters(session))
        .child(todo_list(session));

    Element::new("div")
        .style(base_style())
        .css("min_height", "100vh")
        .child(navigation_bar("Todo App", &[("Tasks", "/"), ("API", "/api/state")]))
        .child(main)
        .into()
}
