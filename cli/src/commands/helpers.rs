use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;

use dashkit_core::view::{Node, render_document};

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Stored UTC timestamp shown in local time; unparseable values pass through.
pub(crate) fn local_time(stored: &str) -> String {
    DateTime::parse_from_rfc3339(stored).map_or_else(
        |_| stored.to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

pub(crate) fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Write a page tree as a standalone HTML document.
pub(crate) fn export_page(path: &Path, title: &str, tree: &Node) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::write(path, render_document(title, tree))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "page exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashkit_core::view::{Element, text};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_local_time_passthrough() {
        assert_eq!(local_time("not a time"), "not a time");
        assert_eq!(local_time("2024-03-10T12:30:00.000000Z").len(), 16);
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some(5)), "5");
        assert_eq!(or_dash(None::<i64>), "-");
    }

    #[test]
    fn test_json_error_escapes() {
        let json: serde_json::Value = serde_json::from_str(&json_error("bad \"id\"")).unwrap();
        assert_eq!(json["error"], "bad \"id\"");
    }

    #[test]
    fn test_export_page_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/page.html");
        let tree: Node = Element::new("p").child(text("hi <there>")).into();
        export_page(&path, "Demo", &tree).unwrap();

        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Demo</title>"));
        assert!(html.contains("hi &lt;there&gt;"));
    }
}
