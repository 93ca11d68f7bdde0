//! Multi-step wizard view
//!
//! Layout:
//! +------------------------------------------+
//! | 1 Basic info ✓ > 2 Pricing ! > 3 Review  |
//! +------------------------------------------+
//! |  fields of the active step               |
//! |  (rows labelled, errors underneath)      |
//! +------------------------------------------+

use super::field_renderer::{draw_field, FieldView};
use crate::state::{BoundField, FieldKind, Focus, Wizard, WizardPhase};
use crate::ui::theme::Palette;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub fn draw_wizard<T>(frame: &mut Frame, area: Rect, wizard: &Wizard<T>, palette: &Palette)
where
    T: Serialize + DeserializeOwned,
{
    let block = Block::default()
        .title(format!(" {} ", wizard.title()))
        .borders(Borders::ALL)
        .border_style(palette.border(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Stepper
            Constraint::Min(0),    // Fields
            Constraint::Length(1), // Row and submit status
        ])
        .split(inner);

    draw_stepper(frame, chunks[0], wizard, palette);

    let fields = wizard.visible_fields();
    if fields.is_empty() {
        draw_review(frame, chunks[1], wizard, palette);
    } else {
        draw_fields(frame, chunks[1], wizard, palette);
    }

    draw_footer(frame, chunks[2], wizard, palette);
}

fn draw_stepper<T>(frame: &mut Frame, area: Rect, wizard: &Wizard<T>, palette: &Palette)
where
    T: Serialize + DeserializeOwned,
{
    let steps = wizard.steps();
    if steps.count() == 1 {
        return;
    }

    let mut spans = Vec::new();
    for (index, step) in steps.steps().iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(" › ", palette.muted()));
        }
        let status = steps.status(index);
        let (marker, color) = if status.has_error {
            (" !", palette.error)
        } else if status.is_complete {
            (" ✓", palette.success)
        } else {
            ("", palette.muted)
        };
        let label_style = if index == steps.active() {
            palette.title()
        } else {
            Style::default().fg(palette.text)
        };
        spans.push(Span::styled(format!("{} {}", index + 1, step.title), label_style));
        spans.push(Span::styled(marker, Style::default().fg(color)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_fields<T>(frame: &mut Frame, area: Rect, wizard: &Wizard<T>, palette: &Palette)
where
    T: Serialize + DeserializeOwned,
{
    let focused = wizard.focused();
    let views: Vec<FieldView> = wizard
        .visible_fields()
        .iter()
        .enumerate()
        .map(|(index, bound)| {
            let field = wizard.field(bound);
            let mut label = field.label.clone();
            if let Some(row) = wizard.row_of(&bound.path) {
                let collection = wizard.collection(&row);
                label = format!("{} #{} · {label}", collection.label, row.index + 1);
            }
            let mut value = field.display_value(wizard.state(), &bound.path);
            if index == focused {
                if let Some(choice) = choice_hint(wizard, bound) {
                    value = choice;
                }
            }
            FieldView {
                label,
                value,
                error: wizard.error_for(&bound.path),
                is_active: index == focused,
                is_multiline: field.is_multiline(),
                is_locked: wizard.is_locked(&bound.path),
            }
        })
        .collect();

    // Scroll so the focused field is on screen
    let mut start = 0;
    while start < focused {
        let needed: u16 = views[start..=focused.min(views.len().saturating_sub(1))]
            .iter()
            .map(FieldView::height)
            .sum();
        if needed <= area.height {
            break;
        }
        start += 1;
    }

    let mut y = area.y;
    for view in &views[start..] {
        let height = view.height();
        if y + height > area.y + area.height {
            break;
        }
        draw_field(
            frame,
            Rect {
                x: area.x,
                y,
                width: area.width,
                height,
            },
            view,
            palette,
        );
        y += height;
    }
}

/// Checkbox groups show which option the cursor is on
fn choice_hint<T>(wizard: &Wizard<T>, bound: &BoundField) -> Option<String>
where
    T: Serialize + DeserializeOwned,
{
    let field = wizard.field(bound);
    let FieldKind::CheckboxGroup(choices) = &field.kind else {
        return None;
    };
    let rendered = field.display_value(wizard.state(), &bound.path);
    let cursor = wizard.choice_cursor();
    let parts: Vec<String> = rendered
        .split("  ")
        .enumerate()
        .map(|(i, part)| {
            if i == cursor {
                format!("›{part}")
            } else {
                format!(" {part}")
            }
        })
        .collect();
    (!choices.is_empty()).then(|| parts.join(" "))
}

/// Last step: indicators of every step and the values entered
fn draw_review<T>(frame: &mut Frame, area: Rect, wizard: &Wizard<T>, palette: &Palette)
where
    T: Serialize + DeserializeOwned,
{
    let steps = wizard.steps();
    let mut lines = Vec::new();
    for (index, step) in steps.steps().iter().enumerate().take(steps.count() - 1) {
        let status = steps.status(index);
        let (text, color) = if status.has_error {
            ("needs attention", palette.error)
        } else if status.is_complete {
            ("complete", palette.success)
        } else {
            ("not checked yet", palette.muted)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<20}", step.title), Style::default().fg(palette.text)),
            Span::styled(text, Style::default().fg(color)),
        ]));
    }
    lines.push(Line::from(""));

    let mut values = Vec::new();
    flatten("", &wizard.snapshot(), &mut values);
    for (key, value) in values {
        lines.push(Line::from(vec![
            Span::styled(format!("{key}: "), palette.muted()),
            Span::raw(value),
        ]));
    }

    let errors = wizard.errors();
    if !errors.is_empty() {
        lines.push(Line::from(""));
        for (path, message) in errors {
            lines.push(Line::from(Span::styled(
                format!("{path}: {message}"),
                Style::default().fg(palette.error),
            )));
        }
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
}

/// Dotted key/value pairs of a snapshot, skipping empty values
fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join(key), child, out);
            }
        }
        Value::Array(items) if items.iter().all(|v| !v.is_object()) => {
            let joined: Vec<String> = items
                .iter()
                .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
                .collect();
            if !joined.is_empty() {
                out.push((prefix.to_string(), joined.join(", ")));
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&join(&index.to_string()), child, out);
            }
        }
        Value::String(text) if text.trim().is_empty() => {}
        Value::String(text) => out.push((prefix.to_string(), text.clone())),
        Value::Null => {}
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

fn draw_footer<T>(frame: &mut Frame, area: Rect, wizard: &Wizard<T>, palette: &Palette)
where
    T: Serialize + DeserializeOwned,
{
    let mut spans = match wizard.phase() {
        WizardPhase::Submitting => vec![Span::styled(
            "Submitting…",
            palette.accent().add_modifier(Modifier::BOLD),
        )],
        _ if wizard.steps().is_last() => vec![Span::styled("Enter: submit", palette.accent())],
        _ => vec![Span::styled("Enter: next step", palette.muted())],
    };

    if let Some(row) = wizard
        .focused_field()
        .and_then(|bound| wizard.row_of(&bound.path))
    {
        let collection = wizard.collection(&row);
        let count = wizard.state().array_len(&row.at);
        let saved = if wizard.is_row_saved(&row) {
            "saved"
        } else {
            "editing"
        };
        spans.push(Span::styled(
            format!(
                "  |  {} {}/{} ({saved})",
                collection.label, count, collection.max_rows
            ),
            palette.muted(),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
