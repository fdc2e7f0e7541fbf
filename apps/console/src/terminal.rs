use std::io::{self, BufRead, Write};

use client_core::{GridRow, Notification, NotificationLevel, NotificationSink, ValidationErrors};

/// Prints toasts as single lines: successes to stdout, errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl NotificationSink for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => println!("ok: {}", notification.message),
            NotificationLevel::Error => eprintln!("error: {}", notification.message),
        }
    }
}

pub fn render_table(columns: &[&str], rows: &[GridRow]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|column| column.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, columns.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut out, row.cells.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

pub fn render_validation(errors: &ValidationErrors) -> String {
    errors
        .iter()
        .map(|error| format!("  {}: {}\n", error.field, error.message))
        .collect()
}

/// Asks a y/N question on the terminal. Anything but `y`/`yes` declines.
pub fn ask_confirmation(title: &str, message: &str) -> io::Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{title} {message} [y/N] ")?;
    stdout.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pads_to_the_widest_cell() {
        let rows = vec![
            GridRow {
                id: "1".into(),
                cells: vec!["1".into(), "Junior".into(), "0".into()],
            },
            GridRow {
                id: "12".into(),
                cells: vec!["12".into(), "Senior".into(), "3".into()],
            },
        ];
        let table = render_table(&["ID", "Description", "Developers"], &rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "ID  Description  Developers");
        assert_eq!(lines[1], "--  -----------  ----------");
        assert_eq!(lines[2], "1   Junior       0");
        assert_eq!(lines[3], "12  Senior       3");
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn validation_lists_one_field_per_line() {
        let mut errors = ValidationErrors::new();
        errors.push("age", "Age must be a positive number");
        assert_eq!(
            render_validation(&errors),
            "  age: Age must be a positive number\n"
        );
    }
}
