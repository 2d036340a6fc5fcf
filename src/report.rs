use std::fmt::Write;

use crate::models::{ActivityMatrix, ActivityStatus};

/// 256-color backgrounds: indianred, yellow, lightseagreen.
fn ansi_color(status: ActivityStatus) -> u8 {
    match status {
        ActivityStatus::NonActive => 167,
        ActivityStatus::Unavailable => 226,
        ActivityStatus::Active => 37,
    }
}

fn plain_glyph(status: ActivityStatus) -> char {
    match status {
        ActivityStatus::NonActive => '.',
        ActivityStatus::Unavailable => 'o',
        ActivityStatus::Active => '#',
    }
}

fn swatch(status: ActivityStatus, width: usize, color: bool) -> String {
    if color {
        format!("\x1b[48;5;{}m{}\x1b[0m", ansi_color(status), " ".repeat(width))
    } else {
        format!("{:^width$}", plain_glyph(status))
    }
}

pub fn legend(color: bool) -> String {
    ActivityStatus::LEGEND
        .iter()
        .map(|status| format!("{} {}", swatch(*status, 2, color), status.label()))
        .collect::<Vec<_>>()
        .join("   ")
}

/// Rows in roster order, columns in selected-date order, legend underneath.
pub fn render_grid(matrix: &ActivityMatrix, title: &str, color: bool) -> String {
    let name_width = matrix
        .names()
        .iter()
        .map(|name| name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Names".len());
    let widths: Vec<usize> = matrix
        .dates()
        .iter()
        .map(|date| date.chars().count().max(3))
        .collect();

    let mut output = String::new();
    let _ = writeln!(output, "{title}");
    let _ = write!(output, "{:<name_width$}", "Names");
    for (date, &width) in matrix.dates().iter().zip(&widths) {
        let _ = write!(output, " {date:^width$}");
    }
    let _ = writeln!(output);

    for (name, row) in matrix.rows() {
        let pad = name_width.saturating_sub(name.chars().count());
        let _ = write!(output, "{name}{}", " ".repeat(pad));
        for (status, &width) in row.iter().zip(&widths) {
            let _ = write!(output, " {}", swatch(*status, width, color));
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{}", legend(color));
    output
}

pub fn caption(matrix: &ActivityMatrix) -> String {
    format!(
        "Heatmap last updated for dates: {}",
        matrix.dates().join(", ")
    )
}

pub fn build_report(matrix: &ActivityMatrix) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Activity Heatmap Report");
    let _ = writeln!(output, "Dates covered: {}", matrix.dates().join(", "));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Legend");
    for status in ActivityStatus::LEGEND {
        let _ = writeln!(
            output,
            "- `{}` {} ({})",
            plain_glyph(status),
            status.label(),
            status.as_cell()
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grid");
    let _ = write!(output, "| Name |");
    for date in matrix.dates() {
        let _ = write!(output, " {date} |");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "|---|{}", "---|".repeat(matrix.dates().len()));
    for (name, row) in matrix.rows() {
        let _ = write!(output, "| {name} |");
        for status in row {
            let _ = write!(output, " {} |", plain_glyph(*status));
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Per-Person Summary");
    for name in matrix.names() {
        if let Some(tally) = matrix.tally(name) {
            let _ = writeln!(
                output,
                "- {}: {} active, {} unavailable, {} non-active",
                name, tally.active, tally.unavailable, tally.non_active
            );
        }
    }

    let mut quiet: Vec<&str> = matrix
        .names()
        .iter()
        .filter(|name| {
            matrix
                .tally(name)
                .is_some_and(|tally| tally.active == 0 && tally.non_active > 0)
        })
        .map(String::as_str)
        .collect();
    quiet.sort();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Not Active On Any Covered Date");
    if quiet.is_empty() {
        let _ = writeln!(output, "Everyone was active or excused.");
    } else {
        for name in quiet {
            let _ = writeln!(output, "- {name}");
        }
    }

    output
}
