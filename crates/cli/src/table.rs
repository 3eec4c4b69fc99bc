// SPDX-License-Identifier: MIT

//! Minimal aligned text-table renderer for list commands' text output.

use std::io::Write;

pub enum Align {
    Left,
    Muted,
    Status,
}

pub struct Column {
    pub title: &'static str,
    pub align: Align,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn left(title: &'static str) -> Self {
        Self { title, align: Align::Left, max_width: None }
    }

    pub fn muted(title: &'static str) -> Self {
        Self { title, align: Align::Muted, max_width: None }
    }

    pub fn status(title: &'static str) -> Self {
        Self { title, align: Align::Status, max_width: None }
    }

    pub fn with_max(mut self, max_width: usize) -> Self {
        self.max_width = Some(max_width);
        self
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn render(&self, out: &mut dyn Write) {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.title.len()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let truncated = truncate(cell, self.columns.get(i).and_then(|c| c.max_width));
                widths[i] = widths[i].max(truncated.len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| pad(c.title, widths[i]))
            .collect();
        let _ = writeln!(out, "{}", header.join("  "));

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    let truncated = truncate(cell, self.columns.get(i).and_then(|c| c.max_width));
                    let colored = match self.columns.get(i).map(|c| &c.align) {
                        Some(Align::Muted) => crate::color::muted(&truncated),
                        Some(Align::Status) => crate::color::header(&truncated),
                        _ => truncated.clone(),
                    };
                    pad_colored(&colored, &truncated, widths[i])
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join("  "));
        }
    }
}

fn truncate(s: &str, max_width: Option<usize>) -> String {
    match max_width {
        Some(max) if s.len() > max => format!("{}…", &s[..max.saturating_sub(1)]),
        _ => s.to_string(),
    }
}

fn pad(s: &str, width: usize) -> String {
    format!("{s:<width$}")
}

/// Pads `colored` to `width` based on `plain`'s visible length, since ANSI
/// escapes in `colored` would otherwise be counted by `{:<width$}`.
fn pad_colored(colored: &str, plain: &str, width: usize) -> String {
    let padding = width.saturating_sub(plain.len());
    format!("{colored}{}", " ".repeat(padding))
}
