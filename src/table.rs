//! Plain-text table rendering for candidate listings.

use std::io::{self, Write};

fn border(widths: &[usize]) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.push_str(&"-".repeat(width + 2));
        line.push('+');
    }
    line
}

fn row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        line.push_str(&format!(" {:<width$} |", cell, width = width));
    }
    line
}

/// Writes a bordered table with a header row.
///
/// Rows shorter than the header are padded with empty cells.
pub fn render<W: Write>(out: &mut W, headers: &[&str], rows: &[Vec<String>]) -> io::Result<()> {
    let columns = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));

    let pad = |cells: Vec<String>| -> Vec<String> {
        let mut cells = cells;
        cells.resize(columns, String::new());
        cells
    };
    let header = pad(headers.iter().map(|h| h.to_string()).collect());
    let body: Vec<Vec<String>> = rows.iter().cloned().map(pad).collect();

    let mut widths = vec![0; columns];
    for cells in std::iter::once(&header).chain(body.iter()) {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = border(&widths);
    writeln!(out, "{}", separator)?;
    writeln!(out, "{}", row(&header, &widths))?;
    writeln!(out, "{}", separator)?;
    for cells in &body {
        writeln!(out, "{}", row(cells, &widths))?;
    }
    writeln!(out, "{}", separator)?;
    Ok(())
}
