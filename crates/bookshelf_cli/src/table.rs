//! Plain column rendering for book listings.

use bookshelf_core::{Book, CatalogStats};
use std::fmt::Write;

const HEADERS: [&str; 7] = ["ID", "Title", "Author", "Year", "Genre", "Rating", "Notes"];
const COLUMN_PADDING: usize = 2;

/// Renders books as left-aligned columns under a header and a dash rule.
///
/// Absent fields render as empty cells. An empty slice renders as
/// `No books found.`.
pub fn render_table(books: &[Book]) -> String {
    if books.is_empty() {
        return "No books found.\n".to_string();
    }

    let rows: Vec<[String; 7]> = books.iter().map(cells).collect();
    let mut widths = HEADERS.map(|header| header.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let widths = widths.map(|width| width + COLUMN_PADDING);

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(str::to_string), &widths);
    out.push_str(&"-".repeat(widths.iter().sum()));
    out.push('\n');
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

/// Renders the `stats` summary.
pub fn render_stats(stats: &CatalogStats) -> String {
    let mut out = String::new();
    let average = stats
        .average_rating
        .map_or_else(|| "N/A".to_string(), |avg| format!("{avg:.2}"));

    let _ = writeln!(out, "Total books: {}", stats.total);
    let _ = writeln!(out, "Average rating: {average}");
    let _ = writeln!(out, "Books per genre:");
    for entry in &stats.per_genre {
        let genre = entry.genre.as_deref().unwrap_or("(unknown)");
        let _ = writeln!(out, "  {genre}: {}", entry.count);
    }
    out
}

fn cells(book: &Book) -> [String; 7] {
    [
        book.id.map(|id| id.to_string()).unwrap_or_default(),
        flatten(&book.title),
        book.author.as_deref().map(flatten).unwrap_or_default(),
        book.year.map(|year| year.to_string()).unwrap_or_default(),
        book.genre.as_deref().map(flatten).unwrap_or_default(),
        book.rating.map(|rating| rating.to_string()).unwrap_or_default(),
        book.notes.as_deref().map(flatten).unwrap_or_default(),
    ]
}

/// Line breaks inside a cell would split its row.
fn flatten(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn push_line(out: &mut String, cells: &[String; 7], widths: &[usize; 7]) {
    let mut line = String::new();
    for (cell, width) in cells.iter().zip(widths) {
        let _ = write!(line, "{cell:<width$}");
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
