//! # Terminal rendering
//!
//! Draws search outcomes for a terminal: warnings, errors, the "no results"
//! notice and the result table. Everything renders into a generic
//! [`Write`] so the same code prints to stdout and into buffers under test.
//!
//! | Outcome | Rendering |
//! |---------|-----------|
//! | blank query | yellow warning |
//! | embedding/search error | red error line |
//! | no rows | blue info line |
//! | rows | bold subheader + aligned table, score first |
//!
//! Colors go through **Crossterm**; column widths are measured with
//! **console** so wide characters and ANSI codes do not break alignment.
//!
//! The interactive loop ([`interactive`]) reads one query per line until
//! `exit`, `quit` or end of input.

use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use console::{Alignment, Term, measure_text_width, pad_str};
use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, Print, SetAttribute, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::{
    customer::{PROFILE_FIELDS, render_bson},
    embedding::Embedder,
    search::{SearchOptions, SearchRow, SearchView, run_search},
    store::CustomerStore,
};

pub const TITLE: &str = "Customer Semantic Search with Gemini & MongoDB Atlas";
pub const EMPTY_QUERY_WARNING: &str = "Please enter a search query.";
pub const NO_RESULTS: &str = "No matching customers found.";
pub const RESULTS_HEADER: &str = "Top Matching Customer Profiles:";

const COLUMN_GAP: &str = "  ";

/// A spinner on stderr, or a hidden bar when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    if !Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Renders one search outcome.
pub fn render_view<W: Write>(out: &mut W, view: &SearchView) -> io::Result<()> {
    match view {
        SearchView::EmptyQuery => print_line(out, Color::Yellow, EMPTY_QUERY_WARNING),
        SearchView::EmbeddingFailed(err) => {
            print_line(out, Color::Red, &format!("Embedding Error: {err}"))
        }
        SearchView::NoResults { error } => {
            if let Some(err) = error {
                print_line(out, Color::Red, &format!("Vector Search Error: {err}"))?;
            }
            print_line(out, Color::Blue, NO_RESULTS)
        }
        SearchView::Results(rows) => {
            out.execute(SetAttribute(Attribute::Bold))?;
            writeln!(out, "{RESULTS_HEADER}")?;
            out.execute(SetAttribute(Attribute::Reset))?;
            render_table(out, rows)
        }
    }
}

/// Prints rows as JSON to `out`; every other outcome prints an empty array.
///
/// Warnings and errors still go to `diagnostics` (stderr in the binary) so
/// `out` stays parseable.
pub fn render_json<W: Write, D: Write>(
    out: &mut W,
    diagnostics: &mut D,
    view: &SearchView,
) -> io::Result<()> {
    let rows: &[SearchRow] = match view {
        SearchView::Results(rows) => rows,
        SearchView::NoResults { error: None } => &[],
        _ => {
            render_view(diagnostics, view)?;
            &[]
        }
    };
    serde_json::to_writer_pretty(&mut *out, rows)?;
    writeln!(out)
}

/// Prints rows as an aligned table with a header line.
pub fn render_table<W: Write>(out: &mut W, rows: &[SearchRow]) -> io::Result<()> {
    let headers: Vec<&str> = std::iter::once("score").chain(PROFILE_FIELDS).collect();

    let cells: Vec<Vec<String>> = rows.iter().map(table_cells).collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            cells
                .iter()
                .map(|row| measure_text_width(&row[i]))
                .chain(std::iter::once(measure_text_width(header)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    out.execute(SetForegroundColor(Color::Cyan))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    writeln!(out, "{}", join_padded(&headers, &widths))?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;

    let rule_width = widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
    writeln!(out, "{}", "─".repeat(rule_width))?;

    for row in &cells {
        writeln!(out, "{}", join_padded(row, &widths))?;
    }
    out.flush()
}

fn table_cells(row: &SearchRow) -> Vec<String> {
    let mut cells = vec![format!("{:.4}", row.score)];
    cells.extend(
        row.fields()
            .iter()
            .map(|(_, value)| value.map(render_bson).unwrap_or_default()),
    );
    cells
}

fn join_padded<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad_str(cell.as_ref(), *width, Alignment::Left, None).into_owned())
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
        .trim_end()
        .to_string()
}

fn print_line<W: Write>(out: &mut W, color: Color, text: &str) -> io::Result<()> {
    out.execute(SetForegroundColor(color))?;
    writeln!(out, "{text}")?;
    out.execute(SetForegroundColor(Color::Reset))?;
    out.flush()
}

/// Prints the banner shown when the interactive loop starts.
pub fn print_banner<W: Write>(out: &mut W) -> io::Result<()> {
    out.execute(SetForegroundColor(Color::Cyan))?;
    out.execute(SetAttribute(Attribute::Bold))?;
    writeln!(out, "{TITLE}")?;
    out.execute(SetAttribute(Attribute::Reset))?;
    out.execute(SetForegroundColor(Color::Reset))?;
    writeln!(
        out,
        "Enter a natural language description to find similar customer profiles."
    )?;
    writeln!(
        out,
        "e.g. 'Young doctors with high income'. Type 'exit' to quit."
    )
}

/// Reads queries from `input` and renders each outcome to `out`.
///
/// Stops on `exit`, `quit` or end of input. Returns the number of searches
/// that were rendered (blank lines count; they produce the warning).
pub async fn interactive<E, S, R, W>(
    embedder: &E,
    store: &S,
    index: &str,
    options: SearchOptions,
    mut input: R,
    out: &mut W,
) -> io::Result<usize>
where
    E: Embedder + ?Sized,
    S: CustomerStore + ?Sized,
    R: BufRead,
    W: Write,
{
    print_banner(out)?;
    let mut rendered = 0;

    loop {
        out.execute(Print("\nSearch for customers: "))?;
        out.execute(SetForegroundColor(Color::Green))?;
        out.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line)?;
        out.execute(SetForegroundColor(Color::Reset))?;

        if read == 0 {
            writeln!(out)?;
            break;
        }
        let command = line.trim().to_lowercase();
        if command == "exit" || command == "quit" {
            break;
        }

        debug!("Interactive query: {:?}", line.trim());
        let progress = spinner("Searching for similar customers...");
        let view = run_search(&line, embedder, store, index, options).await;
        progress.finish_and_clear();

        render_view(out, &view)?;
        rendered += 1;
    }

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{EmbeddingError, SearchError},
        testing::{FakeEmbedder, FakeStore, row},
    };
    use console::strip_ansi_codes;

    fn rendered(view: &SearchView) -> String {
        let mut buf = Vec::new();
        render_view(&mut buf, view).unwrap();
        strip_ansi_codes(&String::from_utf8(buf).unwrap()).into_owned()
    }

    #[test]
    fn test_empty_query_warning() {
        assert_eq!(rendered(&SearchView::EmptyQuery), format!("{EMPTY_QUERY_WARNING}\n"));
    }

    #[test]
    fn test_embedding_error_message() {
        let view = SearchView::EmbeddingFailed(EmbeddingError::Empty);
        assert_eq!(
            rendered(&view),
            "Embedding Error: embedding service returned an empty vector\n"
        );
    }

    #[test]
    fn test_search_failure_renders_no_results() {
        let view = SearchView::NoResults {
            error: Some(SearchError::Other("connection reset".to_string())),
        };
        let text = rendered(&view);
        assert!(text.contains("Vector Search Error: connection reset"));
        assert!(text.ends_with(&format!("{NO_RESULTS}\n")));
    }

    #[test]
    fn test_no_results() {
        assert_eq!(
            rendered(&SearchView::NoResults { error: None }),
            format!("{NO_RESULTS}\n")
        );
    }

    #[test]
    fn test_results_table() {
        let text = rendered(&SearchView::Results(vec![row(0.91234, 1), row(0.5, 12)]));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], RESULTS_HEADER);
        assert!(lines[1].starts_with("score   CustomerID  Gender"));
        assert!(lines[1].ends_with("Family Size"));
        assert!(lines[2].chars().all(|c| c == '─'));
        assert!(lines[3].starts_with("0.9123  1           Female  31"));
        assert!(lines[4].starts_with("0.5000  12          Female  42"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_missing_cells_render_blank() {
        let mut sparse = row(0.3, 4);
        sparse.profession = None;
        let text = rendered(&SearchView::Results(vec![sparse]));
        assert!(!text.contains("Engineer"));
    }

    fn rendered_json(view: &SearchView) -> (String, String) {
        let mut out = Vec::new();
        let mut diagnostics = Vec::new();
        render_json(&mut out, &mut diagnostics, view).unwrap();
        (
            String::from_utf8(out).unwrap(),
            strip_ansi_codes(&String::from_utf8(diagnostics).unwrap()).into_owned(),
        )
    }

    #[test]
    fn test_json_output() {
        let (out, diagnostics) = rendered_json(&SearchView::Results(vec![row(0.75, 9)]));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["score"], 0.75);
        assert_eq!(value[0]["CustomerID"], 9);
        assert_eq!(value[0]["Profession"], "Engineer");
        assert!(diagnostics.is_empty());

        let (out, diagnostics) = rendered_json(&SearchView::NoResults { error: None });
        assert_eq!(out.trim(), "[]");
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_json_blank_query_still_warns() {
        let embedder = FakeEmbedder::new();
        let store = FakeStore::new(vec![]);
        let view = run_search("   ", &embedder, &store, "idx", SearchOptions::default()).await;

        let (out, diagnostics) = rendered_json(&view);
        assert_eq!(out.trim(), "[]");
        assert_eq!(diagnostics, format!("{EMPTY_QUERY_WARNING}\n"));
    }

    #[test]
    fn test_json_failures_report_to_diagnostics() {
        let (out, diagnostics) = rendered_json(&SearchView::EmbeddingFailed(EmbeddingError::Empty));
        assert_eq!(out.trim(), "[]");
        assert!(diagnostics.contains("Embedding Error: embedding service returned an empty vector"));

        let (out, diagnostics) = rendered_json(&SearchView::NoResults {
            error: Some(SearchError::Other("connection reset".to_string())),
        });
        assert_eq!(out.trim(), "[]");
        assert!(diagnostics.contains("Vector Search Error: connection reset"));
    }

    #[tokio::test]
    async fn test_interactive_loop_until_exit() {
        let embedder = FakeEmbedder::new();
        let store = FakeStore::new(vec![]).with_search_rows(vec![row(0.8, 2)]);
        let input = "\nyoung doctors\nEXIT\nnever read\n".as_bytes();
        let mut out = Vec::new();

        let count = interactive(
            &embedder,
            &store,
            "idx",
            SearchOptions::default(),
            input,
            &mut out,
        )
        .await
        .unwrap();

        let text = strip_ansi_codes(&String::from_utf8(out).unwrap()).into_owned();
        assert_eq!(count, 2);
        assert!(text.contains(TITLE));
        assert!(text.contains(EMPTY_QUERY_WARNING));
        assert!(text.contains(RESULTS_HEADER));
        assert_eq!(embedder.call_count(), 1);
        assert_eq!(store.search_count(), 1);
    }

    #[tokio::test]
    async fn test_interactive_stops_at_end_of_input() {
        let embedder = FakeEmbedder::new();
        let store = FakeStore::new(vec![]).failing_search();
        let mut out = Vec::new();

        let count = interactive(
            &embedder,
            &store,
            "idx",
            SearchOptions::default(),
            "who spends the most".as_bytes(),
            &mut out,
        )
        .await
        .unwrap();

        let text = strip_ansi_codes(&String::from_utf8(out).unwrap()).into_owned();
        assert_eq!(count, 1);
        assert!(text.contains(NO_RESULTS));
    }
}
