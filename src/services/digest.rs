// src/services/digest.rs

//! Digest rendering for classified changes.

use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::models::{ClassifiedChange, NotifyConfig};

const STYLE: &str = r#"
@media only screen and (max-width: 600px) {
    table { width: 100%; }
    th, td { padding: 10px !important; font-size: 14px !important; }
}
table { width: 100%; max-width: 1200px; margin: 0 auto; }
"#;

const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%; font-family: Arial, sans-serif; border-bottom: 1px solid #ddd;";
const HEAD_STYLE: &str = "background-color: #f2f2f2;";
const TH_STYLE: &str = "padding: 8px; text-align: left;";
const ROW_STYLE: &str = "border-bottom: 1px solid #ddd;";
const TD_STYLE: &str = "padding: 8px;";

const COLUMNS: [&str; 4] = ["Item Name", "Price", "Store", "Update Type"];

/// A rendered notification, identical for every recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl Digest {
    /// Render the digest for a non-empty set of changes.
    pub fn render(notify: &NotifyConfig, changes: &[ClassifiedChange]) -> Self {
        Self {
            subject: notify.subject.clone(),
            html: render_html(&notify.intro, changes).into_string(),
            text: render_text(&notify.intro, changes),
        }
    }
}

/// HTML email body: intro paragraph followed by the change table.
pub fn render_html(intro: &str, changes: &[ClassifiedChange]) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                style { (PreEscaped(STYLE)) }
            }
            body {
                p { (intro) }
                table border="1" cellpadding="6" cellspacing="0" style=(TABLE_STYLE) {
                    thead style=(HEAD_STYLE) {
                        tr {
                            @for column in COLUMNS {
                                th style=(TH_STYLE) { (column) }
                            }
                        }
                    }
                    tbody {
                        @for change in changes {
                            tr style=(ROW_STYLE) {
                                td style=(TD_STYLE) {
                                    a href=(change.record.link) { (change.record.name) }
                                }
                                td style=(TD_STYLE) { (change.record.price) }
                                td style=(TD_STYLE) { (change.record.store) }
                                td style=(TD_STYLE) { (change.update_type) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Plain-text rendering with aligned columns.
pub fn render_text(intro: &str, changes: &[ClassifiedChange]) -> String {
    let rows: Vec<[String; 4]> = changes
        .iter()
        .map(|c| {
            [
                c.record.name.clone(),
                c.record.price.clone(),
                c.record.store.clone(),
                c.update_type.to_string(),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(|c| c.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![intro.to_string(), format_row(COLUMNS)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        lines.push(format_row([&row[0], &row[1], &row[2], &row[3]]));
    }
    for change in changes {
        lines.push(format!("{}: {}", change.record.name, change.record.link));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingRecord, UpdateType};

    fn changes() -> Vec<ClassifiedChange> {
        vec![
            ClassifiedChange::new(
                ListingRecord::new("Iron Flame", "$39.00", "To The Stars", "https://x/iron"),
                UpdateType::NewItem,
            ),
            ClassifiedChange::new(
                ListingRecord::new("Tom & Jerry <Deluxe>", "$12", "Dragon's Hoard", "https://x/tj"),
                UpdateType::PriceChange {
                    previous: "$10".into(),
                },
            ),
        ]
    }

    #[test]
    fn test_html_contains_rows_in_order() {
        let html = render_html("New book(s) available:", &changes()).into_string();

        assert!(html.contains("<p>New book(s) available:</p>"));
        assert!(html.contains("Update Type"));
        assert!(html.contains(r#"<a href="https://x/iron">Iron Flame</a>"#));
        assert!(html.contains("Price Change - Previously $10"));
        let first = html.find("Iron Flame").unwrap();
        let second = html.find("Price Change").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_html_escapes_listing_text() {
        let html = render_html("intro", &changes()).into_string();
        assert!(html.contains("Tom &amp; Jerry &lt;Deluxe&gt;"));
        assert!(!html.contains("<Deluxe>"));
    }

    #[test]
    fn test_text_table() {
        let text = render_text("New book(s) available:", &changes());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "New book(s) available:");
        assert!(lines[1].starts_with("Item Name"));
        assert!(lines[3].starts_with("Iron Flame"));
        assert!(lines[3].contains("| New Item"));
        assert!(lines[4].ends_with("Price Change - Previously $10"));
        assert!(text.contains("Iron Flame: https://x/iron"));
    }

    #[test]
    fn test_digest_uses_configured_subject() {
        let digest = Digest::render(&NotifyConfig::default(), &changes());
        assert_eq!(digest.subject, "New Broken Binding Books Available!");
        assert!(digest.html.starts_with("<!DOCTYPE html>"));
    }
}
