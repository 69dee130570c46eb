// Submission record PDF generation
// Uses genpdf - requires Liberation or similar fonts in standard paths

use genpdf::Element;

use crate::domain::Submission;
use crate::error::{Error, Result};

pub fn generate_record(submission: &Submission) -> Result<Vec<u8>> {
    // Try common font paths - genpdf needs actual font files for metrics
    let font_paths = [
        "/usr/share/fonts/truetype/liberation",
        "/usr/share/fonts/TTF",
        "/System/Library/Fonts/Supplemental",
        "/Library/Fonts",
    ];

    let font_family = font_paths
        .iter()
        .find(|p| std::path::Path::new(p).exists())
        .and_then(|path| {
            ["LiberationSans", "DejaVuSans", "Arial"]
                .iter()
                .find_map(|name| genpdf::fonts::from_files(*path, name, None).ok())
        })
        .ok_or_else(|| {
            Error::Internal("no suitable fonts found; install fonts-liberation".to_string())
        })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title("Submission Record");

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let title_style = genpdf::style::Style::new().with_font_size(20);
    doc.push(genpdf::elements::Paragraph::new("Submission Record").styled(title_style));
    doc.push(genpdf::elements::Break::new(0.5));

    doc.push(genpdf::elements::Paragraph::new(format!(
        "Title: {}",
        truncate(&submission.title, 120)
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Submitted by: {}",
        submission.owner_username
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Type: {}",
        submission.work_type.as_str()
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "State: {}",
        submission.state
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Registered: {}",
        submission.created_at.format("%B %d, %Y")
    )));
    doc.push(genpdf::elements::Break::new(0.5));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Summary: {}",
        truncate(&submission.summary, 600)
    )));

    doc.push(genpdf::elements::Break::new(1.0));
    let heading_style = genpdf::style::Style::new().with_font_size(14);
    doc.push(genpdf::elements::Paragraph::new("Review trail").styled(heading_style));

    if submission.reviews.is_empty() {
        doc.push(genpdf::elements::Paragraph::new("No reviews recorded."));
    }
    for review in &submission.reviews {
        doc.push(genpdf::elements::Break::new(0.5));
        doc.push(genpdf::elements::Paragraph::new(format!(
            "{} - {} ({})",
            review.created_at.format("%B %d, %Y"),
            review.reviewer_username,
            review.recommendation.as_str()
        )));
        if !review.comments.is_empty() {
            doc.push(genpdf::elements::Paragraph::new(truncate(&review.comments, 1000)));
        }
    }

    doc.push(genpdf::elements::Break::new(1.0));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Generated: {}",
        chrono::Utc::now().format("%B %d, %Y")
    )));
    doc.push(genpdf::elements::Paragraph::new(format!(
        "Record ID: {}",
        submission.id
    )));

    let mut bytes = Vec::new();
    doc.render(&mut bytes)
        .map_err(|e| Error::Internal(format!("pdf rendering failed: {}", e)))?;
    Ok(bytes)
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() > max {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    }
}
