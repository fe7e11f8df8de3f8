//! Human-readable rendering of a counter-argument.

use std::fmt::Write;

use crate::schema::{CounterArgument, PointsResponse, RebuttalParagraphs, ReferencedParagraphs};

/// Render a counter-argument as plain text, one line per printed item.
pub fn render_text(argument: &CounterArgument) -> String {
    let mut out = String::new();
    match argument {
        CounterArgument::Points(r) => render_points(&mut out, r),
        CounterArgument::RebuttalParagraphs(r) => render_paragraphs(&mut out, r),
        CounterArgument::ReferencedParagraphs(r) => render_referenced(&mut out, r),
    }
    out
}

// Writing into a String cannot fail.

fn render_points(out: &mut String, response: &PointsResponse) {
    for (i, point) in response.points().iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, point.point());
        if let Some(support) = point.support() {
            let _ = writeln!(out, "   - {}", support);
        }
    }
}

fn render_paragraphs(out: &mut String, response: &RebuttalParagraphs) {
    for paragraph in response.paragraphs() {
        let _ = writeln!(out, "\n{}\n", paragraph);
    }
}

fn render_referenced(out: &mut String, response: &ReferencedParagraphs) {
    for paragraph in response.paragraphs() {
        let _ = writeln!(out, "\n{}", paragraph.text());
        if paragraph.references().is_empty() {
            continue;
        }

        out.push_str("References:\n");
        for reference in paragraph.references() {
            let _ = match reference.label() {
                Some(label) => writeln!(out, "- {}: {}", label, reference.url()),
                None => writeln!(out, "- {}", reference.url()),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CounterPoint, Reference, ReferencedParagraph};

    #[test]
    fn test_render_points() {
        let response = PointsResponse::new(vec![
            CounterPoint::new("First", Some("Because".into())).unwrap(),
            CounterPoint::new("Second", None).unwrap(),
            CounterPoint::new("Third", None).unwrap(),
        ])
        .unwrap();

        let text = render_text(&CounterArgument::Points(response));
        assert_eq!(text, "1. First\n   - Because\n2. Second\n3. Third\n");
    }

    #[test]
    fn test_render_paragraphs() {
        let response = RebuttalParagraphs::new(vec!["One.".into(), "Two.".into()]).unwrap();
        let text = render_text(&CounterArgument::RebuttalParagraphs(response));
        assert_eq!(text, "\nOne.\n\n\nTwo.\n\n");
    }

    #[test]
    fn test_render_referenced() {
        let response = ReferencedParagraphs::new(vec![
            ReferencedParagraph::new(
                "One.",
                vec![Reference::new("https://a.org", Some("Study A".into())).unwrap()],
            )
            .unwrap(),
            ReferencedParagraph::new("Two.", vec![Reference::new("https://b.org", None).unwrap()])
                .unwrap(),
        ])
        .unwrap();

        let text = render_text(&CounterArgument::ReferencedParagraphs(response));
        assert_eq!(
            text,
            "\nOne.\nReferences:\n- Study A: https://a.org/\n\nTwo.\nReferences:\n- https://b.org/\n"
        );
    }
}
