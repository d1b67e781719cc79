use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::domain::{AggregateResult, ResultItem};

use super::EmailError;

/// Wrap width for the plain-text alternative.
const TEXT_WIDTH: usize = 80;

/// A rendered message ready to hand to a [`super::Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDocument {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Renders `results` for `query` as an email.
///
/// One section per provider, in aggregate order. Items keep their provider
/// order. All dynamic text is HTML-escaped.
pub fn format_for_email(results: &AggregateResult, query: &str) -> Result<EmailDocument, EmailError> {
    let subject = format!("Knowledge Base Search Results: {}", header_safe(query));

    let mut html = String::new();
    let _ = writeln!(html, "<h2>Search Results for: {}</h2>", encode_text(query));
    html.push_str("<div>\n");

    for (provider, items) in results.iter() {
        let _ = writeln!(html, "<h3>{} Results:</h3>", provider.display_name());
        if items.is_empty() {
            html.push_str("<p>No results.</p>\n");
        }
        for item in items {
            render_item(&mut html, item);
        }
    }

    html.push_str("</div>\n");

    let text = html2text::from_read(html.as_bytes(), TEXT_WIDTH)
        .map_err(|e| EmailError::Render(e.to_string()))?;

    Ok(EmailDocument {
        subject,
        html,
        text,
    })
}

/// Drops control characters so a query cannot inject extra header lines.
fn header_safe(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

fn render_item(html: &mut String, item: &ResultItem) {
    let _ = writeln!(
        html,
        "<div>\n<h4><a href=\"{}\">{}</a></h4>\n<p>Score: {}</p>\n</div>",
        encode_double_quoted_attribute(&item.link),
        encode_text(&item.title),
        item.score
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderName;

    fn item(title: &str, link: &str, score: i64) -> ResultItem {
        ResultItem {
            title: title.to_string(),
            link: link.to_string(),
            score,
            body: None,
            created_at: None,
            author: None,
            tags: vec![],
            responses: None,
        }
    }

    fn results() -> AggregateResult {
        let mut agg = AggregateResult::new();
        agg.insert(
            ProviderName::Reddit,
            vec![item("Learning Rust", "https://reddit.com/r/rust/1", 42)],
        );
        agg.insert(
            ProviderName::StackOverflow,
            vec![
                item("How do I borrow?", "https://stackoverflow.com/q/1", 10),
                item("Lifetimes", "https://stackoverflow.com/q/2", 7),
            ],
        );
        agg
    }

    #[test]
    fn test_subject_and_sections_follow_aggregate_order() {
        let doc = format_for_email(&results(), "rust").unwrap();

        assert_eq!(doc.subject, "Knowledge Base Search Results: rust");
        let so = doc.html.find("Stack Overflow Results:").unwrap();
        let reddit = doc.html.find("Reddit Results:").unwrap();
        assert!(so < reddit);

        let first = doc.html.find("How do I borrow?").unwrap();
        let second = doc.html.find("Lifetimes").unwrap();
        assert!(first < second);
        assert!(doc.html.contains("<p>Score: 42</p>"));
    }

    #[test]
    fn test_dynamic_text_is_escaped() {
        let mut agg = AggregateResult::new();
        agg.insert(
            ProviderName::StackOverflow,
            vec![item(
                "<script>alert(1)</script>",
                "https://example.com/?a=1&b=\"2\"",
                1,
            )],
        );

        let doc = format_for_email(&agg, "<b>q</b>").unwrap();

        assert!(!doc.html.contains("<script>"));
        assert!(doc.html.contains("&lt;script&gt;"));
        assert!(doc.html.contains("&lt;b&gt;q&lt;/b&gt;"));
        assert!(doc.html.contains("&quot;2&quot;"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = format_for_email(&results(), "rust").unwrap();
        let b = format_for_email(&results(), "rust").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_plain_text_alternative() {
        let doc = format_for_email(&results(), "rust").unwrap();
        assert!(doc.text.contains("Search Results for: rust"));
        assert!(doc.text.contains("Learning Rust"));
        assert!(!doc.text.contains("<h4>"));
    }

    #[test]
    fn test_empty_provider_section() {
        let mut agg = AggregateResult::new();
        agg.insert(ProviderName::StackOverflow, vec![]);
        agg.insert(ProviderName::Reddit, vec![]);

        let doc = format_for_email(&agg, "nothing").unwrap();
        assert_eq!(doc.html.matches("No results.").count(), 2);
    }

    #[test]
    fn test_subject_drops_control_characters() {
        let mut results = AggregateResult::new();
        results.insert(ProviderName::StackOverflow, vec![]);
        results.insert(ProviderName::Reddit, vec![]);

        let doc = format_for_email(&results, "rust\r\nBcc: victim@example.com\t").unwrap();

        assert!(!doc.subject.contains('\r'));
        assert!(!doc.subject.contains('\n'));
        assert!(!doc.subject.contains('\t'));
        assert_eq!(
            doc.subject,
            "Knowledge Base Search Results: rustBcc: victim@example.com"
        );
    }
}
