use std::fmt::Write as _;

use crate::config::Config;
use crate::domain::AggregateResult;
use crate::state::SharedState;

pub async fn cmd_search(config: Config, query: &str) -> anyhow::Result<()> {
    println!("Searching for: {query}");

    let state = SharedState::new(config).await?;
    let outcome = state.aggregator.search(query).await;
    state.shutdown().await?;

    let results = outcome?;

    if results.total() == 0 {
        println!("No results found for '{query}'");
        return Ok(());
    }

    println!();
    print!("{}", render_results(&results));

    Ok(())
}

/// Formats an aggregate for the terminal, one block per provider.
pub fn render_results(results: &AggregateResult) -> String {
    let mut out = String::new();

    for (provider, items) in results.iter() {
        let _ = writeln!(out, "{} ({} results)", provider.display_name(), items.len());
        let _ = writeln!(out, "{:-<60}", "");

        for item in items {
            let _ = writeln!(out, "• {} (score {})", item.title, item.score);
            let _ = writeln!(out, "  {}", item.link);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderName, ResultItem};

    #[test]
    fn test_render_results_lists_each_provider() {
        let mut agg = AggregateResult::new();
        agg.insert(
            ProviderName::StackOverflow,
            vec![ResultItem {
                title: "What is a lifetime?".into(),
                link: "https://stackoverflow.com/q/1".into(),
                score: 12,
                body: None,
                created_at: None,
                author: None,
                tags: vec![],
                responses: None,
            }],
        );
        agg.insert(ProviderName::Reddit, vec![]);

        let out = render_results(&agg);
        assert!(out.starts_with("Stack Overflow (1 results)"));
        assert!(out.contains("• What is a lifetime? (score 12)"));
        assert!(out.contains("Reddit (0 results)"));
    }
}
