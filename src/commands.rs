//! Command handlers for the `discover` binary.

use anyhow::Result;
use log::debug;

use crate::api::{AddLinkOutcome, DiscoverClient, Link, ViewAction};
use crate::http::Executor;

/// Prints every link, either as text or as pretty JSON.
pub async fn links<E: Executor>(client: &DiscoverClient<E>, json: bool) -> Result<()> {
    let links = client.get_links().await?;
    debug!("Fetched {} links from {}", links.len(), client.base_url());

    if json {
        println!("{}", serde_json::to_string_pretty(&links)?);
        return Ok(());
    }

    if links.is_empty() {
        println!("No links available.");
        return Ok(());
    }

    for link in &links {
        println!("{}", format_link(link));
    }
    Ok(())
}

pub async fn view<E: Executor>(
    client: &DiscoverClient<E>,
    url: &str,
    action: ViewAction,
) -> Result<()> {
    if !client.increment_view(url, action).await? {
        anyhow::bail!("Backend rejected '{}' for {}", action, url);
    }
    println!("Recorded {} for {}", action, url);
    Ok(())
}

pub async fn add<E: Executor>(client: &DiscoverClient<E>, link: &Link) -> Result<()> {
    match client.add_link(link).await? {
        AddLinkOutcome::Added => println!("Added {}", link.url),
        AddLinkOutcome::Duplicate => println!("Link already exists: {}", link.url),
        AddLinkOutcome::Rejected { status, message } => {
            anyhow::bail!("Failed to add link (HTTP {}): {}", status.as_u16(), message)
        }
    }
    Ok(())
}

pub async fn health<E: Executor>(client: &DiscoverClient<E>) -> Result<()> {
    if !client.health().await? {
        anyhow::bail!("Backend at {} is unhealthy", client.base_url());
    }
    println!("OK");
    Ok(())
}

fn format_link(link: &Link) -> String {
    let mut out = format!("{}\n  {}", link.name, link.url);
    if !link.description.is_empty() {
        out.push_str(&format!("\n  {}", link.description));
    }
    if !link.tags.is_empty() {
        out.push_str(&format!("\n  tags: {}", link.tags.join(", ")));
    }
    out.push_str(&format!(
        "\n  views: {}  likes: {}  dislikes: {}",
        link.views, link.likes_mobile, link.dislikes_mobile
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_link() {
        let mut link = Link::new("Example", "https://example.com/", "A demo").with_tags(["a", "b"]);
        link.views = 4;
        link.likes_mobile = 2;

        assert_eq!(
            format_link(&link),
            "Example\n  https://example.com/\n  A demo\n  tags: a, b\n  views: 4  likes: 2  dislikes: 0"
        );
    }

    #[test]
    fn test_format_link_without_optional_parts() {
        let link = Link::new("Bare", "https://bare.example/", "");
        assert_eq!(
            format_link(&link),
            "Bare\n  https://bare.example/\n  views: 0  likes: 0  dislikes: 0"
        );
    }
}
