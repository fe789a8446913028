use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A curated website as exchanged with the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes_mobile: i64,
    #[serde(default)]
    pub dislikes_mobile: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Link {
    pub fn new(name: &str, url: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Checks that name, url and description are present.
    pub fn validate(&self) -> Result<(), LinkError> {
        for (field, value) in [
            ("name", &self.name),
            ("url", &self.url),
            ("description", &self.description),
        ] {
            if value.trim().is_empty() {
                return Err(LinkError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Returns a cleaned-up copy ready for submission.
    ///
    /// Newlines are stripped from every text field, tags are trimmed,
    /// lowercased and de-duplicated (first occurrence wins), and the URL gets
    /// an `https://` scheme when it has none.
    pub fn normalized(&self) -> Result<Link, LinkError> {
        self.validate()?;

        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = strip_newlines(tag.trim()).to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(Link {
            name: strip_newlines(self.name.trim()),
            url: normalize_url(&self.url)?,
            description: strip_newlines(self.description.trim()),
            tags,
            ..self.clone()
        })
    }
}

fn strip_newlines(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

fn normalize_url(raw: &str) -> Result<String, LinkError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let lower = compact.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        compact
    } else {
        format!("https://{}", compact)
    };

    let url = Url::parse(&candidate).map_err(|_| LinkError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(LinkError::InvalidUrl(raw.to_string()));
    }
    Ok(url.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// A required field is empty
    MissingField(&'static str),
    /// The URL is not a valid http(s) URL
    InvalidUrl(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::MissingField(field) => write!(f, "Link {} is required", field),
            LinkError::InvalidUrl(url) => write!(f, "Invalid URL format: {}", url),
        }
    }
}

impl std::error::Error for LinkError {}

/// Counter update sent to `incrementView`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    View,
    Likes,
    Unlikes,
    Dislikes,
    Undislikes,
}

impl ViewAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewAction::View => "view",
            ViewAction::Likes => "likes",
            ViewAction::Unlikes => "unlikes",
            ViewAction::Dislikes => "dislikes",
            ViewAction::Undislikes => "undislikes",
        }
    }
}

impl fmt::Display for ViewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(ViewAction::View),
            "likes" => Ok(ViewAction::Likes),
            "unlikes" => Ok(ViewAction::Unlikes),
            "dislikes" => Ok(ViewAction::Dislikes),
            "undislikes" => Ok(ViewAction::Undislikes),
            other => anyhow::bail!(
                "Invalid action '{}'. Expected one of: view, likes, unlikes, dislikes, undislikes.",
                other
            ),
        }
    }
}
