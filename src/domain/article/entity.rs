use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// Canonical article reference: the provider's article URL.
///
/// The upstream provider has no stable numeric id, so the URL is the natural
/// key. It is kept exactly as supplied (minus surrounding whitespace); two
/// spellings of the same URL are two different articles.
#[derive(Clone, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleRef(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArticleRefError {
	#[error("article url must not be empty")]
	Empty,
	#[error("article url is not a valid absolute url: {0}")]
	Malformed(String),
	#[error("article url must use http or https, got `{0}`")]
	UnsupportedScheme(String),
}

impl ArticleRef {
	pub fn parse(raw: &str) -> Result<Self, ArticleRefError> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return Err(ArticleRefError::Empty);
		}
		let parsed = url::Url::parse(trimmed).map_err(|err| ArticleRefError::Malformed(err.to_string()))?;
		match parsed.scheme() {
			"http" | "https" => Ok(Self(trimmed.to_owned())),
			other => Err(ArticleRefError::UnsupportedScheme(other.to_owned())),
		}
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Rebuilds a reference read back from the store without re-validating it.
	pub(crate) fn from_stored(value: String) -> Self {
		Self(value)
	}
}

impl AsRef<str> for ArticleRef {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ArticleRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Display metadata copied in from whichever caller first touches an article.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
	pub title: String,
	pub description: Option<String>,
	pub image_url: Option<String>,
	pub source: Option<String>,
	pub author: Option<String>,
	pub published_at: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
	pub url: ArticleRef,
	#[serde(flatten)]
	pub metadata: ArticleMetadata,
	pub create_dt: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleLike {
	pub user_id: UserId,
	pub liked_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleComment {
	pub user_id: UserId,
	pub user_name: String,
	pub text: String,
	pub commented_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::{ArticleRef, ArticleRefError};

	#[rstest]
	#[case("", ArticleRefError::Empty)]
	#[case("   ", ArticleRefError::Empty)]
	#[case("not a url", ArticleRefError::Malformed("relative URL without a base".to_string()))]
	#[case("ftp://n.example/1", ArticleRefError::UnsupportedScheme("ftp".to_string()))]
	fn test_rejects_invalid_reference(
		#[case] raw: &str,
		#[case] expected: ArticleRefError,
	) {
		assert_eq!(ArticleRef::parse(raw).unwrap_err(), expected);
	}

	#[test]
	fn test_keeps_reference_verbatim() {
		let reference = ArticleRef::parse("  https://n.example/World?id=1  ").unwrap();
		assert_eq!(reference.as_str(), "https://n.example/World?id=1");

		// no normalization: a trailing slash makes a different article
		let bare = ArticleRef::parse("https://n.example").unwrap();
		assert_eq!(bare.as_str(), "https://n.example");
	}
}
