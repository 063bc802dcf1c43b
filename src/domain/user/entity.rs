use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::article::entity::ArticleRef;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
	#[allow(clippy::new_without_default)]
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}

	pub fn as_uuid(&self) -> Uuid {
		self.0
	}
}

impl From<Uuid> for UserId {
	fn from(value: Uuid) -> Self {
		Self(value)
	}
}

impl std::str::FromStr for UserId {
	type Err = uuid::Error;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Uuid::parse_str(s).map(Self)
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: UserId,
	pub name: String,
	pub email: String,
	#[serde(skip_serializing, default)]
	pub password_hash: String,
	pub liked_articles: Vec<LikedArticle>,
	pub bookmarked_articles: Vec<BookmarkedArticle>,
	pub create_dt: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedArticle {
	pub article_url: ArticleRef,
	pub article_title: String,
	pub liked_at: DateTime<Utc>,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedArticle {
	pub article_url: ArticleRef,
	pub article_title: String,
	pub bookmarked_at: DateTime<Utc>,
}

/// A user about to be inserted; the password is already hashed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NewUser {
	pub name: String,
	pub email: String,
	pub password_hash: String,
}
