//! Account records and the denormalized liked/bookmarked lists kept on them.
//!
//! Only the social mutation service writes those lists; they mirror the
//! article-side state so a user's own views do not need a scan of articles.

pub mod entity;

pub use self::entity::{BookmarkedArticle, LikedArticle, NewUser, User, UserId};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
	#[error("name must not be empty")]
	EmptyName,
	#[error("email address is not valid")]
	InvalidEmail,
	#[error("password must be at least {} characters", MIN_PASSWORD_LEN)]
	PasswordTooShort,
}

/// Validated registration input.
///
/// The email is trimmed and lower-cased so uniqueness is case-insensitive;
/// the password keeps whatever whitespace the caller sent.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
	name: String,
	email: String,
	password: String,
}

impl Registration {
	pub fn try_from_parts(
		name: &str,
		email: &str,
		password: &str,
	) -> Result<Self, RegistrationError> {
		let name = name.trim();
		if name.is_empty() {
			return Err(RegistrationError::EmptyName);
		}
		let email = normalize_email(email).ok_or(RegistrationError::InvalidEmail)?;
		if password.chars().count() < MIN_PASSWORD_LEN {
			return Err(RegistrationError::PasswordTooShort);
		}
		Ok(Self {
			name: name.to_owned(),
			email,
			password: password.to_owned(),
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}
	pub fn email(&self) -> &str {
		&self.email
	}
	pub fn password(&self) -> &str {
		&self.password
	}
}

impl std::fmt::Debug for Registration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Registration")
			.field("name", &self.name)
			.field("email", &self.email)
			.finish_non_exhaustive()
	}
}

/// Lower-cases and trims an address, returning `None` when it cannot be one.
pub fn normalize_email(raw: &str) -> Option<String> {
	let email = raw.trim().to_lowercase();
	let (local, domain) = email.split_once('@')?;
	if local.is_empty() || domain.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
		return None;
	}
	Some(email)
}

#[cfg(test)]
mod test {
	use rstest::rstest;

	use super::{normalize_email, Registration, RegistrationError};

	#[rstest]
	#[case("", "alice@example.com", "secret1", RegistrationError::EmptyName)]
	#[case("  ", "alice@example.com", "secret1", RegistrationError::EmptyName)]
	#[case("alice", "alice.example.com", "secret1", RegistrationError::InvalidEmail)]
	#[case("alice", "@example.com", "secret1", RegistrationError::InvalidEmail)]
	#[case("alice", "a@b@c", "secret1", RegistrationError::InvalidEmail)]
	#[case("alice", "alice@example.com", "short", RegistrationError::PasswordTooShort)]
	fn test_invalid_registration(
		#[case] name: &str,
		#[case] email: &str,
		#[case] password: &str,
		#[case] expected: RegistrationError,
	) {
		assert_eq!(Registration::try_from_parts(name, email, password).unwrap_err(), expected);
	}

	#[test]
	fn test_registration_normalizes_name_and_email() {
		let registration = Registration::try_from_parts(" Alice ", " Alice@Example.COM ", "secret1").unwrap();
		assert_eq!(registration.name(), "Alice");
		assert_eq!(registration.email(), "alice@example.com");
		assert_eq!(registration.password(), "secret1");
		assert!(!format!("{registration:?}").contains("secret1"));
	}

	#[test]
	fn test_normalize_email() {
		assert_eq!(normalize_email("BOB@n.example"), Some("bob@n.example".to_string()));
		assert_eq!(normalize_email("bob smith@n.example"), None);
	}
}
