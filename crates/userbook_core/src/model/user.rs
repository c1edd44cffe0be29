//! User domain model.
//!
//! # Responsibility
//! - Define the single persisted entity and its insert payload.
//! - Define typed lookup criteria and single-field edits.
//!
//! # Invariants
//! - `id` is assigned by the store on insert and never edited afterwards.
//! - `name` and `email` are required (non-blank) but not unique.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned primary key of a user row.
pub type UserId = i64;

/// A persisted user row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Insert payload; the id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Rejection reasons for user payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    EmptyEmail,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "user name must not be empty"),
            Self::EmptyEmail => write!(f, "user email must not be empty"),
        }
    }
}

impl Error for UserValidationError {}

fn validate_fields(name: &str, email: &str) -> Result<(), UserValidationError> {
    if name.trim().is_empty() {
        return Err(UserValidationError::EmptyName);
    }
    if email.trim().is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }
    Ok(())
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Checks required fields before the payload reaches the store.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_fields(&self.name, &self.email)
    }

    /// Binds the payload to a store-assigned id.
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
        }
    }
}

impl User {
    pub fn validate(&self) -> Result<(), UserValidationError> {
        validate_fields(&self.name, &self.email)
    }

    /// Returns a copy with one field replaced. The id is carried over as-is.
    pub fn apply(&self, change: &UserChange) -> Self {
        let mut updated = self.clone();
        match change {
            UserChange::Name(name) => updated.name = name.clone(),
            UserChange::Email(email) => updated.email = email.clone(),
        }
        updated
    }
}

/// Column selector used to locate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Id,
    Name,
    Email,
}

impl UserField {
    /// Resolves a UI label (`id|name|email`, any case) into a field.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
        }
    }
}

/// Field and value used to locate a row for select/update/delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCriteria {
    Id(UserId),
    Name(String),
    Email(String),
}

/// Raw criteria input that cannot be turned into a typed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriteriaError {
    EmptyValue,
    InvalidId(String),
}

impl Display for CriteriaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyValue => write!(f, "criteria value must not be empty"),
            Self::InvalidId(raw) => write!(f, "`{raw}` is not a valid user id"),
        }
    }
}

impl Error for CriteriaError {}

impl UserCriteria {
    /// Builds criteria from raw text entered for `field`.
    ///
    /// Text values are trimmed; ids must parse as a 64-bit integer.
    pub fn from_field(field: UserField, raw: &str) -> Result<Self, CriteriaError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(CriteriaError::EmptyValue);
        }
        match field {
            UserField::Id => value
                .parse::<UserId>()
                .map(Self::Id)
                .map_err(|_| CriteriaError::InvalidId(value.to_string())),
            UserField::Name => Ok(Self::Name(value.to_string())),
            UserField::Email => Ok(Self::Email(value.to_string())),
        }
    }

    pub fn field(&self) -> UserField {
        match self {
            Self::Id(_) => UserField::Id,
            Self::Name(_) => UserField::Name,
            Self::Email(_) => UserField::Email,
        }
    }
}

/// Single-field edit applied to a located row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChange {
    Name(String),
    Email(String),
}

impl UserChange {
    /// Builds an edit for `field`. Returns `None` for `UserField::Id`,
    /// which is immutable.
    pub fn for_field(field: UserField, value: impl Into<String>) -> Option<Self> {
        match field {
            UserField::Id => None,
            UserField::Name => Some(Self::Name(value.into())),
            UserField::Email => Some(Self::Email(value.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CriteriaError, NewUser, User, UserChange, UserCriteria, UserField, UserValidationError,
    };

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            NewUser::new("  ", "a@x.com").validate(),
            Err(UserValidationError::EmptyName)
        );
        assert_eq!(
            NewUser::new("Alice", "").validate(),
            Err(UserValidationError::EmptyEmail)
        );
        assert!(NewUser::new("Alice", "alice@x.com").validate().is_ok());
    }

    #[test]
    fn field_labels_parse_case_insensitively() {
        assert_eq!(UserField::parse_label("ID"), Some(UserField::Id));
        assert_eq!(UserField::parse_label(" Name "), Some(UserField::Name));
        assert_eq!(UserField::parse_label("email"), Some(UserField::Email));
        assert_eq!(UserField::parse_label("phone"), None);
    }

    #[test]
    fn id_criteria_requires_integer_text() {
        assert_eq!(
            UserCriteria::from_field(UserField::Id, " 42 "),
            Ok(UserCriteria::Id(42))
        );
        assert_eq!(
            UserCriteria::from_field(UserField::Id, "4x"),
            Err(CriteriaError::InvalidId("4x".to_string()))
        );
        assert_eq!(
            UserCriteria::from_field(UserField::Email, "   "),
            Err(CriteriaError::EmptyValue)
        );
    }

    #[test]
    fn decoded_payload_binds_to_store_assigned_id() {
        let payload: NewUser =
            serde_json::from_str(r#"{"name": "Alice", "email": "alice@x.com"}"#).unwrap();
        assert!(payload.validate().is_ok());

        let user = payload.into_user(12);
        assert_eq!(
            user,
            User {
                id: 12,
                name: "Alice".to_string(),
                email: "alice@x.com".to_string(),
            }
        );
    }

    #[test]
    fn apply_keeps_id_and_untouched_field() {
        let user = User {
            id: 7,
            name: "Alice".to_string(),
            email: "alice@x.com".to_string(),
        };
        let renamed = user.apply(&UserChange::Name("Alicia".to_string()));
        assert_eq!(renamed.id, 7);
        assert_eq!(renamed.name, "Alicia");
        assert_eq!(renamed.email, "alice@x.com");
        assert_eq!(UserChange::for_field(UserField::Id, "9"), None);
    }
}
