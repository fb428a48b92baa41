use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ModelError;

/// Uppercase the first character and lowercase the rest
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Fixed enumerations stored as their value and displayed capitalized
pub trait Choices: Sized + Copy + 'static {
    const ALL: &'static [Self];

    fn value(&self) -> &'static str;

    /// `(value, display name)` pairs in declaration order
    fn choices() -> Vec<(&'static str, String)> {
        Self::ALL
            .iter()
            .map(|choice| (choice.value(), capitalize(choice.value())))
            .collect()
    }

    fn from_value(value: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|choice| choice.value() == value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Tenant,
    Manager,
}

impl Choices for UserRole {
    const ALL: &'static [Self] = &[UserRole::Admin, UserRole::Tenant, UserRole::Manager];

    fn value(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Tenant => "TENANT",
            UserRole::Manager => "MANAGER",
        }
    }
}

impl FromStr for UserRole {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_value(s.trim()).ok_or_else(|| ModelError::UnknownChoice(s.to_string()))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("done Successfully Created"), "Done successfully created");
        assert_eq!(capitalize("ADMIN"), "Admin");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_role_choices() {
        assert_eq!(
            UserRole::choices(),
            vec![
                ("ADMIN", "Admin".to_string()),
                ("TENANT", "Tenant".to_string()),
                ("MANAGER", "Manager".to_string()),
            ]
        );
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("MANAGER".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!(matches!(
            "OWNER".parse::<UserRole>(),
            Err(ModelError::UnknownChoice(_))
        ));
        assert_eq!(serde_json::to_value(UserRole::Tenant).unwrap(), "TENANT");
    }
}
