use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session routing: clinical users sign in front-office, administrators back-office.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ClientType {
    #[sea_orm(string_value = "front-office")]
    #[serde(rename = "front-office")]
    FrontOffice,
    #[sea_orm(string_value = "back-office")]
    #[serde(rename = "back-office")]
    BackOffice,
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::FrontOffice => "front-office",
            Self::BackOffice => "back-office",
        };
        write!(f, "{value}")
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "front-office" => Ok(Self::FrontOffice),
            "back-office" => Ok(Self::BackOffice),
            _ => Err(format!("Unknown client type: {value}")),
        }
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Default,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserStatus {
    #[sea_orm(string_value = "actif")]
    #[serde(rename = "actif")]
    #[default]
    Actif,
    #[sea_orm(string_value = "inactif")]
    #[serde(rename = "inactif")]
    Inactif,
    #[sea_orm(string_value = "suspendu")]
    #[serde(rename = "suspendu")]
    Suspendu,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Actif => "actif",
            Self::Inactif => "inactif",
            Self::Suspendu => "suspendu",
        };
        write!(f, "{value}")
    }
}

/// Admin subtype; only `super_admin` carries special meaning in the permission
/// resolution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminType {
    SuperAdmin,
    AdminSimple,
}

impl AdminType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(Self::SuperAdmin),
            "admin_simple" => Some(Self::AdminSimple),
            _ => None,
        }
    }

    pub fn is_super_admin(value: Option<&str>) -> bool {
        matches!(value.and_then(Self::parse), Some(Self::SuperAdmin))
    }
}

impl fmt::Display for AdminType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::SuperAdmin => "super_admin",
            Self::AdminSimple => "admin_simple",
        };
        write!(f, "{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_type_display_round_trip() {
        for value in ["front-office", "back-office"] {
            let parsed: ClientType = value.parse().unwrap();
            assert_eq!(parsed.to_string(), value);
        }
    }

    #[test]
    fn client_type_rejects_unknown_values() {
        assert!("backoffice".parse::<ClientType>().is_err());
        assert!("".parse::<ClientType>().is_err());
    }

    #[test]
    fn client_type_serde_uses_hyphenated_form() {
        let json = serde_json::to_string(&ClientType::BackOffice).unwrap();
        assert_eq!(json, "\"back-office\"");
    }

    #[test]
    fn super_admin_detection() {
        assert!(AdminType::is_super_admin(Some("super_admin")));
        assert!(!AdminType::is_super_admin(Some("admin_simple")));
        assert!(!AdminType::is_super_admin(Some("autre")));
        assert!(!AdminType::is_super_admin(None));
    }
}
