//! The closed set of tables every document carries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::StoreError;

/// A table of the CRM document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Accounts,
    Leads,
    Activities,
    Tasks,
    Payments,
    EmailTemplates,
    EmailTriggers,
}

impl Table {
    /// Every table, in document order
    pub const ALL: [Table; 8] = [
        Table::Users,
        Table::Accounts,
        Table::Leads,
        Table::Activities,
        Table::Tasks,
        Table::Payments,
        Table::EmailTemplates,
        Table::EmailTriggers,
    ];

    /// The key of the table in the persisted document
    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Accounts => "accounts",
            Table::Leads => "leads",
            Table::Activities => "activities",
            Table::Tasks => "tasks",
            Table::Payments => "payments",
            Table::EmailTemplates => "email_templates",
            Table::EmailTriggers => "email_triggers",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Table::ALL
            .iter()
            .copied()
            .find(|t| t.name() == lowered)
            .ok_or_else(|| StoreError::UnknownTable(s.to_string()))
    }
}
