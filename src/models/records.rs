use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dashboard::Record;

/// A service the business offers, as listed on the dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceOffering {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
}

impl ServiceOffering {
    pub fn new(title: &str, description: &str, category: &str) -> Self {
        ServiceOffering {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
        }
    }
}

impl Record for ServiceOffering {
    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.category)
    }
}

/// A client of the business.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
}

impl ClientRecord {
    pub fn new(name: &str, email: &str, phone: &str, company: &str) -> Self {
        ClientRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            company: company.to_string(),
        }
    }
}

impl Record for ClientRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn search_text(&self) -> String {
        format!("{} {} {} {}", self.name, self.email, self.phone, self.company)
    }
}

/// Dashboard panels.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    #[default]
    Overview,
    Vision,
    Services,
    Clients,
    Impact,
    Portfolio,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Overview,
        Section::Vision,
        Section::Services,
        Section::Clients,
        Section::Impact,
        Section::Portfolio,
    ];

    /// Identifier used in storage and navigation.
    pub fn id(&self) -> &'static str {
        match self {
            Section::Overview => "overview",
            Section::Vision => "vision",
            Section::Services => "services",
            Section::Clients => "clients",
            Section::Impact => "impact",
            Section::Portfolio => "portfolio",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Section::Overview => "Overview",
            Section::Vision => "Vision & Mission",
            Section::Services => "Services",
            Section::Clients => "Who We Serve",
            Section::Impact => "Our Impact",
            Section::Portfolio => "Portfolio",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown dashboard section '{0}'")]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.id() == s)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_round_trips_through_id() {
        for section in Section::ALL {
            assert_eq!(section.id().parse::<Section>(), Ok(section));
        }
        assert_eq!(
            "settings".parse::<Section>(),
            Err(UnknownSection("settings".to_string()))
        );
        assert_eq!(Section::default(), Section::Overview);
        assert_eq!(Section::Clients.label(), "Who We Serve");
    }

    #[test]
    fn test_records_get_fresh_ids() {
        let a = ServiceOffering::new("Tax Advisory", "Filing and planning", "Accounting");
        let b = ServiceOffering::new("Tax Advisory", "Filing and planning", "Accounting");
        assert_ne!(a.id(), b.id());
        assert!(a.search_text().contains("Accounting"));

        let client = ClientRecord::new("Aline", "aline@example.rw", "0788000000", "Kigali Traders");
        assert!(client.search_text().contains("Kigali Traders"));
    }
}
