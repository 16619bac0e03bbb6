//! Content records: the data a site is generated from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contact details shown on a generated site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A social network profile link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAccount {
    /// Network name (e.g. "instagram")
    #[serde(rename = "type")]
    pub kind: String,

    pub url: String,
}

/// A site generation request and, once generated, where its output lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRecord {
    /// Assigned by the record store on save
    #[serde(default)]
    pub id: String,

    pub name: String,

    pub template_id: String,

    /// Category tag shown on the site
    #[serde(default)]
    pub site_type: String,

    #[serde(default)]
    pub about: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub website: String,

    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default)]
    pub contact: Contact,

    #[serde(default)]
    pub social_accounts: Vec<SocialAccount>,

    /// Filenames in the upload area, in display order
    #[serde(default)]
    pub images: Vec<String>,

    /// Output location, set after a successful generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_path: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SiteRecord {
    /// A record with only the required fields set.
    pub fn new(name: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            template_id: template_id.into(),
            site_type: String::new(),
            about: String::new(),
            description: String::new(),
            address: String::new(),
            website: String::new(),
            services: Vec::new(),
            contact: Contact::default(),
            social_accounts: Vec::new(),
            images: Vec::new(),
            site_path: None,
            created_at: Utc::now(),
        }
    }

    /// The output location, if the site has been generated.
    pub fn output_location(&self) -> Option<&str> {
        self.site_path.as_deref().filter(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sparse_json() {
        let record: SiteRecord =
            serde_json::from_str(r#"{"name": "Acme", "templateId": "t1"}"#).unwrap();

        assert_eq!(record.name, "Acme");
        assert_eq!(record.template_id, "t1");
        assert!(record.services.is_empty());
        assert_eq!(record.contact, Contact::default());
        assert_eq!(record.output_location(), None);
    }

    #[test]
    fn social_accounts_use_type_key() {
        let account: SocialAccount =
            serde_json::from_str(r#"{"type": "instagram", "url": "https://instagram.com/acme"}"#)
                .unwrap();

        assert_eq!(account.kind, "instagram");
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains(r#""type":"instagram""#));
    }

    #[test]
    fn empty_site_path_is_not_a_location() {
        let mut record = SiteRecord::new("Acme", "t1");
        record.site_path = Some(String::new());

        assert_eq!(record.output_location(), None);
    }
}
