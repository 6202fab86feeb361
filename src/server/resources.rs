//! Read-only markdown documents served through `resources/*`

use crate::protocol::mcp::{ResourceContents, ResourceDefinition};

const MARKDOWN: &str = "text/markdown";

pub struct StaticResource {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
}

pub static RESOURCES: [StaticResource; 2] = [
    StaticResource {
        uri: "documentation://usage",
        name: "API usage",
        description: "Quotas, error kinds and licensing notes",
        text: include_str!("docs/usage.md"),
    },
    StaticResource {
        uri: "documentation://getting-started",
        name: "Getting started",
        description: "Credentials setup and a first search-to-download walkthrough",
        text: include_str!("docs/getting_started.md"),
    },
];

impl StaticResource {
    pub fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: self.uri.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            mime_type: MARKDOWN.to_string(),
        }
    }

    pub fn contents(&self) -> ResourceContents {
        ResourceContents {
            uri: self.uri.to_string(),
            mime_type: MARKDOWN.to_string(),
            text: self.text.to_string(),
        }
    }
}

pub fn find(uri: &str) -> Option<&'static StaticResource> {
    RESOURCES.iter().find(|resource| resource.uri == uri)
}
