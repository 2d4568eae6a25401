pub mod object;
pub mod root;
pub mod version;

use serde::Serialize;

/// An identifier paired with the path that addresses it.
#[derive(Debug, Serialize)]
pub struct Link {
    pub identifier: Option<String>,
    #[serde(rename = "_link")]
    pub link: String,
}

impl Link {
    pub fn object(id: String) -> Self {
        let link = format!("/{id}");
        Self {
            identifier: Some(id),
            link,
        }
    }

    pub fn root() -> Self {
        Self {
            identifier: None,
            link: "/".to_string(),
        }
    }
}
