use serde::{Deserialize, Serialize};

pub mod error;
pub mod links;
pub mod panel;
pub mod selection;

pub use error::PanelError;
pub use links::FileHost;
pub use panel::{Layout, ListView, PanelState};
pub use selection::{Category, RouteParams, Selection};

pub const DEFAULT_API_BASE: &str = "https://back-c-seven.vercel.app/api";
pub const DEFAULT_FILE_HOST: &str = "https://drive.google.com";

/// One document held by the remote store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
}

/// Body of `POST /fetchdata`. The store calls the group name `fileName`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FetchRequest {
    pub category: String,
    #[serde(rename = "fileName")]
    pub group_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
}

/// What the surrounding application lets the panel do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Access {
    #[default]
    ReadOnly,
    Admin,
}

impl Access {
    pub fn from_admin_flag(admin: bool) -> Self {
        if admin {
            Access::Admin
        } else {
            Access::ReadOnly
        }
    }

    pub fn is_admin(self) -> bool {
        self == Access::Admin
    }
}

/// Runtime configuration served by the host at `/config`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PanelConfig {
    pub api_base: String,
    pub file_host: String,
    pub admin: bool,
    pub debug: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            file_host: DEFAULT_FILE_HOST.to_string(),
            admin: false,
            debug: false,
        }
    }
}

impl PanelConfig {
    pub fn access(&self) -> Access {
        Access::from_admin_flag(self.admin)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(feature = "frontend")]
pub mod frontend;

#[cfg(feature = "frontend")]
pub use frontend::*;
