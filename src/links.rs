//! Download and preview links for files kept on the public file host.

use crate::DEFAULT_FILE_HOST;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHost {
    base: String,
}

impl Default for FileHost {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_HOST)
    }
}

impl FileHost {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn download_url(&self, id: &str) -> String {
        format!("{}/uc?id={}&export=download", self.base, id)
    }

    pub fn preview_url(&self, id: &str) -> String {
        format!("{}/file/d/{}/preview", self.base, id)
    }
}
