use crate::model::JobId;

/// Structure file loaded into the interactive viewer.
pub const STRUCTURE_FILE: &str = "input_model_0.cif";
/// Structure file offered for download.
pub const DOWNLOAD_FILE: &str = "prediction.cif";

/// URL layout of the job service below a fixed API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn jobs(&self) -> String {
        format!("{}/jobs", self.base)
    }

    pub fn job(&self, id: &JobId) -> String {
        format!("{}/jobs/{}", self.base, id)
    }

    pub fn files(&self, id: &JobId) -> String {
        format!("{}/files", self.job(id))
    }

    pub fn file(&self, id: &JobId, filename: &str) -> String {
        format!("{}/files/{}", self.job(id), filename)
    }

    pub fn structure_url(&self, id: &JobId) -> String {
        self.file(id, STRUCTURE_FILE)
    }

    pub fn download_url(&self, id: &JobId) -> String {
        self.file(id, DOWNLOAD_FILE)
    }
}

/// Chooses the file to visualize from a job's file listing.
///
/// Prefers the conventional model file, then any first-model mmCIF, then any mmCIF.
pub fn pick_structure_file(files: &[String]) -> Option<&str> {
    files
        .iter()
        .find(|name| name.as_str() == STRUCTURE_FILE)
        .or_else(|| files.iter().find(|name| name.ends_with("_model_0.cif")))
        .or_else(|| files.iter().find(|name| name.ends_with(".cif")))
        .map(String::as_str)
}
