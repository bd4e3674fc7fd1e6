//! Score identification and credits

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Work, movement, creators and encoding information of a score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrIdentification {
    pub work_title: Option<String>,
    pub work_number: Option<String>,
    pub movement_title: Option<String>,
    pub movement_number: Option<String>,

    /// Creators by type ("composer", "lyricist", "arranger", ...)
    pub creators: BTreeMap<String, Vec<String>>,

    pub rights: Vec<String>,
    pub softwares: Vec<String>,
    pub encoding_date: Option<String>,
    pub source: Option<String>,
}

impl MsrIdentification {
    pub fn add_creator(&mut self, creator_type: &str, name: &str) {
        self.creators
            .entry(creator_type.to_string())
            .or_default()
            .push(name.to_string());
    }
}

/// A `<credit>` block: text printed on a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsrCredit {
    pub page: u32,
    pub types: Vec<String>,
    pub words: Vec<String>,
    pub input_line: u32,
}
