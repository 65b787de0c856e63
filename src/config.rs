use std::sync::Arc;

use crate::error::Result;
use crate::resolver::{ContentResolver, DEFAULT_SNIFF_LENGTH};

fn default_sniff_length() -> u64 {
    DEFAULT_SNIFF_LENGTH
}

/// Config represents a dictfs.json file
///
/// ```json
/// { "root": "bucket/photos", "sniffLength": 256 }
/// ```
///
/// Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Key prefix opened as the root directory, the whole store when empty
    #[serde(default)]
    pub root: String,
    /// Leading bytes read when classifying a file
    #[serde(rename = "sniffLength", default = "default_sniff_length")]
    pub sniff_length: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: String::new(),
            sniff_length: DEFAULT_SNIFF_LENGTH,
        }
    }
}

impl Config {
    pub fn new<S: Into<String>>(root: S) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Load a Config from a JSON reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load a Config from a file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// The shared resolver when the defaults apply, otherwise a dedicated one.
    pub fn resolver(&self) -> Arc<ContentResolver> {
        if self.sniff_length == DEFAULT_SNIFF_LENGTH {
            ContentResolver::shared()
        } else {
            Arc::new(ContentResolver::new().with_sniff_length(self.sniff_length))
        }
    }
}
