//! The course document model: blocks containing units containing slides,
//! plus the YAML metadata file persisted at the repository root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the course metadata file, stored at the repository root.
pub const COURSE_META_FILE: &str = "course.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Markdown,
    Quiz,
    Scenario,
}

/// A single authored page. `filepath` is the repository-absolute path of the
/// backing file and is kept in sync with the slide's title by the tree
/// synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    pub filepath: PathBuf,
    pub content_type: ContentType,
    #[serde(default)]
    pub content: String,
}

/// A unit owns a directory; all of its slides live directly inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    pub dir_path: PathBuf,
    #[serde(default)]
    pub slides: Vec<Slide>,
    /// Launch parameters and other passthrough metadata that sync ignores.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDocument {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl CourseDocument {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            version: "1.0".to_string(),
            blocks: Vec::new(),
        }
    }

    /// Iterates over every slide in tree order.
    pub fn slides(&self) -> impl Iterator<Item = &Slide> {
        self.blocks
            .iter()
            .flat_map(|block| block.units.iter())
            .flat_map(|unit| unit.slides.iter())
    }

    pub fn find_slide(&self, filepath: &Path) -> Option<&Slide> {
        self.slides().find(|slide| slide.filepath == filepath)
    }

    pub fn find_slide_mut(&mut self, filepath: &Path) -> Option<&mut Slide> {
        self.blocks
            .iter_mut()
            .flat_map(|block| block.units.iter_mut())
            .flat_map(|unit| unit.slides.iter_mut())
            .find(|slide| slide.filepath == filepath)
    }

    /// Returns a copy with every slide body blanked. The metadata file only
    /// records structure; slide contents live in their own files.
    pub fn stripped(&self) -> Self {
        let mut stripped = self.clone();
        for block in &mut stripped.blocks {
            for unit in &mut block.units {
                for slide in &mut unit.slides {
                    slide.content = String::new();
                }
            }
        }
        stripped
    }

    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        serde_yaml::to_string(self)
    }

    pub fn from_yaml(source: &str) -> serde_yaml::Result<Self> {
        serde_yaml::from_str(source)
    }
}
