use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A slice of a tree of files. Can be loaded into an
/// [`InMemoryFs`](crate::InMemoryFs), which makes building up fixture trees
/// in tests cheap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VfsSnapshot {
    File { contents: Vec<u8> },
    Dir { children: BTreeMap<String, VfsSnapshot> },
}

impl VfsSnapshot {
    pub fn file<C: Into<Vec<u8>>>(contents: C) -> Self {
        Self::File {
            contents: contents.into(),
        }
    }

    pub fn dir<K: Into<String>, I: IntoIterator<Item = (K, VfsSnapshot)>>(children: I) -> Self {
        Self::Dir {
            children: children
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        }
    }

    pub fn empty_dir() -> Self {
        Self::Dir {
            children: BTreeMap::new(),
        }
    }
}
