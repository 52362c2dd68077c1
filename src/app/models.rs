//! Data models for the Bavarian LIDAR fetcher
//!
//! A [`Region`] is one KML placemark of the geoportal index; a [`TileFile`] is
//! one downloadable LIDAR file listed in a region's meta4 manifest.

use serde::{Deserialize, Serialize};

/// One surveyed region parsed from a KML placemark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Placemark name
    pub name: String,
    /// Number of tiles in the region
    pub file_count: u64,
    /// Surveyed area in square kilometres
    pub area_km2: f64,
    /// Download size as published, with `.` as decimal separator (e.g. "52.2 GB")
    pub download_size: String,
    /// Download size normalized to megabytes
    pub download_size_mb: f64,
    /// URL of the region's meta4 manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metalink: Option<String>,
}

impl Region {
    /// Manifest URL, if the placemark carried one
    pub fn metalink(&self) -> Option<&str> {
        self.metalink.as_deref().filter(|link| !link.trim().is_empty())
    }
}

/// One LIDAR tile listed in a meta4 manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFile {
    /// File name, unique across a run
    pub file_name: String,
    /// Size in bytes
    pub file_size: u64,
    /// Hash algorithm, "unknown" when the manifest does not say
    pub hash_type: String,
    /// Hash digest as published
    pub hash_value: String,
    /// First download URL of the file
    pub download_url: String,
}

/// Kind of record handled by the serializer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Region,
    TileFile,
}

impl RecordKind {
    /// Human readable name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "Region",
            Self::TileFile => "TileFile",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either record type, for heterogeneous input to the serializer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Region(Region),
    TileFile(TileFile),
}

impl Record {
    /// Kind of the wrapped record
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Region(_) => RecordKind::Region,
            Self::TileFile(_) => RecordKind::TileFile,
        }
    }
}

impl From<Region> for Record {
    fn from(region: Region) -> Self {
        Self::Region(region)
    }
}

impl From<TileFile> for Record {
    fn from(file: TileFile) -> Self {
        Self::TileFile(file)
    }
}

/// Record types that can be written as a table
pub trait Tabular: Serialize {
    /// Record kind
    const KIND: RecordKind;

    /// Column names in output order
    fn field_names() -> &'static [&'static str];
}

impl Tabular for Region {
    const KIND: RecordKind = RecordKind::Region;

    fn field_names() -> &'static [&'static str] {
        &[
            "name",
            "file_count",
            "area_km2",
            "download_size",
            "download_size_mb",
            "metalink",
        ]
    }
}

impl Tabular for TileFile {
    const KIND: RecordKind = RecordKind::TileFile;

    fn field_names() -> &'static [&'static str] {
        &[
            "file_name",
            "file_size",
            "hash_type",
            "hash_value",
            "download_url",
        ]
    }
}

impl<T: Tabular> Tabular for &T {
    const KIND: RecordKind = T::KIND;

    fn field_names() -> &'static [&'static str] {
        T::field_names()
    }
}
