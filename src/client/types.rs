//! Icon service data model and upstream wire decoding
//!
//! Upstream JSON is decoded field by field. Unknown fields are ignored and a
//! missing required field fails the whole decode, which the client reports
//! as a malformed upstream response.

use crate::error::IconError;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Thumbnail edge lengths the upstream can render
pub const THUMBNAIL_SIZES: [u32; 3] = [42, 84, 200];

/// Downloadable icon formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconFormat {
    Svg,
    Png,
}

impl IconFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            IconFormat::Svg => "svg",
            IconFormat::Png => "png",
        }
    }
}

impl fmt::Display for IconFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IconFormat {
    type Err = IconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "svg" => Ok(IconFormat::Svg),
            "png" => Ok(IconFormat::Png),
            other => Err(IconError::invalid_argument(format!(
                "format must be 'svg' or 'png', got '{other}'"
            ))),
        }
    }
}

/// Parameters for an icon search
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuery {
    pub term: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub public_domain_only: bool,
    pub thumbnail_size: Option<u32>,
    pub include_svg: bool,
}

impl SearchQuery {
    pub fn new<S: Into<String>>(term: S) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn validate(&self) -> Result<(), IconError> {
        require_non_empty("term", &self.term)?;
        validate_limit(self.limit)?;
        validate_thumbnail_size(self.thumbnail_size)
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("query", self.term.trim().to_string())];
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if self.public_domain_only {
            params.push(("limit_to_public_domain", "1".to_string()));
        }
        if let Some(size) = self.thumbnail_size {
            params.push(("thumbnail_size", size.to_string()));
        }
        if self.include_svg {
            params.push(("include_svg", "1".to_string()));
        }
        params
    }
}

/// Parameters for fetching one icon asset
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub icon_id: String,
    pub format: IconFormat,
    pub size: Option<u32>,
    pub color: Option<String>,
}

impl DownloadRequest {
    pub fn new<S: Into<String>>(icon_id: S, format: IconFormat) -> Self {
        Self {
            icon_id: icon_id.into(),
            format,
            size: None,
            color: None,
        }
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn validate(&self) -> Result<(), IconError> {
        require_non_empty("icon_id", &self.icon_id)?;

        match (self.format, self.size) {
            (IconFormat::Svg, Some(_)) => {
                return Err(IconError::invalid_argument(
                    "size only applies to png downloads",
                ))
            }
            (IconFormat::Png, Some(0)) => {
                return Err(IconError::invalid_argument("size must be greater than zero"))
            }
            _ => {}
        }

        self.normalized_color().map(|_| ())
    }

    /// Color as six hex digits without a leading '#'
    pub fn normalized_color(&self) -> Result<Option<String>, IconError> {
        let Some(color) = self.color.as_deref() else {
            return Ok(None);
        };
        let hex = color.trim().trim_start_matches('#');
        if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Some(hex.to_ascii_uppercase()))
        } else {
            Err(IconError::invalid_argument(format!(
                "color must be a 6-digit hex value like 'FF0000', got '{color}'"
            )))
        }
    }

    pub(crate) fn to_params(&self) -> Result<Vec<(&'static str, String)>, IconError> {
        let mut params = vec![("filetype", self.format.as_str().to_string())];
        if let Some(size) = self.size {
            params.push(("size", size.to_string()));
        }
        if let Some(color) = self.normalized_color()? {
            params.push(("color", color));
        }
        Ok(params)
    }
}

/// Parameters for fetching one collection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionRequest {
    pub collection_id: String,
    pub limit: Option<u32>,
    pub thumbnail_size: Option<u32>,
    pub include_svg: bool,
}

impl CollectionRequest {
    pub fn new<S: Into<String>>(collection_id: S) -> Self {
        Self {
            collection_id: collection_id.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), IconError> {
        require_id("collection_id", &self.collection_id)?;
        validate_limit(self.limit)?;
        validate_thumbnail_size(self.thumbnail_size)
    }

    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(size) = self.thumbnail_size {
            params.push(("thumbnail_size", size.to_string()));
        }
        if self.include_svg {
            params.push(("include_svg", "1".to_string()));
        }
        params
    }
}

/// Icon as listed in search results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconSummary {
    pub id: String,
    pub term: String,
    pub tags: Vec<String>,
    pub preview_url: String,
    pub license_description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
}

impl IconSummary {
    pub fn is_public_domain(&self) -> bool {
        self.license_description.eq_ignore_ascii_case("public-domain")
    }
}

/// Icon uploader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
}

/// Reference from an icon to a collection it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionRef {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Full metadata for one icon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconDetails {
    #[serde(flatten)]
    pub summary: IconSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution_preview_url: Option<String>,
    pub is_public_domain: bool,
    pub collections: Vec<CollectionRef>,
    pub available_formats: Vec<IconFormat>,
}

/// Downloaded icon bytes as reported by the upstream
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadedAsset {
    pub content: Bytes,
    pub content_type: String,
    pub format: IconFormat,
}

impl DownloadedAsset {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Icon collection as listed in search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub icon_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Creator>,
}

/// Collection together with the icons it contains
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionDetails {
    #[serde(flatten)]
    pub collection: Collection,
    pub icons: Vec<IconSummary>,
}

/// Call counts for one accounting period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    #[serde(default)]
    pub hourly: Option<u64>,
    #[serde(default)]
    pub daily: Option<u64>,
    #[serde(default)]
    pub monthly: Option<u64>,
}

/// API quota and consumption for the configured key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub limits: UsageWindow,
    #[serde(default)]
    pub usage: UsageWindow,
}

// ---- Wire types ----

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match WireId::deserialize(deserializer)? {
        WireId::Text(s) => s,
        WireId::Number(n) => n.to_string(),
    })
}

fn deserialize_optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<WireId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(WireId::Number(n)) => Ok(Some(n)),
        Some(WireId::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireTag {
    Name(String),
    Slug { slug: String },
}

#[derive(Deserialize)]
pub(crate) struct WireIcon {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(default)]
    term: Option<String>,
    #[serde(default)]
    tags: Option<Vec<WireTag>>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    license_description: String,
    #[serde(default)]
    attribution: Option<String>,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    creator: Option<Creator>,
    #[serde(default)]
    attribution_preview_url: Option<String>,
    #[serde(default)]
    collections: Option<Vec<CollectionRef>>,
    #[serde(default)]
    formats: Option<Vec<String>>,
}

impl WireIcon {
    fn into_summary_parts(self) -> Result<(IconSummary, WireIconExtras), IconError> {
        let preview_url = self
            .preview_url
            .or(self.thumbnail_url)
            .ok_or_else(|| {
                IconError::malformed_response(format!(
                    "icon {} has no preview_url or thumbnail_url",
                    self.id
                ))
            })?;

        let tags = self
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| match tag {
                WireTag::Name(name) => name,
                WireTag::Slug { slug } => slug,
            })
            .collect();

        let summary = IconSummary {
            id: self.id,
            term: self.term.unwrap_or_default(),
            tags,
            preview_url,
            license_description: self.license_description,
            attribution: self.attribution,
            permalink: self.permalink,
        };

        let extras = WireIconExtras {
            creator: self.creator,
            attribution_preview_url: self.attribution_preview_url,
            collections: self.collections.unwrap_or_default(),
            formats: self.formats,
        };

        Ok((summary, extras))
    }
}

struct WireIconExtras {
    creator: Option<Creator>,
    attribution_preview_url: Option<String>,
    collections: Vec<CollectionRef>,
    formats: Option<Vec<String>>,
}

impl TryFrom<WireIcon> for IconSummary {
    type Error = IconError;

    fn try_from(wire: WireIcon) -> Result<Self, Self::Error> {
        wire.into_summary_parts().map(|(summary, _)| summary)
    }
}

impl TryFrom<WireIcon> for IconDetails {
    type Error = IconError;

    fn try_from(wire: WireIcon) -> Result<Self, Self::Error> {
        let (summary, extras) = wire.into_summary_parts()?;

        let available_formats = match extras.formats {
            Some(formats) => formats
                .iter()
                .filter_map(|f| f.parse::<IconFormat>().ok())
                .collect(),
            None => vec![IconFormat::Svg, IconFormat::Png],
        };

        Ok(IconDetails {
            is_public_domain: summary.is_public_domain(),
            summary,
            creator: extras.creator,
            attribution_preview_url: extras.attribution_preview_url,
            collections: extras.collections,
            available_formats,
        })
    }
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub icons: Option<Vec<WireIcon>>,
}

#[derive(Deserialize)]
pub(crate) struct IconResponse {
    #[serde(default)]
    pub icon: Option<WireIcon>,
}

#[derive(Deserialize)]
pub(crate) struct WireSuggestion {
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct AutocompleteResponse {
    #[serde(default)]
    pub suggestions: Option<Vec<WireSuggestion>>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionsResponse {
    #[serde(default)]
    pub collections: Option<Vec<Collection>>,
}

#[derive(Deserialize)]
pub(crate) struct WireCollectionDetails {
    #[serde(flatten)]
    pub collection: Collection,
    #[serde(default)]
    pub icons: Option<Vec<WireIcon>>,
}

#[derive(Deserialize)]
pub(crate) struct CollectionResponse {
    #[serde(default)]
    pub collection: Option<WireCollectionDetails>,
}

#[derive(Deserialize)]
pub(crate) struct DownloadPayload {
    pub base64_encoded_file: String,
    pub content_type: String,
}

pub(crate) fn decode_icons(icons: Option<Vec<WireIcon>>) -> Result<Vec<IconSummary>, IconError> {
    icons
        .unwrap_or_default()
        .into_iter()
        .map(IconSummary::try_from)
        .collect()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), IconError> {
    if value.trim().is_empty() {
        Err(IconError::invalid_argument(format!(
            "{field} must not be empty"
        )))
    } else {
        Ok(())
    }
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<(), IconError> {
    require_non_empty(field, value)?;
    if value.contains('/') || value.contains('?') || value.contains('#') {
        return Err(IconError::invalid_argument(format!(
            "{field} contains characters that are not allowed in an id"
        )));
    }
    Ok(())
}

pub(crate) fn require_term(value: &str) -> Result<(), IconError> {
    require_non_empty("term", value)
}

pub(crate) fn validate_limit(limit: Option<u32>) -> Result<(), IconError> {
    match limit {
        Some(0) => Err(IconError::invalid_argument("limit must be greater than zero")),
        _ => Ok(()),
    }
}

pub(crate) fn validate_thumbnail_size(size: Option<u32>) -> Result<(), IconError> {
    match size {
        Some(size) if !THUMBNAIL_SIZES.contains(&size) => Err(IconError::invalid_argument(
            format!("thumbnail_size must be one of 42, 84 or 200, got {size}"),
        )),
        _ => Ok(()),
    }
}
