//! Page-level types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SourceDocument, SourceId};
use crate::error::CollectionError;

/// Stable identity of one page record.
///
/// Generated once at import time; reordering never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(Uuid);

impl PageId {
    /// Generate a fresh, never-before-seen id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Page rotation, clockwise, in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    /// No rotation
    #[default]
    R0,
    /// 90 degrees clockwise
    R90,
    /// Upside down
    R180,
    /// 270 degrees clockwise
    R270,
}

impl Rotation {
    /// All four rotations in clockwise order.
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Build a rotation from any multiple of 90 degrees, normalized mod 360.
    pub fn from_degrees(degrees: i32) -> Result<Self, CollectionError> {
        if degrees % 90 != 0 {
            return Err(CollectionError::InvalidRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            0 => Rotation::R0,
            90 => Rotation::R90,
            180 => Rotation::R180,
            _ => Rotation::R270,
        })
    }

    /// Rotation in degrees: 0, 90, 180 or 270.
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Additive composition: `(self + other) mod 360`.
    pub fn compose(self, other: Rotation) -> Rotation {
        Self::ALL[((self.quarter_turns() + other.quarter_turns()) % 4) as usize]
    }

    /// One more quarter turn clockwise.
    pub fn clockwise(self) -> Rotation {
        self.compose(Rotation::R90)
    }

    /// One quarter turn counter-clockwise.
    pub fn counter_clockwise(self) -> Rotation {
        self.compose(Rotation::R270)
    }

    /// Whether width and height swap when displayed.
    pub fn is_sideways(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    fn quarter_turns(self) -> u8 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = CollectionError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Preview raster produced by a [`Renderer`](crate::backend::Renderer).
///
/// Composition never looks at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel data, RGBA8, row-major
    pub pixels: Vec<u8>,
}

impl RasterImage {
    /// Create an image from RGBA8 pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// One entry of the output page list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Stable identity
    pub id: PageId,

    /// Owning source document
    pub source_id: SourceId,

    /// Zero-based page index inside the source
    pub source_page_index: u32,

    /// Rotation applied on top of the source page's own rotation
    pub rotation: Rotation,

    /// Thumbnail, if one was rendered
    #[serde(skip)]
    pub preview: Option<Arc<RasterImage>>,
}

impl PageRecord {
    /// Create a record for page `index` of `source` with a fresh id.
    pub fn new(source: &SourceDocument, index: u32) -> Result<Self, CollectionError> {
        if index >= source.page_count {
            return Err(CollectionError::PageIndexOutOfRange {
                index,
                page_count: source.page_count,
            });
        }
        Ok(Self {
            id: PageId::new(),
            source_id: source.id,
            source_page_index: index,
            rotation: Rotation::R0,
            preview: None,
        })
    }

    /// Attach a preview image.
    pub fn with_preview(mut self, preview: RasterImage) -> Self {
        self.preview = Some(Arc::new(preview));
        self
    }

    /// Check whether this record has a preview.
    pub fn has_preview(&self) -> bool {
        self.preview.is_some()
    }
}
