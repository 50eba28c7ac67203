//! Colormap resource parsing and lookup.

use std::path::Path;

use landsat_core::{Error, Result};
use tracing::debug;

const DEFAULT_NDVI: &str = include_str!("../resources/ndvi.txt");

/// Number of entries an 8-bit lookup needs
const ENTRIES: usize = 256;

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black, reserved for nodata.
    pub const NODATA: Self = Self { r: 0, g: 0, b: 0 };
}

/// A full 256-entry lookup table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormap {
    entries: Box<[Rgb; ENTRIES]>,
}

impl Colormap {
    /// Parse a colormap resource.
    ///
    /// Entries are numbered from 1 in file order; reading stops at the
    /// first blank line. Fewer than 255 entries is an error since every
    /// NDVI index must resolve to a color.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let header = lines
            .next()
            .ok_or_else(|| Error::Colormap("empty colormap".into()))?;
        let max = header
            .trim()
            .strip_prefix("mode")
            .map(|rest| rest.trim_start().trim_start_matches('=').trim())
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|m| m.is_finite() && *m > 0.0)
            .ok_or_else(|| Error::Colormap(format!("bad header line: {:?}", header)))?;

        let mut entries = Box::new([Rgb::NODATA; ENTRIES]);
        let mut count = 0usize;

        for (line_no, line) in lines.enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                break;
            }
            if count + 1 >= ENTRIES {
                break;
            }
            if fields.len() < 3 {
                return Err(Error::Colormap(format!(
                    "line {}: expected 3 values, got {}",
                    line_no + 2,
                    fields.len()
                )));
            }

            let mut rgb = [0u8; 3];
            for (slot, field) in rgb.iter_mut().zip(&fields[..3]) {
                let v: f64 = field.parse().map_err(|_| {
                    Error::Colormap(format!("line {}: bad value {:?}", line_no + 2, field))
                })?;
                *slot = (v * 255.0 / max).round().clamp(0.0, 255.0) as u8;
            }

            count += 1;
            entries[count] = Rgb::new(rgb[0], rgb[1], rgb[2]);
        }

        if count < ENTRIES - 1 {
            return Err(Error::Colormap(format!(
                "colormap has {} entries, {} required",
                count,
                ENTRIES - 1
            )));
        }

        Ok(Self { entries })
    }

    /// Read and parse a colormap file
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading colormap");
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Brown-to-green NDVI colormap shipped with the crate
    pub fn default_ndvi() -> Result<Self> {
        Self::parse(DEFAULT_NDVI)
    }

    /// Color for an index; 0 is always black
    #[inline]
    pub fn lookup(&self, index: u8) -> Rgb {
        self.entries[index as usize]
    }
}
