//! Sony Pictures Imageworks 1D LUT format (SPI1D).
//!
//! ```text
//! Version 1
//! From 0.0 1.0
//! Length 1024
//! Components 3
//! {
//!   0.000000 0.000000 0.000000
//!   0.001000 0.001000 0.001000
//!   ...
//! }
//! ```
//!
//! - `From` gives the input range the samples span; it defaults to [0, 1]
//! - one component entries apply to all channels, two component entries
//!   leave blue at zero
//!
//! # Example
//!
//! ```rust,no_run
//! use vfx_lut::spi::read_spi1d;
//!
//! let spi = read_spi1d("gamma.spi1d").unwrap();
//! println!("{} samples over [{}, {}]", spi.lut.size(), spi.from_min, spi.from_max);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use vfx_core::BitDepth;

use crate::{Lut1D, LutError, LutResult};

/// Decoded contents of an SPI1D file.
#[derive(Debug, Clone, PartialEq)]
pub struct Spi1d {
    /// Samples, evenly spaced over `[from_min, from_max]`.
    pub lut: Lut1D,
    /// Input value of the first sample.
    pub from_min: f32,
    /// Input value of the last sample.
    pub from_max: f32,
}

fn parse_error(message: &str, file_name: &str, line: Option<(usize, &str)>) -> LutError {
    let mut text = format!("Error parsing .spi1d file ({file_name}).  ");
    if let Some((number, content)) = line {
        text.push_str(&format!("At line ({number}): '{content}'.  "));
    }
    text.push_str(message);
    LutError::ParseError(text)
}

/// Reads an SPI1D file from disk.
pub fn read_spi1d<P: AsRef<Path>>(path: P) -> LutResult<Spi1d> {
    let path = path.as_ref();
    let file = File::open(path)?;
    parse_spi1d(BufReader::new(file), &path.display().to_string())
}

/// Parses SPI1D from a reader. `file_name` only appears in error messages.
pub fn parse_spi1d<R: BufRead>(reader: R, file_name: &str) -> LutResult<Spi1d> {
    let mut version: Option<i64> = None;
    let mut length: Option<usize> = None;
    let mut components: Option<usize> = None;
    let mut from_min = 0.0f32;
    let mut from_max = 1.0f32;

    let mut lines = reader.lines().enumerate();

    for (index, line) in lines.by_ref() {
        let line = line?;
        let number = index + 1;
        if line.starts_with('{') {
            break;
        }
        if let Some(rest) = line.strip_prefix("Version") {
            let parsed: i64 = rest
                .trim()
                .parse()
                .map_err(|_| parse_error("Invalid 'Version' Tag.", file_name, Some((number, line.as_str()))))?;
            if parsed != 1 {
                return Err(parse_error(
                    "Only format version 1 supported.",
                    file_name,
                    Some((number, line.as_str())),
                ));
            }
            version = Some(parsed);
        } else if let Some(rest) = line.strip_prefix("From") {
            let values: Vec<f32> = rest.split_whitespace().filter_map(|s| s.parse().ok()).collect();
            if values.len() != 2 {
                return Err(parse_error("Invalid 'From' Tag.", file_name, Some((number, line.as_str()))));
            }
            from_min = values[0];
            from_max = values[1];
        } else if let Some(rest) = line.strip_prefix("Components") {
            let parsed: usize = rest.trim().parse().map_err(|_| {
                parse_error("Invalid 'Components' Tag.", file_name, Some((number, line.as_str())))
            })?;
            components = Some(parsed);
        } else if let Some(rest) = line.strip_prefix("Length") {
            let parsed: usize = rest
                .trim()
                .parse()
                .map_err(|_| parse_error("Invalid 'Length' Tag.", file_name, Some((number, line.as_str()))))?;
            length = Some(parsed);
        }
    }

    if version.is_none() {
        return Err(parse_error("Could not find 'Version' Tag.", file_name, None));
    }
    let length = length.ok_or_else(|| parse_error("Could not find 'Length' Tag.", file_name, None))?;
    let components =
        components.ok_or_else(|| parse_error("Could not find 'Components' Tag.", file_name, None))?;
    if !(1..=3).contains(&components) {
        return Err(parse_error("Components must be [1,2,3].", file_name, None));
    }

    let mut data: Vec<[f32; 3]> = Vec::with_capacity(length);
    for (index, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("}") {
            break;
        }
        if trimmed.is_empty() {
            continue;
        }
        let values: Result<Vec<f32>, _> = trimmed.split_whitespace().map(str::parse::<f32>).collect();
        let values = match values {
            Ok(v) if v.len() == components => v,
            _ => {
                return Err(parse_error(
                    "Malformed LUT line.",
                    file_name,
                    Some((index + 1, trimmed)),
                ));
            }
        };
        data.push(match components {
            1 => [values[0], values[0], values[0]],
            2 => [values[0], values[1], 0.0],
            _ => [values[0], values[1], values[2]],
        });
    }

    if data.len() != length {
        return Err(parse_error("Not enough entries found.", file_name, None));
    }

    let lut = Lut1D::from_rgb(data)
        .map_err(|e| parse_error(&e.to_string(), file_name, None))?
        .with_file_output_bit_depth(BitDepth::F32);

    Ok(Spi1d {
        lut,
        from_min,
        from_max,
    })
}
