//! Iridas ITX 3D LUT format parser.
//!
//! # Format
//!
//! ```text
//! LUT_3D_SIZE 17
//! # optional comment
//! 0.0 0.0 0.0
//! 1.0 0.0 0.0
//! ...
//! ```
//!
//! - Red coordinate changes fastest, then green, then blue
//! - Values are floating point RGB triplets
//! - Lines starting with `#` are comments

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use vfx_core::BitDepth;

use crate::error::{LutError, LutResult};
use crate::lut3d::Lut3D;

fn parse_error(message: &str, file_name: &str, line: Option<(usize, &str)>) -> LutError {
    let mut text = format!("Error parsing Iridas .itx file ({file_name}).  ");
    if let Some((number, content)) = line {
        text.push_str(&format!("At line ({number}): '{content}'.  "));
    }
    text.push_str(message);
    LutError::ParseError(text)
}

/// Parses an Iridas ITX file from a reader. `file_name` only appears in
/// error messages.
pub fn parse_itx<R: Read>(reader: R, file_name: &str) -> LutResult<Lut3D> {
    let reader = BufReader::new(reader);
    let mut size: Option<usize> = None;
    let mut raw: Vec<[f32; 3]> = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        if line.starts_with('#') {
            continue;
        }
        let lower = line.trim().to_lowercase();
        let parts: Vec<&str> = lower.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if parts[0] == "lut_3d_size" {
            let parsed = match parts.as_slice() {
                [_, value] => value.parse::<usize>().ok(),
                _ => None,
            };
            let parsed = parsed.ok_or_else(|| {
                parse_error("Malformed LUT_3D_SIZE tag.", file_name, Some((number, line.as_str())))
            })?;
            raw.reserve(parsed * parsed * parsed);
            size = Some(parsed);
        } else if size.is_some() {
            let values: Result<Vec<f32>, _> = parts.iter().map(|s| s.parse::<f32>()).collect();
            match values {
                Ok(v) if v.len() == 3 => raw.push([v[0], v[1], v[2]]),
                _ => {
                    return Err(parse_error(
                        "Malformed color triples specified.",
                        file_name,
                        Some((number, line.as_str())),
                    ));
                }
            }
        }
    }

    let size = size.ok_or_else(|| parse_error("No 3D LUT found.", file_name, None))?;
    let expected = size * size * size;
    if raw.len() != expected {
        return Err(parse_error(
            &format!(
                "Incorrect number of 3D LUT entries. Found {}, expected {}.",
                raw.len(),
                expected
            ),
            file_name,
            None,
        ));
    }

    Ok(Lut3D::from_red_fastest(&raw, size)
        .map_err(|e| parse_error(&e.to_string(), file_name, None))?
        .with_file_output_bit_depth(BitDepth::F32))
}

/// Reads an Iridas ITX file from disk.
pub fn read_itx<P: AsRef<Path>>(path: P) -> LutResult<Lut3D> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    parse_itx(file, &path.display().to_string())
}
