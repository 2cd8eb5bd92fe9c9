//! Plain text persistence of features.
//!
//! ```text
//! NUM_FEATURES DIM
//! X Y SCALE ORIENTATION D_1 D_2 D_3 ... D_DIM
//! ...
//! X Y SCALE ORIENTATION D_1 D_2 D_3 ... D_DIM
//! ```
//!
//! The four keypoint fields are floats, the descriptor components integers in `[0, 255]`.

use crate::{Error, Features, Keypoint, Result, DESCRIPTOR_SIZE};
use log::*;
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Rows reserved up front when reading, whatever the header claims.
const PREALLOCATED_ROWS: usize = 1 << 12;

/// Writes features in the text format.
///
/// Floats use the shortest representation that parses back to the same value.
pub fn write_features<W: Write>(mut writer: W, features: &Features) -> Result<()> {
    writeln!(writer, "{} {}", features.len(), DESCRIPTOR_SIZE)?;
    for (keypoint, descriptor) in features.iter() {
        write!(
            writer,
            "{} {} {} {}",
            keypoint.x, keypoint.y, keypoint.scale, keypoint.orientation
        )?;
        for value in descriptor.iter() {
            write!(writer, " {}", value)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_features_path(path: impl AsRef<Path>, features: &Features) -> Result<()> {
    let path = path.as_ref();
    debug!("Writing {} features to {}", features.len(), path.display());
    write_features(BufWriter::new(File::create(path)?), features)
}

fn parse_field<T: FromStr>(field: Option<&str>, line: usize, name: &str) -> Result<T> {
    let field = field.ok_or_else(|| Error::Format {
        line,
        reason: format!("missing {}", name),
    })?;
    field.parse().map_err(|_| Error::Format {
        line,
        reason: format!("invalid {} {:?}", name, field),
    })
}

/// Reads features written by [`write_features`].
pub fn read_features<R: BufRead>(reader: R) -> Result<Features> {
    let mut lines = reader.lines().enumerate().map(|(ix, line)| (ix + 1, line));

    let (line_number, header) = lines.next().ok_or_else(|| Error::Format {
        line: 1,
        reason: "missing header".into(),
    })?;
    let header = header?;
    let mut fields = header.split_whitespace();
    let num_features: usize = parse_field(fields.next(), line_number, "feature count")?;
    let dim: usize = parse_field(fields.next(), line_number, "descriptor dimension")?;
    if dim != DESCRIPTOR_SIZE {
        return Err(Error::Format {
            line: line_number,
            reason: format!("descriptor dimension {} instead of {}", dim, DESCRIPTOR_SIZE),
        });
    }

    // The header count is untrusted, rows are only allocated once parsed.
    let mut keypoints = Vec::with_capacity(num_features.min(PREALLOCATED_ROWS));
    let mut rows: Vec<[u8; DESCRIPTOR_SIZE]> = Vec::with_capacity(keypoints.capacity());
    while keypoints.len() < num_features {
        let (line_number, line) = lines.next().ok_or_else(|| Error::Format {
            line: keypoints.len() + 2,
            reason: format!("expected {} features, found {}", num_features, keypoints.len()),
        })?;
        let line = line?;
        let mut fields = line.split_whitespace();
        keypoints.push(Keypoint {
            x: parse_field(fields.next(), line_number, "x")?,
            y: parse_field(fields.next(), line_number, "y")?,
            scale: parse_field(fields.next(), line_number, "scale")?,
            orientation: parse_field(fields.next(), line_number, "orientation")?,
        });
        let mut row = [0u8; DESCRIPTOR_SIZE];
        for value in row.iter_mut() {
            *value = parse_field(fields.next(), line_number, "descriptor component")?;
        }
        if fields.next().is_some() {
            return Err(Error::Format {
                line: line_number,
                reason: "trailing fields".into(),
            });
        }
        rows.push(row);
    }
    let descriptors = Array2::from_shape_fn((rows.len(), DESCRIPTOR_SIZE), |(r, c)| rows[r][c]);
    Features::new(keypoints, descriptors)
}

pub fn read_features_path(path: impl AsRef<Path>) -> Result<Features> {
    let path = path.as_ref();
    let features = read_features(BufReader::new(File::open(path)?))?;
    debug!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let keypoints = vec![Keypoint {
            x: 0.5,
            y: 1.25,
            scale: 2.0,
            orientation: -0.75,
        }];
        let descriptors = Array2::from_shape_fn((1, DESCRIPTOR_SIZE), |(_, c)| c as u8);
        let features = Features::new(keypoints, descriptors).unwrap();
        let mut buffer = vec![];
        write_features(&mut buffer, &features).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("1 128"));
        assert!(lines.next().unwrap().starts_with("0.5 1.25 2 -0.75 0 1 2 3 "));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn rejects_wrong_dimension() {
        let text = "1 4\n0.32 0.12 1.23 1.0 1 2 3 4\n";
        assert!(matches!(
            read_features(text.as_bytes()),
            Err(Error::Format { line: 1, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_component() {
        let mut text = String::from("1 128\n0.32 0.12 1.23 1.0");
        for _ in 0..127 {
            text.push_str(" 1");
        }
        text.push_str(" 256\n");
        assert!(matches!(
            read_features(text.as_bytes()),
            Err(Error::Format { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_missing_rows() {
        let text = "2 128\n";
        assert!(matches!(
            read_features(text.as_bytes()),
            Err(Error::Format { line: 2, .. })
        ));
    }

    #[test]
    fn huge_header_count_is_a_format_error() {
        let text = "18446744073709551615 128\n";
        assert!(matches!(
            read_features(text.as_bytes()),
            Err(Error::Format { line: 2, .. })
        ));
    }

    #[test]
    fn empty_collection() {
        let mut buffer = vec![];
        write_features(&mut buffer, &Features::empty()).unwrap();
        assert_eq!(buffer, b"0 128\n");
        assert!(read_features(&buffer[..]).unwrap().is_empty());
    }
}
