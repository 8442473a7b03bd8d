//! Trajectory file parsing.
//!
//! Two on-disk layouts are supported:
//!
//! - **Binary**: a flat run of little-endian `f64`. Value 0 is the atom count,
//!   values 1..=3 the box dimensions, the rest interleaved x,y,z per atom per
//!   timestep.
//! - **Text**: the same information line by line. Line 1 holds the atom
//!   count, line 2 the box dimensions, then one `x y z` line per atom per
//!   timestep.
//!
//! Both narrow coordinates to `f32` on load.

use std::path::Path;

use glam::Vec3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Trajectory;
use crate::error::TrajviewError;

const HEADER_VALUES: usize = 4;

/// On-disk trajectory layout.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryFormat {
    /// Pick by file extension, then by sniffing the first bytes.
    #[default]
    Auto,
    /// Little-endian `f64` records.
    Binary,
    /// Whitespace-separated ASCII records.
    Text,
}

impl TrajectoryFormat {
    /// Resolve `Auto` for a concrete file.
    pub fn resolve(self, path: &Path, head: &[u8]) -> Self {
        match self {
            Self::Auto => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase);
                match ext.as_deref() {
                    Some("txt" | "dat" | "xyz") => Self::Text,
                    Some("traj" | "bin") => Self::Binary,
                    _ if looks_like_text(head) => Self::Text,
                    _ => Self::Binary,
                }
            }
            other => other,
        }
    }
}

/// Whether the leading bytes are plausibly an ASCII text trajectory.
fn looks_like_text(head: &[u8]) -> bool {
    !head.is_empty()
        && head.iter().take(64).all(|&b| {
            b.is_ascii_digit()
                || b.is_ascii_whitespace()
                || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')
        })
}

/// Read and parse a trajectory file.
///
/// # Errors
///
/// Returns [`TrajviewError::Io`] if the file cannot be read and
/// [`TrajviewError::Format`] if its contents are malformed.
pub fn load_file(
    path: &Path,
    format: TrajectoryFormat,
) -> Result<Trajectory, TrajviewError> {
    let bytes = std::fs::read(path)?;
    match format.resolve(path, &bytes) {
        TrajectoryFormat::Text => {
            let text = std::str::from_utf8(&bytes).map_err(|e| {
                TrajviewError::Format(format!("text trajectory: {e}"))
            })?;
            parse_text(text)
        }
        TrajectoryFormat::Binary | TrajectoryFormat::Auto => {
            parse_binary(&bytes)
        }
    }
}

/// Parse the binary `f64` layout.
///
/// # Errors
///
/// Returns [`TrajviewError::Format`] on truncated records, a header shorter
/// than four values, a non-integral atom count, or coordinates that do not
/// form whole timesteps.
pub fn parse_binary(bytes: &[u8]) -> Result<Trajectory, TrajviewError> {
    if bytes.len() % 8 != 0 {
        return Err(TrajviewError::Format(format!(
            "{} bytes is not a whole number of f64 values",
            bytes.len()
        )));
    }
    let values: Vec<f64> = bytes
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            f64::from_le_bytes(raw)
        })
        .collect();
    if values.len() < HEADER_VALUES {
        return Err(TrajviewError::Format(format!(
            "header needs {HEADER_VALUES} values, found {}",
            values.len()
        )));
    }

    let atom_count = atom_count_from(values[0])?;
    let dims = Vec3::new(values[1] as f32, values[2] as f32, values[3] as f32);
    let positions: Vec<f32> =
        values[HEADER_VALUES..].iter().map(|&v| v as f32).collect();

    log::debug!(
        "binary trajectory: {atom_count} atoms, {} coordinates",
        positions.len()
    );
    Trajectory::new(atom_count, dims, positions)
}

/// Parse the line-oriented text layout.
///
/// # Errors
///
/// Returns [`TrajviewError::Format`] on a missing header, unparsable numbers,
/// lines without exactly three coordinates, or a ragged final timestep.
pub fn parse_text(text: &str) -> Result<Trajectory, TrajviewError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());

    let (line_no, count_line) = lines.next().ok_or_else(|| {
        TrajviewError::Format("empty text trajectory".into())
    })?;
    let count: f64 = count_line.parse().map_err(|_| {
        TrajviewError::Format(format!(
            "line {line_no}: bad atom count {count_line:?}"
        ))
    })?;
    let atom_count = atom_count_from(count)?;

    let (line_no, dims_line) = lines.next().ok_or_else(|| {
        TrajviewError::Format("missing box dimensions line".into())
    })?;
    let dims = Vec3::from_array(parse_triple(line_no, dims_line)?);

    let mut positions = Vec::new();
    for (line_no, line) in lines {
        positions.extend_from_slice(&parse_triple(line_no, line)?);
    }
    Trajectory::new(atom_count, dims, positions)
}

fn parse_triple(line_no: usize, line: &str) -> Result<[f32; 3], TrajviewError> {
    let mut out = [0.0f32; 3];
    let mut fields = line.split_whitespace();
    for slot in &mut out {
        let field = fields.next().ok_or_else(|| {
            TrajviewError::Format(format!(
                "line {line_no}: expected 3 values in {line:?}"
            ))
        })?;
        *slot = field.parse().map_err(|_| {
            TrajviewError::Format(format!(
                "line {line_no}: bad number {field:?}"
            ))
        })?;
    }
    if fields.next().is_some() {
        return Err(TrajviewError::Format(format!(
            "line {line_no}: more than 3 values in {line:?}"
        )));
    }
    Ok(out)
}

fn atom_count_from(value: f64) -> Result<usize, TrajviewError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(TrajviewError::Format(format!(
            "atom count {value} is not a non-negative integer"
        )));
    }
    if value > u32::MAX as f64 {
        return Err(TrajviewError::Format(format!(
            "atom count {value} is too large"
        )));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(values: &[f64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn binary_header_and_frames() {
        let bytes = encode(&[
            2.0, 10.0, 11.0, 12.0, // header
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, // step 0
            1.5, 2.5, 3.5, 4.5, 5.5, 6.5, // step 1
        ]);
        let traj = parse_binary(&bytes).unwrap();
        assert_eq!(traj.atom_count(), 2);
        assert_eq!(traj.timesteps(), 2);
        assert_eq!(traj.dims(), Vec3::new(10.0, 11.0, 12.0));
        assert_eq!(traj.position(1, 0), Some(Vec3::new(1.5, 2.5, 3.5)));
    }

    #[test]
    fn binary_rejects_ragged_timesteps() {
        let bytes = encode(&[2.0, 10.0, 10.0, 10.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            parse_binary(&bytes),
            Err(TrajviewError::Format(_))
        ));
    }

    #[test]
    fn binary_rejects_truncated_values() {
        let mut bytes = encode(&[1.0, 10.0, 10.0, 10.0, 1.0, 2.0, 3.0]);
        let _ = bytes.pop();
        assert!(parse_binary(&bytes).is_err());
        assert!(parse_binary(&encode(&[1.0, 10.0])).is_err());
    }

    #[test]
    fn binary_rejects_fractional_atom_count() {
        let bytes = encode(&[1.5, 10.0, 10.0, 10.0]);
        assert!(parse_binary(&bytes).is_err());
    }

    #[test]
    fn text_layout_parses() {
        let text = "2\n10 10 10\n1 2 3\n4 5 6\n\n1.5 2.5 3.5\n4.5 5.5 6.5\n";
        let traj = parse_text(text).unwrap();
        assert_eq!(traj.timesteps(), 2);
        assert_eq!(traj.position(1, 1), Some(Vec3::new(4.5, 5.5, 6.5)));
    }

    #[test]
    fn text_reports_line_numbers() {
        let err = parse_text("1\n10 10 10\n1 2 x\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(parse_text("1\n10 10\n").is_err());
        assert!(parse_text("").is_err());
    }

    #[test]
    fn auto_format_uses_extension_then_content() {
        let auto = TrajectoryFormat::Auto;
        assert_eq!(
            auto.resolve(Path::new("a.txt"), &[0]),
            TrajectoryFormat::Text
        );
        assert_eq!(
            auto.resolve(Path::new("coords.traj"), b"1\n"),
            TrajectoryFormat::Binary
        );
        assert_eq!(
            auto.resolve(Path::new("coords"), b"2\n10 10 10\n"),
            TrajectoryFormat::Text
        );
        assert_eq!(
            auto.resolve(Path::new("coords"), &encode(&[2.0])),
            TrajectoryFormat::Binary
        );
        assert_eq!(
            TrajectoryFormat::Text.resolve(Path::new("x.traj"), &[]),
            TrajectoryFormat::Text
        );
    }

    #[test]
    fn load_file_reads_binary_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "trajview-format-{}.traj",
            std::process::id()
        ));
        std::fs::write(&path, encode(&[1.0, 5.0, 5.0, 5.0, 1.0, 2.0, 3.0]))
            .unwrap();
        let traj = load_file(&path, TrajectoryFormat::Auto).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(traj.timesteps(), 1);
        assert_eq!(traj.dims(), Vec3::splat(5.0));
    }
}
