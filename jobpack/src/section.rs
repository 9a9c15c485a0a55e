//! Splits a JobPack buffer into its four sections.
use std::fmt;
use std::ops::Range;

use tracing::debug;

use crate::error::{JobPackError, Result};
use crate::header::{Header, HEADER_SIZE, MAGIC, NUM_SECTIONS};

/// Position of a section within the pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// Job metadata, JSON object.
    JobDict,

    /// Environment variables, JSON object.
    JobEnvs,

    /// Archive of the job's code. Opaque.
    JobHome,

    /// Auxiliary payload. Opaque.
    JobData,
}

impl SectionKind {
    pub const ALL: [SectionKind; NUM_SECTIONS] = [
        SectionKind::JobDict,
        SectionKind::JobEnvs,
        SectionKind::JobHome,
        SectionKind::JobData,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::JobDict => "jobdict",
            SectionKind::JobEnvs => "jobenvs",
            SectionKind::JobHome => "jobhome",
            SectionKind::JobData => "jobdata",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// A `[start, end)` byte range of the pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub start: usize,
    pub end: usize,
}

impl Section {
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Borrow this section out of the buffer it was framed from.
    ///
    /// Panics if `buffer` is shorter than the buffer passed to [`frame`].
    #[inline]
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.range()]
    }
}

/// Check the header against `buffer` and return the four section ranges.
///
/// Checks run in order and the first failure is returned:
/// magic, alignment of the first offset, monotonicity of the offsets up to
/// the end of the buffer, and a non-empty jobdict section.
///
/// Sections 1 to 3 may be empty.
pub fn frame(buffer: &[u8], header: &Header) -> Result<[Section; NUM_SECTIONS]> {
    if header.magic != MAGIC {
        return Err(JobPackError::BadMagic(header.magic));
    }

    let offsets = header.offsets.map(|offset| offset as usize);

    if offsets[0] != HEADER_SIZE {
        return Err(JobPackError::BadHeader(format!(
            "jobdict must start at offset {}, not {}",
            HEADER_SIZE, offsets[0]
        )));
    }

    let mut bounds = [0usize; NUM_SECTIONS + 1];
    bounds[..NUM_SECTIONS].copy_from_slice(&offsets);
    bounds[NUM_SECTIONS] = buffer.len();

    if let Some(i) = bounds.windows(2).position(|w| w[1] < w[0]) {
        let what = if i + 1 == NUM_SECTIONS {
            "end of buffer".to_string()
        } else {
            format!("offset {}", i + 1)
        };
        return Err(JobPackError::BadHeader(format!(
            "{} ({}) is before offset {} ({})",
            what,
            bounds[i + 1],
            i,
            bounds[i]
        )));
    }

    if bounds[1] == bounds[0] {
        return Err(JobPackError::BadHeader("jobdict section is empty".into()));
    }

    let sections = SectionKind::ALL.map(|kind| {
        let i = kind as usize;
        Section {
            kind,
            start: bounds[i],
            end: bounds[i + 1],
        }
    });

    debug!(
        "Framed jobpack of {} bytes: {:?}",
        buffer.len(),
        sections.map(|s| s.len())
    );
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{decode_header, encode_header, encode_header_with_magic};

    const H: u32 = HEADER_SIZE as u32;

    fn pack(offsets: [u32; 4], body: &[u8]) -> Vec<u8> {
        let mut buffer = encode_header(offsets).to_vec();
        buffer.extend_from_slice(body);
        buffer
    }

    fn frame_buffer(buffer: &[u8]) -> Result<[Section; NUM_SECTIONS]> {
        let header = decode_header(buffer)?;
        frame(buffer, &header)
    }

    #[test]
    fn frames_contiguous_sections() {
        let buffer = pack([H, H + 2, H + 5, H + 5], b"{}abcxyz");
        let sections = frame_buffer(&buffer).unwrap();

        assert_eq!(sections[0].slice(&buffer), b"{}");
        assert_eq!(sections[1].slice(&buffer), b"abc");
        assert!(sections[2].is_empty());
        assert_eq!(sections[3].slice(&buffer), b"xyz");
        assert_eq!(sections[3].end, buffer.len());
        assert_eq!(sections[2].kind, SectionKind::JobHome);
    }

    #[test]
    fn wrong_magic_wins_over_everything_else() {
        let mut buffer = encode_header_with_magic(0, [0, 0, 0, 0]).to_vec();
        buffer.extend_from_slice(b"0000");
        assert_eq!(frame_buffer(&buffer), Err(JobPackError::BadMagic(0)));
    }

    #[test]
    fn misaligned_first_offset() {
        let buffer = pack([H + 1, H + 2, H + 2, H + 2], b"000");
        assert!(matches!(
            frame_buffer(&buffer),
            Err(JobPackError::BadHeader(_))
        ));

        let buffer = pack([H - 1, H + 2, H + 2, H + 2], b"000");
        assert!(matches!(
            frame_buffer(&buffer),
            Err(JobPackError::BadHeader(_))
        ));
    }

    #[test]
    fn empty_jobdict() {
        let buffer = pack([H, H, H + 1, H + 1], b"00");
        assert_eq!(
            frame_buffer(&buffer),
            Err(JobPackError::BadHeader("jobdict section is empty".into()))
        );
    }

    #[test]
    fn decreasing_offsets() {
        let buffer = pack([H, H + 1, H, H + 1], b"00");
        assert!(matches!(
            frame_buffer(&buffer),
            Err(JobPackError::BadHeader(_))
        ));

        let buffer = pack([H, H + 1, H + 1, H], b"00");
        assert!(matches!(
            frame_buffer(&buffer),
            Err(JobPackError::BadHeader(_))
        ));
    }

    #[test]
    fn offsets_past_end_of_buffer() {
        let buffer = pack([H, H + 1, H + 1, H + 10], b"00");
        let err = frame_buffer(&buffer).unwrap_err();
        assert!(err.to_string().contains("end of buffer"));
    }

    #[test]
    fn trailing_empty_sections_are_allowed() {
        let buffer = pack([H, H + 2, H + 2, H + 2], b"{}");
        let sections = frame_buffer(&buffer).unwrap();
        assert!(sections[1..].iter().all(Section::is_empty));
    }
}
