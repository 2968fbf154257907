//! Writability queries against the live memory map.
//!
//! Every query re-reads `/proc/self/maps`: mappings come and go between any
//! two calls, so nothing parsed here outlives the call that parsed it.

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use thiserror::Error;

const MAPS_PATH: &str = "/proc/self/maps";

/// Errors from reading or parsing a memory map snapshot.
#[derive(Debug, Error)]
pub enum MapsError {
    #[error("failed to read memory map: {0}")]
    Io(#[from] io::Error),
    #[error("malformed memory map line: {line:?}")]
    Malformed { line: String },
}

impl MapsError {
    fn malformed(line: &[u8]) -> Self {
        Self::Malformed {
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }
}

/// The outcome of a writability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The address is inside a writable mapping.
    Writable,
    /// The address is inside a mapping without write permission.
    NotWritable,
    /// The map couldn't be read, or no mapping contains the address.
    Unknown,
}

/// One mapping: `[start, end)` plus its write bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
    pub writable: bool,
}

impl Region {
    /// Parses a single maps line, e.g.
    /// `7ffd5b3a1000-7ffd5b3c2000 rw-p 00000000 00:00 0    [stack]`.
    ///
    /// Only the address range and the permission string are looked at.
    pub fn parse(line: &[u8]) -> Result<Self, MapsError> {
        let mut fields = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|field| !field.is_empty());

        let (Some(range), Some(perms)) = (fields.next(), fields.next()) else {
            return Err(MapsError::malformed(line));
        };

        let Some(dash) = range.iter().position(|&b| b == b'-') else {
            return Err(MapsError::malformed(line));
        };
        let (Some(start), Some(end)) = (parse_hex(&range[..dash]), parse_hex(&range[dash + 1..]))
        else {
            return Err(MapsError::malformed(line));
        };

        if perms.len() != 4 {
            return Err(MapsError::malformed(line));
        }

        Ok(Self {
            start,
            end,
            writable: perms[1] == b'w',
        })
    }

    /// Upper bound is exclusive: the kernel reports `end` as one past the
    /// last mapped byte.
    pub fn contains(&self, addr: usize) -> bool {
        self.start <= addr && addr < self.end
    }
}

fn parse_hex(digits: &[u8]) -> Option<usize> {
    let digits = std::str::from_utf8(digits).ok()?;
    usize::from_str_radix(digits, 16).ok()
}

/// Finds the region containing `addr` in a maps snapshot.
///
/// Regions are listed in ascending order, so the scan stops at the first
/// region that contains `addr` or starts above it. A malformed line before
/// that point is an error: nothing past it can be trusted.
pub fn lookup<R: BufRead>(mut reader: R, addr: usize) -> Result<Option<Region>, MapsError> {
    let mut line = Vec::with_capacity(128);

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }

        let trimmed = line.strip_suffix(b"\n").unwrap_or(&line);
        if trimmed.is_empty() {
            continue;
        }

        let region = Region::parse(trimmed)?;
        if region.contains(addr) {
            return Ok(Some(region));
        }
        if region.start > addr {
            return Ok(None);
        }
    }
}

/// Classifies `addr` against a maps snapshot.
pub fn classify_from<R: BufRead>(reader: R, addr: usize) -> Classification {
    match lookup(reader, addr) {
        Ok(Some(region)) if region.writable => Classification::Writable,
        Ok(Some(_)) => Classification::NotWritable,
        Ok(None) | Err(_) => Classification::Unknown,
    }
}

/// Classifies `addr` against a fresh snapshot of this process's memory map.
pub fn classify(addr: usize) -> Classification {
    match File::open(MAPS_PATH) {
        Ok(maps) => classify_from(BufReader::new(maps), addr),
        Err(_) => Classification::Unknown,
    }
}
