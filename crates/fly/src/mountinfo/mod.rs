//! Kernel mount table parsing.
//!
//! Reads the `/proc/<pid>/mountinfo` format:
//!
//! ```text
//! 36 35 98:0 /mnt1 /mnt2 rw,noatime master:1 - ext3 /dev/root rw,errors=continue
//! (1)(2)(3)   (4)   (5)      (6)      (7)   (8) (9)   (10)         (11)
//! ```
//!
//! Field 7 is zero or more optional tags, terminated by the literal `-`
//! in field 8. Fields 9-11 may be missing; everything before the separator
//! is required.

mod entry;
pub mod order;

pub use entry::{MountEntry, Propagation};
pub use order::{is_strict_descendant, is_within, unmount_order};

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use fly_common::{FlyError, FlyResult};

/// Number of fields that must precede the optional tags.
const REQUIRED_FIELDS: usize = 6;

/// Fields allowed after the separator: type, source, superblock options.
const MAX_TRAILING_FIELDS: usize = 3;

/// Parsed mount table, in kernel scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountTable {
    entries: Vec<MountEntry>,
}

impl MountTable {
    /// Read and parse the mount table at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> FlyResult<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).map_err(|e| FlyError::syscall("opening mount table", path, e))?;
        let table = Self::from_reader(file)?;

        tracing::debug!(
            path = %path.display(),
            mounts = table.len(),
            "Parsed mount table"
        );
        Ok(table)
    }

    /// Parse a mount table from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`FlyError::Parse`] on the first malformed line.
    pub fn from_reader(reader: impl Read) -> FlyResult<Self> {
        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_line(idx + 1, &line)?);
        }
        Ok(Self { entries })
    }

    /// All entries in scan order.
    #[must_use]
    pub fn entries(&self) -> &[MountEntry] {
        &self.entries
    }

    /// Iterate over entries in scan order.
    pub fn iter(&self) -> std::slice::Iter<'_, MountEntry> {
        self.entries.iter()
    }

    /// Number of mounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no mounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromStr for MountTable {
    type Err = FlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

impl<'a> IntoIterator for &'a MountTable {
    type Item = &'a MountEntry;
    type IntoIter = std::slice::Iter<'a, MountEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn parse_line(line_no: usize, line: &str) -> FlyResult<MountEntry> {
    let malformed = |reason: String| FlyError::Parse {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < REQUIRED_FIELDS {
        return Err(malformed(format!(
            "expected at least {REQUIRED_FIELDS} fields, found {}",
            fields.len()
        )));
    }

    let separator = fields[REQUIRED_FIELDS..]
        .iter()
        .position(|f| *f == "-")
        .map(|pos| pos + REQUIRED_FIELDS)
        .ok_or_else(|| malformed("missing '-' separator".to_string()))?;

    let trailing = &fields[separator + 1..];
    if trailing.len() > MAX_TRAILING_FIELDS {
        return Err(malformed(format!(
            "expected at most {MAX_TRAILING_FIELDS} fields after the separator, found {}",
            trailing.len()
        )));
    }

    let id = parse_number(fields[0], "mount id").map_err(malformed)?;
    let parent_id = parse_number(fields[1], "parent id").map_err(malformed)?;
    let (major, minor) = fields[2]
        .split_once(':')
        .ok_or_else(|| malformed(format!("device {:?} is not major:minor", fields[2])))?;
    let major = parse_number(major, "device major").map_err(malformed)?;
    let minor = parse_number(minor, "device minor").map_err(malformed)?;

    let optional_fields: Vec<String> = fields[REQUIRED_FIELDS..separator]
        .iter()
        .map(ToString::to_string)
        .collect();
    let propagation = Propagation::from_optional_fields(&optional_fields);
    let trailing_field = |i: usize| trailing.get(i).map_or_else(String::new, ToString::to_string);

    Ok(MountEntry {
        id,
        parent_id,
        major,
        minor,
        root: unescape(fields[3]),
        mount_point: unescape(fields[4]),
        options: fields[5].split(',').map(ToString::to_string).collect(),
        optional_fields,
        propagation,
        fs_type: trailing_field(0),
        mount_source: trailing_field(1),
        super_options: trailing_field(2),
    })
}

fn parse_number(field: &str, what: &str) -> Result<u32, String> {
    field
        .parse()
        .map_err(|_| format!("{what} {field:?} is not a number"))
}

/// Decode the `\ooo` octal escapes the kernel uses for whitespace and
/// backslashes in paths.
fn unescape(field: &str) -> PathBuf {
    let raw = field.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'\\' && i + 3 < raw.len() {
            let digits = &raw[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(byte) = u8::try_from(value) {
                    out.push(byte);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    PathBuf::from(OsString::from_vec(out))
}
