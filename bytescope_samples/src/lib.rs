//! Contains builders producing well-formed sample files, used to test the format walkers without binary fixtures.

pub mod cpio;
pub mod gif;
pub mod tar;
pub mod tiff;

/// A file stored in a sample archive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    pub name: String,
    /// File type and permission bits, as found in `st_mode`.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub inode: u32,
    pub nlink: u32,
    /// Modification time, in seconds since the Unix epoch.
    pub mtime: u64,
    pub contents: Vec<u8>,
}

impl Entry {
    /// Creates a regular file with `rw-r--r--` permissions.
    pub fn file<N: Into<String>, C: Into<Vec<u8>>>(name: N, contents: C) -> Self {
        Self {
            name: name.into(),
            mode: 0o100644,
            uid: 1000,
            gid: 1000,
            inode: 1,
            nlink: 1,
            mtime: 1_600_000_000,
            contents: contents.into(),
        }
    }

    pub fn directory<N: Into<String>>(name: N) -> Self {
        Self {
            mode: 0o040755,
            nlink: 2,
            ..Self::file(name, Vec::new())
        }
    }
}
