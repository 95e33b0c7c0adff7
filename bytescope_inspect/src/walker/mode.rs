//! Decomposition of Unix file modes, as stored in cpio and tar headers.

use bytescope::annotation::INVALID;
use std::fmt::{Display, Formatter};

bitflags::bitflags! {
    #[repr(transparent)]
    pub struct Permissions: u32 {
        const OTHER_EXECUTE = 0o1;
        const OTHER_WRITE = 0o2;
        const OTHER_READ = 0o4;
        const GROUP_EXECUTE = 0o10;
        const GROUP_WRITE = 0o20;
        const GROUP_READ = 0o40;
        const OWNER_EXECUTE = 0o100;
        const OWNER_WRITE = 0o200;
        const OWNER_READ = 0o400;
        const STICKY = 0o1000;
        const SET_GROUP_ID = 0o2000;
        const SET_USER_ID = 0o4000;
    }
}

impl Permissions {
    #[inline]
    pub fn from_mode(mode: u32) -> Self {
        Self::from_bits_truncate(mode)
    }
}

impl Display for Permissions {
    /// Writes the permissions the way `ls -l` does, for example `rwxr-sr-t`.
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let triples = [
            (Self::OWNER_READ, Self::OWNER_WRITE, Self::OWNER_EXECUTE, Self::SET_USER_ID, 's'),
            (Self::GROUP_READ, Self::GROUP_WRITE, Self::GROUP_EXECUTE, Self::SET_GROUP_ID, 's'),
            (Self::OTHER_READ, Self::OTHER_WRITE, Self::OTHER_EXECUTE, Self::STICKY, 't'),
        ];

        for (read, write, execute, special, symbol) in triples {
            let flag = |permission: Self, symbol: char| if self.contains(permission) { symbol } else { '-' };
            let execute = match (self.contains(execute), self.contains(special)) {
                (true, true) => symbol,
                (false, true) => symbol.to_ascii_uppercase(),
                (true, false) => 'x',
                (false, false) => '-',
            };

            write!(f, "{}{}{}", flag(read, 'r'), flag(write, 'w'), execute)?;
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FileType {
    Socket,
    SymbolicLink,
    Regular,
    BlockDevice,
    Directory,
    CharacterDevice,
    Fifo,
}

impl FileType {
    pub const MASK: u32 = 0o170000;

    pub fn from_mode(mode: u32) -> Option<Self> {
        Some(match mode & Self::MASK {
            0o140000 => Self::Socket,
            0o120000 => Self::SymbolicLink,
            0o100000 => Self::Regular,
            0o060000 => Self::BlockDevice,
            0o040000 => Self::Directory,
            0o020000 => Self::CharacterDevice,
            0o010000 => Self::Fifo,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Socket => "Socket",
            Self::SymbolicLink => "Symbolic link",
            Self::Regular => "Regular file",
            Self::BlockDevice => "Block device",
            Self::Directory => "Directory",
            Self::CharacterDevice => "Character device",
            Self::Fifo => "FIFO",
        }
    }
}

/// Describes the file type and permissions contained in a mode, such as `Regular file (rw-r--r--)`.
pub fn describe(mode: u32) -> String {
    match FileType::from_mode(mode) {
        Some(file_type) => format!("{} ({})", file_type.name(), Permissions::from_mode(mode)),
        None => INVALID.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_are_described() {
        assert_eq!(describe(0o100644), "Regular file (rw-r--r--)");
        assert_eq!(describe(0o040755), "Directory (rwxr-xr-x)");
        assert_eq!(describe(0o041777), "Directory (rwxrwxrwt)");
        assert_eq!(describe(0o104754), "Regular file (rwsr-xr--)");
        assert_eq!(describe(0o102640), "Regular file (rw-r-S---)");
        assert_eq!(describe(0o170644), INVALID);
        assert_eq!(describe(0o644), INVALID);
    }
}
