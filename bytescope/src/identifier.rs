//! Names used by format definitions to refer to fields, variables, colors, and blocks.

use std::borrow::Borrow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

/// A UTF-8 string that cannot be empty or contain any `null` bytes.
///
/// [`Id`] is to [`Identifier`] as [`str`] is to [`String`].
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct Identifier(String);

/// Borrowed form of an identifier.
#[derive(Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Id(str);

macro_rules! format_impls {
    ($implementor: ident) => {
        impl Debug for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Debug::fmt(&self.0, f)
            }
        }

        impl Display for $implementor {
            fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

format_impls!(Identifier);
format_impls!(Id);

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidIdentifier {
    #[error("identifiers cannot be empty")]
    Empty,
    #[error("identifiers cannot contain null bytes")]
    ContainsNull,
}

impl Id {
    pub fn new(identifier: &str) -> Result<&Id, InvalidIdentifier> {
        if identifier.is_empty() {
            Err(InvalidIdentifier::Empty)
        } else if identifier.contains('\0') {
            Err(InvalidIdentifier::ContainsNull)
        } else {
            // Safety: Id is a transparent wrapper over str.
            Ok(unsafe { &*(identifier as *const str as *const Id) })
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Id {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Identifier {
    #[inline]
    pub fn as_id(&self) -> &Id {
        // Safety: the contents were already checked when the identifier was created.
        unsafe { &*(self.0.as_str() as *const str as *const Id) }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Identifier {
    type Target = Id;

    fn deref(&self) -> &Id {
        self.as_id()
    }
}

impl Borrow<Id> for Identifier {
    fn borrow(&self) -> &Id {
        self.as_id()
    }
}

impl ToOwned for Id {
    type Owned = Identifier;

    fn to_owned(&self) -> Identifier {
        Identifier(self.0.to_string())
    }
}

impl From<&Id> for Identifier {
    fn from(identifier: &Id) -> Self {
        identifier.to_owned()
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> String {
        identifier.0
    }
}

impl<'a> TryFrom<&'a str> for &'a Id {
    type Error = InvalidIdentifier;

    fn try_from(identifier: &'a str) -> Result<&'a Id, InvalidIdentifier> {
        Id::new(identifier)
    }
}

impl TryFrom<String> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(identifier: String) -> Result<Self, InvalidIdentifier> {
        Id::new(&identifier)?;
        Ok(Self(identifier))
    }
}

impl TryFrom<&str> for Identifier {
    type Error = InvalidIdentifier;

    fn try_from(identifier: &str) -> Result<Self, InvalidIdentifier> {
        Id::new(identifier).map(Id::to_owned)
    }
}

impl std::str::FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(identifier: &str) -> Result<Self, InvalidIdentifier> {
        Self::try_from(identifier)
    }
}
