//! Definitions shipped with the library.

pub(crate) const DEFINITIONS: &[(&str, &str)] = &[
    ("png.toml", include_str!("../definitions/png.toml")),
    ("jpeg.toml", include_str!("../definitions/jpeg.toml")),
];
