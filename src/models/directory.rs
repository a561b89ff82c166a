use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// A working directory that must exist under the base directory with a
/// specific access mode before dependent components run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySpec {
    /// Path relative to the base directory
    pub path: Utf8PathBuf,

    /// Unix permission bits, written as an octal string in config files
    #[serde(with = "octal_mode")]
    pub mode: u32,
}

impl DirectorySpec {
    pub fn new(path: impl Into<Utf8PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// True when the path stays inside the base directory.
    ///
    /// Absolute paths, root/prefix components and `..` are rejected.
    pub fn is_confined(&self) -> bool {
        !self.path.as_str().is_empty()
            && self
                .path
                .components()
                .all(|c| matches!(c, Utf8Component::Normal(_) | Utf8Component::CurDir))
    }

    pub fn resolve(&self, base_dir: &Utf8Path) -> Utf8PathBuf {
        base_dir.join(&self.path)
    }
}

/// The working directories every installation needs, in creation order.
pub fn default_directories() -> Vec<DirectorySpec> {
    vec![
        DirectorySpec::new("bin", 0o771),
        DirectorySpec::new("conf", 0o771),
        DirectorySpec::new("log", 0o777),
    ]
}

/// Serde adapter for permission bits.
///
/// Serializes as a zero-padded octal string (`"0771"`). Deserializes only
/// octal strings, with or without a `0o` prefix. Bare integers are rejected:
/// YAML loaders disagree on whether an unquoted `0777` is octal or decimal.
mod octal_mode {
    use serde::de::{self, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const EXPECTED: &str = "a quoted octal permission string such as \"0771\"";

    pub fn serialize<S: Serializer>(mode: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:04o}", mode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        deserializer.deserialize_any(ModeVisitor)
    }

    struct ModeVisitor;

    impl Visitor<'_> for ModeVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(EXPECTED)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u32, E> {
            let digits = value.trim();
            let digits = digits.strip_prefix("0o").unwrap_or(digits);
            let mode = u32::from_str_radix(digits, 8)
                .map_err(|_| E::custom(format!("invalid octal mode: {value:?}")))?;
            check_range(mode)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u32, E> {
            Err(E::invalid_type(Unexpected::Unsigned(value), &EXPECTED))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u32, E> {
            Err(E::invalid_type(Unexpected::Signed(value), &EXPECTED))
        }
    }

    fn check_range<E: de::Error>(mode: u32) -> Result<u32, E> {
        if mode > 0o7777 {
            return Err(E::custom(format!("mode {mode:o} exceeds 07777")));
        }
        Ok(mode)
    }
}
