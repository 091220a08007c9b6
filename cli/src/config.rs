//! Settings for the `w3` binary.
//!
//! Settings may be read from a YAML file:
//!
//! ```yaml
//! shard_size: 104857600
//! verify: true
//! max_section_size: 134217728
//! ```
//!
//! Omitted keys keep their defaults. Command-line flags take precedence over the file.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path};
use w3up_car::{decoder, sharding};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Maximum encoded size of a shard, header included.
    pub shard_size: usize,

    /// Whether to check every block against its link while decoding.
    pub verify: bool,

    /// Largest section (link plus block bytes) the decoder accepts.
    pub max_section_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_size: sharding::SHARD_SIZE,
            verify: false,
            max_section_size: decoder::Config::default().max_section_size,
        }
    }
}

impl Config {
    /// Reads settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn decoder(&self) -> decoder::Config {
        decoder::Config {
            verify: self.verify,
            max_section_size: self.max_section_size,
            ..decoder::Config::default()
        }
    }

    pub fn sharding(&self) -> sharding::Config {
        sharding::Config {
            shard_size: self.shard_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load() {
        let file = write_config("shard_size: 1048576\nverify: true\n");
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(
            cfg,
            Config {
                shard_size: 1 << 20,
                verify: true,
                ..Config::default()
            }
        );
        assert_eq!(cfg.sharding().shard_size, 1 << 20);
        assert!(cfg.decoder().verify);
    }

    #[test]
    fn test_load_partial() {
        let file = write_config("verify: true\n");
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.shard_size, sharding::SHARD_SIZE);
        assert!(cfg.verify);
    }

    #[test]
    fn test_load_max_section_size() {
        let file = write_config("max_section_size: 134217728\n");
        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.max_section_size, 128 << 20);
        assert_eq!(cfg.decoder().max_section_size, 128 << 20);
        assert!(!cfg.decoder().verify);
    }

    #[test]
    fn test_load_unknown_key() {
        let file = write_config("shard_sise: 10\n");
        assert!(matches!(Config::load(file.path()), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::load(&dir.path().join("missing.yaml")),
            Err(Error::Io(_))
        ));
    }
}
