use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors that can occur when sharding or inspecting an archive from the command line.
#[derive(Debug, Error)]
pub enum Error {
    #[error("archive error: {0}")]
    Car(#[from] w3up_car::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is a directory, expected a car file")]
    NotAFile(PathBuf),
    #[error("missing root CID")]
    MissingRoot,
}

impl Error {
    /// Converts an error returned while reading a shard, recovering the archive error it carries.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if !err
            .get_ref()
            .is_some_and(|inner| inner.is::<w3up_car::Error>())
        {
            return Self::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<w3up_car::Error>()) {
            Some(Ok(err)) => Self::Car(*err),
            Some(Err(inner)) => Self::Io(io::Error::new(kind, inner)),
            None => Self::Io(kind.into()),
        }
    }
}
