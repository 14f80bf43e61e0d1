//! Purpose: Persist a function reference with its source in a JSON fixture file.
//! Exports: `FunctionFixture`, `FixtureFile`, `ensure_fixture`, `DEFAULT_FIXTURE_FILE`.
//! Role: Create-if-missing then read, so a stored payload can be materialized later.
//! Invariants: An existing file is never rewritten; its bytes are returned as-is.
//! Invariants: Content for a given definition is byte-stable across runs.
#![allow(clippy::result_large_err)]

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, ErrorKind};
use crate::core::functions::FunctionDef;
use crate::core::node::FunctionRef;
use crate::json::parse;

pub const DEFAULT_FIXTURE_FILE: &str = "function_fixture.json";

/// On-disk shape: the qualified name plus the literal source.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionFixture {
    #[serde(rename = "pb/function")]
    pub function: String,
    #[serde(rename = "pb/code")]
    pub code: String,
}

impl FunctionFixture {
    pub fn for_function(def: &FunctionDef) -> Self {
        Self {
            function: def.qualname().to_string(),
            code: def.source().to_string(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to serialize fixture")
                .with_source(err)
        })
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        parse::from_slice(text.as_bytes()).map_err(|err| {
            let hint = parse::hint_for_error(&err, "fixture.parse");
            Error::new(ErrorKind::Corrupt)
                .with_message("fixture is not a function payload")
                .with_hint(hint)
                .with_source(err)
        })
    }

    pub fn reference(&self) -> FunctionRef {
        FunctionRef::new(self.function.clone()).with_source(self.code.clone())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixtureFile {
    pub path: PathBuf,
    /// True when this call wrote the file.
    pub created: bool,
    pub contents: String,
}

pub fn ensure_fixture(path: &Path, fixture: &FunctionFixture) -> Result<FixtureFile, Error> {
    let mut created = false;
    if !path.exists() {
        let contents = fixture.to_json_string()?;
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())
                    .map_err(|err| io_error(err, path, "failed to write fixture"))?;
                created = true;
                tracing::info!(path = %path.display(), function = %fixture.function, "created fixture");
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(io_error(err, path, "failed to create fixture")),
        }
    }
    let contents = std::fs::read_to_string(path)
        .map_err(|err| io_error(err, path, "failed to read fixture"))?;
    Ok(FixtureFile {
        path: path.to_path_buf(),
        created,
        contents,
    })
}

fn io_error(err: io::Error, path: &Path, message: &str) -> Error {
    let kind = match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    };
    Error::new(kind)
        .with_message(message)
        .with_path(path)
        .with_source(err)
}
