//! Purpose: Functions compiled into picklebox and available for materialization.
//! Exports: `get_area`, `get_perimeter`, `builtin_functions`.
//! Role: Default `FunctionRegistry` for the CLI and the shipped fixture file.
//! Invariants: Qualified names and source text are stable; stored payloads depend on them.

use crate::api::{Error, ErrorKind, FunctionDef, FunctionFixture, FunctionRegistry};

pub fn get_area() -> FunctionDef {
    crate::function_def!(fn get_area(length: i64, width: i64) -> Result<i64> {
        length.checked_mul(width).ok_or_else(overflow)
    })
}

pub fn get_perimeter() -> FunctionDef {
    crate::function_def!(fn get_perimeter(length: i64, width: i64) -> Result<i64> {
        length
            .checked_add(width)
            .and_then(|sum| sum.checked_mul(2))
            .ok_or_else(overflow)
    })
}

fn overflow() -> Error {
    Error::new(ErrorKind::Unsupported)
        .with_message("result exceeds the signed 64-bit range")
        .with_hint("Integers are 64-bit; pass smaller arguments.")
}

/// Fixture content written when the fixture file is missing.
pub fn perimeter_fixture() -> FunctionFixture {
    FunctionFixture::for_function(&get_perimeter())
}

pub fn builtin_functions() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    for def in [get_area(), get_perimeter()] {
        // Qualified names are distinct by construction.
        if let Err(err) = registry.register(def) {
            tracing::error!(error = %err, "builtin registration failed");
        }
    }
    registry
}
