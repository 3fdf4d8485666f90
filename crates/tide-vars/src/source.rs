//! Content sources of a declaration.

use std::path::PathBuf;

use tide_core::{VariableDeclaration, VariableKind};

use crate::error::{VariableError, VariableResult};

/// Where a declaration's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableSource {
    /// Read from a file path (relative to the working directory).
    File(PathBuf),
    /// Read from a named environment entry.
    Environment(String),
    /// Inline content, interpolated before use.
    Content(String),
    /// No explicit source: try `./{name}.secret`, then environment name variants.
    Inferred,
}

impl VariableSource {
    /// Determine the source of a declaration. Setting more than one
    /// explicit source is rejected.
    pub fn from_declaration(
        kind: VariableKind,
        name: &str,
        declaration: &VariableDeclaration,
    ) -> VariableResult<Self> {
        let sources = declaration.explicit_sources();
        if sources.len() > 1 {
            return Err(VariableError::MultipleSources {
                kind,
                name: name.to_string(),
                sources: sources.join(" and "),
            });
        }
        Ok(match declaration {
            VariableDeclaration {
                file: Some(path), ..
            } => Self::File(path.clone()),
            VariableDeclaration {
                environment: Some(variable),
                ..
            } => Self::Environment(variable.clone()),
            VariableDeclaration {
                content: Some(content),
                ..
            } => Self::Content(content.clone()),
            _ => Self::Inferred,
        })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Environment(_) => "environment",
            Self::Content(_) => "content",
            Self::Inferred => "inferred",
        }
    }
}

/// Environment names tried for an inferred source, in order and without
/// duplicates: exact, upper-cased, prefix+exact, prefix+upper,
/// stack+exact, stack+upper.
pub fn candidate_names(name: &str, prefix: &str, stack: &str) -> Vec<String> {
    let upper = name.to_uppercase();
    let stack_key = stack.replace('-', "_");
    let variants = [
        name.to_string(),
        upper.clone(),
        format!("{prefix}_{name}"),
        format!("{}_{upper}", prefix.to_uppercase()),
        format!("{stack_key}_{name}"),
        format!("{}_{upper}", stack_key.to_uppercase()),
    ];
    let mut out: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !out.contains(&variant) {
            out.push(variant);
        }
    }
    out
}
