//! Variable lifecycle — resolve one declaration into a materialized,
//! content-addressed variable.
//!
//! Source priority (first match wins):
//!
//! 1. ignore directive or `external` → left untouched
//! 2. `file` → read; a missing file only fails in strict mode, otherwise
//!    resolution falls through to the inferred sources
//! 3. `environment` → environment lookup, always required
//! 4. `content` → inline text, interpolated against the environment
//! 5. nothing explicit → `./{name}.secret`, then environment name variants
//!
//! Content that is not already backed by a file (or that was transformed
//! by an encode/decode directive) is written to
//! `./{name}.{token}.generated.secret`.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tide_core::labels;
use tide_core::{
    ErrorKind, Labels, ReservedLabel, ResolvedVariable, Settings, VariableDeclaration,
    VariableEnvironment, VariableKind,
};
use tide_interp::interpolate;
use tracing::{debug, info, warn};

use crate::codec::Transform;
use crate::error::{VariableError, VariableResult};
use crate::source::{candidate_names, VariableSource};

/// Extension of files picked up by source inference.
pub const INFERRED_EXTENSION: &str = "secret";
/// Suffix of files written during materialization.
pub const GENERATED_SUFFIX: &str = "generated.secret";

/// Length of the hash suffix in materialized names.
const SHORT_HASH_LEN: usize = 7;

/// Outcome of resolving a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Ignored or external; returned unchanged.
    Unmanaged(VariableDeclaration),
    Resolved(ResolvedVariable),
}

/// Raw content and the file it came from, if any.
struct Loaded {
    content: Vec<u8>,
    file: Option<PathBuf>,
}

impl Loaded {
    fn from_value(value: &str) -> Self {
        Self {
            content: value.as_bytes().to_vec(),
            file: None,
        }
    }
}

/// Resolves declarations against one run's settings and environment.
pub struct VariableManager<'a> {
    settings: &'a Settings,
    env: &'a VariableEnvironment,
}

impl<'a> VariableManager<'a> {
    pub fn new(settings: &'a Settings, env: &'a VariableEnvironment) -> Self {
        Self { settings, env }
    }

    /// Check a declaration's shape without touching files or the environment.
    pub fn validate(
        &self,
        kind: VariableKind,
        name: &str,
        declaration: &VariableDeclaration,
    ) -> VariableResult<()> {
        if is_unmanaged(declaration) {
            return Ok(());
        }
        VariableSource::from_declaration(kind, name, declaration)?;
        Transform::from_labels(kind, name, &declaration.labels)?;
        Ok(())
    }

    /// Resolve a declaration. May write a generated file.
    pub fn resolve(
        &self,
        kind: VariableKind,
        name: &str,
        declaration: &VariableDeclaration,
    ) -> VariableResult<Resolution> {
        if is_unmanaged(declaration) {
            debug!(%kind, variable = name, "declaration left unmanaged");
            return Ok(Resolution::Unmanaged(declaration.clone()));
        }

        let source = VariableSource::from_declaration(kind, name, declaration)?;
        let transform = Transform::from_labels(kind, name, &declaration.labels)?;
        let loaded = self.load(name, &source)?;

        if loaded.content.trim_ascii().is_empty() {
            warn!(%kind, variable = name, source = source.describe(), "resolved content is empty");
        }

        let (content, file) = match transform {
            Some(t) => (t.apply(name, &loaded.content)?, None),
            None => (loaded.content, loaded.file),
        };

        let hash = content_hash(&content);
        let (file, generated) = match file {
            Some(path) => (path, false),
            None => (self.materialize(name, &content)?, true),
        };

        let base = declaration
            .name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.settings.stack, name));
        let materialized_name = format!("{base}-{}", &hash[..SHORT_HASH_LEN]);
        let labels = self.identity_labels(name, &hash, &declaration.labels);

        let rewritten = VariableDeclaration {
            file: Some(file.clone()),
            environment: None,
            content: None,
            name: Some(materialized_name.clone()),
            labels: labels.clone(),
            external: false,
            extra: declaration.extra.clone(),
        };

        info!(
            %kind,
            variable = name,
            name = %materialized_name,
            source = source.describe(),
            generated,
            "variable resolved"
        );

        Ok(Resolution::Resolved(ResolvedVariable {
            kind,
            stack: self.settings.stack.clone(),
            logical_name: name.to_string(),
            name: materialized_name,
            hash,
            file,
            generated,
            labels,
            declaration: rewritten,
        }))
    }

    fn load(&self, name: &str, source: &VariableSource) -> VariableResult<Loaded> {
        match source {
            VariableSource::File(path) => {
                let path = self.settings.work_dir.join(path);
                match read_file(name, &path) {
                    Ok(content) => Ok(Loaded {
                        content,
                        file: Some(path),
                    }),
                    Err(e) if !self.settings.strict_variables && e.kind() == ErrorKind::Resolution => {
                        warn!(variable = name, error = %e, "file source unavailable, inferring source");
                        self.infer(name)
                    }
                    Err(e) => Err(e),
                }
            }
            VariableSource::Environment(variable) => self
                .env
                .get(variable)
                .map(Loaded::from_value)
                .ok_or_else(|| VariableError::EnvironmentMissing {
                    name: name.to_string(),
                    variable: variable.clone(),
                }),
            VariableSource::Content(text) => {
                let content = interpolate(text, self.env, self.settings.strict_variables)
                    .map_err(|source| VariableError::Interpolation {
                        name: name.to_string(),
                        source,
                    })?;
                Ok(Loaded {
                    content: content.into_bytes(),
                    file: None,
                })
            }
            VariableSource::Inferred => self.infer(name),
        }
    }

    fn infer(&self, name: &str) -> VariableResult<Loaded> {
        let path = self
            .settings
            .work_dir
            .join(format!("{name}.{INFERRED_EXTENSION}"));
        if path.is_file() {
            debug!(variable = name, path = %path.display(), "inferred file source");
            let content = read_file(name, &path)?;
            return Ok(Loaded {
                content,
                file: Some(path),
            });
        }

        let candidates = candidate_names(name, &self.settings.env_prefix, &self.settings.stack);
        for candidate in &candidates {
            if let Some(value) = self.env.get(candidate) {
                debug!(variable = name, from = %candidate, "inferred environment source");
                return Ok(Loaded::from_value(value));
            }
        }

        Err(VariableError::NoSource {
            name: name.to_string(),
            file: path,
            candidates: candidates.join(", "),
        })
    }

    fn materialize(&self, name: &str, content: &[u8]) -> VariableResult<PathBuf> {
        let token = unique_token()?;
        let path = self
            .settings
            .work_dir
            .join(format!("{name}.{token}.{GENERATED_SUFFIX}"));
        std::fs::write(&path, content).map_err(|source| VariableError::Materialize {
            path: path.clone(),
            source,
        })?;
        debug!(variable = name, path = %path.display(), "content materialized");
        Ok(path)
    }

    /// User labels minus directives, overlaid with the identity labels.
    fn identity_labels(&self, name: &str, hash: &str, user: &Labels) -> Labels {
        let mut merged = labels::without_directives(user);
        for label in ReservedLabel::ALL {
            let value: &str = match label {
                ReservedLabel::Name => name,
                ReservedLabel::Hash => hash,
                ReservedLabel::Stack => &self.settings.stack,
                ReservedLabel::Version => &self.settings.version,
            };
            merged.insert(label.key().to_string(), value.to_string());
        }
        merged
    }
}

fn is_unmanaged(declaration: &VariableDeclaration) -> bool {
    declaration.is_ignored() || declaration.external
}

/// Hex sha256 of the content with surrounding whitespace trimmed.
pub fn content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content.trim_ascii()))
}

fn read_file(name: &str, path: &Path) -> VariableResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| VariableError::FileRead {
        name: name.to_string(),
        path: path.to_path_buf(),
        source,
    })
}

fn unique_token() -> VariableResult<String> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).map_err(|e| VariableError::Token(e.to_string()))?;
    Ok(hex::encode(bytes))
}
