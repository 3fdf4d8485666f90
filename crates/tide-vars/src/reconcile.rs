//! Stack reconciliation.
//!
//! Every declaration is validated before anything is written, so a
//! malformed spec fails without leaving generated files behind. String
//! values inside `services` are interpolated with the same strictness as
//! inline content; keys are left alone.

use std::collections::BTreeMap;

use serde_json::Value;
use tide_core::{ResolvedSpec, ResolvedVariable, Settings, StackSpec, VariableEnvironment, VariableKind};
use tide_interp::{interpolate, InterpolationResult};
use tracing::{debug, info, warn};

use crate::error::{VariableError, VariableResult};
use crate::lifecycle::{Resolution, VariableManager};

/// Resolve a stack spec: interpolate services, then materialize secrets
/// and configs (in that order).
pub fn reconcile(
    spec: &StackSpec,
    settings: &Settings,
    env: &VariableEnvironment,
) -> VariableResult<ResolvedSpec> {
    let services = spec.services.as_ref().ok_or(VariableError::MissingServices)?;
    let manager = VariableManager::new(settings, env);

    for kind in VariableKind::ALL {
        for (name, declaration) in spec.declarations(kind) {
            manager.validate(kind, name, declaration)?;
        }
    }

    let mut output = spec.clone();
    let mut interpolated = BTreeMap::new();
    for (name, service) in services {
        let value = interpolate_value(service, env, settings.strict_variables).map_err(|source| {
            VariableError::Interpolation {
                name: format!("services.{name}"),
                source,
            }
        })?;
        interpolated.insert(name.clone(), value);
    }
    output.services = Some(interpolated);

    let mut variables: Vec<ResolvedVariable> = Vec::new();
    let mut unmanaged = Vec::new();
    for kind in VariableKind::ALL {
        for (name, declaration) in spec.declarations(kind) {
            match manager.resolve(kind, name, declaration) {
                Ok(Resolution::Resolved(variable)) => {
                    output
                        .declarations_mut(kind)
                        .insert(name.clone(), variable.declaration.clone());
                    variables.push(variable);
                }
                Ok(Resolution::Unmanaged(_)) => unmanaged.push((kind, name.clone())),
                Err(e) => {
                    discard(&variables);
                    return Err(e);
                }
            }
        }
    }

    info!(
        stack = %settings.stack,
        version = %settings.version,
        services = services.len(),
        variables = variables.len(),
        unmanaged = unmanaged.len(),
        "stack reconciled"
    );

    Ok(ResolvedSpec {
        stack: settings.stack.clone(),
        version: settings.version.clone(),
        spec: output,
        variables,
        unmanaged,
    })
}

/// Interpolate every string scalar of a JSON value.
fn interpolate_value(
    value: &Value,
    env: &VariableEnvironment,
    strict: bool,
) -> InterpolationResult<Value> {
    Ok(match value {
        Value::String(text) => Value::String(interpolate(text, env, strict)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, env, strict))
                .collect::<InterpolationResult<_>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                out.insert(key.clone(), interpolate_value(item, env, strict)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}

/// Remove files generated before a failed resolution.
fn discard(variables: &[ResolvedVariable]) {
    for variable in variables.iter().filter(|v| v.generated) {
        match std::fs::remove_file(&variable.file) {
            Ok(()) => debug!(path = %variable.file.display(), "discarded generated file"),
            Err(e) => warn!(path = %variable.file.display(), error = %e, "could not discard generated file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tide_core::{Directive, ErrorKind, VariableDeclaration};

    use super::*;

    fn settings(dir: &tempfile::TempDir) -> Settings {
        let mut settings = Settings::new("demo", "v1");
        settings.work_dir = dir.path().to_path_buf();
        settings
    }

    fn spec() -> StackSpec {
        serde_json::from_value(json!({
            "version": "3.8",
            "services": {
                "web": {
                    "image": "nginx:${TAG:-latest}",
                    "ports": ["${PORT}:80"],
                    "deploy": {"replicas": 2},
                    "secrets": ["db_user"]
                }
            },
            "secrets": {
                "db_user": {"content": "root"},
                "legacy": {"external": true}
            },
            "configs": {
                "app_conf": {"content": "level=${LEVEL}", "template_driver": "golang"}
            }
        }))
        .unwrap()
    }

    fn env() -> VariableEnvironment {
        VariableEnvironment::from_pairs([("PORT", "8080"), ("LEVEL", "debug")])
    }

    fn file_count(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn resolves_services_and_declarations() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = reconcile(&spec(), &settings(&dir), &env()).unwrap();

        let web = &resolved.spec.services.as_ref().unwrap()["web"];
        assert_eq!(web["image"], "nginx:latest");
        assert_eq!(web["ports"][0], "8080:80");
        assert_eq!(web["deploy"]["replicas"], 2);

        assert_eq!(resolved.variables.len(), 2);
        assert_eq!(resolved.variables[0].kind, VariableKind::Secret);
        assert_eq!(resolved.variables[0].name, "demo-db_user-4813494");
        assert_eq!(resolved.unmanaged, vec![(VariableKind::Secret, "legacy".to_string())]);

        let conf = &resolved.spec.configs["app_conf"];
        assert!(conf.content.is_none());
        assert_eq!(conf.extra["template_driver"], "golang");
        let written = std::fs::read_to_string(conf.file.as_ref().unwrap()).unwrap();
        assert_eq!(written, "level=debug");

        assert!(resolved.spec.secrets["legacy"].external);
        assert!(resolved.spec.extra.contains_key("version"));
        assert_eq!(file_count(&dir), 2);
    }

    #[test]
    fn missing_services_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec();
        spec.services = None;
        let err = reconcile(&spec, &settings(&dir), &env()).unwrap_err();
        assert!(matches!(err, VariableError::MissingServices));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_declaration_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec();
        let mut bad = VariableDeclaration::with_content("x");
        bad.labels.insert(Directive::Encode.key().into(), "rot13".into());
        spec.configs.insert("z_bad".into(), bad);

        let err = reconcile(&spec, &settings(&dir), &env()).unwrap_err();
        assert!(matches!(err, VariableError::UnknownCodec { .. }));
        assert_eq!(file_count(&dir), 0);
    }

    #[test]
    fn resolution_failure_discards_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec();
        spec.configs
            .insert("z_missing".into(), VariableDeclaration::with_environment("NOPE"));

        let err = reconcile(&spec, &settings(&dir), &env()).unwrap_err();
        assert!(matches!(err, VariableError::EnvironmentMissing { .. }));
        assert_eq!(file_count(&dir), 0);
    }

    #[test]
    fn strict_mode_applies_to_services() {
        let dir = tempfile::tempdir().unwrap();
        let err = reconcile(&spec(), &settings(&dir), &VariableEnvironment::from_pairs([("LEVEL", "x")]))
            .unwrap_err();
        assert!(err.to_string().contains("services.web"), "{err}");

        let mut lenient = settings(&dir);
        lenient.strict_variables = false;
        let resolved = reconcile(&spec(), &lenient, &VariableEnvironment::new()).unwrap();
        assert_eq!(resolved.spec.services.unwrap()["web"]["ports"][0], ":80");
    }
}
