//! Recipe converters: declared environment → `EnvironmentModel`.
//!
//! One converter per recipe type. `convert` dispatches on the recipe tag;
//! each converter still rejects foreign recipes on its own so it can be
//! called directly.

use workbay_common::{DeclaredEnvironment, Recipe, ServiceSpec};

use super::model::{BuildContext, ContainerConfig, EnvironmentModel};
use crate::domain::error::ValidationError;

/// Convert any declared environment.
///
/// # Errors
///
/// Returns the converter's `ValidationError` when the declaration is malformed.
pub fn convert(env: &DeclaredEnvironment) -> Result<EnvironmentModel, ValidationError> {
    match &env.recipe {
        Recipe::Compose { .. } => ComposeConverter.convert(env),
        Recipe::Dockerfile { .. } => DockerfileConverter.convert(env),
        Recipe::Image { .. } => ImageConverter.convert(env),
    }
}

/// Compose recipe: one machine per service, fields copied 1:1.
pub struct ComposeConverter;

impl ComposeConverter {
    /// # Errors
    ///
    /// Fails on a non-compose recipe, an empty service map, a service with no
    /// image or build source, or a declared machine that is not a service.
    pub fn convert(&self, env: &DeclaredEnvironment) -> Result<EnvironmentModel, ValidationError> {
        let Recipe::Compose { services } = &env.recipe else {
            return Err(ValidationError::TypeMismatch {
                converter: "compose",
                actual: env.recipe.kind(),
            });
        };
        if services.is_empty() {
            return Err(ValidationError::NoMachines);
        }
        if let Some(unknown) = env.machines.keys().find(|m| !services.contains_key(*m)) {
            return Err(ValidationError::UnknownMachine(unknown.clone()));
        }

        let mut model = EnvironmentModel::default();
        for (name, service) in services {
            model
                .machines
                .insert(name.clone(), container_from_service(name, service)?);
        }
        Ok(model)
    }
}

fn container_from_service(
    name: &str,
    service: &ServiceSpec,
) -> Result<ContainerConfig, ValidationError> {
    let has_image = service.image.as_deref().is_some_and(|i| !i.is_empty());
    let has_build = service.build.as_ref().is_some_and(|b| b.has_source());
    if !has_image && !has_build {
        return Err(ValidationError::MissingBuildSource {
            machine: name.to_owned(),
        });
    }

    Ok(ContainerConfig {
        image: service.image.clone(),
        build: service.build.as_ref().map(|b| BuildContext {
            context: b.context.clone(),
            dockerfile_path: b.dockerfile.clone(),
            dockerfile_content: b.dockerfile_content.clone(),
            args: b.args.clone(),
        }),
        command: service.command.clone(),
        entrypoint: service.entrypoint.clone(),
        environment: service.environment.clone(),
        expose: service.expose.iter().cloned().collect(),
        ports: service.ports.iter().cloned().collect(),
        volumes: service.volumes.clone(),
        volumes_from: service.volumes_from.clone(),
        links: service.links.clone(),
        depends_on: service.depends_on.clone(),
        labels: service.labels.clone(),
        mem_limit: service.mem_limit,
    })
}

/// Dockerfile recipe: exactly one machine built from the Dockerfile.
pub struct DockerfileConverter;

impl DockerfileConverter {
    /// # Errors
    ///
    /// Fails on a non-dockerfile recipe, a machine count other than one, or a
    /// recipe with neither content nor location.
    pub fn convert(&self, env: &DeclaredEnvironment) -> Result<EnvironmentModel, ValidationError> {
        let Recipe::Dockerfile { content, location } = &env.recipe else {
            return Err(ValidationError::TypeMismatch {
                converter: "dockerfile",
                actual: env.recipe.kind(),
            });
        };
        let name = single_machine_name(env, "dockerfile")?;

        let content = content.as_deref().filter(|c| !c.is_empty());
        let location = location.as_deref().filter(|l| !l.is_empty());
        if content.is_none() && location.is_none() {
            return Err(ValidationError::MissingBuildSource {
                machine: name.to_owned(),
            });
        }

        let container = ContainerConfig {
            build: Some(BuildContext {
                context: location.map(str::to_owned),
                dockerfile_content: content.map(str::to_owned),
                ..BuildContext::default()
            }),
            ..ContainerConfig::default()
        };
        Ok(single_machine_model(name, container))
    }
}

/// Image recipe: exactly one machine running the referenced image.
pub struct ImageConverter;

impl ImageConverter {
    /// # Errors
    ///
    /// Fails on a non-image recipe, a machine count other than one, or an
    /// empty image reference.
    pub fn convert(&self, env: &DeclaredEnvironment) -> Result<EnvironmentModel, ValidationError> {
        let Recipe::Image { image } = &env.recipe else {
            return Err(ValidationError::TypeMismatch {
                converter: "image",
                actual: env.recipe.kind(),
            });
        };
        let name = single_machine_name(env, "image")?;
        if image.trim().is_empty() {
            return Err(ValidationError::MissingBuildSource {
                machine: name.to_owned(),
            });
        }

        let container = ContainerConfig {
            image: Some(image.clone()),
            ..ContainerConfig::default()
        };
        Ok(single_machine_model(name, container))
    }
}

fn single_machine_name<'a>(
    env: &'a DeclaredEnvironment,
    kind: &'static str,
) -> Result<&'a str, ValidationError> {
    match env.machines.len() {
        1 => Ok(env.machines.keys().next().map_or("", String::as_str)),
        count => Err(ValidationError::MachineCount {
            kind,
            count,
            names: env
                .machines
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

fn single_machine_model(name: &str, container: ContainerConfig) -> EnvironmentModel {
    let mut model = EnvironmentModel::default();
    model.machines.insert(name.to_owned(), container);
    model
}
