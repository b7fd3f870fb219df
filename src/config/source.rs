//! Reading configuration fragments from a directory.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::config::loader::ConfigError;
use crate::config::merger::merge;
use crate::config::schema::{
    CountriesFile, CountryDefinition, EnvironmentOverlay, EnvironmentsFile, ServiceDefinition,
    ServiceFile,
};
use crate::config::snapshot::ConfigSnapshot;

pub const COUNTRIES_FILE: &str = "countries.yaml";
pub const SERVICES_DIR: &str = "services";
pub const ENVIRONMENTS_FILE: &str = "environments.yaml";

/// Raw, unvalidated fragments of one configuration directory.
#[derive(Debug, Clone, Default)]
pub struct Fragments {
    pub countries: BTreeMap<String, CountryDefinition>,
    /// Services in file-name order.
    pub services: Vec<LoadedService>,
    pub environments: BTreeMap<String, EnvironmentOverlay>,
}

/// A service definition and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedService {
    pub path: PathBuf,
    pub definition: ServiceDefinition,
}

/// A directory of YAML fragments.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    dir: PathBuf,
}

impl ConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read, merge and validate the directory for `environment`.
    ///
    /// Pure with respect to the files on disk: nothing outside the returned
    /// snapshot is touched.
    pub fn load(&self, environment: &str) -> Result<ConfigSnapshot, ConfigError> {
        let fragments = self.read()?;
        merge(fragments, environment)
    }

    /// Read every fragment without validating it.
    pub fn read(&self) -> Result<Fragments, ConfigError> {
        let countries: CountriesFile = read_yaml(&self.dir.join(COUNTRIES_FILE))?;
        let services = self.read_services()?;
        let environments = self.read_environments()?;

        tracing::debug!(
            dir = %self.dir.display(),
            countries = countries.countries.len(),
            services = services.len(),
            environments = environments.len(),
            "Configuration fragments read"
        );

        Ok(Fragments {
            countries: countries.countries,
            services,
            environments,
        })
    }

    fn read_services(&self) -> Result<Vec<LoadedService>, ConfigError> {
        let services_dir = self.dir.join(SERVICES_DIR);
        let entries = fs::read_dir(&services_dir).map_err(|source| ConfigError::Io {
            path: services_dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ConfigError::Io {
                path: services_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_yaml(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let file: ServiceFile = read_yaml(&path)?;
                Ok(LoadedService {
                    path,
                    definition: file.service,
                })
            })
            .collect()
    }

    fn read_environments(&self) -> Result<BTreeMap<String, EnvironmentOverlay>, ConfigError> {
        let path = self.dir.join(ENVIRONMENTS_FILE);
        match fs::metadata(&path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(ConfigError::Io { path, source }),
            Ok(_) => {
                let file: EnvironmentsFile = read_yaml(&path)?;
                Ok(file.environments)
            }
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}
