use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category id that matches every service.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to read catalog {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One entry of the services catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

impl ServiceRecord {
    fn mentions(&self, needle: &str) -> bool {
        let contains = |value: &str| value.to_lowercase().contains(needle);
        contains(&self.title)
            || contains(&self.description)
            || self.features.iter().any(|feature| contains(feature.as_str()))
            || self.technologies.iter().any(|tech| contains(tech.as_str()))
    }
}

/// Category and free-text filter applied to the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub category: Option<String>,
    pub query: Option<String>,
}

impl CatalogFilter {
    pub fn new(category: Option<String>, query: Option<String>) -> Self {
        Self { category, query }
    }

    pub fn matches(&self, service: &ServiceRecord) -> bool {
        let category_ok = match self.category.as_deref().map(str::trim) {
            None | Some("") | Some(ALL_CATEGORIES) => true,
            Some(category) => service.category == category,
        };
        if !category_ok {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => service.mentions(&query.to_lowercase()),
        }
    }

    /// Returns the matching services in catalog order.
    pub fn apply<'a>(&self, services: &'a [ServiceRecord]) -> Vec<&'a ServiceRecord> {
        services
            .iter()
            .filter(|service| self.matches(service))
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Services(Vec<ServiceRecord>),
    Wrapped { services: Vec<ServiceRecord> },
}

pub fn parse_catalog(json: &str) -> Result<Vec<ServiceRecord>, serde_json::Error> {
    let file: CatalogFile = serde_json::from_str(json)?;
    Ok(match file {
        CatalogFile::Services(services) | CatalogFile::Wrapped { services } => services,
    })
}

/// Reads a catalog that is either a bare array of services or an object
/// with a `services` array.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<ServiceRecord>, CatalogError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&json).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<ServiceRecord> {
        parse_catalog(
            r#"{"services": [
                {"id": "cards", "title": "Business Cards", "description": "Premium stock",
                 "category": "print", "features": ["Spot UV"], "technologies": ["Offset"]},
                {"id": "site", "title": "Landing Page", "description": "Fast static site",
                 "category": "web", "features": ["SEO"], "technologies": ["Rust", "WebGL"]},
                {"id": "logo", "title": "Logo Design", "category": "design"}
            ]}"#,
        )
        .unwrap()
    }

    fn ids(filter: &CatalogFilter, services: &[ServiceRecord]) -> Vec<String> {
        filter
            .apply(services)
            .into_iter()
            .map(|service| service.id.clone())
            .collect()
    }

    #[test]
    fn all_or_empty_category_matches_everything() {
        let services = catalog();
        for category in [None, Some(""), Some("all")] {
            let filter = CatalogFilter::new(category.map(String::from), None);
            assert_eq!(ids(&filter, &services).len(), 3);
        }
    }

    #[test]
    fn category_must_match_exactly() {
        let services = catalog();
        let filter = CatalogFilter::new(Some("web".into()), None);
        assert_eq!(ids(&filter, &services), vec!["site"]);
        let filter = CatalogFilter::new(Some("Web".into()), None);
        assert!(ids(&filter, &services).is_empty());
    }

    #[test]
    fn query_searches_every_text_field_case_insensitively() {
        let services = catalog();
        let query = |q: &str| ids(&CatalogFilter::new(None, Some(q.into())), &services);
        assert_eq!(query("business"), vec!["cards"]);
        assert_eq!(query("STATIC"), vec!["site"]);
        assert_eq!(query("spot uv"), vec!["cards"]);
        assert_eq!(query("webgl"), vec!["site"]);
        assert!(query("embroidery").is_empty());
    }

    #[test]
    fn category_and_query_combine() {
        let services = catalog();
        let filter = CatalogFilter::new(Some("print".into()), Some("rust".into()));
        assert!(ids(&filter, &services).is_empty());
    }

    #[test]
    fn bare_arrays_are_accepted() {
        let services = parse_catalog(r#"[{"id": "a", "title": "A", "category": "x"}]"#).unwrap();
        assert_eq!(services[0].description, "");
        assert!(services[0].features.is_empty());
    }
}
