//! Configuration for the collocation engine.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::locator::DEFAULT_TOLERANCE_DEG;
use crate::namespace::VariableNamespace;

/// Default raster file extension.
pub const DEFAULT_EXTENSION: &str = "nc";

/// Variables extracted from the plankton product by default.
pub const DEFAULT_PLANKTON_VARS: &[&str] = &[
    "CHL",
    "CHL_uncertainty",
    "flags",
    "DIATO",
    "DINO",
    "HAPTO",
    "GREEN",
    "PROKAR",
    "PROCHLO",
    "MICRO",
    "NANO",
    "PICO",
    "DIATO_uncertainty",
    "DINO_uncertainty",
    "HAPTO_uncertainty",
    "GREEN_uncertainty",
    "PROKAR_uncertainty",
    "PROCHLO_uncertainty",
    "MICRO_uncertainty",
    "NANO_uncertainty",
    "PICO_uncertainty",
];

/// Variables extracted from the optics product by default.
pub const DEFAULT_OPTICS_VARS: &[&str] = &[
    "BBP",
    "BBP_uncertainty",
    "flags",
    "CDM",
    "CDM_uncertainty",
];

/// One raster product to collocate against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Product identifier, used for namespacing and diagnostics.
    pub id: String,
    /// Directory containing one subdirectory per year.
    pub base_dir: PathBuf,
    /// Raw variable names to extract.
    pub variables: Vec<String>,
}

impl ProductConfig {
    pub fn new(
        id: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            base_dir: base_dir.into(),
            variables: variables.into_iter().map(Into::into).collect(),
        }
    }

    /// The plankton product with its default variable set.
    pub fn plankton(base_dir: impl Into<PathBuf>) -> Self {
        Self::new("plankton", base_dir, DEFAULT_PLANKTON_VARS.iter().copied())
    }

    /// The optics product with its default variable set.
    pub fn optics(base_dir: impl Into<PathBuf>) -> Self {
        Self::new("optics", base_dir, DEFAULT_OPTICS_VARS.iter().copied())
    }
}

/// Order in which candidate files for a day are tried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrder {
    /// Most specific naming pattern first: `YYYYMMDD.<ext>`, then
    /// `YYYYMMDD_*`, then `*YYYYMMDD*`; ties by file name.
    #[default]
    Priority,
    /// Plain lexical order of file names.
    Name,
}

impl CandidateOrder {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "priority" => Some(Self::Priority),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Name => "name",
        }
    }
}

impl std::fmt::Display for CandidateOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for a collocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollocationConfig {
    /// Nearest-neighbour tolerance in degrees.
    #[serde(default = "default_tolerance")]
    pub tolerance_deg: f64,

    /// Primary product first, optional secondary second.
    pub products: Vec<ProductConfig>,

    /// Output column remapping.
    #[serde(default)]
    pub namespace: VariableNamespace,

    #[serde(default)]
    pub candidate_order: CandidateOrder,

    /// Process day-groups on the rayon thread pool.
    #[serde(default)]
    pub parallel: bool,

    /// Raster file extension, without the dot.
    #[serde(default = "default_extension")]
    pub file_extension: String,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_DEG
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

impl Default for CollocationConfig {
    fn default() -> Self {
        Self {
            tolerance_deg: DEFAULT_TOLERANCE_DEG,
            products: Vec::new(),
            namespace: VariableNamespace::default(),
            candidate_order: CandidateOrder::default(),
            parallel: false,
            file_extension: default_extension(),
        }
    }
}

impl CollocationConfig {
    /// A configuration for a single primary product.
    pub fn new(primary: ProductConfig) -> Self {
        Self {
            products: vec![primary],
            ..Default::default()
        }
    }

    /// Plankton as primary and, optionally, optics as secondary, with the
    /// optics quality flags written to `flags_optics`.
    pub fn plankton_optics(
        plankton_dir: impl Into<PathBuf>,
        optics_dir: Option<impl Into<PathBuf>>,
    ) -> Self {
        let mut config = Self::new(ProductConfig::plankton(plankton_dir));
        if let Some(dir) = optics_dir {
            config.products.push(ProductConfig::optics(dir));
        }
        config.namespace.insert("optics", "flags", "flags_optics");
        config
    }

    /// Add the secondary product.
    pub fn with_secondary(mut self, secondary: ProductConfig) -> Self {
        self.products.push(secondary);
        self
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = tolerance_deg;
        self
    }

    pub fn with_namespace(mut self, namespace: VariableNamespace) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn with_candidate_order(mut self, order: CandidateOrder) -> Self {
        self.candidate_order = order;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Apply overrides from environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("COLLOCATION_TOLERANCE_DEG") {
            if let Ok(tol) = val.parse() {
                self.tolerance_deg = tol;
            }
        }

        if let Ok(val) = std::env::var("COLLOCATION_PARALLEL") {
            self.parallel = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("COLLOCATION_CANDIDATE_ORDER") {
            if let Some(order) = CandidateOrder::from_str(&val) {
                self.candidate_order = order;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance_deg.is_finite() || self.tolerance_deg < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance_deg));
        }

        match self.products.len() {
            0 => return Err(ConfigError::NoProducts),
            1 | 2 => {}
            n => return Err(ConfigError::TooManyProducts(n)),
        }

        let mut seen = HashSet::new();
        for product in &self.products {
            if product.id.is_empty() {
                return Err(ConfigError::EmptyProductId);
            }
            if !seen.insert(product.id.as_str()) {
                return Err(ConfigError::DuplicateProduct(product.id.clone()));
            }
            if product.variables.is_empty() {
                return Err(ConfigError::NoVariables(product.id.clone()));
            }
        }

        // Each column must come from a single (product, variable) pair
        let mut owners: HashMap<&str, (&str, &str)> = HashMap::new();
        for product in &self.products {
            for var in &product.variables {
                let column = self.namespace.column(&product.id, var);
                let source = (product.id.as_str(), var.as_str());
                match owners.get(column) {
                    Some(&owner) if owner != source => {
                        return Err(ConfigError::ColumnCollision {
                            column: column.to_string(),
                            products: vec![owner.0.to_string(), product.id.clone()],
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(column, source);
                    }
                }
            }
        }

        if self.file_extension.is_empty() {
            return Err(ConfigError::EmptyExtension);
        }

        Ok(())
    }

    /// Output column names in order: each product's variables, primary first.
    ///
    /// A variable requested twice by the same product appears once.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for product in &self.products {
            for var in &product.variables {
                let column = self.namespace.column(&product.id, var);
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        columns
    }
}
