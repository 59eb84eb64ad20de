//! Service configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults (plankton/optics presets, 0.05 degree tolerance)
//! 2. an optional YAML file (`--config`), with `${VAR}` / `${VAR:-default}`
//!    substitution and `~` expansion of paths
//! 3. `COLLOCATION_*` environment variables
//! 4. command-line flags

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use collocation::{
    CandidateOrder, CollocationConfig, ProductConfig, VariableNamespace, DEFAULT_OPTICS_VARS,
    DEFAULT_PLANKTON_VARS,
};
use serde::{Deserialize, Serialize};

use crate::cli::Args;

pub const DEFAULT_PRIMARY_ID: &str = "plankton";
pub const DEFAULT_SECONDARY_ID: &str = "optics";
pub const DEFAULT_NO_DATA_MARKER: &str = "NaN";

/// Names of the input table columns holding the sample date and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub year: String,
    pub month: String,
    pub day: String,
    pub lat: String,
    pub lon: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            year: "Year".to_string(),
            month: "Month".to_string(),
            day: "Day".to_string(),
            lat: "LATITUDE".to_string(),
            lon: "LONGITUDE".to_string(),
        }
    }
}

/// A product as written in the YAML file; everything but the directory is
/// optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSection {
    pub id: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub variables: Vec<String>,
}

/// Contents of the YAML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    pub input: Option<PathBuf>,
    pub output_csv: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub no_data_marker: Option<String>,
    pub columns: Option<ColumnNames>,
    pub tolerance_deg: Option<f64>,
    pub candidate_order: Option<CandidateOrder>,
    pub parallel: Option<bool>,
    pub file_extension: Option<String>,
    pub primary: Option<ProductSection>,
    pub secondary: Option<ProductSection>,
    pub namespace: Option<VariableNamespace>,
}

/// Everything a run needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub input: PathBuf,
    pub output_csv: PathBuf,
    pub summary_json: Option<PathBuf>,
    pub columns: ColumnNames,
    pub no_data_marker: String,
    pub collocation: CollocationConfig,
}

impl RunSettings {
    /// Merge command-line arguments over an optional configuration file.
    pub fn resolve(args: &Args, file: ServiceConfig) -> Result<Self> {
        let input = args
            .input
            .clone()
            .or(file.input)
            .context("No input table given (--input)")?;

        let Some(output_csv) = args.output_csv.clone().or(file.output_csv) else {
            bail!("You must specify an output destination (--output-csv)");
        };

        let mut columns = file.columns.unwrap_or_default();
        override_with(&mut columns.year, &args.year_col);
        override_with(&mut columns.month, &args.month_col);
        override_with(&mut columns.day, &args.day_col);
        override_with(&mut columns.lat, &args.lat_col);
        override_with(&mut columns.lon, &args.lon_col);

        let primary = resolve_product(
            file.primary.unwrap_or_default(),
            &args.primary_id,
            &args.primary_base_dir,
            &args.primary_vars,
            DEFAULT_PRIMARY_ID,
        )?
        .context("No primary product directory given (--primary-base-dir)")?;

        let secondary = resolve_product(
            file.secondary.unwrap_or_default(),
            &args.secondary_id,
            &args.secondary_base_dir,
            &args.secondary_vars,
            DEFAULT_SECONDARY_ID,
        )?;

        let namespace = file
            .namespace
            .unwrap_or_else(|| default_namespace(secondary.as_ref().map(|p| p.id.as_str())));
        let mut collocation = CollocationConfig::new(primary).with_namespace(namespace);
        if let Some(secondary) = secondary {
            collocation = collocation.with_secondary(secondary);
        }
        if let Some(tol) = file.tolerance_deg {
            collocation.tolerance_deg = tol;
        }
        if let Some(order) = file.candidate_order {
            collocation.candidate_order = order;
        }
        if let Some(parallel) = file.parallel {
            collocation.parallel = parallel;
        }
        if let Some(ext) = file.file_extension {
            collocation.file_extension = ext.trim_start_matches('.').to_string();
        }

        collocation.apply_env();

        if let Some(tol) = args.tol_deg {
            collocation.tolerance_deg = tol;
        }
        if let Some(order) = args.candidate_order {
            collocation.candidate_order = order;
        }
        if args.parallel {
            collocation.parallel = true;
        }

        collocation
            .validate()
            .context("Invalid collocation configuration")?;

        Ok(Self {
            input: expand_path(&input),
            output_csv: expand_path(&output_csv),
            summary_json: args
                .summary_json
                .clone()
                .or(file.summary_json)
                .map(|p| expand_path(&p)),
            columns,
            no_data_marker: args
                .no_data_marker
                .clone()
                .or(file.no_data_marker)
                .unwrap_or_else(|| DEFAULT_NO_DATA_MARKER.to_string()),
            collocation,
        })
    }
}

/// The namespace used when none is configured: the secondary product's
/// flags go to `flags_<id>` (`flags_optics` for the optics preset) so they
/// do not collide with the primary's flags.
pub fn default_namespace(secondary_id: Option<&str>) -> VariableNamespace {
    match secondary_id {
        Some(id) => VariableNamespace::new().with_rule(id, "flags", format!("flags_{}", id)),
        None => VariableNamespace::new(),
    }
}

/// Variables extracted when a product lists none.
pub fn preset_variables(id: &str) -> Vec<String> {
    let preset: &[&str] = match id {
        "plankton" => DEFAULT_PLANKTON_VARS,
        "optics" => DEFAULT_OPTICS_VARS,
        _ => &[],
    };
    preset.iter().map(|v| v.to_string()).collect()
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

/// Returns `None` when no base directory is configured for the product.
fn resolve_product(
    section: ProductSection,
    id: &Option<String>,
    base_dir: &Option<PathBuf>,
    variables: &[String],
    default_id: &str,
) -> Result<Option<ProductConfig>> {
    let Some(base_dir) = base_dir.clone().or(section.base_dir) else {
        if id.is_some() || !variables.is_empty() {
            bail!(
                "Variables or an id were given for product '{}' but no base directory",
                id.as_deref().unwrap_or(default_id)
            );
        }
        return Ok(None);
    };

    let id = id
        .clone()
        .or(section.id)
        .unwrap_or_else(|| default_id.to_string());

    let variables = if !variables.is_empty() {
        variables.to_vec()
    } else if !section.variables.is_empty() {
        section.variables
    } else {
        preset_variables(&id)
    };

    Ok(Some(ProductConfig::new(id, expand_path(&base_dir), variables)))
}

/// Expand a leading `~` in a path.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load and parse the YAML configuration file with environment variable
/// substitution.
pub fn load_service_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;

    let expanded = expand_env_vars(&content)?;

    let config: ServiceConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse config YAML from {:?}", path))?;

    Ok(config)
}

/// Expand environment variables in content.
/// Supports ${VAR} and ${VAR:-default} syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();

            let mut var_expr = String::new();
            let mut depth = 1;
            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve a variable expression (`VAR` or `VAR:-default`).
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr))
    }
}
