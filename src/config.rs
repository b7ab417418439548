use crate::error::{FertiplanError, Result};
use crate::logic::deficit::EfficiencyParameters;
use crate::logic::optimizer::OptimizerSettings;
use crate::logic::soil_supply::SoilFactors;
use crate::logic::AgronomySettings;
use crate::models::NpkValues;
use dialoguer::{Confirm, Input, Password};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub agronomy: EfficiencyParameters,
    pub soil_factors: SoilFactors,
    pub optimizer: OptimizerSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_analysis: Option<DocumentAnalysisConfig>,
}

#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentAnalysisConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.into()
}

fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.into()
}

impl std::fmt::Debug for DocumentAnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentAnalysisConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Config {
    /// Loads the first config file found, or the built-in defaults when
    /// there is none. An explicit override must exist.
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => {
                if !p.exists() {
                    return Err(FertiplanError::Config(format!(
                        "Config file not found at {:?}",
                        p
                    )));
                }
                p
            }
            None => match Self::find_config_path()? {
                Some(p) => p,
                None => {
                    debug!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| FertiplanError::Config(format!("Failed to read config: {}", e)))?;

        let config = Self::parse(&config_str)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .map_err(|e| FertiplanError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn settings(&self) -> AgronomySettings {
        AgronomySettings {
            efficiency: self.agronomy,
            soil_factors: self.soil_factors,
            optimizer: self.optimizer,
        }
    }

    /// Search for config.yaml in standard locations.
    fn find_config_path() -> Result<Option<PathBuf>> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        let xdg_config = Self::default_config_path()?;
        if xdg_config.exists() {
            return Ok(Some(xdg_config));
        }

        Ok(None)
    }

    /// Returns true if a config file can be found in any standard location.
    pub fn exists(config_override: Option<&PathBuf>) -> bool {
        match config_override {
            Some(p) => p.exists(),
            None => matches!(Self::find_config_path(), Ok(Some(_))),
        }
    }

    /// Default path for writing new config files (~/.config/fertiplan/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FertiplanError::Config("Cannot determine config directory".into()))?
            .join("fertiplan");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the new Config and the path it was written to.
    pub fn setup_interactive(target: Option<PathBuf>) -> Result<(Self, PathBuf)> {
        println!();
        println!("Let's set up fertiplan!");
        println!();

        let defaults = EfficiencyParameters::default();

        println!("Soil efficiency (fraction of the soil reserve the crop can use)");
        let soil = prompt_npk(defaults.soil)?;
        println!();

        println!("Fertilizer efficiency (fraction of applied nutrient taken up)");
        let fertilizer = prompt_npk(defaults.fertilizer)?;
        println!();

        let boost: f64 = Input::new()
            .with_prompt("Nitrogen efficiency boost for specialized products")
            .default(defaults.nitrogen_efficiency_boost)
            .validate_with(|v: &f64| {
                crate::logic::deficit::validate_boost(*v).map_err(|e| e.to_string())
            })
            .interact_text()
            .map_err(input_error)?;
        println!();

        println!("Document analysis (Gemini)");
        let enable_documents = Confirm::new()
            .with_prompt("  Enable soil report extraction from PDFs and images?")
            .default(false)
            .interact()
            .map_err(input_error)?;

        let document_analysis = if enable_documents {
            let api_key: String = Password::new()
                .with_prompt("  API key (or ${GEMINI_API_KEY})")
                .allow_empty_password(true)
                .interact()
                .map_err(input_error)?;

            let model: String = Input::new()
                .with_prompt("  Model")
                .default(DEFAULT_GEMINI_MODEL.into())
                .interact_text()
                .map_err(input_error)?;

            Some(DocumentAnalysisConfig {
                api_key: if api_key.is_empty() {
                    "${GEMINI_API_KEY}".into()
                } else {
                    api_key
                },
                model,
                endpoint: DEFAULT_GEMINI_ENDPOINT.into(),
            })
        } else {
            None
        };

        println!();

        let config = Config {
            agronomy: EfficiencyParameters {
                soil,
                fertilizer,
                nitrogen_efficiency_boost: boost,
            },
            soil_factors: SoilFactors::default(),
            optimizer: OptimizerSettings::default(),
            document_analysis,
        };
        config.settings().validate()?;

        let config_path = match target {
            Some(p) => p,
            None => Self::default_config_path()?,
        };
        config.write(&config_path)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| FertiplanError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# fertiplan configuration\n# Generated by `fertiplan init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(path, content)?;
        info!(path = %path.display(), "Wrote config");
        Ok(())
    }

    fn substitute_env_vars(content: &str) -> Result<String> {
        let mut result = content.to_string();

        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| FertiplanError::Config(format!("Invalid substitution pattern: {}", e)))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        Ok(result)
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("FERTIPLAN_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| FertiplanError::Config("Cannot determine data directory".into()))?
            .join("fertiplan");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn db_path(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        Ok(Self::data_dir(data_dir_override)?.join("fertiplan.db"))
    }
}

fn input_error(e: dialoguer::Error) -> FertiplanError {
    FertiplanError::Config(format!("Input error: {}", e))
}

fn prompt_npk(defaults: NpkValues) -> Result<NpkValues> {
    let mut values = defaults;
    for nutrient in crate::models::PrimaryNutrient::ALL {
        let value: f64 = Input::new()
            .with_prompt(format!("  {}", nutrient.symbol()))
            .default(defaults.get(nutrient))
            .interact_text()
            .map_err(input_error)?;
        values = values.with(nutrient, value);
    }
    Ok(values)
}
