use crate::error::FertiplanError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaUnit {
    Hectare,
    /// Central American manzana (0.7 ha)
    Manzana,
}

impl AreaUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaUnit::Hectare => "hectare",
            AreaUnit::Manzana => "manzana",
        }
    }

    pub fn all() -> &'static [AreaUnit] {
        &[AreaUnit::Hectare, AreaUnit::Manzana]
    }
}

impl FromStr for AreaUnit {
    type Err = FertiplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hectare" | "hectares" | "ha" => Ok(AreaUnit::Hectare),
            "manzana" | "manzanas" | "mz" => Ok(AreaUnit::Manzana),
            _ => Err(FertiplanError::UnknownUnit {
                kind: "area",
                tag: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldUnit {
    Kilogram,
    Pound,
    /// 100 lb quintal
    Quintal,
    MetricTon,
}

impl YieldUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            YieldUnit::Kilogram => "kilogram",
            YieldUnit::Pound => "pound",
            YieldUnit::Quintal => "quintal",
            YieldUnit::MetricTon => "metricton",
        }
    }

    pub fn all() -> &'static [YieldUnit] {
        &[
            YieldUnit::Kilogram,
            YieldUnit::Pound,
            YieldUnit::Quintal,
            YieldUnit::MetricTon,
        ]
    }
}

impl FromStr for YieldUnit {
    type Err = FertiplanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kilogram" | "kilograms" | "kg" => Ok(YieldUnit::Kilogram),
            "pound" | "pounds" | "lb" | "lbs" => Ok(YieldUnit::Pound),
            "quintal" | "quintals" | "qq" => Ok(YieldUnit::Quintal),
            "metricton" | "metric-ton" | "ton" | "tons" | "t" => Ok(YieldUnit::MetricTon),
            _ => Err(FertiplanError::UnknownUnit {
                kind: "yield",
                tag: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for YieldUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub value: f64,
    pub unit: AreaUnit,
}

/// Target harvest per one unit of the field's area unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetYield {
    pub value: f64,
    pub unit: YieldUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionTarget {
    pub crop: String,
    pub area: Area,
    pub target_yield: TargetYield,
}

impl ProductionTarget {
    pub fn new(crop: impl Into<String>, area: f64, area_unit: AreaUnit) -> Self {
        Self {
            crop: crop.into(),
            area: Area {
                value: area,
                unit: area_unit,
            },
            target_yield: TargetYield {
                value: 0.0,
                unit: YieldUnit::MetricTon,
            },
        }
    }

    pub fn with_yield(mut self, value: f64, unit: YieldUnit) -> Self {
        self.target_yield = TargetYield { value, unit };
        self
    }

    /// Key used against the removal-rate table.
    pub fn crop_key(&self) -> String {
        self.crop.trim().to_lowercase()
    }
}
