use serde::{Deserialize, Serialize};

/// Soil chemistry extracted from a laboratory report.
///
/// Values the report does not state are 0. Nitrogen may be reported in ppm,
/// potassium in either ppm or cmol/kg; the soil supply model sorts that out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SoilReading {
    pub ph: f64,
    /// Percent organic matter
    #[serde(alias = "organicMatter")]
    pub organic_matter: f64,
    pub nitrogen: f64,
    /// ppm
    pub phosphorus: f64,
    pub potassium: f64,
    /// cmol/kg
    pub calcium: f64,
    /// cmol/kg
    pub magnesium: f64,
    #[serde(alias = "cationExchangeCapacity")]
    pub cation_exchange_capacity: f64,
    pub texture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    /// Auxiliary readings as "Name: value unit"
    #[serde(alias = "otherData")]
    pub other_data: Vec<String>,
}

impl SoilReading {
    pub fn new(ph: f64, organic_matter: f64) -> Self {
        Self {
            ph,
            organic_matter,
            ..Default::default()
        }
    }

    pub fn with_npk(mut self, nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        self.nitrogen = nitrogen;
        self.phosphorus = phosphorus;
        self.potassium = potassium;
        self
    }

    pub fn with_cations(mut self, calcium: f64, magnesium: f64, cec: f64) -> Self {
        self.calcium = calcium;
        self.magnesium = magnesium;
        self.cation_exchange_capacity = cec;
        self
    }

    pub fn with_texture(mut self, texture: impl Into<String>) -> Self {
        self.texture = texture.into();
        self
    }

    pub fn with_other(mut self, entry: impl Into<String>) -> Self {
        self.other_data.push(entry.into());
        self
    }
}
