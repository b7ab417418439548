use crate::error::{FertiplanError, Result};
use crate::models::{NpkValues, SoilReading};
use serde::{Deserialize, Serialize};

/// Conversion factors from lab readings to kg/ha of plant nutrient.
///
/// These are field approximations (20 cm sampling depth, bulk density 1.0)
/// and can be overridden in `config.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SoilFactors {
    pub ppm_to_kg_ha: f64,
    /// kg N/ha/year released per percent organic matter
    pub organic_matter_n_factor: f64,
    pub p_to_p2o5: f64,
    pub k_to_k2o: f64,
    pub cmol_k_to_ppm: f64,
    /// Potassium readings below this are taken as cmol/kg
    pub cmol_k_threshold: f64,
}

impl Default for SoilFactors {
    fn default() -> Self {
        Self {
            ppm_to_kg_ha: 2.0,
            organic_matter_n_factor: 20.0,
            p_to_p2o5: 2.29,
            k_to_k2o: 1.20,
            cmol_k_to_ppm: 391.0,
            cmol_k_threshold: 10.0,
        }
    }
}

impl SoilFactors {
    pub fn validate(&self) -> Result<()> {
        let factors = [
            ("ppm_to_kg_ha", self.ppm_to_kg_ha),
            ("organic_matter_n_factor", self.organic_matter_n_factor),
            ("p_to_p2o5", self.p_to_p2o5),
            ("k_to_k2o", self.k_to_k2o),
            ("cmol_k_to_ppm", self.cmol_k_to_ppm),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(FertiplanError::Config(format!(
                    "soil factor {} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.cmol_k_threshold.is_finite() || self.cmol_k_threshold < 0.0 {
            return Err(FertiplanError::Config(format!(
                "cmol_k_threshold must be non-negative, got {}",
                self.cmol_k_threshold
            )));
        }
        Ok(())
    }

    /// Available N in kg/ha; falls back to an organic-matter estimate when
    /// the report has no nitrogen reading.
    pub fn nitrogen_kg_ha(&self, soil: &SoilReading) -> f64 {
        if soil.nitrogen > 0.0 {
            soil.nitrogen * self.ppm_to_kg_ha
        } else {
            soil.organic_matter.max(0.0) * self.organic_matter_n_factor
        }
    }

    /// Available phosphorus as kg P₂O₅/ha.
    pub fn phosphorus_kg_ha(&self, soil: &SoilReading) -> f64 {
        soil.phosphorus.max(0.0) * self.ppm_to_kg_ha * self.p_to_p2o5
    }

    /// Available potassium as kg K₂O/ha.
    pub fn potassium_kg_ha(&self, soil: &SoilReading) -> f64 {
        self.potassium_ppm(soil) * self.ppm_to_kg_ha * self.k_to_k2o
    }

    fn potassium_ppm(&self, soil: &SoilReading) -> f64 {
        let k = soil.potassium.max(0.0);
        if k > 0.0 && k < self.cmol_k_threshold {
            k * self.cmol_k_to_ppm
        } else {
            k
        }
    }

    /// Soil supply for N, P₂O₅ and K₂O before any efficiency factor.
    pub fn supply(&self, soil: &SoilReading) -> NpkValues {
        NpkValues::new(
            self.nitrogen_kg_ha(soil),
            self.phosphorus_kg_ha(soil),
            self.potassium_kg_ha(soil),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn nitrogen_reading_takes_priority() {
        let factors = SoilFactors::default();
        let soil = SoilReading::new(6.2, 3.0).with_npk(20.0, 0.0, 0.0);
        assert!(close(factors.nitrogen_kg_ha(&soil), 40.0));
    }

    #[test]
    fn nitrogen_falls_back_to_organic_matter() {
        let factors = SoilFactors::default();
        let soil = SoilReading::new(6.2, 3.0);
        assert!(close(factors.nitrogen_kg_ha(&soil), 60.0));

        let empty = SoilReading::default();
        assert_eq!(factors.nitrogen_kg_ha(&empty), 0.0);
    }

    #[test]
    fn phosphorus_expressed_as_oxide() {
        let factors = SoilFactors::default();
        let soil = SoilReading::new(6.0, 2.0).with_npk(0.0, 15.0, 0.0);
        assert!(close(factors.phosphorus_kg_ha(&soil), 15.0 * 2.0 * 2.29));
    }

    #[test]
    fn potassium_in_cmol_is_converted() {
        let factors = SoilFactors::default();
        let cmol = SoilReading::new(6.0, 2.0).with_npk(0.0, 0.0, 0.3);
        assert!(close(factors.potassium_kg_ha(&cmol), 0.3 * 391.0 * 2.0 * 1.2));

        let ppm = SoilReading::new(6.0, 2.0).with_npk(0.0, 0.0, 120.0);
        assert!(close(factors.potassium_kg_ha(&ppm), 120.0 * 2.0 * 1.2));

        let zero = SoilReading::new(6.0, 2.0);
        assert_eq!(factors.potassium_kg_ha(&zero), 0.0);
    }

    #[test]
    fn overridden_factors_apply() {
        let factors = SoilFactors {
            ppm_to_kg_ha: 2.6,
            ..Default::default()
        };
        let soil = SoilReading::new(6.0, 2.0).with_npk(10.0, 0.0, 0.0);
        assert!(close(factors.nitrogen_kg_ha(&soil), 26.0));
    }

    #[test]
    fn validation_rejects_non_positive_factors() {
        assert!(SoilFactors::default().validate().is_ok());
        let bad = SoilFactors {
            p_to_p2o5: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
