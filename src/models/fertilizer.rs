use super::nutrient::{Nutrient, NpkValues, PrimaryNutrient};
use crate::error::{FertiplanError, Result};
use crate::logic::units::LB_TO_KG;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FertilizerCategory {
    /// Standard bulk grades (urea, DAP, KCl, ...)
    Commodity,
    /// Stabilized or controlled-release products
    Specialized,
}

impl FertilizerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FertilizerCategory::Commodity => "commodity",
            FertilizerCategory::Specialized => "specialized",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "commodity" => Some(FertilizerCategory::Commodity),
            "specialized" | "specialty" => Some(FertilizerCategory::Specialized),
            _ => None,
        }
    }
}

impl std::fmt::Display for FertilizerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_bag_weight() -> f64 {
    100.0
}

/// A bagged fertilizer product with its label analysis in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerProduct {
    pub id: String,
    pub name: String,
    pub category: FertilizerCategory,
    /// Price per bag
    pub price: f64,
    #[serde(default = "default_bag_weight")]
    pub bag_weight_lb: f64,
    pub n: f64,
    pub p: f64,
    pub k: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cu: Option<f64>,
}

impl FertilizerProduct {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: FertilizerCategory,
        price: f64,
        grade: (f64, f64, f64),
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            price,
            bag_weight_lb: default_bag_weight(),
            n: grade.0,
            p: grade.1,
            k: grade.2,
            s: None,
            ca: None,
            mg: None,
            zn: None,
            b: None,
            fe: None,
            mn: None,
            cu: None,
        }
    }

    pub fn with_bag_weight(mut self, pounds: f64) -> Self {
        self.bag_weight_lb = pounds;
        self
    }

    pub fn with_content(mut self, nutrient: Nutrient, percent: f64) -> Self {
        match nutrient {
            Nutrient::N => self.n = percent,
            Nutrient::P => self.p = percent,
            Nutrient::K => self.k = percent,
            Nutrient::S => self.s = Some(percent),
            Nutrient::Ca => self.ca = Some(percent),
            Nutrient::Mg => self.mg = Some(percent),
            Nutrient::Zn => self.zn = Some(percent),
            Nutrient::B => self.b = Some(percent),
            Nutrient::Fe => self.fe = Some(percent),
            Nutrient::Mn => self.mn = Some(percent),
            Nutrient::Cu => self.cu = Some(percent),
        }
        self
    }

    /// Label percentage for a nutrient channel; undeclared channels are 0.
    pub fn content(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::N => self.n,
            Nutrient::P => self.p,
            Nutrient::K => self.k,
            Nutrient::S => self.s.unwrap_or(0.0),
            Nutrient::Ca => self.ca.unwrap_or(0.0),
            Nutrient::Mg => self.mg.unwrap_or(0.0),
            Nutrient::Zn => self.zn.unwrap_or(0.0),
            Nutrient::B => self.b.unwrap_or(0.0),
            Nutrient::Fe => self.fe.unwrap_or(0.0),
            Nutrient::Mn => self.mn.unwrap_or(0.0),
            Nutrient::Cu => self.cu.unwrap_or(0.0),
        }
    }

    pub fn grade(&self) -> NpkValues {
        NpkValues::new(self.n, self.p, self.k)
    }

    pub fn bag_weight_kg(&self) -> f64 {
        self.bag_weight_lb * LB_TO_KG
    }

    pub fn is_specialized(&self) -> bool {
        self.category == FertilizerCategory::Specialized
    }

    /// "46-0-0" style label.
    pub fn grade_label(&self) -> String {
        format!("{}-{}-{}", self.n, self.p, self.k)
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(FertiplanError::InvalidCatalog(format!(
                "product '{}' has an empty id",
                self.name
            )));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(FertiplanError::InvalidCatalog(format!(
                "product '{}' has invalid price {}",
                self.id, self.price
            )));
        }
        if !self.bag_weight_lb.is_finite() || self.bag_weight_lb <= 0.0 {
            return Err(FertiplanError::InvalidCatalog(format!(
                "product '{}' has invalid bag weight {}",
                self.id, self.bag_weight_lb
            )));
        }
        for nutrient in Nutrient::ALL {
            let pct = self.content(nutrient);
            if !(0.0..=100.0).contains(&pct) {
                return Err(FertiplanError::InvalidCatalog(format!(
                    "product '{}' declares {}% {}, expected 0-100",
                    self.id, pct, nutrient
                )));
            }
        }
        Ok(())
    }
}

/// Checks every product and rejects duplicate ids.
pub fn validate_catalog(catalog: &[FertilizerProduct]) -> Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for product in catalog {
        product.validate()?;
        if !seen.insert(product.id.as_str()) {
            return Err(FertiplanError::InvalidCatalog(format!(
                "duplicate product id '{}'",
                product.id
            )));
        }
    }
    Ok(())
}

/// Starter portfolio used when the store is empty.
pub fn default_catalog() -> Vec<FertilizerProduct> {
    use FertilizerCategory::{Commodity, Specialized};

    vec![
        FertilizerProduct::new("urea", "Urea (46-0-0)", Commodity, 35.0, (46.0, 0.0, 0.0)),
        FertilizerProduct::new(
            "15-15-15",
            "Triple 15 (15-15-15)",
            Commodity,
            45.0,
            (15.0, 15.0, 15.0),
        ),
        FertilizerProduct::new("18-46-0", "DAP (18-46-0)", Commodity, 50.0, (18.0, 46.0, 0.0)),
        FertilizerProduct::new(
            "0-0-60",
            "Potassium chloride (0-0-60)",
            Commodity,
            40.0,
            (0.0, 0.0, 60.0),
        ),
        FertilizerProduct::new(
            "20-20-0",
            "Starter (20-20-0)",
            Commodity,
            42.0,
            (20.0, 20.0, 0.0),
        ),
        FertilizerProduct::new(
            "nitroxtend",
            "NitroXTEND (46-0-0)",
            Specialized,
            40.0,
            (46.0, 0.0, 0.0),
        ),
        FertilizerProduct::new(
            "17-6-18",
            "Production (17-6-18)",
            Specialized,
            48.0,
            (17.0, 6.0, 18.0),
        )
        .with_content(Nutrient::S, 4.0),
    ]
}

/// kg of nutrient removed per metric ton of harvested yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemovalRate {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl RemovalRate {
    pub fn new(n: f64, p: f64, k: f64) -> Self {
        Self { n, p, k }
    }

    pub fn get(&self, nutrient: PrimaryNutrient) -> f64 {
        match nutrient {
            PrimaryNutrient::N => self.n,
            PrimaryNutrient::P => self.p,
            PrimaryNutrient::K => self.k,
        }
    }

    pub fn is_valid(&self) -> bool {
        PrimaryNutrient::ALL
            .iter()
            .all(|n| self.get(*n).is_finite() && self.get(*n) >= 0.0)
    }
}

/// Removal rates keyed by crop id, always carrying a `default` fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, RemovalRate>",
    into = "BTreeMap<String, RemovalRate>"
)]
pub struct RemovalRateTable {
    default: RemovalRate,
    crops: BTreeMap<String, RemovalRate>,
}

impl RemovalRateTable {
    pub const DEFAULT_KEY: &'static str = "default";

    pub fn new(default: RemovalRate) -> Self {
        Self {
            default,
            crops: BTreeMap::new(),
        }
    }

    pub fn with_crop(mut self, crop: &str, rate: RemovalRate) -> Self {
        self.insert(crop, rate);
        self
    }

    pub fn insert(&mut self, crop: &str, rate: RemovalRate) {
        let key = crop.trim().to_lowercase();
        if key == Self::DEFAULT_KEY {
            self.default = rate;
        } else {
            self.crops.insert(key, rate);
        }
    }

    /// Rate for a crop, falling back to the `default` entry.
    pub fn lookup(&self, crop: &str) -> &RemovalRate {
        self.crops
            .get(&crop.trim().to_lowercase())
            .unwrap_or(&self.default)
    }

    pub fn contains(&self, crop: &str) -> bool {
        self.crops.contains_key(&crop.trim().to_lowercase())
    }

    pub fn default_rate(&self) -> &RemovalRate {
        &self.default
    }

    /// Crops in key order, followed by the `default` entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &RemovalRate)> {
        self.crops
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(std::iter::once((Self::DEFAULT_KEY, &self.default)))
    }

    pub fn validate(&self) -> Result<()> {
        for (crop, rate) in self.entries() {
            if !rate.is_valid() {
                return Err(FertiplanError::Config(format!(
                    "removal rate for '{}' must be finite and non-negative",
                    crop
                )));
            }
        }
        Ok(())
    }
}

impl Default for RemovalRateTable {
    fn default() -> Self {
        Self::new(RemovalRate::new(20.0, 10.0, 20.0))
            .with_crop("cafe", RemovalRate::new(12.0, 2.5, 16.0))
            .with_crop("maiz", RemovalRate::new(25.0, 10.0, 20.0))
            .with_crop("frijol", RemovalRate::new(40.0, 10.0, 30.0))
            .with_crop("tomate", RemovalRate::new(2.8, 0.8, 3.5))
            .with_crop("cana", RemovalRate::new(1.5, 0.5, 2.5))
            .with_crop("papa", RemovalRate::new(3.5, 1.5, 5.5))
    }
}

impl TryFrom<BTreeMap<String, RemovalRate>> for RemovalRateTable {
    type Error = FertiplanError;

    fn try_from(mut map: BTreeMap<String, RemovalRate>) -> Result<Self> {
        let default = map.remove(Self::DEFAULT_KEY).ok_or_else(|| {
            FertiplanError::Config("removal-rate table is missing the 'default' entry".into())
        })?;
        let mut table = Self::new(default);
        for (crop, rate) in map {
            table.insert(&crop, rate);
        }
        table.validate()?;
        Ok(table)
    }
}

impl From<RemovalRateTable> for BTreeMap<String, RemovalRate> {
    fn from(table: RemovalRateTable) -> Self {
        let mut map = table.crops;
        map.insert(RemovalRateTable::DEFAULT_KEY.to_string(), table.default);
        map
    }
}
