use serde::{Deserialize, Serialize};

/// Every nutrient channel a fertilizer label can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Nutrient {
    N,
    P,
    K,
    S,
    Ca,
    Mg,
    Zn,
    B,
    Fe,
    Mn,
    Cu,
}

impl Nutrient {
    pub const ALL: [Nutrient; 11] = [
        Nutrient::N,
        Nutrient::P,
        Nutrient::K,
        Nutrient::S,
        Nutrient::Ca,
        Nutrient::Mg,
        Nutrient::Zn,
        Nutrient::B,
        Nutrient::Fe,
        Nutrient::Mn,
        Nutrient::Cu,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Nutrient::N => "N",
            Nutrient::P => "P",
            Nutrient::K => "K",
            Nutrient::S => "S",
            Nutrient::Ca => "Ca",
            Nutrient::Mg => "Mg",
            Nutrient::Zn => "Zn",
            Nutrient::B => "B",
            Nutrient::Fe => "Fe",
            Nutrient::Mn => "Mn",
            Nutrient::Cu => "Cu",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Nutrient::N => "Nitrogen",
            Nutrient::P => "Phosphorus",
            Nutrient::K => "Potassium",
            Nutrient::S => "Sulfur",
            Nutrient::Ca => "Calcium",
            Nutrient::Mg => "Magnesium",
            Nutrient::Zn => "Zinc",
            Nutrient::B => "Boron",
            Nutrient::Fe => "Iron",
            Nutrient::Mn => "Manganese",
            Nutrient::Cu => "Copper",
        }
    }

    /// Case-insensitive symbol or English name.
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.symbol().eq_ignore_ascii_case(s) || n.name().eq_ignore_ascii_case(s))
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The three nutrients that drive demand and the mix optimizer.
///
/// Phosphorus and potassium are carried in their oxide forms (P₂O₅, K₂O),
/// matching how fertilizer grades are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimaryNutrient {
    N,
    P,
    K,
}

impl PrimaryNutrient {
    pub const ALL: [PrimaryNutrient; 3] =
        [PrimaryNutrient::N, PrimaryNutrient::P, PrimaryNutrient::K];

    pub fn symbol(&self) -> &'static str {
        match self {
            PrimaryNutrient::N => "N",
            PrimaryNutrient::P => "P₂O₅",
            PrimaryNutrient::K => "K₂O",
        }
    }

    pub fn name(&self) -> &'static str {
        Nutrient::from(*self).name()
    }
}

impl From<PrimaryNutrient> for Nutrient {
    fn from(value: PrimaryNutrient) -> Self {
        match value {
            PrimaryNutrient::N => Nutrient::N,
            PrimaryNutrient::P => Nutrient::P,
            PrimaryNutrient::K => Nutrient::K,
        }
    }
}

impl std::fmt::Display for PrimaryNutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A value per primary nutrient (kg, kg/ha or percent depending on context).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NpkValues {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl NpkValues {
    pub const ZERO: NpkValues = NpkValues {
        n: 0.0,
        p: 0.0,
        k: 0.0,
    };

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

    pub fn with(mut self, nutrient: PrimaryNutrient, value: f64) -> Self {
        match nutrient {
            PrimaryNutrient::N => self.n = value,
            PrimaryNutrient::P => self.p = value,
            PrimaryNutrient::K => self.k = value,
        }
        self
    }

    pub fn map(self, f: impl Fn(PrimaryNutrient, f64) -> f64) -> Self {
        Self {
            n: f(PrimaryNutrient::N, self.n),
            p: f(PrimaryNutrient::P, self.p),
            k: f(PrimaryNutrient::K, self.k),
        }
    }
}

impl std::ops::Add for NpkValues {
    type Output = NpkValues;

    fn add(self, rhs: NpkValues) -> NpkValues {
        NpkValues::new(self.n + rhs.n, self.p + rhs.p, self.k + rhs.k)
    }
}

impl std::ops::Sub for NpkValues {
    type Output = NpkValues;

    fn sub(self, rhs: NpkValues) -> NpkValues {
        NpkValues::new(self.n - rhs.n, self.p - rhs.p, self.k - rhs.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npk_get_and_with_address_the_same_channel() {
        let values = NpkValues::ZERO
            .with(PrimaryNutrient::N, 1.0)
            .with(PrimaryNutrient::P, 2.0)
            .with(PrimaryNutrient::K, 3.0);
        for (nutrient, expected) in PrimaryNutrient::ALL.iter().zip([1.0, 2.0, 3.0]) {
            assert_eq!(values.get(*nutrient), expected);
        }
    }

    #[test]
    fn npk_arithmetic() {
        let a = NpkValues::new(10.0, 5.0, 2.0);
        let b = NpkValues::new(4.0, 5.0, 3.0);
        assert_eq!(a - b, NpkValues::new(6.0, 0.0, -1.0));
        assert_eq!(a + b, NpkValues::new(14.0, 10.0, 5.0));
    }

    #[test]
    fn primary_nutrients_map_to_channels() {
        assert_eq!(Nutrient::from(PrimaryNutrient::P), Nutrient::P);
        assert_eq!(PrimaryNutrient::K.symbol(), "K₂O");
        assert_eq!(PrimaryNutrient::N.name(), "Nitrogen");
    }

    #[test]
    fn nutrient_lookup_by_symbol_or_name() {
        assert_eq!(Nutrient::from_str("s"), Some(Nutrient::S));
        assert_eq!(Nutrient::from_str(" Zinc "), Some(Nutrient::Zn));
        assert_eq!(Nutrient::from_str("Al"), None);
    }
}
