use crate::models::{Area, AreaUnit, ProductionTarget, TargetYield, YieldUnit};

pub const MANZANA_TO_HECTARE: f64 = 0.7;
/// One quintal is 100 lb
pub const QUINTAL_TO_KG: f64 = 45.36;
pub const LB_TO_KG: f64 = 0.4536;
pub const TON_TO_KG: f64 = 1000.0;

impl AreaUnit {
    pub fn hectares_per_unit(&self) -> f64 {
        match self {
            AreaUnit::Hectare => 1.0,
            AreaUnit::Manzana => MANZANA_TO_HECTARE,
        }
    }
}

impl YieldUnit {
    pub fn kilograms_per_unit(&self) -> f64 {
        match self {
            YieldUnit::Kilogram => 1.0,
            YieldUnit::Pound => LB_TO_KG,
            YieldUnit::Quintal => QUINTAL_TO_KG,
            YieldUnit::MetricTon => TON_TO_KG,
        }
    }
}

pub fn normalize_area(area: Area) -> f64 {
    area.value * area.unit.hectares_per_unit()
}

pub fn normalize_yield(target: TargetYield) -> f64 {
    target.value * target.unit.kilograms_per_unit()
}

/// Target yield in metric tons per hectare.
///
/// The target is stated per one unit of the field's area unit, so the
/// normalized yield is spread over that unit's hectare equivalent.
pub fn yield_per_hectare_tons(target: &ProductionTarget) -> f64 {
    normalize_yield(target.target_yield) / target.area.unit.hectares_per_unit() / TON_TO_KG
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn hectares_to(hectares: f64, unit: AreaUnit) -> f64 {
        hectares / unit.hectares_per_unit()
    }

    fn kilograms_to(kilograms: f64, unit: YieldUnit) -> f64 {
        kilograms / unit.kilograms_per_unit()
    }

    #[test]
    fn area_conversion() {
        let ha = normalize_area(Area {
            value: 10.0,
            unit: AreaUnit::Manzana,
        });
        assert!(close(ha, 7.0));
        assert!(close(
            normalize_area(Area {
                value: 3.5,
                unit: AreaUnit::Hectare
            }),
            3.5
        ));
    }

    #[test]
    fn yield_conversion() {
        let cases = [
            (YieldUnit::Kilogram, 1.0),
            (YieldUnit::Pound, 0.4536),
            (YieldUnit::Quintal, 45.36),
            (YieldUnit::MetricTon, 1000.0),
        ];
        for (unit, factor) in cases {
            let kg = normalize_yield(TargetYield { value: 2.0, unit });
            assert!(close(kg, 2.0 * factor), "{:?}", unit);
        }
    }

    #[test]
    fn conversions_round_trip() {
        for unit in AreaUnit::all() {
            for value in [0.0, 0.5, 1.0, 37.25, 1200.0] {
                let ha = normalize_area(Area { value, unit: *unit });
                assert!(close(hectares_to(ha, *unit), value), "{:?} {}", unit, value);
            }
        }
        for unit in YieldUnit::all() {
            for value in [0.0, 0.5, 1.0, 300.0, 9000.0] {
                let kg = normalize_yield(TargetYield { value, unit: *unit });
                assert!(close(kilograms_to(kg, *unit), value), "{:?} {}", unit, value);
            }
        }
    }

    #[test]
    fn conversions_are_linear() {
        for unit in YieldUnit::all() {
            let one = normalize_yield(TargetYield { value: 1.0, unit: *unit });
            let many = normalize_yield(TargetYield { value: 7.0, unit: *unit });
            assert!(close(many, one * 7.0));
        }
    }

    #[test]
    fn yield_per_hectare_in_tons() {
        let per_ha = ProductionTarget::new("maiz", 4.0, AreaUnit::Hectare)
            .with_yield(5.0, YieldUnit::MetricTon);
        assert!(close(yield_per_hectare_tons(&per_ha), 5.0));

        // 70 qq per manzana = 3175.2 kg over 0.7 ha
        let per_mz = ProductionTarget::new("cafe", 2.0, AreaUnit::Manzana)
            .with_yield(70.0, YieldUnit::Quintal);
        assert!(close(yield_per_hectare_tons(&per_mz), 4.536));
    }
}
