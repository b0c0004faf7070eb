//! Allocation solver (C6).
//!
//! Given a fixed lot subset and a DC target, computes a per-lot kilogram
//! split that drives the weighted DC toward target while respecting
//! availability ceilings and the minimum-usage floor.

use crate::config::OperationalLimits;
use crate::lot::Lot;

/// A single lot's share of a proposed blend.
#[derive(Debug, Clone)]
pub struct LotAllocation<'a> {
    pub lot: &'a Lot,
    pub kg: f64,
}

const BALANCE_ITERATIONS: usize = 50;
const BALANCE_CONVERGENCE: f64 = 0.1;
const BALANCE_UP: f64 = 1.1;
const BALANCE_DOWN: f64 = 0.9;

/// Attempts to allocate `target_kg` across `lots` so the weighted DC lands
/// near `dc_target` (if given). Returns `None` if the 90% mass floor can't
/// be met by any strategy.
pub fn allocate<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    dc_target: Option<f64>,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    if lots.is_empty() {
        return None;
    }

    let Some(target) = dc_target else {
        return simple_allocation(lots, target_kg, limits).filter(|a| meets_floor(a, target_kg));
    };

    let dcs: Vec<f64> = lots.iter().map(|l| l.dc_real.unwrap_or(target)).collect();
    let dc_min = dcs.iter().cloned().fold(f64::INFINITY, f64::min);
    let dc_max = dcs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if dc_max - dc_min <= 2.0 {
        return uniform_allocation(lots, target_kg, limits).filter(|a| meets_floor(a, target_kg));
    }
    if target < dc_min - 5.0 || target > dc_max + 5.0 {
        return simple_allocation(lots, target_kg, limits).filter(|a| meets_floor(a, target_kg));
    }

    let mut best: Option<(f64, Vec<LotAllocation>)> = None;
    for candidate in [
        balanced_allocation(lots, target_kg, target, limits),
        distance_weighted_allocation(lots, target_kg, target, limits),
        greedy_balanced_allocation(lots, target_kg, target, limits),
    ]
    .into_iter()
    .flatten()
    {
        if !meets_floor(&candidate, target_kg) {
            continue;
        }
        let dc = weighted_dc(&candidate);
        let distance = (dc - target).abs();
        if best.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, allocation)| allocation)
}

fn meets_floor(allocation: &[LotAllocation], target_kg: f64) -> bool {
    let total: f64 = allocation.iter().map(|a| a.kg).sum();
    total >= 0.9 * target_kg
}

fn weighted_dc(allocation: &[LotAllocation]) -> f64 {
    let total: f64 = allocation.iter().map(|a| a.kg).sum();
    if total <= 0.0 {
        return 0.0;
    }
    allocation
        .iter()
        .filter_map(|a| a.lot.dc_real.map(|dc| dc * a.kg))
        .sum::<f64>()
        / total
}

fn ceiling(lot: &Lot, limits: &OperationalLimits) -> f64 {
    lot.available_kg * limits.max_lot_usage_pct
}

fn simple_allocation<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    let mut remaining = target_kg;
    let mut out = Vec::new();
    for lot in lots {
        if remaining <= 0.0 {
            break;
        }
        let kg = (remaining * 1.2).min(ceiling(lot, limits));
        if kg >= limits.min_lot_usage_kg {
            remaining -= kg;
            out.push(LotAllocation { lot, kg });
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn uniform_allocation<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    let share = target_kg / lots.len() as f64;
    let mut out = Vec::new();
    for lot in lots {
        let kg = share.min(ceiling(lot, limits));
        if kg >= limits.min_lot_usage_kg {
            out.push(LotAllocation { lot, kg });
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn balanced_allocation<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    dc_target: f64,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    let n = lots.len();
    let mut proportions = vec![1.0 / n as f64; n];
    let dcs: Vec<f64> = lots.iter().map(|l| l.dc_real.unwrap_or(dc_target)).collect();

    for _ in 0..BALANCE_ITERATIONS {
        let dc: f64 = proportions.iter().zip(&dcs).map(|(p, d)| p * d).sum();
        if (dc - dc_target).abs() < BALANCE_CONVERGENCE {
            break;
        }
        for (p, d) in proportions.iter_mut().zip(&dcs) {
            if dc > dc_target {
                *p *= if *d < dc_target { BALANCE_UP } else { BALANCE_DOWN };
            } else {
                *p *= if *d > dc_target { BALANCE_UP } else { BALANCE_DOWN };
            }
        }
        let sum: f64 = proportions.iter().sum();
        if sum > 0.0 {
            for p in proportions.iter_mut() {
                *p /= sum;
            }
        }
    }

    let mut out = Vec::new();
    for (lot, p) in lots.iter().zip(&proportions) {
        let kg = (target_kg * p).min(ceiling(lot, limits));
        if kg >= limits.min_lot_usage_kg {
            out.push(LotAllocation { lot: *lot, kg });
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn distance_weighted_allocation<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    dc_target: f64,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    let weights: Vec<f64> = lots
        .iter()
        .map(|l| {
            let dc = l.dc_real.unwrap_or(dc_target);
            1.0 / (1.0 + (dc - dc_target).abs() / 10.0)
        })
        .collect();
    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut out = Vec::new();
    for (lot, w) in lots.iter().zip(&weights) {
        let kg = (target_kg * w / total_weight).min(ceiling(lot, limits));
        if kg >= limits.min_lot_usage_kg {
            out.push(LotAllocation { lot: *lot, kg });
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn greedy_balanced_allocation<'a>(
    lots: &[&'a Lot],
    target_kg: f64,
    dc_target: f64,
    limits: &OperationalLimits,
) -> Option<Vec<LotAllocation<'a>>> {
    let mut sorted: Vec<&&Lot> = lots.iter().collect();
    sorted.sort_by(|a, b| {
        let da = (a.dc_real.unwrap_or(dc_target) - dc_target).abs();
        let db = (b.dc_real.unwrap_or(dc_target) - dc_target).abs();
        da.partial_cmp(&db).unwrap()
    });

    let mut out: Vec<LotAllocation> = Vec::new();
    let mut remaining = target_kg;
    let mut used_kg = 0.0;
    let mut used_dc_sum = 0.0;

    for (idx, lot) in sorted.into_iter().enumerate() {
        if remaining <= 0.0 {
            break;
        }
        let cap = ceiling(lot, limits);
        let fraction = if idx == 0 {
            0.5
        } else {
            let running_dc = if used_kg > 0.0 {
                used_dc_sum / used_kg
            } else {
                dc_target
            };
            if (running_dc - dc_target).abs() < 1.0 {
                0.3
            } else {
                0.5
            }
        };
        let kg = (remaining * fraction).min(cap).min(remaining);
        if kg >= limits.min_lot_usage_kg {
            remaining -= kg;
            used_kg += kg;
            used_dc_sum += kg * lot.dc_real.unwrap_or(dc_target);
            out.push(LotAllocation { lot: *lot, kg });
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes;

    fn lot(dc: f64, avail: f64) -> Lot {
        Lot {
            article_code_raw: "PAPW".to_string(),
            lot_code: "L".to_string(),
            description: None,
            code: codes::parse("PAPW"),
            dc_real: Some(dc),
            fp_real: None,
            duck_real: None,
            other_elements_real: None,
            feather_real: None,
            oxygen_real: None,
            turbidity_real: None,
            total_fibres: None,
            broken: None,
            landfowl: None,
            dc_nominal: None,
            fp_nominal: None,
            quality_nominal: None,
            standard_nominal: None,
            available_kg: avail,
            cost_per_kg: Some(10.0),
            dc_was_imputed: false,
            fp_was_imputed: false,
        }
    }

    #[test]
    fn uniform_allocation_for_equal_dc_lots() {
        let a = lot(85.0, 5000.0);
        let b = lot(85.0, 5000.0);
        let refs = [&a, &b];
        let result = allocate(&refs, 2000.0, Some(85.0), &OperationalLimits::default()).unwrap();
        let total: f64 = result.iter().map(|r| r.kg).sum();
        assert!((total - 2000.0).abs() < 1.0);
        assert!((weighted_dc(&result) - 85.0).abs() < 0.01);
    }

    #[test]
    fn bends_toward_target_with_mixed_dc_lots() {
        let a = lot(90.0, 1000.0);
        let b = lot(80.0, 1000.0);
        let c = lot(70.0, 1000.0);
        let refs = [&a, &b, &c];
        let result = allocate(&refs, 1500.0, Some(80.0), &OperationalLimits::default()).unwrap();
        let dc = weighted_dc(&result);
        assert!((dc - 80.0).abs() <= 3.0, "dc was {dc}");
    }

    #[test]
    fn insufficient_availability_returns_none() {
        let a = lot(85.0, 500.0);
        let refs = [&a];
        let result = allocate(&refs, 2000.0, Some(85.0), &OperationalLimits::default());
        assert!(result.is_none());
    }

    #[test]
    fn no_dc_target_uses_simple_allocation_in_order() {
        let a = lot(85.0, 5000.0);
        let b = lot(70.0, 5000.0);
        let refs = [&a, &b];
        let result = allocate(&refs, 2000.0, None, &OperationalLimits::default()).unwrap();
        assert!(!result.is_empty());
        let total: f64 = result.iter().map(|r| r.kg).sum();
        assert!(total >= 0.9 * 2000.0);
    }
}
