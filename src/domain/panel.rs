//! The solvent panel: an immutable set of labeled measurements.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::{HspPoint, SolventMeasurement};
use crate::error::HspError;

/// Labeled solvents keyed by unique identifier.
///
/// Measurements are stored sorted by identifier, so any aggregate over the panel
/// (scores included) does not depend on the order rows were supplied in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolventPanel {
    measurements: Vec<SolventMeasurement>,
}

impl SolventPanel {
    /// Build a panel, rejecting duplicate identifiers and non-finite coordinates.
    ///
    /// An empty panel is allowed here; scoring it fails with `EmptyPanel`.
    pub fn new(mut measurements: Vec<SolventMeasurement>) -> Result<Self, HspError> {
        let mut seen = HashSet::with_capacity(measurements.len());
        for m in &measurements {
            if m.id.trim().is_empty() {
                return Err(HspError::InvalidInput("solvent identifier is empty".to_string()));
            }
            if !m.point().is_finite() {
                return Err(HspError::InvalidInput(format!(
                    "solvent '{}' has non-finite coordinates ({}, {}, {})",
                    m.id, m.delta_d, m.delta_p, m.delta_h
                )));
            }
            if !seen.insert(m.id.as_str()) {
                return Err(HspError::DuplicateIdentifier(m.id.clone()));
            }
        }

        measurements.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { measurements })
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SolventMeasurement> {
        self.measurements.iter()
    }

    pub fn get(&self, id: &str) -> Option<&SolventMeasurement> {
        self.measurements
            .binary_search_by(|m| m.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.measurements[i])
    }

    pub fn good_count(&self) -> usize {
        self.measurements.iter().filter(|m| m.is_good_solvent).count()
    }

    pub fn poor_count(&self) -> usize {
        self.len() - self.good_count()
    }

    /// Ensure the panel can support a meaningful fit: non-empty, with both labels present.
    pub fn ensure_fittable(&self) -> Result<(), HspError> {
        if self.is_empty() {
            return Err(HspError::EmptyPanel);
        }
        let good = self.good_count();
        if good == 0 {
            return Err(HspError::DegeneratePanel {
                count: self.len(),
                label: "poor",
            });
        }
        if good == self.len() {
            return Err(HspError::DegeneratePanel {
                count: self.len(),
                label: "good",
            });
        }
        Ok(())
    }

    /// Arithmetic mean of the good solvents' coordinates.
    pub fn good_centroid(&self) -> Option<HspPoint> {
        let goods: Vec<HspPoint> = self
            .measurements
            .iter()
            .filter(|m| m.is_good_solvent)
            .map(SolventMeasurement::point)
            .collect();
        if goods.is_empty() {
            return None;
        }
        let n = goods.len() as f64;
        let (d, p, h) = goods.iter().fold((0.0, 0.0, 0.0), |(d, p, h), g| {
            (d + g.delta_d, p + g.delta_p, h + g.delta_h)
        });
        Some(HspPoint::new(d / n, p / n, h / n))
    }
}

impl<'a> IntoIterator for &'a SolventPanel {
    type Item = &'a SolventMeasurement;
    type IntoIter = std::slice::Iter<'a, SolventMeasurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: &str, d: f64, p: f64, h: f64, good: bool) -> SolventMeasurement {
        SolventMeasurement::new(id, HspPoint::new(d, p, h), good)
    }

    #[test]
    fn panel_is_sorted_by_identifier() {
        let panel = SolventPanel::new(vec![
            m("67-64-1", 15.5, 10.4, 7.0, true),
            m("108-88-3", 18.0, 1.4, 2.0, false),
            m("64-17-5", 15.8, 8.8, 19.4, false),
        ])
        .unwrap();
        let ids: Vec<&str> = panel.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["108-88-3", "64-17-5", "67-64-1"]);
        assert!(panel.get("64-17-5").is_some());
        assert!(panel.get("71-43-2").is_none());
    }

    #[test]
    fn duplicate_identifier_is_rejected() {
        let err = SolventPanel::new(vec![
            m("64-17-5", 15.8, 8.8, 19.4, true),
            m("64-17-5", 15.8, 8.8, 19.4, false),
        ])
        .unwrap_err();
        assert!(matches!(err, HspError::DuplicateIdentifier(id) if id == "64-17-5"));
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let err = SolventPanel::new(vec![m("A", f64::NAN, 1.0, 1.0, true)]).unwrap_err();
        assert!(matches!(err, HspError::InvalidInput(_)));
        let err = SolventPanel::new(vec![m("A", 18.0, f64::INFINITY, 1.0, true)]).unwrap_err();
        assert!(matches!(err, HspError::InvalidInput(_)));
    }

    #[test]
    fn fittable_requires_both_labels() {
        let empty = SolventPanel::new(Vec::new()).unwrap();
        assert!(matches!(empty.ensure_fittable(), Err(HspError::EmptyPanel)));

        let all_good = SolventPanel::new(vec![m("A", 18.0, 6.0, 6.0, true), m("B", 17.0, 5.0, 5.0, true)]).unwrap();
        assert!(matches!(
            all_good.ensure_fittable(),
            Err(HspError::DegeneratePanel { count: 2, label: "good" })
        ));

        let all_poor = SolventPanel::new(vec![m("A", 18.0, 6.0, 6.0, false)]).unwrap();
        assert!(matches!(
            all_poor.ensure_fittable(),
            Err(HspError::DegeneratePanel { count: 1, label: "poor" })
        ));

        let mixed = SolventPanel::new(vec![m("A", 18.0, 6.0, 6.0, true), m("B", 22.0, 16.0, 18.0, false)]).unwrap();
        assert!(mixed.ensure_fittable().is_ok());
    }

    #[test]
    fn good_centroid_ignores_poor_solvents() {
        let panel = SolventPanel::new(vec![
            m("A", 18.0, 6.0, 6.0, true),
            m("B", 20.0, 8.0, 10.0, true),
            m("C", 30.0, 30.0, 30.0, false),
        ])
        .unwrap();
        let c = panel.good_centroid().unwrap();
        assert!((c.delta_d - 19.0).abs() < 1e-12);
        assert!((c.delta_p - 7.0).abs() < 1e-12);
        assert!((c.delta_h - 8.0).abs() < 1e-12);
    }
}
