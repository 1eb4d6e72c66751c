//! models::parameter — named, bounded, freezable model parameters.
//!
//! Purpose
//! -------
//! Represent the scalar knobs of a sky model. Every parameter carries a
//! value, an optional `[min, max]` range, a frozen flag (excluded from the
//! optimizer's free vector but still used for evaluation), and an error that
//! stays `None` until a fit fills it.
//!
//! Invariants & assumptions
//! ------------------------
//! - Values are finite.
//! - Bounds, when set, are finite and `min < max` if both are present.
//! - The value lies inside its bounds (inclusive).
//! - Names are unique inside one [`Parameters`] collection.
use crate::models::errors::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// A single model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub frozen: bool,
    /// 1σ uncertainty; populated only by a fit.
    pub error: Option<f64>,
}

impl Parameter {
    /// Free, unbounded parameter.
    pub fn new(name: &str, value: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit: unit.to_string(),
            min: None,
            max: None,
            frozen: false,
            error: None,
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_bounds(self, min: f64, max: f64) -> Self {
        self.with_min(min).with_max(max)
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    /// Check finiteness, bound consistency, and containment.
    ///
    /// # Errors
    /// - [`ModelError::NonFiniteValue`], [`ModelError::InvalidBounds`], or
    ///   [`ModelError::OutOfBounds`].
    pub fn validate(&self) -> ModelResult<()> {
        self.check_bounds()?;
        self.check_value(self.value)
    }

    /// Check that `value` would be acceptable for this parameter.
    pub fn check_value(&self, value: f64) -> ModelResult<()> {
        if !value.is_finite() {
            return Err(ModelError::NonFiniteValue { name: self.name.clone(), value });
        }
        let below = self.min.is_some_and(|min| value < min);
        let above = self.max.is_some_and(|max| value > max);
        if below || above {
            return Err(ModelError::OutOfBounds {
                name: self.name.clone(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn check_bounds(&self) -> ModelResult<()> {
        let finite =
            self.min.map_or(true, f64::is_finite) && self.max.map_or(true, f64::is_finite);
        let ordered = match (self.min, self.max) {
            (Some(min), Some(max)) => min < max,
            _ => true,
        };
        if !finite || !ordered {
            return Err(ModelError::InvalidBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Ordered collection of parameters with unique names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    items: Vec<Parameter>,
}

impl Parameters {
    /// Build a collection, validating every parameter and name uniqueness.
    pub fn new(items: Vec<Parameter>) -> ModelResult<Self> {
        let params = Self { items };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ModelResult<()> {
        for (i, p) in self.items.iter().enumerate() {
            p.validate()?;
            if self.items[..i].iter().any(|q| q.name == p.name) {
                return Err(ModelError::DuplicateParameter { name: p.name.clone() });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|p| p.name.as_str()).collect()
    }

    /// Current values in declaration order.
    pub fn values(&self) -> Vec<f64> {
        self.items.iter().map(|p| p.value).collect()
    }

    /// Value at position `index`; callers index by the component's layout.
    pub(crate) fn value_at(&self, index: usize) -> f64 {
        self.items[index].value
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> ModelResult<&Parameter> {
        self.items
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ModelError::MissingParameter { name: name.to_string() })
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> ModelResult<&mut Parameter> {
        self.items
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ModelError::MissingParameter { name: name.to_string() })
    }

    /// Set a value after checking it against the parameter's bounds.
    pub fn set_value(&mut self, name: &str, value: f64) -> ModelResult<()> {
        let p = self.get_mut(name)?;
        p.check_value(value)?;
        p.value = value;
        Ok(())
    }

    pub fn set_frozen(&mut self, name: &str, frozen: bool) -> ModelResult<()> {
        self.get_mut(name)?.frozen = frozen;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Bounds are inclusive and reject values outside them.
    fn parameter_bounds_are_inclusive() {
        let p = Parameter::new("index", 2.0, "").with_bounds(1.0, 5.0);
        assert!(p.check_value(1.0).is_ok());
        assert!(p.check_value(5.0).is_ok());
        assert!(matches!(p.check_value(5.5), Err(ModelError::OutOfBounds { .. })));
        assert!(matches!(p.check_value(f64::NAN), Err(ModelError::NonFiniteValue { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Inverted bounds and duplicate names are rejected when the collection
    // is built.
    fn parameters_new_rejects_bad_bounds_and_duplicates() {
        let inverted = Parameter::new("a", 1.0, "").with_bounds(2.0, 0.0);
        assert!(matches!(
            Parameters::new(vec![inverted]),
            Err(ModelError::InvalidBounds { .. })
        ));

        let dup = vec![Parameter::new("a", 1.0, ""), Parameter::new("a", 2.0, "")];
        assert!(matches!(Parameters::new(dup), Err(ModelError::DuplicateParameter { .. })));
    }

    #[test]
    // Purpose
    // -------
    // `set_value` must leave the stored value untouched when the new value
    // violates the bounds.
    fn set_value_is_atomic_on_failure() {
        let mut params =
            Parameters::new(vec![Parameter::new("amplitude", 1e-11, "cm-2 s-1 TeV-1").with_min(0.0)])
                .unwrap();

        assert!(params.set_value("amplitude", -1.0).is_err());
        assert_eq!(params.get("amplitude").unwrap().value, 1e-11);

        params.set_value("amplitude", 2e-11).unwrap();
        assert_eq!(params.get("amplitude").unwrap().value, 2e-11);
        assert!(matches!(params.set_value("nope", 1.0), Err(ModelError::MissingParameter { .. })));
    }
}
