//! Parameter declarations.
//!
//! Each model declares its parameters once at construction: name, display
//! label, bounds and default. The sampler (or the α scan) only sees the
//! *active* parameters; fixed ones are filled in with their defaults when a
//! free-value vector is expanded into a [`Params`] map.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

/// Ordered parameter declarations plus the set of fixed names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSpace {
    decls: Vec<ParamDecl>,
    fixed: BTreeSet<String>,
}

impl ParamSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter. Redeclaring a name replaces the earlier entry in place.
    pub fn add_param(
        &mut self,
        name: &str,
        label: &str,
        min: f64,
        max: f64,
        default: f64,
    ) -> Result<(), AppError> {
        if !(min.is_finite() && max.is_finite() && min < max && (min..=max).contains(&default)) {
            return Err(AppError::config(format!(
                "Invalid declaration for '{name}': bounds [{min}, {max}], default {default}."
            )));
        }
        let decl = ParamDecl {
            name: name.to_string(),
            label: label.to_string(),
            min,
            max,
            default,
        };
        match self.decls.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = decl,
            None => self.decls.push(decl),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ParamDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Hold `name` at its default during sampling.
    pub fn fix(&mut self, name: &str) -> Result<(), AppError> {
        if self.get(name).is_none() {
            return Err(unknown(name));
        }
        self.fixed.insert(name.to_string());
        Ok(())
    }

    /// Return `name` to the sampled set.
    pub fn free(&mut self, name: &str) -> Result<(), AppError> {
        if self.get(name).is_none() {
            return Err(unknown(name));
        }
        self.fixed.remove(name);
        Ok(())
    }

    pub fn is_fixed(&self, name: &str) -> bool {
        self.fixed.contains(name)
    }

    pub fn set_default(&mut self, name: &str, value: f64) -> Result<(), AppError> {
        let decl = self
            .decls
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| unknown(name))?;
        if !(decl.min..=decl.max).contains(&value) {
            return Err(AppError::config(format!(
                "Default {value} for '{name}' is outside [{}, {}].",
                decl.min, decl.max
            )));
        }
        decl.default = value;
        Ok(())
    }

    pub fn all(&self) -> &[ParamDecl] {
        &self.decls
    }

    /// Sampled parameters, in declaration order.
    pub fn active(&self) -> Vec<&ParamDecl> {
        self.decls
            .iter()
            .filter(|d| !self.fixed.contains(&d.name))
            .collect()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active().into_iter().map(|d| d.name.clone()).collect()
    }

    pub fn active_bounds(&self) -> Vec<(f64, f64)> {
        self.active().into_iter().map(|d| (d.min, d.max)).collect()
    }

    /// Every parameter at its default.
    pub fn defaults(&self) -> Params {
        Params(
            self.decls
                .iter()
                .map(|d| (d.name.clone(), d.default))
                .collect(),
        )
    }

    /// Expand a vector of active values into a full parameter map.
    pub fn fill(&self, free: &[f64]) -> Result<Params, AppError> {
        let active = self.active();
        if free.len() != active.len() {
            return Err(AppError::config(format!(
                "Expected {} free parameter values, got {}.",
                active.len(),
                free.len()
            )));
        }
        let mut params = self.defaults();
        for (decl, value) in active.into_iter().zip(free) {
            params.set(&decl.name, *value);
        }
        Ok(params)
    }

    /// Whether every declared parameter present in `params` is within bounds.
    pub fn in_bounds(&self, params: &Params) -> bool {
        self.decls.iter().all(|d| match params.0.get(&d.name) {
            Some(v) => (d.min..=d.max).contains(v),
            None => true,
        })
    }
}

fn unknown(name: &str) -> AppError {
    AppError::config(format!("Unknown parameter '{name}'."))
}

/// A full set of named parameter values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(BTreeMap<String, f64>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<f64, AppError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| AppError::config(format!("Missing parameter '{name}'.")))
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParamSpace {
        let mut s = ParamSpace::new();
        s.add_param("om", "Ω_m", 0.1, 0.5, 0.31).unwrap();
        s.add_param("alpha", "α", 0.8, 1.2, 1.0).unwrap();
        s.add_param("b", "b", 0.01, 10.0, 1.0).unwrap();
        s.fix("om").unwrap();
        s
    }

    #[test]
    fn fill_uses_defaults_for_fixed() {
        let s = space();
        assert_eq!(s.active_names(), vec!["alpha".to_string(), "b".to_string()]);
        let p = s.fill(&[1.05, 2.0]).unwrap();
        assert_eq!(p.get("om").unwrap(), 0.31);
        assert_eq!(p.get("alpha").unwrap(), 1.05);
        assert_eq!(p.get("b").unwrap(), 2.0);
    }

    #[test]
    fn fill_rejects_wrong_length() {
        assert_eq!(space().fill(&[1.0]).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn missing_parameter_is_named() {
        let err = Params::new().get("sigma_nl").unwrap_err();
        assert!(err.message().contains("sigma_nl"));
    }

    #[test]
    fn set_default_checks_bounds() {
        let mut s = space();
        s.set_default("om", 0.3).unwrap();
        assert_eq!(s.defaults().get("om").unwrap(), 0.3);
        assert!(s.set_default("om", 0.9).is_err());
        assert!(s.set_default("nope", 0.3).is_err());
    }

    #[test]
    fn in_bounds_checks_declared_values() {
        let s = space();
        assert!(s.in_bounds(&s.defaults()));
        assert!(!s.in_bounds(&s.defaults().with("alpha", 1.5)));
    }

    #[test]
    fn active_bounds_skip_fixed_parameters() {
        let mut s = space();
        assert_eq!(s.active_bounds(), vec![(0.8, 1.2), (0.01, 10.0)]);
        s.fix("b").unwrap();
        assert_eq!(s.active_bounds(), vec![(0.8, 1.2)]);
        s.free("om").unwrap();
        assert_eq!(s.active_bounds(), vec![(0.1, 0.5), (0.8, 1.2)]);
    }

    #[test]
    fn free_returns_parameter_to_active_set() {
        let mut s = space();
        s.free("om").unwrap();
        assert_eq!(s.active().len(), 3);
        assert!(!s.is_fixed("om"));
    }
}
