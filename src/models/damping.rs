//! Memoized perturbation-theory damping for [`crate::models::CorrSeo2016`].
//!
//! Four caches, all keyed on inputs rounded to [`crate::cache::KEY_DECIMALS`]:
//!
//! | function              | key          | value                         | default capacity |
//! |-----------------------|--------------|-------------------------------|------------------|
//! | `pt_data`             | `Ω_m`        | [`PtData`]                    | 32               |
//! | `damping_dd`          | `(f, Ω_m)`   | `exp(-(1+(2+f)fμ²) k² σ_dd/2)` | 8192             |
//! | `damping`             | `(f, Ω_m)`   | `exp(-(1+(2+f)fμ²) k² σ/2)`    | 8192             |
//! | `damping_ss`          | `Ω_m`        | `exp(-k² σ_ss/2)`             | 32               |
//!
//! The μ×k tables are `nmu × nk` matrices (rows μ, columns k). The shift-shift
//! damping does not depend on μ and is stored as a single row.
//!
//! A cache belongs to one model instance and is dropped with it.

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::cache::{LruCache, quantize, round_key};
use crate::cosmology::{PtData, PtSupplier};
use crate::error::AppError;

/// Capacities of the four caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DampingCapacities {
    pub pt_data: usize,
    pub damping_dd: usize,
    pub damping: usize,
    pub damping_ss: usize,
}

impl Default for DampingCapacities {
    fn default() -> Self {
        Self {
            pt_data: 32,
            damping_dd: 8192,
            damping: 8192,
            damping_ss: 32,
        }
    }
}

/// Current number of entries in each cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DampingOccupancy {
    pub pt_data: usize,
    pub damping_dd: usize,
    pub damping: usize,
    pub damping_ss: usize,
}

type Table = Arc<DMatrix<f64>>;

pub struct DampingCache {
    source: Box<dyn PtSupplier>,
    ks: Arc<[f64]>,
    mu: Arc<[f64]>,
    pt_data: LruCache<i64, Arc<PtData>>,
    damping_dd: LruCache<(i64, i64), Table>,
    damping: LruCache<(i64, i64), Table>,
    damping_ss: LruCache<i64, Arc<[f64]>>,
}

impl DampingCache {
    pub fn new(
        source: Box<dyn PtSupplier>,
        ks: Arc<[f64]>,
        mu: Arc<[f64]>,
        capacities: DampingCapacities,
    ) -> Self {
        Self {
            source,
            ks,
            mu,
            pt_data: LruCache::new(capacities.pt_data),
            damping_dd: LruCache::new(capacities.damping_dd),
            damping: LruCache::new(capacities.damping),
            damping_ss: LruCache::new(capacities.damping_ss),
        }
    }

    pub fn ks(&self) -> &[f64] {
        &self.ks
    }

    pub fn mu(&self) -> &[f64] {
        &self.mu
    }

    pub fn occupancy(&self) -> DampingOccupancy {
        DampingOccupancy {
            pt_data: self.pt_data.len(),
            damping_dd: self.damping_dd.len(),
            damping: self.damping.len(),
            damping_ss: self.damping_ss.len(),
        }
    }

    /// Whether `damping_dd(growth, om)` is cached, without touching its recency.
    pub fn has_damping_dd(&self, growth: f64, om: f64) -> bool {
        self.damping_dd.contains_key(&(quantize(growth), quantize(om)))
    }

    pub fn pt_data(&mut self, om: f64) -> Result<Arc<PtData>, AppError> {
        let om = round_key(om);
        let source = &mut self.source;
        let data = self
            .pt_data
            .get_or_try_insert_with(quantize(om), || source.get_data(om))?;
        Ok(Arc::clone(data))
    }

    pub fn damping_dd(&mut self, growth: f64, om: f64) -> Result<Table, AppError> {
        let key = (quantize(growth), quantize(om));
        if let Some(table) = self.damping_dd.get(&key) {
            return Ok(Arc::clone(table));
        }
        let sigma_dd = self.pt_data(om)?.sigma_dd;
        let table = Arc::new(anisotropic_damping(&self.mu, &self.ks, round_key(growth), sigma_dd));
        self.damping_dd.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn damping(&mut self, growth: f64, om: f64) -> Result<Table, AppError> {
        let key = (quantize(growth), quantize(om));
        if let Some(table) = self.damping.get(&key) {
            return Ok(Arc::clone(table));
        }
        let sigma = self.pt_data(om)?.sigma;
        let table = Arc::new(anisotropic_damping(&self.mu, &self.ks, round_key(growth), sigma));
        self.damping.insert(key, Arc::clone(&table));
        Ok(table)
    }

    pub fn damping_ss(&mut self, om: f64) -> Result<Arc<[f64]>, AppError> {
        let key = quantize(om);
        if let Some(row) = self.damping_ss.get(&key) {
            return Ok(Arc::clone(row));
        }
        let sigma_ss = self.pt_data(om)?.sigma_ss;
        let row: Arc<[f64]> = self
            .ks
            .iter()
            .map(|k| (-k * k * sigma_ss / 2.0).exp())
            .collect();
        self.damping_ss.insert(key, Arc::clone(&row));
        Ok(row)
    }
}

fn anisotropic_damping(mu: &[f64], ks: &[f64], growth: f64, sigma: f64) -> DMatrix<f64> {
    DMatrix::from_fn(mu.len(), ks.len(), |i, j| {
        let boost = 1.0 + (2.0 + growth) * growth * mu[i] * mu[i];
        (-boost * ks[j] * ks[j] * sigma / 2.0).exp()
    })
}
