//! End-to-end properties of the transforms, caches and models.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::DMatrix;

use bao_fit::app::pipeline::run_fit;
use bao_fit::cache::LruCache;
use bao_fit::cosmology::{
    CosmologyConfig, CosmologyData, CosmologySupplier, DEFAULT_SMOOTHING_SCALE, EisensteinHu,
    LptGenerator, PtData, PtSupplier,
};
use bao_fit::data::{DataKind, Dataset};
use bao_fit::domain::{FitConfig, ModelKind, ModelSettings};
use bao_fit::error::AppError;
use bao_fit::fit::scan_alpha;
use bao_fit::math::{lin_space, log_space};
use bao_fit::models::{
    CorrBeutler2017, CorrSeo2016, DampingCache, DampingCapacities, Model, ModelOptions,
    PowerBeutler2017, Reconstruction, build_model,
};
use bao_fit::transform::{
    GaussConfig, GaussTransform, HankelConfig, HankelTransform, PowerToCorrelation, TransformKind,
};

fn small_cosmology() -> CosmologyConfig {
    CosmologyConfig {
        k_num: 400,
        ..CosmologyConfig::default()
    }
}

/// Eisenstein-Hu spectra, optionally with the wiggles removed.
struct Dewiggled {
    inner: EisensteinHu,
    dewiggle: bool,
}

impl Dewiggled {
    fn new(dewiggle: bool) -> Self {
        Self {
            inner: EisensteinHu::new(small_cosmology()).unwrap(),
            dewiggle,
        }
    }
}

impl CosmologySupplier for Dewiggled {
    fn ks(&self) -> Arc<[f64]> {
        self.inner.ks()
    }

    fn get_data(&mut self, om: f64) -> Result<Arc<CosmologyData>, AppError> {
        let data = self.inner.get_data(om)?;
        if !self.dewiggle {
            return Ok(data);
        }
        Ok(Arc::new(CosmologyData {
            om: data.om,
            pk_lin: data.pk_smooth_lin.clone(),
            pk_smooth_lin: data.pk_smooth_lin.clone(),
            pk_ratio: vec![0.0; data.pk_ratio.len()],
        }))
    }
}

fn correlation_data(x: Vec<f64>) -> Arc<Dataset> {
    let n = x.len();
    Arc::new(Dataset::new("xi", DataKind::Correlation, x, vec![0.0; n], DMatrix::identity(n, n)).unwrap())
}

fn power_data(x: Vec<f64>) -> Arc<Dataset> {
    let n = x.len();
    Arc::new(Dataset::new("pk", DataKind::Power, x, vec![0.0; n], DMatrix::identity(n, n)).unwrap())
}

fn corr_beutler(dewiggle: bool) -> CorrBeutler2017 {
    let cosmology = Dewiggled::new(dewiggle);
    let transform = TransformKind::Gauss.build(&cosmology.ks()).unwrap();
    CorrBeutler2017::new(Box::new(cosmology), transform, ModelOptions::default()).unwrap()
}

fn corr_seo(dewiggle: bool, reconstruction: Reconstruction) -> CorrSeo2016 {
    let cosmology = Dewiggled::new(dewiggle);
    let transform = TransformKind::Gauss.build(&cosmology.ks()).unwrap();
    let pt = LptGenerator::new(
        Box::new(EisensteinHu::new(small_cosmology()).unwrap()),
        reconstruction.smoothing_scale().unwrap_or(DEFAULT_SMOOTHING_SCALE),
        4,
    )
    .unwrap();
    CorrSeo2016::new(
        Box::new(cosmology),
        Box::new(pt),
        transform,
        reconstruction,
        ModelOptions::default(),
        DampingCapacities::default(),
    )
    .unwrap()
}

fn assert_close(a: &[f64], b: &[f64], rel: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() <= rel * y.abs() + 1e-15, "{x} vs {y}");
    }
}

#[test]
fn transforms_are_deterministic() {
    let mut cosmology = EisensteinHu::new(small_cosmology()).unwrap();
    let ks = cosmology.ks();
    let pk = cosmology.get_data(0.31).unwrap().pk_lin.clone();
    let ss = lin_space(30.0, 200.0, 12).unwrap();

    for kind in [TransformKind::Gauss, TransformKind::Hankel] {
        let t = kind.build(&ks).unwrap();
        let a = t.transform(&ks, &pk, &ss).unwrap();
        let b = t.transform(&ks, &pk, &ss).unwrap();
        assert_eq!(a, b, "{kind:?}");
    }
}

#[test]
fn damped_quadrature_converges_to_hankel_reference() {
    let mut cosmology = EisensteinHu::new(CosmologyConfig::default()).unwrap();
    let ks = cosmology.ks();
    let pk = cosmology.get_data(0.31).unwrap().pk_lin.clone();
    let ss = lin_space(30.0, 200.0, 35).unwrap();

    let dense = GaussTransform::new(
        &ks,
        GaussConfig {
            interpolate_detail: 8,
            a: 0.25,
        },
    )
    .unwrap();
    let reference = HankelTransform::new(HankelConfig::default()).unwrap();
    let xi = dense.transform(&ks, &pk, &ss).unwrap();
    let want = reference.transform(&ks, &pk, &ss).unwrap();

    let peak = want.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    for ((s, a), b) in ss.iter().zip(&xi).zip(&want) {
        assert!((a - b).abs() < 0.01 * peak, "s={s}: {a} vs {b}");
    }
}

#[test]
fn lorentzian_spectrum_decays_below_zero_separation_limit() {
    let amplitude = 2000.0;
    let ks = log_space(1e-4, 1.0, 200).unwrap();
    let pk: Vec<f64> = ks.iter().map(|k| amplitude / (1.0 + k * k)).collect();
    let t = GaussTransform::new(&ks, GaussConfig::default()).unwrap();
    let xi = t.transform(&ks, &pk, &[50.0, 100.0, 150.0]).unwrap();

    let bound = amplitude / (2.0 * PI);
    assert!(xi.iter().all(|v| v.is_finite() && v.abs() < bound));
    assert!(xi[0].abs() > xi[1].abs() && xi[1].abs() > xi[2].abs());
}

#[test]
fn lru_cache_stays_bounded_and_evicts_oldest() {
    let mut cache: LruCache<(i64, i64), usize> = LruCache::new(3);
    for i in 0..3 {
        cache.insert((i, 0), i as usize);
    }
    // Touch the oldest entry so the second-oldest becomes the victim.
    assert_eq!(cache.get(&(0, 0)), Some(&0));
    for i in 3..10 {
        cache.insert((i, 0), i as usize);
        assert!(cache.len() <= cache.capacity());
    }
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.keys_by_recency(), vec![(9, 0), (8, 0), (7, 0)]);

    let mut cache: LruCache<i64, i64> = LruCache::new(2);
    cache.insert(1, 1);
    cache.insert(2, 2);
    cache.get(&1);
    cache.insert(3, 3);
    assert!(cache.contains_key(&1));
    assert!(!cache.contains_key(&2));
}

struct FlatPt {
    n: usize,
}

impl PtSupplier for FlatPt {
    fn get_data(&mut self, om: f64) -> Result<Arc<PtData>, AppError> {
        Ok(Arc::new(PtData {
            om,
            sigma: 30.0,
            sigma_dd: 5.0,
            sigma_ss: 10.0,
            r1: vec![0.0; self.n],
            r2: vec![0.0; self.n],
        }))
    }
}

#[test]
fn damping_cache_evicts_least_recently_used_pair() {
    let ks: Arc<[f64]> = log_space(1e-3, 1.0, 16).unwrap().into();
    let mu: Arc<[f64]> = lin_space(0.0, 1.0, 4).unwrap().into();
    let capacities = DampingCapacities {
        damping_dd: 3,
        ..DampingCapacities::default()
    };
    let mut cache = DampingCache::new(Box::new(FlatPt { n: ks.len() }), ks, mu, capacities);

    cache.damping_dd(0.50, 0.31).unwrap();
    cache.damping_dd(0.60, 0.31).unwrap();
    cache.damping_dd(0.70, 0.31).unwrap();
    cache.damping_dd(0.50, 0.31).unwrap();
    for i in 0..5 {
        cache.damping_dd(0.8 + 0.01 * i as f64, 0.31).unwrap();
        assert!(cache.occupancy().damping_dd <= 3);
    }
    assert!(!cache.has_damping_dd(0.60, 0.31));
    assert!(!cache.has_damping_dd(0.70, 0.31));
    assert!(cache.has_damping_dd(0.84, 0.31));

    // Recently used survives a single overflow.
    cache.damping_dd(0.83, 0.31).unwrap();
    cache.damping_dd(0.90, 0.31).unwrap();
    assert!(cache.has_damping_dd(0.83, 0.31));
    assert!(!cache.has_damping_dd(0.82, 0.31));
}

#[test]
fn alpha_only_rescales_the_transform_argument() {
    let d = vec![60.0, 80.0, 100.0, 120.0, 140.0];
    let alpha = 1.07;

    let mut dilated = corr_beutler(false);
    dilated.set_data(correlation_data(d.clone())).unwrap();
    let p = dilated.params().defaults().with("sigma_nl", 5.0).with("b", 1.5);
    let at_alpha = dilated.get_model(&p.clone().with("alpha", alpha), false).unwrap();

    let mut rescaled = corr_beutler(false);
    rescaled.set_data(correlation_data(d.iter().map(|d| d * alpha).collect())).unwrap();
    let at_one = rescaled.get_model(&p.clone().with("alpha", 1.0), false).unwrap();
    assert_close(&at_alpha, &at_one, 1e-12);

    // α = 1 is the bare transform, times the bias.
    let mut direct = corr_beutler(false);
    direct.set_data(correlation_data(d.clone())).unwrap();
    let model = direct.get_model(&p, false).unwrap();
    let (ks, pk1d) = direct.compute_pk1d(&p, false).unwrap();
    let xi = direct.transform().transform(&ks, &pk1d, &d).unwrap();
    let want: Vec<f64> = xi.iter().map(|v| 1.5 * v).collect();
    assert_close(&model, &want, 1e-12);
}

#[test]
fn smooth_branch_matches_full_branch_without_wiggles() {
    let d = vec![50.0, 75.0, 100.0, 125.0, 150.0];

    let mut wiggly = corr_beutler(false);
    let mut flat = corr_beutler(true);
    wiggly.set_data(correlation_data(d.clone())).unwrap();
    flat.set_data(correlation_data(d.clone())).unwrap();
    let p = wiggly.params().defaults().with("sigma_nl", 4.0);
    assert_close(&wiggly.get_model(&p, true).unwrap(), &flat.get_model(&p, false).unwrap(), 1e-10);

    for reconstruction in [
        Reconstruction::Pre,
        Reconstruction::Post {
            smoothing_scale: 15.0,
        },
    ] {
        let mut wiggly = corr_seo(false, reconstruction);
        let mut flat = corr_seo(true, reconstruction);
        wiggly.set_data(correlation_data(d.clone())).unwrap();
        flat.set_data(correlation_data(d.clone())).unwrap();
        let p = wiggly.params().defaults();
        assert_close(&wiggly.get_model(&p, true).unwrap(), &flat.get_model(&p, false).unwrap(), 1e-12);
    }

    let ks = vec![0.03, 0.08, 0.15, 0.25];
    let mut wiggly = PowerBeutler2017::new(Box::new(Dewiggled::new(false)), false, ModelOptions::default()).unwrap();
    let mut flat = PowerBeutler2017::new(Box::new(Dewiggled::new(true)), false, ModelOptions::default()).unwrap();
    wiggly.set_data(power_data(ks.clone())).unwrap();
    flat.set_data(power_data(ks)).unwrap();
    let p = wiggly.params().defaults().with("a2", 50.0);
    assert_close(&wiggly.get_model(&p, true).unwrap(), &flat.get_model(&p, false).unwrap(), 1e-12);
}

#[test]
fn only_the_beutler_model_multiplies_xi_by_bias() {
    let d = vec![60.0, 90.0, 120.0, 150.0];

    let mut beutler = corr_beutler(false);
    beutler.set_data(correlation_data(d.clone())).unwrap();
    let p = beutler.params().defaults();
    let one = beutler.get_model(&p, false).unwrap();
    let two = beutler.get_model(&p.clone().with("b", 2.0), false).unwrap();
    let shaped = beutler
        .get_model(&p.clone().with("b", 2.0).with("a1", 20.0).with("a2", 0.1).with("a3", 0.01), false)
        .unwrap();
    for i in 0..d.len() {
        assert!((two[i] - 2.0 * one[i]).abs() <= 1e-12 * two[i].abs());
        let shape = 20.0 / (d[i] * d[i]) + 0.1 / d[i] + 0.01;
        assert!((shaped[i] - two[i] - shape).abs() < 1e-12);
    }

    let mut seo = corr_seo(false, Reconstruction::Pre);
    seo.set_data(correlation_data(d.clone())).unwrap();
    let p = seo.params().defaults();
    let one = seo.get_model(&p, true).unwrap();
    let two = seo.get_model(&p.clone().with("b", 2.0), true).unwrap();
    let shaped = seo
        .get_model(&p.clone().with("b", 2.0).with("a1", 20.0).with("a2", 0.1).with("a3", 0.01), true)
        .unwrap();
    for i in 0..d.len() {
        // b enters as b² through the spectrum only.
        assert!((two[i] - 4.0 * one[i]).abs() <= 1e-12 * two[i].abs());
        let shape = 20.0 / (d[i] * d[i]) + 0.1 / d[i] + 0.01;
        assert!((shaped[i] - two[i] - shape).abs() < 1e-12);
    }
}

fn fit_config(kind: ModelKind, recon: bool) -> FitConfig {
    let mut settings = ModelSettings::new(kind);
    settings.cosmology = small_cosmology();
    settings.recon = recon;
    let mut config = FitConfig::new(settings);
    config.true_alpha = 0.98;
    config.alpha_min = 0.9;
    config.alpha_max = 1.1;
    config.alpha_steps = 41;
    config.noise = 0.002;
    config
}

#[test]
fn alpha_scan_recovers_the_mock_truth() {
    for (kind, recon) in [(ModelKind::CorrBeutler, false), (ModelKind::CorrSeo, true)] {
        let run = run_fit(&fit_config(kind, recon)).unwrap();
        assert!(
            (run.scan.best.alpha - 0.98).abs() <= 0.0051,
            "{kind:?}: best α = {}",
            run.scan.best.alpha
        );
        assert!(run.scan.best.chi2.is_finite());
        assert_eq!(run.scan.model, kind.display_name());
    }
}

#[test]
fn alpha_scan_is_reproducible() {
    let config = fit_config(ModelKind::CorrBeutler, false);
    let a = run_fit(&config).unwrap();
    let b = run_fit(&config).unwrap();
    assert_eq!(a.scan, b.scan);
    assert_eq!(a.dataset.data(), b.dataset.data());
}

#[test]
fn alpha_scan_builds_one_model_per_worker_only() {
    let mut settings = ModelSettings::new(ModelKind::PowerBeutler);
    settings.cosmology = small_cosmology();
    let base = build_model(&settings).unwrap().params().defaults();
    let data = power_data(lin_space(0.02, 0.3, 10).unwrap());

    let built = AtomicUsize::new(0);
    let factory = || {
        built.fetch_add(1, Ordering::SeqCst);
        build_model(&settings)
    };
    let scan = scan_alpha(factory, data, &base, &[1.0]).unwrap();

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(scan.model, ModelKind::PowerBeutler.display_name());
    assert_eq!(scan.points.len(), 1);
}
