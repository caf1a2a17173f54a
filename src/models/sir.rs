//! The SIR kinetic model and its integration contract.
//!
//! The model partitions a closed population into Susceptible, Infected and
//! Recovered compartments with one-directional flow S→I→R:
//!
//! ```text
//! dS/dt = -k1 * S * I / N
//! dI/dt =  k1 * S * I / N - k2 * I
//! dR/dt =  k2 * I
//! ```
//!
//! `N` is the total population, evaluated once from the initial state and held
//! fixed for the whole integration. The three right-hand sides sum to zero, so
//! `S + I + R` is conserved; using the fixed `N` in the flux term (rather than
//! the live `S+I+R`) keeps numerical drift out of the transmission rate.

use crate::domain::{CompartmentState, RateParams};
use crate::error::AppError;
use crate::math::{DenseSolution, OdeOptions, OdeSystem, solve};

use nalgebra::DMatrix;

/// The SIR right-hand side as a value type: rate constants plus the fixed
/// population total. No mutable state; evaluation is pure.
#[derive(Debug, Clone, Copy)]
pub struct SirModel {
    pub k1: f64,
    pub k2: f64,
    pub n_total: f64,
}

impl SirModel {
    pub fn new(params: RateParams, n_total: f64) -> Self {
        Self {
            k1: params.k1,
            k2: params.k2,
            n_total,
        }
    }
}

impl OdeSystem for SirModel {
    fn ndim(&self) -> usize {
        3
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, i) = (y[0], y[1]);
        let infection_flux = self.k1 * s * i / self.n_total;
        let removal_flux = self.k2 * i;
        dydt[0] = -infection_flux;
        dydt[1] = infection_flux - removal_flux;
        dydt[2] = removal_flux;
    }

    fn jacobian(&self, _t: f64, y: &[f64], jac: &mut DMatrix<f64>) {
        let (s, i) = (y[0], y[1]);
        let a = self.k1 * i / self.n_total;
        let b = self.k1 * s / self.n_total;
        jac[(0, 0)] = -a;
        jac[(0, 1)] = -b;
        jac[(0, 2)] = 0.0;
        jac[(1, 0)] = a;
        jac[(1, 1)] = b - self.k2;
        jac[(1, 2)] = 0.0;
        jac[(2, 0)] = 0.0;
        jac[(2, 1)] = self.k2;
        jac[(2, 2)] = 0.0;
    }
}

/// One integration's output: the daily sample grid plus the dense interpolant
/// for off-grid queries. Immutable after creation.
#[derive(Debug, Clone)]
pub struct Trajectory {
    days: Vec<f64>,
    states: Vec<CompartmentState>,
    dense: DenseSolution,
}

impl Trajectory {
    /// Sampled day grid `0, 1, ..., horizon-1`.
    pub fn days(&self) -> &[f64] {
        &self.days
    }

    /// Compartment states aligned to [`days`](Self::days).
    pub fn states(&self) -> &[CompartmentState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// The infected counts aligned to the day grid.
    pub fn infected(&self) -> Vec<f64> {
        self.states.iter().map(|st| st.i).collect()
    }

    /// Dense query at an arbitrary time within the solved span.
    pub fn at(&self, t: f64) -> Result<CompartmentState, AppError> {
        let y = self.dense.eval(t)?;
        Ok(CompartmentState::new(y[0], y[1], y[2]))
    }

    /// `(day index, value)` of the maximum sampled infected count.
    pub fn peak_infected(&self) -> (usize, f64) {
        let mut best = (0usize, f64::NEG_INFINITY);
        for (d, st) in self.states.iter().enumerate() {
            if st.i > best.1 {
                best = (d, st.i);
            }
        }
        best
    }
}

/// Integrate the SIR system with default solver options.
///
/// Samples the dense solution at integer days `0..horizon_days-1` and retains
/// the interpolant on the returned [`Trajectory`]. Fails fast with a
/// validation error on out-of-domain parameters; numerical non-convergence
/// surfaces as a distinct solver error and never yields a partial trajectory.
pub fn integrate(
    params: RateParams,
    initial: CompartmentState,
    horizon_days: usize,
) -> Result<Trajectory, AppError> {
    integrate_with_options(params, initial, horizon_days, &OdeOptions::default())
}

/// [`integrate`] with caller-tuned solver options (tolerances, step budget).
pub fn integrate_with_options(
    params: RateParams,
    initial: CompartmentState,
    horizon_days: usize,
    opts: &OdeOptions,
) -> Result<Trajectory, AppError> {
    params.validate()?;
    initial.validate_initial()?;
    if horizon_days == 0 {
        return Err(AppError::new(2, "horizon_days must be > 0."));
    }

    // Population constant, fixed for the whole solve.
    let n_total = initial.total();
    let model = SirModel::new(params, n_total);

    let y0 = [initial.s, initial.i, initial.r];
    let t_end = horizon_days as f64;
    let dense = solve(&model, &y0, 0.0, t_end, opts)?;

    let mut days = Vec::with_capacity(horizon_days);
    let mut states = Vec::with_capacity(horizon_days);
    for d in 0..horizon_days {
        let t = d as f64;
        let y = dense.eval(t)?;
        days.push(t);
        states.push(CompartmentState::new(y[0], y[1], y[2]));
    }

    Ok(Trajectory { days, states, dense })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idaho_scenario() -> Trajectory {
        integrate(
            RateParams::new(1.3, 1.0),
            CompartmentState::new(1_787_063.0, 2.0, 0.0),
            365,
        )
        .unwrap()
    }

    #[test]
    fn population_is_conserved_at_every_sample() {
        let traj = idaho_scenario();
        let n = 1_787_065.0;
        for st in traj.states() {
            assert!(
                (st.total() - n).abs() / n < 1e-6,
                "conservation violated: {} vs {n}",
                st.total()
            );
        }
    }

    #[test]
    fn compartments_stay_non_negative() {
        let traj = idaho_scenario();
        let eps = 1e-6 * 1_787_065.0;
        for st in traj.states() {
            assert!(st.s >= -eps && st.i >= -eps && st.r >= -eps);
        }
    }

    #[test]
    fn fast_outbreak_peaks_early_and_burns_out() {
        let traj = idaho_scenario();
        assert_eq!(traj.len(), 365);
        assert!((traj.states()[0].i - 2.0).abs() < 1e-6);

        let (peak_day, peak_i) = traj.peak_infected();
        assert!(peak_day > 1 && peak_day < 60, "peak at day {peak_day}");
        assert!(peak_i > 2.0);

        let last = traj.states().last().unwrap();
        assert!(last.i < 1.0, "infections should be near zero by day 365, got {}", last.i);
    }

    #[test]
    fn subcritical_regime_never_takes_off() {
        let traj = integrate(
            RateParams::new(1.06, 1.025),
            CompartmentState::new(100.0, 1.0, 0.0),
            100,
        )
        .unwrap();

        let (_, peak_i) = traj.peak_infected();
        assert!(peak_i < 3.0, "peak {peak_i} should stay a small multiple of I0");
        let last = traj.states().last().unwrap();
        assert!(last.i < 0.5, "infections should trend to zero, got {}", last.i);
    }

    #[test]
    fn zero_infected_is_a_fixed_point() {
        let traj = integrate(
            RateParams::new(1.3, 1.0),
            CompartmentState::new(1000.0, 0.0, 5.0),
            50,
        )
        .unwrap();
        for st in traj.states() {
            assert!((st.s - 1000.0).abs() < 1e-6);
            assert!(st.i.abs() < 1e-6);
            assert!((st.r - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn recovered_is_monotone_non_decreasing() {
        let traj = idaho_scenario();
        let mut prev = f64::NEG_INFINITY;
        for st in traj.states() {
            assert!(st.r >= prev - 1e-6, "R decreased: {} -> {}", prev, st.r);
            prev = st.r;
        }
    }

    #[test]
    fn identical_inputs_produce_identical_trajectories() {
        let a = idaho_scenario();
        let b = idaho_scenario();
        for (x, y) in a.states().iter().zip(b.states()) {
            assert_eq!(x.s, y.s);
            assert_eq!(x.i, y.i);
            assert_eq!(x.r, y.r);
        }
    }

    #[test]
    fn interpolant_agrees_with_grid_samples() {
        let traj = idaho_scenario();
        for d in [0usize, 1, 17, 100, 364] {
            let dense = traj.at(d as f64).unwrap();
            let grid = traj.states()[d];
            assert!((dense.i - grid.i).abs() <= 1e-9 * (1.0 + grid.i.abs()));
            assert!((dense.s - grid.s).abs() <= 1e-9 * (1.0 + grid.s.abs()));
        }
        // Off-grid queries stay within the solved span and physical range.
        let mid = traj.at(33.5).unwrap();
        assert!(mid.i > 0.0 && mid.total() < 1_787_065.0 * (1.0 + 1e-6));
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        let init = CompartmentState::new(100.0, 1.0, 0.0);
        assert!(integrate(RateParams::new(0.0, 1.0), init, 10).is_err());
        assert!(integrate(RateParams::new(1.0, -1.0), init, 10).is_err());
        assert!(integrate(RateParams::new(1.0, 1.0), CompartmentState::new(-1.0, 1.0, 0.0), 10).is_err());
        assert!(integrate(RateParams::new(1.0, 1.0), CompartmentState::new(0.0, 0.0, 0.0), 10).is_err());
        assert!(integrate(RateParams::new(1.0, 1.0), init, 0).is_err());
    }

    #[test]
    fn analytic_jacobian_matches_finite_differences() {
        struct FdView(SirModel);
        impl OdeSystem for FdView {
            fn ndim(&self) -> usize {
                3
            }
            fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
                self.0.rhs(t, y, dydt);
            }
            // Inherit the default finite-difference jacobian.
        }

        let model = SirModel::new(RateParams::new(1.3, 1.0), 1000.0);
        let y = [700.0, 200.0, 100.0];

        let mut analytic = DMatrix::<f64>::zeros(3, 3);
        model.jacobian(0.0, &y, &mut analytic);

        let mut fd = DMatrix::<f64>::zeros(3, 3);
        FdView(model).jacobian(0.0, &y, &mut fd);

        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (analytic[(i, j)] - fd[(i, j)]).abs() < 1e-4 * (1.0 + analytic[(i, j)].abs()),
                    "J[{i},{j}]: analytic {} vs fd {}",
                    analytic[(i, j)],
                    fd[(i, j)]
                );
            }
        }
    }
}
