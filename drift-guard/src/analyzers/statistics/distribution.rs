//! Special functions and small numeric helpers shared by the tests.

use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const MAX_ITERATIONS: usize = 500;
const EPSILON: f64 = 1e-14;
const TINY: f64 = 1e-300;

/// Natural log of the gamma function (Lanczos approximation).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula.
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let series = LANCZOS_COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Upper regularized incomplete gamma function `Q(a, x)`.
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        (1.0 - lower_gamma_series(a, x)).clamp(0.0, 1.0)
    } else {
        upper_gamma_continued_fraction(a, x).clamp(0.0, 1.0)
    }
}

/// `P(a, x)` by series expansion; converges quickly for `x < a + 1`.
fn lower_gamma_series(a: f64, x: f64) -> f64 {
    let mut denominator = a;
    let mut term = 1.0 / a;
    let mut sum = term;
    for _ in 0..MAX_ITERATIONS {
        denominator += 1.0;
        term *= x / denominator;
        sum += term;
        if term.abs() < sum.abs() * EPSILON {
            break;
        }
    }
    (sum.ln() - x + a * x.ln() - ln_gamma(a)).exp()
}

/// `Q(a, x)` by modified Lentz continued fraction; for `x >= a + 1`.
fn upper_gamma_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_ITERATIONS {
        let i = i as f64;
        let an = -i * (i - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Survival function of the chi-square distribution with `df` degrees of freedom.
pub fn chi_square_survival(statistic: f64, df: usize) -> f64 {
    if df == 0 || statistic <= 0.0 {
        return 1.0;
    }
    regularized_gamma_q(df as f64 / 2.0, statistic / 2.0)
}

/// Asymptotic Kolmogorov survival function `Q_KS(lambda)`.
pub fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        // Dual series converges fast for small lambda.
        let y = (-PI * PI / (8.0 * lambda * lambda)).exp();
        let cdf = (2.0 * PI).sqrt() / lambda * (y + y.powi(9) + y.powi(25) + y.powi(49));
        (1.0 - cdf).clamp(0.0, 1.0)
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        (2.0 * (x - x.powi(4) + x.powi(9))).clamp(0.0, 1.0)
    }
}

/// Linear-interpolation quantile of an ascending slice (`0 <= q <= 1`).
///
/// Matches the common "type 7" definition; returns `NaN` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let weight = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Finite values of `values`, sorted ascending.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Number of distinct values in an ascending slice.
pub fn distinct_sorted(sorted: &[f64]) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| w[0] != w[1]).count()
}

/// Counts to proportions, with zero cells replaced by `epsilon` and the
/// vector renormalized to sum to 1.
pub fn smoothed_proportions(counts: &[u64], epsilon: f64) -> Vec<f64> {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        let uniform = 1.0 / counts.len().max(1) as f64;
        return vec![uniform; counts.len()];
    }
    let mut proportions: Vec<f64> = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                epsilon
            } else {
                c as f64 / total as f64
            }
        })
        .collect();
    let sum: f64 = proportions.iter().sum();
    for p in &mut proportions {
        *p /= sum;
    }
    proportions
}

/// Mean and sample standard deviation (`n - 1` denominator).
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n == 1 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    (mean, variance.sqrt())
}
