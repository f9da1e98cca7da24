//! Numerical Differentiation and Integration

use glam::DVec3;

/// Second-order gradient of `values` against a possibly non-uniform time axis.
///
/// Interior samples use the non-uniform central difference, the two ends use
/// one-sided first differences. Returns `None` for fewer than two samples or
/// when any time step is not strictly positive.
pub fn gradient<T>(values: &[T], t: &[f64]) -> Option<Vec<T>>
where
    T: Copy + std::ops::Sub<Output = T> + std::ops::Add<Output = T> + std::ops::Mul<f64, Output = T>,
{
    let n = values.len();
    if n < 2 || t.len() != n || !strictly_increasing(t) {
        return None;
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) * (1.0 / (t[1] - t[0])));
    for i in 1..n - 1 {
        let hs = t[i] - t[i - 1];
        let hd = t[i + 1] - t[i];
        let denom = hs * hd * (hs + hd);
        let d = values[i + 1] * (hs * hs / denom) + values[i] * ((hd * hd - hs * hs) / denom)
            - values[i - 1] * (hd * hd / denom);
        out.push(d);
    }
    out.push((values[n - 1] - values[n - 2]) * (1.0 / (t[n - 1] - t[n - 2])));
    Some(out)
}

/// Whether every consecutive step is positive
pub fn strictly_increasing(t: &[f64]) -> bool {
    t.windows(2).all(|w| w[1] > w[0])
}

/// Collapse samples that share a timestamp into their mean position.
///
/// Non-decreasing input comes back strictly increasing, so it can go
/// straight into [`gradient`].
pub fn merge_repeated(points: &[DVec3], t: &[f64]) -> (Vec<DVec3>, Vec<f64>) {
    let mut merged: Vec<DVec3> = Vec::with_capacity(points.len());
    let mut times: Vec<f64> = Vec::with_capacity(points.len());
    let mut run = 0usize;

    for (&p, &ts) in points.iter().zip(t) {
        match times.last() {
            Some(&last) if last == ts => {
                run += 1;
                if let Some(mean) = merged.last_mut() {
                    *mean += (p - *mean) / run as f64;
                }
            }
            _ => {
                merged.push(p);
                times.push(ts);
                run = 1;
            }
        }
    }
    (merged, times)
}

/// Sum of consecutive Euclidean displacements
pub fn path_length(points: &[DVec3]) -> f64 {
    points.windows(2).map(|w| (w[1] - w[0]).length()).sum()
}

/// Peak-to-peak span of a sample set
pub fn span(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    max - min
}

/// Composite Simpson's rule over samples `y` at abscissae `x`.
///
/// Handles non-uniform spacing. With an odd number of intervals the last one
/// gets the three-point end correction, so the rule stays exact for
/// quadratics. Two samples fall back to the trapezoid rule.
pub fn simpson(y: &[f64], x: &[f64]) -> f64 {
    let n = y.len().min(x.len());
    match n {
        0 | 1 => return 0.0,
        2 => return 0.5 * (x[1] - x[0]) * (y[0] + y[1]),
        _ => {}
    }

    let intervals = n - 1;
    let paired_end = if intervals % 2 == 0 { n - 1 } else { n - 2 };

    let mut total = 0.0;
    let mut i = 0;
    while i + 2 <= paired_end {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        total += hsum / 6.0
            * ((2.0 - h1 / h0) * y[i]
                + hsum * hsum / (h0 * h1) * y[i + 1]
                + (2.0 - h0 / h1) * y[i + 2]);
        i += 2;
    }

    if intervals % 2 == 1 {
        let h0 = x[n - 2] - x[n - 3];
        let h1 = x[n - 1] - x[n - 2];
        let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
        let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
        let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));
        total += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
    }

    total
}
