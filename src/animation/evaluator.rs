//! Time-sampled keyframe evaluation.
//!
//! `evaluate` is pure: the frame clock lives with a collaborator, and a
//! `None` result means the property must be left unset for this tick,
//! never snapped to the last frame.

use crate::foundation::core::{Color, Size};
use crate::foundation::math::{lerp_f64, lerp_vec2};
use crate::model::layer::{Animation, CalculationMode, KeyValue};

/// Sample one animation at `now_seconds` on the document clock.
pub fn evaluate(anim: &Animation, now_seconds: f64) -> Option<KeyValue> {
    let first = anim.values.first()?;
    // Fewer than two values is a static property, not an error.
    if anim.values.len() < 2 || anim.duration_seconds <= 0.0 {
        return Some(first.clone());
    }

    // Hold the first frame through the delay.
    if now_seconds < anim.begin_seconds {
        return Some(first.clone());
    }

    // Speed scales time after the delay is subtracted.
    let mut elapsed = (now_seconds - anim.begin_seconds) * anim.speed;

    let cycle = anim.cycle_seconds();
    if anim.infinite {
        elapsed = elapsed.rem_euclid(cycle);
    } else if let Some(bound) = anim.repeat_duration_seconds {
        if elapsed >= bound {
            return None;
        }
        elapsed = elapsed.rem_euclid(cycle);
    } else if elapsed >= cycle {
        return None;
    }

    // Autoreverse samples the same forward key-time table mirrored;
    // no reversed table is ever built.
    let (local, reversing) = if anim.autoreverses && elapsed >= anim.duration_seconds {
        ((elapsed - anim.duration_seconds) / anim.duration_seconds, true)
    } else {
        (elapsed / anim.duration_seconds, false)
    };

    let eased = anim.timing_function.apply(local);
    let position = if reversing { 1.0 - eased } else { eased };

    Some(sample_at(anim, position))
}

fn sample_at(anim: &Animation, position: f64) -> KeyValue {
    let n = anim.values.len();
    let position = position.clamp(0.0, 1.0);
    let table = key_time_table(anim, n);

    match anim.calculation_mode {
        CalculationMode::Discrete => {
            // Snap to the highest key time at or below the position.
            let mut idx = 0;
            for (i, &kt) in table.iter().enumerate() {
                if kt <= position {
                    idx = i;
                } else {
                    break;
                }
            }
            anim.values[idx.min(n - 1)].clone()
        }
        CalculationMode::Linear => {
            if position <= table[0] {
                return anim.values[0].clone();
            }
            let last = n - 1;
            if position >= table[last] {
                return anim.values[last].clone();
            }
            let seg = table
                .windows(2)
                .position(|w| position >= w[0] && position < w[1])
                .unwrap_or(last - 1);
            let span = table[seg + 1] - table[seg];
            let t = if span <= 0.0 {
                0.0
            } else {
                (position - table[seg]) / span
            };
            lerp_values(&anim.values[seg], &anim.values[seg + 1], t)
        }
    }
}

/// Linear mode spaces keys `i/(N-1)`; discrete mode `i/N`. The
/// asymmetry is intentional. Author-supplied key times win when the
/// length matches the value count.
fn key_time_table(anim: &Animation, n: usize) -> Vec<f64> {
    if let Some(custom) = &anim.key_times
        && custom.len() == n
    {
        return custom.clone();
    }
    match anim.calculation_mode {
        CalculationMode::Linear => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
        CalculationMode::Discrete => (0..n).map(|i| i as f64 / n as f64).collect(),
    }
}

fn lerp_values(a: &KeyValue, b: &KeyValue, t: f64) -> KeyValue {
    match (a, b) {
        (KeyValue::Scalar(x), KeyValue::Scalar(y)) => KeyValue::Scalar(lerp_f64(*x, *y, t)),
        (KeyValue::Point(x), KeyValue::Point(y)) => KeyValue::Point(lerp_vec2(*x, *y, t)),
        (KeyValue::Size(x), KeyValue::Size(y)) => {
            KeyValue::Size(Size::new(lerp_f64(x.w, y.w, t), lerp_f64(x.h, y.h, t)))
        }
        (KeyValue::Color(x), KeyValue::Color(y)) => KeyValue::Color(Color::lerp(*x, *y, t)),
        // Pairwise, truncated to the shorter list when lengths differ.
        (KeyValue::Colors(xs), KeyValue::Colors(ys)) => KeyValue::Colors(
            xs.iter()
                .zip(ys.iter())
                .map(|(x, y)| Color::lerp(*x, *y, t))
                .collect(),
        ),
        _ => a.clone(),
    }
}
