//! Threshold-crossing extraction and APD/DI pairing.
//!
//! The scan alternates between waiting for an upstroke and waiting for a
//! repolarization. A crossing fires on the *current* sample alone
//! (`V[i] > threshold` while waiting up, `V[i] < threshold` while waiting
//! down); the previous sample is only used to interpolate the crossing time.
//! A trace that starts above threshold therefore reports an upstroke at its
//! first sample.

use serde::{Deserialize, Serialize};

use crate::error::{Result, config_err};

/// Crossing times in scan order: even indices are upstrokes, odd indices
/// are repolarizations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CrossingSequence {
    times: Vec<f64>,
}

/// One restitution point: APD against the preceding DI (single cell) or
/// against the pacing period (tissue).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestitutionSample {
    pub abscissa: f64,
    pub apd: f64,
}

impl CrossingSequence {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn upstrokes(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().step_by(2).copied()
    }

    pub fn repolarizations(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().skip(1).step_by(2).copied()
    }

    /// Number of complete action potentials (upstroke and repolarization).
    pub fn complete_pulses(&self) -> usize {
        self.times.len() / 2
    }

    /// `APD_k = down_k - up_k`
    pub fn apd(&self, k: usize) -> Option<f64> {
        let up = *self.times.get(2 * k)?;
        let down = *self.times.get(2 * k + 1)?;
        Some(down - up)
    }

    /// `DI_k = up_k - down_{k-1}`, the rest interval before pulse `k`.
    pub fn di(&self, k: usize) -> Option<f64> {
        if k == 0 {
            return None;
        }
        let prev_down = *self.times.get(2 * k - 1)?;
        let up = *self.times.get(2 * k)?;
        Some(up - prev_down)
    }

    /// `(DI_k, APD_k)` for every complete pulse `k >= max(skip, 1)`.
    pub fn di_apd_pairs(&self, skip: usize) -> Vec<RestitutionSample> {
        (skip.max(1)..self.complete_pulses())
            .filter_map(|k| {
                Some(RestitutionSample {
                    abscissa: self.di(k)?,
                    apd: self.apd(k)?,
                })
            })
            .collect()
    }

    /// `(period, APD_k)` for every complete pulse `k >= skip`.
    pub fn period_apd_pairs(&self, skip: usize, period: f64) -> Vec<RestitutionSample> {
        (skip..self.complete_pulses())
            .filter_map(|k| {
                Some(RestitutionSample {
                    abscissa: period,
                    apd: self.apd(k)?,
                })
            })
            .collect()
    }
}

/// Scan `voltage` (sampled at `time`) for up to `2 * num_pulses` crossings
/// of `threshold`.
pub fn extract_restitution(
    time: &[f64],
    voltage: &[f64],
    num_pulses: usize,
    threshold: f64,
) -> Result<CrossingSequence> {
    if time.is_empty() {
        return config_err("time vector is empty");
    }
    if time.len() != voltage.len() {
        return config_err(format!(
            "time ({}) and voltage ({}) lengths differ",
            time.len(),
            voltage.len()
        ));
    }
    if num_pulses == 0 {
        return config_err("requested pulse count must be > 0");
    }
    if !threshold.is_finite() {
        return config_err("threshold must be finite");
    }

    let max_crossings = 2 * num_pulses;
    let mut times = Vec::with_capacity(max_crossings);
    let mut waiting_up = true;

    for (i, &v) in voltage.iter().enumerate() {
        let crossed = if waiting_up {
            v > threshold
        } else {
            v < threshold
        };
        if !crossed {
            continue;
        }

        let t = if i == 0 {
            time[0]
        } else {
            let dt = time[i] - time[i - 1];
            // the pair always brackets the threshold here, so v != prev
            let prev = voltage[i - 1];
            time[i] - dt * (v - threshold) / (v - prev)
        };
        times.push(t);
        waiting_up = !waiting_up;

        if times.len() >= max_crossings {
            break;
        }
    }

    Ok(CrossingSequence { times })
}
