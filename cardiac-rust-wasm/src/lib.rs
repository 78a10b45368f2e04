use cardiac_core::{
    Cable, CardiacError, DiffusionConfig, ModelParameters, State, Stimulus, ThreeCurrentModel,
    Tissue,
};
use wasm_bindgen::prelude::*;

fn js_err(e: CardiacError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn resting_state() -> State {
    State::new(0.0, 0.9, 0.9)
}

#[wasm_bindgen]
pub struct TissueSim {
    inner: Tissue,
    params: ModelParameters,
    stimulus: Stimulus,
}

#[wasm_bindgen]
impl TissueSim {
    #[wasm_bindgen(constructor)]
    pub fn new(
        nx: usize,
        ny: usize,
        excited_x: usize,
        excited_y: usize,
        period: f64,
    ) -> Result<TissueSim, JsValue> {
        let inner = Tissue::new(
            nx,
            ny,
            excited_x,
            excited_y,
            resting_state(),
            DiffusionConfig::default(),
        )
        .map_err(js_err)?;
        let stimulus = Stimulus::new(1.0, period).map_err(js_err)?;
        Ok(TissueSim {
            inner,
            params: ModelParameters::default(),
            stimulus,
        })
    }

    // Parameters
    pub fn set_param(&mut self, index: usize, value: f64) -> Result<(), JsValue> {
        self.params = with_param(&self.params, index, value)?;
        Ok(())
    }

    pub fn set_pacing(&mut self, duration: f64, period: f64) -> Result<(), JsValue> {
        self.stimulus =
            Stimulus::starting_at(duration, period, self.inner.time()).map_err(js_err)?;
        Ok(())
    }

    pub fn nx(&self) -> usize { self.inner.nx() }
    pub fn ny(&self) -> usize { self.inner.ny() }
    pub fn time(&self) -> f64 { self.inner.time() }

    pub fn clear(&mut self) {
        self.inner.clear(resting_state());
        self.stimulus.reset_at(self.inner.time());
    }

    /// Depolarize a disc of cells (an S2 stimulus by hand).
    pub fn excite(&mut self, cx: usize, cy: usize, radius: usize) {
        let r2 = (radius * radius) as isize;
        for y in cy.saturating_sub(radius)..=(cy + radius).min(self.inner.ny() - 1) {
            for x in cx.saturating_sub(radius)..=(cx + radius).min(self.inner.nx() - 1) {
                let (dx, dy) = (x as isize - cx as isize, y as isize - cy as isize);
                if dx * dx + dy * dy <= r2 {
                    let s = self.inner.state(x, y);
                    self.inner.set_cell(x, y, State::new(1.0, s.fast_gate, s.slow_gate));
                }
            }
        }
        self.inner.finalize_ic();
    }

    // Copy-based JS access
    pub fn get_voltage(&self) -> Vec<f32> {
        self.inner.voltage().as_slice().iter().map(|&v| v as f32).collect()
    }

    pub fn step(&mut self, frames: usize) -> Result<StepInfo, JsValue> {
        let t0 = now_ms();
        self.inner
            .step(&ThreeCurrentModel, &self.params, &mut self.stimulus, frames)
            .map_err(js_err)?;
        let t1 = now_ms();
        Ok(StepInfo { frames, compute_ms: t1 - t0, time: self.inner.time() })
    }
}

#[wasm_bindgen]
pub struct CableSim {
    inner: Cable,
    params: ModelParameters,
    stimulus: Stimulus,
}

#[wasm_bindgen]
impl CableSim {
    #[wasm_bindgen(constructor)]
    pub fn new(cells: usize, excited_cells: usize, period: f64) -> Result<CableSim, JsValue> {
        let inner = Cable::new(cells, excited_cells, resting_state(), DiffusionConfig::default())
            .map_err(js_err)?;
        let stimulus = Stimulus::new(1.0, period).map_err(js_err)?;
        Ok(CableSim {
            inner,
            params: ModelParameters::default(),
            stimulus,
        })
    }

    pub fn set_param(&mut self, index: usize, value: f64) -> Result<(), JsValue> {
        self.params = with_param(&self.params, index, value)?;
        Ok(())
    }

    pub fn set_pacing(&mut self, duration: f64, period: f64) -> Result<(), JsValue> {
        self.stimulus =
            Stimulus::starting_at(duration, period, self.inner.time()).map_err(js_err)?;
        Ok(())
    }

    pub fn cells(&self) -> usize { self.inner.len() }
    pub fn time(&self) -> f64 { self.inner.time() }

    pub fn clear(&mut self) {
        self.inner.clear(resting_state());
        self.stimulus.reset_at(self.inner.time());
    }

    pub fn get_voltage(&self) -> Vec<f32> {
        self.inner.voltage().iter().map(|&v| v as f32).collect()
    }

    pub fn step(&mut self, frames: usize) -> Result<StepInfo, JsValue> {
        let t0 = now_ms();
        self.inner
            .step(&ThreeCurrentModel, &self.params, &mut self.stimulus, frames)
            .map_err(js_err)?;
        let t1 = now_ms();
        Ok(StepInfo { frames, compute_ms: t1 - t0, time: self.inner.time() })
    }
}

fn with_param(params: &ModelParameters, index: usize, value: f64) -> Result<ModelParameters, JsValue> {
    let mut arr = params.to_array();
    let slot = arr
        .get_mut(index)
        .ok_or_else(|| JsValue::from_str(&format!("parameter index {index} out of range")))?;
    *slot = value;
    let next = ModelParameters::from_array(arr);
    next.validate().map_err(js_err)?;
    Ok(next)
}

#[wasm_bindgen]
pub struct StepInfo {
    frames: usize,
    compute_ms: f64,
    time: f64,
}

#[wasm_bindgen]
impl StepInfo {
    pub fn frames(&self) -> usize { self.frames }
    pub fn compute_ms(&self) -> f64 { self.compute_ms }
    pub fn time(&self) -> f64 { self.time }
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}
