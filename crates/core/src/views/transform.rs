//! Time/pixel transform shared by every panel.
//!
//! `canvasXPerModelX` has exactly one writer ([`SharedScale`], owned by the
//! viewer) and any number of readers ([`ScaleReader`], one per panel). Reads
//! happen inside the per-frame update, after all writes of the frame.

use std::cell::Cell;
use std::rc::Rc;

use log::warn;

#[derive(Debug)]
struct ScaleCell {
    value: Cell<f64>,
    version: Cell<u64>,
}

/// Owning, writable handle to the shared scale factor.
#[derive(Debug)]
pub struct SharedScale {
    inner: Rc<ScaleCell>,
}

/// Read-only handle to the shared scale factor.
#[derive(Debug, Clone)]
pub struct ScaleReader {
    inner: Rc<ScaleCell>,
}

impl SharedScale {
    pub fn new(initial: f64) -> Self {
        let value = if initial.is_finite() && initial > 0.0 {
            initial
        } else {
            1.0
        };
        Self {
            inner: Rc::new(ScaleCell {
                value: Cell::new(value),
                version: Cell::new(0),
            }),
        }
    }

    pub fn get(&self) -> f64 {
        self.inner.value.get()
    }

    /// Set the scale. Non-finite or non-positive values are rejected and
    /// leave the current value untouched.
    pub fn set(&self, value: f64) -> bool {
        if !(value.is_finite() && value > 0.0) {
            warn!("rejected canvas scale {value}");
            return false;
        }
        self.inner.value.set(value);
        self.inner.version.set(self.inner.version.get() + 1);
        true
    }

    /// Number of accepted writes so far; 0 means the initial value is still
    /// in place.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn reader(&self) -> ScaleReader {
        ScaleReader {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl ScaleReader {
    pub fn get(&self) -> f64 {
        self.inner.value.get()
    }

    /// `pixelX(modelTime) = modelTime * canvasXPerModelX - scrollX`.
    pub fn model_to_canvas_x(&self, model_x: f64, scroll_x: f64) -> f64 {
        model_x * self.get() - scroll_x
    }

    pub fn canvas_to_model_x(&self, canvas_x: f64, scroll_x: f64) -> f64 {
        (canvas_x + scroll_x) / self.get()
    }

    /// Length in pixels of a model-time duration.
    pub fn model_to_canvas_len(&self, model_len: f64) -> f64 {
        model_len * self.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_observe_writes() {
        let scale = SharedScale::new(1.0);
        let a = scale.reader();
        let b = scale.reader();
        assert!(scale.set(0.25));
        assert_eq!(a.get(), 0.25);
        assert_eq!(b.get(), 0.25);
        assert_eq!(scale.version(), 1);
    }

    #[test]
    fn rejects_invalid_values() {
        let scale = SharedScale::new(2.0);
        assert!(!scale.set(0.0));
        assert!(!scale.set(-1.0));
        assert!(!scale.set(f64::NAN));
        assert!(!scale.set(f64::INFINITY));
        assert_eq!(scale.get(), 2.0);
        assert_eq!(scale.version(), 0);
    }

    #[test]
    fn invalid_initial_value_falls_back_to_one() {
        assert_eq!(SharedScale::new(0.0).get(), 1.0);
    }

    #[test]
    fn transform_round_trips() {
        let scale = SharedScale::new(0.5);
        let r = scale.reader();
        let px = r.model_to_canvas_x(300.0, 40.0);
        assert!((px - 110.0).abs() < 1e-9);
        assert!((r.canvas_to_model_x(px, 40.0) - 300.0).abs() < 1e-9);
        assert!((r.model_to_canvas_len(10.0) - 5.0).abs() < 1e-9);
    }
}
