#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use digitpad_lib::{
    config::{CANVAS_SIZE, FEATURE_LEN, NUM_CLASSES},
    Classifier, DigitError, FeatureVector, RawSurface, RemoteStore, Result, SoftmaxModel,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Classifier that always answers `label` and counts how often it was asked.
pub struct CountingClassifier {
    pub label: usize,
    pub predict_calls: AtomicUsize,
    pub proba_calls: AtomicUsize,
}

impl CountingClassifier {
    pub fn new(label: usize) -> Arc<Self> {
        Arc::new(Self {
            label,
            predict_calls: AtomicUsize::new(0),
            proba_calls: AtomicUsize::new(0),
        })
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn proba_calls(&self) -> usize {
        self.proba_calls.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn predict(&self, _: &FeatureVector) -> Result<usize> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.label)
    }

    fn predict_proba(&self, _: &FeatureVector) -> Result<Vec<f32>> {
        self.proba_calls.fetch_add(1, Ordering::SeqCst);
        let mut row = vec![0.02; NUM_CLASSES];
        row[self.label] = 0.82;
        Ok(row)
    }
}

/// Remote store that serves fixed bytes, or fails, and counts fetches.
pub struct FakeStore {
    pub payload: Option<Vec<u8>>,
    pub fetches: AtomicUsize,
    pub requested: Mutex<Vec<String>>,
    pub delay: std::time::Duration,
}

impl FakeStore {
    pub fn serving(payload: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload),
            fetches: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            delay: std::time::Duration::ZERO,
        })
    }

    pub fn slow(payload: Vec<u8>, delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            payload: Some(payload),
            fetches: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            payload: None,
            fetches: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            delay: std::time::Duration::ZERO,
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RemoteStore for FakeStore {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(file_id.to_string());
        std::thread::sleep(self.delay);
        self.payload
            .clone()
            .ok_or_else(|| DigitError::Download("simulated network error".into()))
    }
}

/// Serialized model whose answer is always `favourite` once anything is drawn.
pub fn model_json(favourite: usize) -> String {
    let weights = (0..NUM_CLASSES)
        .map(|class| vec![if class == favourite { 0.05 } else { 0.0 }; FEATURE_LEN])
        .collect();
    SoftmaxModel::new(weights, vec![0.0; NUM_CLASSES], 1.0 / 255.0)
        .unwrap()
        .to_json()
        .unwrap()
}

pub fn centered_square(side: u32) -> RawSurface {
    let mut surface = RawSurface::blank();
    let offset = (CANVAS_SIZE - side) / 2;
    surface.fill_rect(offset, offset, side, side, 0);
    surface
}

pub fn three_dots() -> RawSurface {
    let mut surface = RawSurface::blank();
    for (x, y) in [(30, 50), (150, 150), (250, 220)] {
        surface.fill_rect(x, y, 2, 2, 0);
    }
    surface
}
