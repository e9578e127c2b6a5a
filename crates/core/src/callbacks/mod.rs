use std::{collections::HashMap, fmt};

use crate::{Quantizer, TimeKey};

pub type Callback = Box<dyn FnMut()>;

/// Host callbacks keyed by quantized time.
///
/// A registry belongs to exactly one scheduler; there is no shared table.
pub struct CallbackRegistry {
    quantizer: Quantizer,
    callbacks: HashMap<TimeKey, Vec<Callback>>,
    last_observed: TimeKey,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new(Quantizer::default())
    }
}

impl CallbackRegistry {
    pub fn new(quantizer: Quantizer) -> Self {
        Self {
            quantizer,
            callbacks: HashMap::new(),
            last_observed: TimeKey::default(),
        }
    }

    /// Appends `callback` to the list fired when the clock reaches `seconds`.
    pub fn register<F>(&mut self, seconds: f64, callback: F)
    where
        F: FnMut() + 'static,
    {
        let key = self.quantizer.key(seconds);
        self.callbacks
            .entry(key)
            .or_default()
            .push(Box::new(callback));
    }

    /// Fires the callbacks for `seconds` if its bucket differs from the last
    /// one observed, in either direction. Returns how many callbacks ran.
    pub fn execute(&mut self, seconds: f64) -> usize {
        let key = self.quantizer.key(seconds);
        if key == self.last_observed {
            return 0;
        }
        self.last_observed = key;

        let Some(callbacks) = self.callbacks.get_mut(&key) else {
            return 0;
        };
        for callback in callbacks.iter_mut() {
            callback();
        }
        tracing::debug!(seconds = self.quantizer.seconds(key), fired = callbacks.len(), "fired callbacks");
        callbacks.len()
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Moves every registration onto the grid of `quantizer`. Callbacks that
    /// land in the same bucket keep their registration order.
    pub fn requantize(self, quantizer: Quantizer) -> Self {
        if quantizer == self.quantizer {
            return self;
        }
        let mut keys: Vec<TimeKey> = self.callbacks.keys().copied().collect();
        keys.sort_unstable();

        let mut callbacks = self.callbacks;
        let mut rekeyed: HashMap<TimeKey, Vec<Callback>> = HashMap::new();
        for key in keys {
            if let Some(list) = callbacks.remove(&key) {
                let seconds = self.quantizer.seconds(key);
                rekeyed.entry(quantizer.key(seconds)).or_default().extend(list);
            }
        }
        Self {
            quantizer,
            callbacks: rekeyed,
            last_observed: quantizer.key(self.quantizer.seconds(self.last_observed)),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("quantizer", &self.quantizer)
            .field("callbacks", &self.len())
            .field("last_observed", &self.last_observed)
            .finish()
    }
}
