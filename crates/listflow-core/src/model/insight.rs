use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hecho aprendido por un step y registrado en la base de conocimiento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub key: String,
    pub value: Value,
    pub source_id: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl Insight {
    /// Construye un insight con timestamp actual y confianza acotada a
    /// `[0, 1]`. `NaN` se trata como `0`.
    pub fn new(key: impl Into<String>, value: Value, source_id: impl Into<String>, confidence: f64) -> Self {
        Self { key:        key.into(),
               value,
               source_id:  source_id.into(),
               confidence: clamp_confidence(confidence),
               timestamp:  Utc::now() }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.timestamp
    }
}

/// Acota la confianza a `[0, 1]`, registrando un warning si hubo que
/// corregirla.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        log::warn!("insight confidence is NaN; using 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&confidence) {
        let clamped = confidence.clamp(0.0, 1.0);
        log::warn!("insight confidence {confidence} out of range; clamped to {clamped}");
        return clamped;
    }
    confidence
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clamps_out_of_range_and_nan() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.42), 0.42);
        assert_eq!(Insight::new("k", json!(1), "s", 3.0).confidence, 1.0);
    }
}
