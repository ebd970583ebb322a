use hearex_core::CrmToken;
use serde::{Deserialize, Serialize};

/// Logistic probability of a correct CRM response as a function of SNR
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsychometricFunction {
    /// SNR at the midpoint of the logistic (dB)
    pub srt_db: f64,
    /// Spread of the logistic (dB); larger is shallower
    pub slope_db: f64,
    pub guess_rate: f64,
    pub lapse_rate: f64,
}

impl PsychometricFunction {
    /// Chance performance for a colour/number response grid
    pub const CRM_GUESS_RATE: f64 = 1.0 / CrmToken::RESPONSE_SET_SIZE as f64;

    pub fn crm(srt_db: f64, slope_db: f64, lapse_rate: f64) -> Self {
        Self {
            srt_db,
            slope_db,
            guess_rate: Self::CRM_GUESS_RATE,
            lapse_rate,
        }
    }

    pub fn p_correct(&self, snr_db: f64) -> f64 {
        let span = (1.0 - self.guess_rate - self.lapse_rate).max(0.0);
        let slope = self.slope_db.max(f64::EPSILON);
        let logistic = 1.0 / (1.0 + (-(snr_db - self.srt_db) / slope).exp());
        (self.guess_rate + span * logistic).clamp(0.0, 1.0)
    }
}
