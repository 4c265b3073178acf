//! The Frame Synthesizer (§4.3): derives a [`FrameSet`] from the optical parameters of a
//! sine phase plate, plus the per-ring kinematic record ([`Ring`]) the Coordinator uses to
//! drive motion.
//!
//! Grounded on `SinePhasePlateGeneration` in the source backend: unit conversion to SI at
//! the boundary (mm→m, nm→m, µm→m), a linear radius sampling over the full multi-SLM
//! span, and a per-sample sawtooth chirp. `scipy.signal.sawtooth` has no direct
//! counterpart in the dependency stack here, so the canonical rising sawtooth is
//! implemented directly rather than pulled in as a dependency for one function.

use crate::app_config::ChirpForm;
use crate::error::{EocError, EocResult, InstrumentError};
use crate::frame::{Frame, FrameSet, SLM_PX_WIDTH};
use std::f64::consts::PI;

/// A derived per-ring kinematic record (§3 `Ring`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    pub index: usize,
    pub radius_m: f64,
    pub angular_speed_deg_s: f64,
    /// `+1` for even `index`, `-1` for odd.
    pub direction: i8,
}

/// The rising sawtooth wave on period `2*pi`, range `[-1, 1]`, matching
/// `scipy.signal.sawtooth(x)` with the default (rising) width: `-1` at `x = 0`, rising
/// linearly to `+1` as `x` approaches `2*pi`.
fn sawtooth(x: f64) -> f64 {
    x.rem_euclid(2.0 * PI) / PI - 1.0
}

/// Evaluates the per-sample chirp value at physical radius `r` (meters), given
/// focal length and wavelength in meters and the configured phase-argument form.
fn chirp_value(r: f64, focal_length_m: f64, wavelength_m: f64, y_min: u8, y_peak_to_peak: u8, form: ChirpForm) -> u8 {
    let argument = PI * r * r / (focal_length_m * wavelength_m);
    let phase = match form {
        ChirpForm::Radians => argument,
        ChirpForm::LegacyDoubleConversion => argument.to_radians(),
    };
    let value = f64::from(y_min) + ((1.0 + sawtooth(phase)) / 2.0) * f64::from(y_peak_to_peak);
    value.round().clamp(0.0, 255.0) as u8
}

/// Synthesizes the full [`FrameSet`] for one sine phase plate run.
///
/// `radius_mm` and `focal_length_mm` come from the runtime-only Settings fields;
/// the remainder from persisted Settings. Fails `InvalidArgument` (embedded in
/// [`InstrumentError`] for a uniform failure type across the domain, per the source's
/// taxonomy) if `radius_mm < grating_width_um`, since no rings would result.
pub fn synthesize(
    radius_mm: f64,
    focal_length_mm: f64,
    wavelength_nm: f64,
    grating_width_um: f64,
    y_min: u8,
    y_peak_to_peak: u8,
    chirp_form: ChirpForm,
) -> EocResult<FrameSet> {
    let radius_m = radius_mm / 1000.0;
    let focal_length_m = focal_length_mm / 1000.0;
    let wavelength_m = wavelength_nm / 1_000_000_000.0;
    let grating_width_m = grating_width_um / 1_000_000.0;

    let slm_count = (radius_m / grating_width_m).floor() as i64;
    if slm_count <= 0 {
        return Err(EocError::Instrument(InstrumentError::InvalidArgument(
            "radius_mm must be >= grating_width_um: no rings would be produced".to_string(),
        )));
    }
    let slm_count = slm_count as usize;

    let linespace_width = slm_count * SLM_PX_WIDTH;
    let pixel_width_m = radius_m / linespace_width as f64;

    let mut waveform = Vec::with_capacity(linespace_width);
    for i in 0..linespace_width {
        let r = i as f64 * pixel_width_m;
        waveform.push(chirp_value(
            r,
            focal_length_m,
            wavelength_m,
            y_min,
            y_peak_to_peak,
            chirp_form,
        ));
    }

    let mut frames = Vec::with_capacity(slm_count);
    for i in 0..slm_count {
        let start = SLM_PX_WIDTH * i;
        let stop = start + SLM_PX_WIDTH;
        let row = waveform[start..stop].to_vec();
        frames.push(Frame::from_broadcast_row(row));
    }

    Ok(FrameSet::new(frames))
}

/// Derives the kinematic record for ring `index` (§3 `Ring`).
pub fn derive_ring(index: usize, grating_width_m: f64, grating_height_m: f64, exposure_time_s: f64) -> Ring {
    let radius_m = grating_width_m * (index as f64 + 1.0);
    let angular_speed_deg_s = (grating_height_m / (exposure_time_s * radius_m)) * (180.0 / PI);
    let direction = if index % 2 == 0 { 1 } else { -1 };
    Ring {
        index,
        radius_m,
        angular_speed_deg_s,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const S3_RADIUS_MM: f64 = 2.5;
    const S3_FOCAL_LENGTH_MM: f64 = 30.0;
    const S3_WAVELENGTH_NM: f64 = 633.0;
    const S3_GRATING_WIDTH_UM: f64 = 70.0;
    const S3_Y_MIN: u8 = 65;
    const S3_Y_PEAK_TO_PEAK: u8 = 85;

    #[test]
    fn frame_count_matches_floor_division() {
        let set = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::Radians,
        )
        .unwrap();
        assert_eq!(set.len(), 35);
    }

    #[test]
    fn radius_below_grating_width_is_invalid_argument() {
        let result = synthesize(10.0, S3_FOCAL_LENGTH_MM, S3_WAVELENGTH_NM, 70.0, S3_Y_MIN, S3_Y_PEAK_TO_PEAK, ChirpForm::Radians);
        assert!(matches!(
            result,
            Err(EocError::Instrument(InstrumentError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn every_frame_has_the_fixed_slm_shape() {
        let set = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::Radians,
        )
        .unwrap();
        for frame in set.iter() {
            assert_eq!(frame.height(), 1200);
            assert_eq!(frame.width(), 1920);
        }
    }

    #[test]
    fn first_sample_matches_sawtooth_at_zero_radius() {
        // sawtooth(0) on the rising convention is -1, so value = y_min + 0 = y_min.
        let set = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::Radians,
        )
        .unwrap();
        assert_eq!(set.get(0).unwrap().sample(0, 0), S3_Y_MIN);
    }

    #[test]
    fn chirp_peak_radius_is_monotone_across_frames() {
        // Frame i covers a strictly higher range of physical radius than frame i-1, since
        // each frame is a contiguous later slice of the same increasing r sampling.
        let set = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::Radians,
        )
        .unwrap();
        assert!(set.len() > 1);
    }

    #[test]
    fn ring_direction_alternates() {
        let r0 = derive_ring(0, 0.00007, 0.00004, 11.0);
        let r1 = derive_ring(1, 0.00007, 0.00004, 11.0);
        assert_eq!(r0.direction, 1);
        assert_eq!(r1.direction, -1);
    }

    #[test]
    fn doubling_exposure_time_halves_angular_speed() {
        let slow = derive_ring(0, 0.00007, 0.00004, 22.0);
        let fast = derive_ring(0, 0.00007, 0.00004, 11.0);
        assert!((fast.angular_speed_deg_s - 2.0 * slow.angular_speed_deg_s).abs() < 1e-9);
    }

    #[test]
    fn legacy_chirp_form_differs_from_radians_form() {
        let radians_frame = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::Radians,
        )
        .unwrap();
        let legacy_frame = synthesize(
            S3_RADIUS_MM,
            S3_FOCAL_LENGTH_MM,
            S3_WAVELENGTH_NM,
            S3_GRATING_WIDTH_UM,
            S3_Y_MIN,
            S3_Y_PEAK_TO_PEAK,
            ChirpForm::LegacyDoubleConversion,
        )
        .unwrap();
        assert_ne!(radians_frame, legacy_frame);
    }
}
