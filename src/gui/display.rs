//! The secondary SLM display surface (§4.6).
//!
//! Exposes a full-screen, borderless viewport on a chosen monitor whose sole content is
//! the current [`Frame`]. Grounded on egui/eframe's deferred-viewport API for the
//! second window (the teacher's GUI is single-window, so this is net-new in the
//! teacher's idiom rather than adapted code) and on `sine_phase_plate_UI.py`'s
//! `ImageDisplay`, whose `show_image`/`thread_safe_show_image` split this mirrors.

use crate::error::{EocError, EocResult};
use crate::frame::{Frame, SLM_PX_HEIGHT, SLM_PX_WIDTH};
use eframe::egui;
use std::sync::{Arc, Mutex};

/// Abstracts monitor enumeration so the display surface is testable without a real
/// windowing system attached, and so the operator's physical layout (which eframe has no
/// reliable cross-platform way to enumerate ahead of window creation) is declared rather
/// than guessed. See the project's design notes for why this is configured, not detected.
pub trait MonitorCatalog: Send + Sync {
    /// Number of monitors the operator has declared as present.
    fn monitor_count(&self) -> usize;

    /// Top-left origin, in logical pixels, of monitor `index`, assuming a horizontal
    /// tiling of monitors each `monitor_width_px` wide.
    fn origin_for(&self, index: usize, monitor_width_px: f32) -> Option<egui::Pos2>;
}

/// The operator-declared monitor layout, read from [`crate::app_config::DisplaySettings`].
pub struct ConfiguredMonitorCatalog {
    pub monitor_count: usize,
}

impl MonitorCatalog for ConfiguredMonitorCatalog {
    fn monitor_count(&self) -> usize {
        self.monitor_count
    }

    fn origin_for(&self, index: usize, monitor_width_px: f32) -> Option<egui::Pos2> {
        if index >= self.monitor_count {
            None
        } else {
            Some(egui::pos2(index as f32 * monitor_width_px, 0.0))
        }
    }
}

/// A deterministic stand-in for tests (§8).
pub struct FakeMonitorCatalog {
    pub monitor_count: usize,
}

impl MonitorCatalog for FakeMonitorCatalog {
    fn monitor_count(&self) -> usize {
        self.monitor_count
    }

    fn origin_for(&self, index: usize, monitor_width_px: f32) -> Option<egui::Pos2> {
        if index >= self.monitor_count {
            None
        } else {
            Some(egui::pos2(index as f32 * monitor_width_px, 0.0))
        }
    }
}

const SLM_VIEWPORT_ID: egui::ViewportId = egui::ViewportId::from_hash_of("eoc-slm-display");

/// The secondary full-screen SLM viewport. Frames are pushed in from the Motion Worker
/// thread via [`SecondaryDisplay::thread_safe_show_image`] and painted on the next UI
/// frame; the UI thread owns viewport creation (`show_image` is main-thread only).
pub struct SecondaryDisplay {
    current_frame: Arc<Mutex<Option<Frame>>>,
    texture: Option<egui::TextureHandle>,
    monitor_index: usize,
}

impl SecondaryDisplay {
    /// Opens the SLM viewport on `monitor_index`, failing if fewer than `monitor_index +
    /// 1` monitors are declared present (§4.6 `NoSecondMonitorError`).
    pub fn new(monitor_index: usize, monitor_width_px: f32, catalog: &dyn MonitorCatalog) -> EocResult<Self> {
        let available = catalog.monitor_count();
        if monitor_index >= available {
            return Err(EocError::NoSecondMonitor {
                requested: monitor_index,
                available,
            });
        }
        let _origin = catalog
            .origin_for(monitor_index, monitor_width_px)
            .ok_or(EocError::NoSecondMonitor {
                requested: monitor_index,
                available,
            })?;

        Ok(Self {
            current_frame: Arc::new(Mutex::new(None)),
            texture: None,
            monitor_index,
        })
    }

    /// A cheaply cloneable handle for sharing with the Motion Worker thread.
    pub fn frame_sink(&self) -> FrameSink {
        FrameSink {
            current_frame: self.current_frame.clone(),
        }
    }

    /// Main-thread-only: presents `frame` immediately.
    pub fn show_image(&self, frame: Frame) {
        *self.current_frame.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
    }

    /// Renders the secondary viewport if a frame is queued. Call once per UI update.
    pub fn update(&mut self, ctx: &egui::Context, monitor_width_px: f32, catalog: &dyn MonitorCatalog) {
        let frame = self.current_frame.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let Some(frame) = frame else {
            return;
        };

        let origin = catalog
            .origin_for(self.monitor_index, monitor_width_px)
            .unwrap_or(egui::pos2(0.0, 0.0));

        let pixels: Vec<u8> = (0..frame.height())
            .flat_map(|row| frame.row(row).to_vec())
            .collect();
        let image = egui::ColorImage::from_gray([SLM_PX_WIDTH, SLM_PX_HEIGHT], &pixels);

        let texture = self.texture.get_or_insert_with(|| {
            ctx.load_texture("slm-frame", image.clone(), egui::TextureOptions::NEAREST)
        });
        texture.set(image, egui::TextureOptions::NEAREST);
        let texture_id = texture.id();

        let builder = egui::ViewportBuilder::default()
            .with_title("SLM Display")
            .with_decorations(false)
            .with_position(origin)
            .with_fullscreen(true);

        ctx.show_viewport_deferred(SLM_VIEWPORT_ID, builder, move |ctx, _class| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none().fill(egui::Color32::BLACK))
                .show(ctx, |ui| {
                    let size = egui::vec2(SLM_PX_WIDTH as f32, SLM_PX_HEIGHT as f32);
                    ui.add(egui::Image::from_texture((texture_id, size)));
                });
        });
    }
}

/// A `Send`-able handle that can push frames from any thread (§4.6
/// `thread_safe_show_image`). Frames are retained by the shared cell for the full
/// lifetime of display, so the UI toolkit never releases one mid-present.
#[derive(Clone)]
pub struct FrameSink {
    current_frame: Arc<Mutex<Option<Frame>>>,
}

impl FrameSink {
    pub fn thread_safe_show_image(&self, frame: Frame) {
        *self.current_frame.lock().unwrap_or_else(|e| e.into_inner()) = Some(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requesting_an_out_of_range_monitor_fails() {
        let catalog = FakeMonitorCatalog { monitor_count: 1 };
        let result = SecondaryDisplay::new(1, 1920.0, &catalog);
        assert!(matches!(
            result,
            Err(EocError::NoSecondMonitor {
                requested: 1,
                available: 1
            })
        ));
    }

    #[test]
    fn a_single_declared_monitor_opens_at_index_zero() {
        let catalog = FakeMonitorCatalog { monitor_count: 1 };
        assert!(SecondaryDisplay::new(0, 1920.0, &catalog).is_ok());
    }

    #[test]
    fn frame_sink_pushes_the_retained_frame_for_the_main_thread_to_pick_up() {
        let catalog = FakeMonitorCatalog { monitor_count: 2 };
        let display = SecondaryDisplay::new(1, 1920.0, &catalog).unwrap();
        let sink = display.frame_sink();
        let frame = Frame::from_broadcast_row(vec![42u8; SLM_PX_WIDTH]);
        sink.thread_safe_show_image(frame.clone());
        assert_eq!(*display.current_frame.lock().unwrap(), Some(frame));
    }
}
