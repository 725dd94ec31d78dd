//! eframe front end: one Generate button, one streaming text surface.
//!
//! Resources load once at startup; a load failure is shown in the window
//! and the Generate button never becomes active, so the generation loop
//! cannot start without a vocabulary and a model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use eframe::{egui, App, Frame};
use generate::{CancelHandle, GenConfig, Generator, Outcome, Session};
use tokenize::Vocabulary;

const TOKENISER_FILE: &str = "tokeniser.json";
const MODEL_FILE: &str = "model.bin";
const SETTINGS_FILE: &str = "settings.json";

/// Outcome of a finished run, handed from the worker thread to the UI.
struct RunReport {
    chars: usize,
    message: String,
    ok: bool,
}

struct DemoApp {
    generator: Option<Arc<Mutex<Generator>>>,
    running: Arc<AtomicBool>,
    cancel: CancelHandle,
    output: Arc<Mutex<String>>,
    pending: Option<Arc<Mutex<Option<RunReport>>>>,
    history: Vec<(String, RunReport)>,
    status: String,
    load_error: Option<String>,
}

fn build_generator() -> Result<Generator, String> {
    let cfg = GenConfig::load(SETTINGS_FILE).map_err(|e| format!("settings: {e}"))?;
    let vocab = Vocabulary::load(TOKENISER_FILE).map_err(|e| format!("tokeniser: {e}"))?;
    let session =
        Session::open(MODEL_FILE, vocab.len(), &cfg).map_err(|e| format!("model: {e}"))?;
    Ok(Generator::new(Arc::new(vocab), session, cfg))
}

impl Default for DemoApp {
    fn default() -> Self {
        let mut load_error = None;
        let mut generator = None;
        let mut running = Arc::new(AtomicBool::new(false));
        match build_generator() {
            Ok(g) => {
                running = g.running_flag();
                generator = Some(Arc::new(Mutex::new(g)));
            }
            Err(msg) => {
                tracing::warn!(error = %msg, "resource load failed");
                load_error = Some(msg);
            }
        }
        Self {
            generator,
            running,
            cancel: CancelHandle::new(),
            output: Arc::new(Mutex::new(String::new())),
            pending: None,
            history: Vec::new(),
            status: "ready".to_string(),
            load_error,
        }
    }
}

impl DemoApp {
    fn start_run(&mut self, ctx: &egui::Context) {
        let Some(generator) = self.generator.clone() else {
            return;
        };
        if self.running.load(Ordering::SeqCst) {
            self.status = "a run is already active".to_string();
            return;
        }

        if let Ok(mut out) = self.output.lock() {
            out.clear();
        }
        self.cancel.reset();
        self.status = "generating...".to_string();

        // shared slot for the finished-run report, polled in update()
        let report_slot: Arc<Mutex<Option<RunReport>>> = Arc::new(Mutex::new(None));
        self.pending = Some(report_slot.clone());

        let output = self.output.clone();
        let cancel = self.cancel.clone();
        let thread_ctx = ctx.clone();
        thread::spawn(move || {
            let result = match generator.lock() {
                Ok(mut generator) => generator.run(&cancel, |ch| {
                    if let Ok(mut out) = output.lock() {
                        out.push(ch);
                    }
                    thread_ctx.request_repaint();
                }),
                Err(_) => return,
            };
            let chars = output.lock().map(|o| o.chars().count()).unwrap_or(0);
            let report = match result {
                Ok(summary) => RunReport {
                    chars,
                    message: match summary.outcome {
                        Outcome::Completed => "completed".to_string(),
                        Outcome::Cancelled => "stopped".to_string(),
                    },
                    ok: true,
                },
                Err(e) => RunReport {
                    chars,
                    message: e.to_string(),
                    ok: false,
                },
            };
            if let Ok(mut slot) = report_slot.lock() {
                *slot = Some(report);
            }
            thread_ctx.request_repaint();
        });
    }

    fn poll_report(&mut self) {
        let Some(slot) = self.pending.as_ref().map(Arc::clone) else {
            return;
        };
        if let Ok(mut guard) = slot.lock() {
            if let Some(report) = guard.take() {
                self.status = if report.ok {
                    format!("{} ({} chars)", report.message, report.chars)
                } else {
                    format!("aborted: {}", report.message)
                };
                let now = chrono::Utc::now().format("%H:%M:%S").to_string();
                self.history.push((now, report));
                self.pending = None;
            }
        };
    }
}

impl App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.poll_report();
        let busy = self.running.load(Ordering::SeqCst);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Character generator");
                ui.separator();
                if let Some(err) = &self.load_error {
                    ui.colored_label(egui::Color32::LIGHT_RED, err);
                } else {
                    ui.label(&self.status);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let can_generate = self.generator.is_some() && !busy;
                if ui
                    .add_enabled(can_generate, egui::Button::new("Generate"))
                    .clicked()
                {
                    self.start_run(ctx);
                }
                if ui.add_enabled(busy, egui::Button::new("Stop")).clicked() {
                    self.cancel.cancel();
                }
                if ui.button("Clear history").clicked() {
                    self.history.clear();
                }
            });

            if busy {
                // keep repainting while characters stream in
                ctx.request_repaint_after(Duration::from_millis(50));
            }

            ui.separator();
            ui.label("Output:");
            let mut text = self.output.lock().map(|g| g.clone()).unwrap_or_default();
            egui::ScrollArea::vertical()
                .max_height(300.0)
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut text)
                            .desired_rows(12)
                            .desired_width(f32::INFINITY)
                            .interactive(false),
                    );
                });

            ui.separator();
            ui.label("Runs:");
            egui::ScrollArea::vertical()
                .id_salt("history")
                .max_height(120.0)
                .show(ui, |ui| {
                    for (time, report) in self.history.iter().rev() {
                        let color = if report.ok {
                            egui::Color32::from_rgb(150, 150, 150)
                        } else {
                            egui::Color32::LIGHT_RED
                        };
                        ui.colored_label(
                            color,
                            format!("{} — {} ({} chars)", time, report.message, report.chars),
                        );
                    }
                });
        });
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt::init();
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Character generator",
        native_options,
        Box::new(|_| Ok(Box::new(DemoApp::default()))),
    )
}
