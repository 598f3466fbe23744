//! egui host for the advent calendar: card grid, countdown, and confetti overlay.

use std::time::Instant;

use advent_core::{AdventConfig, Calendar, Card, CardState, ContentDocument, OpenOutcome};
use advent_platform::{FileStore, SurfaceRect};
use chrono::{Local, Utc};
use glam::Vec2;
use tracing::{info, warn};

mod loader;
mod surface;

pub use loader::{spawn_content_loader, ContentEvent, LoaderCommand, LoaderHandles};
pub use surface::{EguiSurfaceHost, SharedCanvas};

const CONFETTI_LAYER: &str = "advent-confetti";

/// Opens the calendar window and blocks until it is closed.
pub fn run(config: AdventConfig) -> eframe::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_title("Advent"),
        ..Default::default()
    };
    eframe::run_native(
        "Advent",
        native_options,
        Box::new(move |creation_context| {
            let loader = spawn_content_loader(
                config.content.path.clone(),
                creation_context.egui_ctx.clone(),
            );
            Ok(Box::new(AdventApp::new(config, loader)))
        }),
    )
}

pub struct AdventApp {
    calendar: Calendar<FileStore>,
    canvas: SharedCanvas,
    loader: LoaderHandles,
    started: Instant,
    status: Option<String>,
}

impl AdventApp {
    pub fn new(config: AdventConfig, loader: LoaderHandles) -> Self {
        let canvas = SharedCanvas::default();
        let mut surfaces = EguiSurfaceHost::new(canvas.clone());
        let store = FileStore::new(config.storage.path.clone());
        let calendar = Calendar::new(
            &config,
            ContentDocument::default(),
            store,
            &mut surfaces,
            SurfaceRect::new(960.0, 720.0, 1.0),
            Utc::now(),
        );
        let app = Self {
            calendar,
            canvas,
            loader,
            started: Instant::now(),
            status: None,
        };
        app.request_fetch();
        app
    }

    fn request_fetch(&self) {
        if self.loader.command_sender.send(LoaderCommand::Fetch).is_err() {
            warn!("UI: loader channel closed; cannot fetch content");
        }
    }

    fn drain_loader(&mut self) {
        while let Ok(event) = self.loader.event_receiver.try_recv() {
            match event {
                ContentEvent::Loaded(document) => {
                    if self.calendar.replace_document(document, Utc::now()) {
                        info!("UI: new content version loaded");
                    }
                    self.status = None;
                }
                ContentEvent::Failed(_) => {
                    self.status = Some("Could not fetch content.".to_owned());
                }
            }
        }
    }

    fn sync_surface(&mut self, context: &egui::Context) {
        let screen = context.screen_rect();
        let rect = SurfaceRect {
            x: screen.min.x,
            y: screen.min.y,
            width: screen.width(),
            height: screen.height(),
            scale_factor: context.pixels_per_point(),
        };
        if self.canvas.rect() != Some(rect) {
            self.calendar.resize(rect);
        }
    }

    fn header(&mut self, ui: &mut egui::Ui) {
        let now = Utc::now();
        ui.horizontal(|ui| {
            let title = self
                .calendar
                .document()
                .site
                .title
                .clone()
                .unwrap_or_default();
            if let Some(logo) = self.calendar.document().site.field("logo") {
                ui.hyperlink_to(logo, logo);
            }
            ui.heading(title);
            if let Some(countdown) = self.calendar.countdown(now) {
                ui.label(format!("{countdown}"));
            }
            if ui.button("Refresh").clicked() {
                self.request_fetch();
            }
        });
        if let Some(status) = &self.status {
            ui.colored_label(egui::Color32::LIGHT_RED, status);
        }
    }

    /// Draws every card and returns the id and screen position of an open request.
    fn cards(&self, ui: &mut egui::Ui) -> Option<(String, Vec2)> {
        let mut clicked = None;
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for (card, state) in self.calendar.cards_in_order(Utc::now()) {
                    let response = ui.group(|ui| {
                        ui.set_width(200.0);
                        card_body(ui, &card, state)
                    });
                    let rect = response.response.rect;
                    // Locked cards still take clicks so they can answer "not yet".
                    let knocked = state == CardState::Locked
                        && ui
                            .interact(
                                rect,
                                egui::Id::new(("advent-card", card.id.as_str())),
                                egui::Sense::click(),
                            )
                            .clicked();
                    if response.inner || knocked {
                        let origin = Vec2::new(rect.center().x, rect.top() + rect.height() * 0.25);
                        clicked = Some((card.id.to_string(), origin));
                    }
                }
            });
        });
        clicked
    }

    fn open(&mut self, id: &str, origin: Vec2) {
        match self.calendar.open(id, Utc::now(), origin) {
            Ok(OpenOutcome::Opened { particles }) => {
                info!("UI: opened `{id}` with {particles} confetti");
                self.status = None;
            }
            Ok(OpenOutcome::StillLocked) => {
                self.status = Some("Not yet!".to_owned());
            }
            Ok(OpenOutcome::AlreadyOpen | OpenOutcome::UnknownCard) => {}
            Err(err) => {
                warn!("UI: open `{id}` failed: {err}");
                self.status = Some("Could not save that the card was opened.".to_owned());
            }
        }
    }
}

/// Renders one card; returns `true` when the user pressed its Open button.
fn card_body(ui: &mut egui::Ui, card: &Card, state: CardState) -> bool {
    match state {
        CardState::Open => {
            ui.strong(card.field("title").unwrap_or_default());
            ui.small("Opened");
            if let Some(text) = card.field("text") {
                ui.label(text);
            }
            if let Some(image) = card.field("image") {
                ui.hyperlink_to(image, image);
            }
            false
        }
        CardState::Unlockable => {
            ui.strong(card.teaser().unwrap_or("Soon…"));
            ui.small("Ready to open");
            ui.button("Open").clicked()
        }
        CardState::Locked => {
            ui.strong(card.teaser().unwrap_or("Soon…"));
            let label = card
                .unlock_at
                .instant()
                .map(|at| at.with_timezone(&Local).format("%-d %b %Y").to_string())
                .unwrap_or_default();
            ui.small(label);
            false
        }
    }
}

impl eframe::App for AdventApp {
    fn update(&mut self, context: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_loader();
        self.sync_surface(context);

        let elapsed = self.started.elapsed();
        for change in self.calendar.pump(elapsed, Utc::now()) {
            info!(
                "UI: card `{}` {:?} -> {}",
                change.id,
                change.from.map(CardState::as_str),
                change.to.as_str()
            );
        }

        egui::TopBottomPanel::top("header").show(context, |ui| self.header(ui));
        let clicked = egui::CentralPanel::default()
            .show(context, |ui| self.cards(ui))
            .inner;
        if let Some((id, origin)) = clicked {
            self.open(&id, origin);
        }

        let painter = context.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new(CONFETTI_LAYER),
        ));
        self.canvas.paint(&painter);

        if self.calendar.wants_frame() {
            context.request_repaint();
        } else if let Some(next) = self.calendar.next_wakeup() {
            context.request_repaint_after(next.saturating_sub(elapsed));
        }
    }
}
