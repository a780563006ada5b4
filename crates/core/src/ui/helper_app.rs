//! Main homework helper window.
//!
//! This module contains the `HelperApp` struct which implements the
//! `eframe::App` trait: the conversation, the input bar, the crop editor
//! and the settings window.

use super::rendering::{draw_selection_border, draw_selection_overlay, show_markdown};
use super::selection::{SelectionEvent, fit_image, initial_selection, process_drag_event, to_crop_rect};
use super::settings::{AVAILABLE_MODELS, Settings};
use super::state::{Alert, CropState, PendingAttachment, StreamEvent};
use crate::capture::{self, ImageOrigin};
use crate::chat::{ChatSession, LoadState, Message, Role};
use crate::config::Config;
use crate::crop::AspectRatio;
use crate::encode::{encode_image, load_image_from_bytes};
use crate::error::{AppError, Result};
use crate::gemini::GeminiClient;
use crate::image_processing::{ImageProcessor, RasterRequest};
use crate::markdown;
use crate::prompt::TutorRequest;
use eframe::egui;
use image::DynamicImage;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;

const THUMBNAIL_SIZE: u32 = 160;

/// The homework helper application.
pub struct HelperApp {
    config: Config,
    settings: Settings,
    show_settings: bool,

    session: ChatSession,
    chat_input: String,
    rx: Receiver<StreamEvent>,
    tx: Sender<StreamEvent>,

    crop: Option<CropState>,
    attachment: Option<PendingAttachment>,
    alert: Option<Alert>,
}

impl HelperApp {
    /// Creates a new helper window state.
    ///
    /// # Arguments
    /// * `config` - Environment configuration, used as fallback for settings
    /// * `initial_image` - Image to open in the crop editor right away
    pub fn new(config: Config, initial_image: Option<DynamicImage>) -> Self {
        let (tx, rx) = channel();
        let settings = Settings::load(&config);

        Self {
            config,
            settings,
            show_settings: false,
            session: ChatSession::new(),
            chat_input: String::new(),
            rx,
            tx,
            crop: initial_image.map(CropState::new),
            attachment: None,
            alert: None,
        }
    }

    /// Loads an image from either origin into the crop editor.
    fn open_origin(&mut self, origin: ImageOrigin) {
        match capture::acquire(&origin) {
            Ok(image) => self.crop = Some(CropState::new(image)),
            Err(e) => self.show_read_failure(e),
        }
    }

    fn open_dropped_bytes(&mut self, bytes: &[u8]) {
        match load_image_from_bytes(bytes) {
            Ok(image) => self.crop = Some(CropState::new(image)),
            Err(e) => self.show_read_failure(e),
        }
    }

    fn show_read_failure(&mut self, error: AppError) {
        log::warn!("could not read image: {error}");
        self.alert = Some(Alert {
            title: "Could not open image".to_string(),
            message: error.to_string(),
        });
    }

    fn pick_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg"])
            .pick_file()
        {
            self.open_origin(ImageOrigin::File(path));
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.first() else { return };

        if let Some(path) = &file.path {
            self.open_origin(ImageOrigin::File(path.clone()));
        } else if let Some(bytes) = &file.bytes {
            self.open_dropped_bytes(bytes);
        }
    }

    /// Rasterizes the crop (or the full image) and attaches it to the next question.
    fn finalize_crop(&mut self, ctx: &egui::Context, use_selection: bool) {
        let Some(crop) = self.crop.take() else { return };

        let request = RasterRequest {
            display_width: crop.display_size.map_or(crop.image.width() as f32, |s| s.x),
            display_height: crop.display_size.map_or(crop.image.height() as f32, |s| s.y),
            selection: if use_selection { crop.selection.map(to_crop_rect) } else { None },
            pixel_density: ctx.pixels_per_point(),
        };

        match Self::build_attachment(ctx, &crop.image, &request) {
            Ok(attachment) => self.attachment = Some(attachment),
            Err(e) => {
                log::warn!("crop failed: {e}");
                self.alert = Some(Alert {
                    title: "Could not crop image".to_string(),
                    message: e.to_string(),
                });
                // Keep the editor open so the user can adjust the selection
                self.crop = Some(crop);
            }
        }
    }

    fn build_attachment(
        ctx: &egui::Context,
        image: &DynamicImage,
        request: &RasterRequest,
    ) -> Result<PendingAttachment> {
        let cropped = ImageProcessor::rasterize(image, request)?;
        let encoded = encode_image(&cropped)?;

        let thumb = cropped.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgba8();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(
            [thumb.width() as usize, thumb.height() as usize],
            thumb.as_flat_samples().as_slice(),
        );
        let thumbnail = ctx.load_texture("attachment", color_image, egui::TextureOptions::LINEAR);

        Ok(PendingAttachment {
            encoded,
            thumbnail,
            width: cropped.width(),
            height: cropped.height(),
        })
    }

    /// Sends the current input and attachment.
    ///
    /// Does nothing while a request is in flight.
    fn send(&mut self, ctx: &egui::Context) {
        if self.session.is_busy() {
            return;
        }

        let config = match self.settings.to_config(&self.config) {
            Ok(config) => config,
            Err(e) => {
                self.alert = Some(Alert {
                    title: "Settings".to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let image = self.attachment.as_ref().map(|a| a.encoded.clone());
        let Some(request) = self.session.begin_send(&config, &self.chat_input, image) else {
            return;
        };

        self.chat_input.clear();
        self.attachment = None;

        if let Err(e) = self.settings.save() {
            log::warn!("failed to save settings: {e}");
        }

        spawn_answer_task(config, request, self.tx.clone(), ctx.clone());
    }

    /// Feeds background events into the session.
    fn process_stream_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                StreamEvent::Chunk(text) => self.session.push_chunk(&text),
                StreamEvent::Error(e) => {
                    self.session.finish(Err(e));
                }
                StreamEvent::Done => {
                    self.session.finish(Ok(String::new()));
                }
            }
        }
    }

    fn render_input_bar(&mut self, ui: &mut egui::Ui) {
        if let Some(attachment) = &self.attachment {
            let mut remove = false;
            ui.horizontal(|ui| {
                ui.image((attachment.thumbnail.id(), attachment.thumbnail.size_vec2()));
                ui.vertical(|ui| {
                    ui.label(format!("Attached crop: {}x{}", attachment.width, attachment.height));
                    remove = ui.button("Remove").clicked();
                });
            });
            if remove {
                self.attachment = None;
            }
            ui.separator();
        }

        let busy = self.session.is_busy();
        ui.horizontal(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("📷 Capture screen")).clicked() {
                self.open_origin(ImageOrigin::Screen(self.settings.monitor));
            }
            if ui.add_enabled(!busy, egui::Button::new("📂 Open image")).clicked() {
                self.pick_file();
            }
            if ui.button("⚙").clicked() {
                self.show_settings = !self.show_settings;
            }
        });

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::multiline(&mut self.chat_input)
                    .desired_rows(2)
                    .desired_width(ui.available_width() - 60.0)
                    .hint_text("Type your question, or attach a photo of the problem"),
            );

            let enter_pressed = response.has_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);
            let clicked = ui.add_enabled(!busy, egui::Button::new("Send")).clicked();
            if clicked || enter_pressed {
                // Enter also inserted a newline
                if enter_pressed {
                    let trimmed = self.chat_input.trim_end_matches('\n').len();
                    self.chat_input.truncate(trimmed);
                }
                self.send(ui.ctx());
            }
        });
    }

    fn render_conversation(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if self.session.messages().is_empty() && !self.session.is_busy() {
                    ui.weak("Ask a homework question. Attach a photo of the problem to get a step-by-step answer.");
                }

                for message in self.session.messages() {
                    render_message(ui, message);
                    ui.add_space(8.0);
                }

                match self.session.state() {
                    LoadState::Thinking => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Thinking...");
                        });
                    }
                    LoadState::Streaming => {
                        if let Some(draft) = self.session.draft() {
                            bubble(ui, Role::Model, false, |ui| show_markdown(ui, draft));
                        }
                    }
                    LoadState::Idle => {}
                }
            });
    }

    fn render_crop_editor(&mut self, ctx: &egui::Context) {
        let mut confirm: Option<bool> = None;
        let mut cancel = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(crop) = self.crop.as_mut() else { return };

            ui.horizontal(|ui| {
                let before = crop.aspect;
                egui::ComboBox::from_label("Aspect")
                    .selected_text(crop.aspect.label())
                    .show_ui(ui, |ui| {
                        for aspect in AspectRatio::ALL {
                            ui.selectable_value(&mut crop.aspect, aspect, aspect.label());
                        }
                    });
                if crop.aspect != before {
                    crop.needs_initial_selection = true;
                }

                if ui.button("Use selection").clicked() {
                    confirm = Some(true);
                }
                if ui.button("Use full image").clicked() {
                    confirm = Some(false);
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
            ui.horizontal(|ui| {
                ui.label("Drag over the problem to select it.");
                if let Some(display) = crop.display_size {
                    let request = RasterRequest {
                        display_width: display.x,
                        display_height: display.y,
                        selection: crop.selection.map(to_crop_rect),
                        pixel_density: ctx.pixels_per_point(),
                    };
                    if let Ok((w, h)) = ImageProcessor::output_dimensions(&crop.image, &request) {
                        ui.weak(format!("Output {w}x{h} px"));
                    }
                }
            });
            ui.separator();

            let texture_id = crop.texture.get_or_insert_with(|| {
                let rgba = crop.image.to_rgba8();
                let color_image = egui::ColorImage::from_rgba_unmultiplied(
                    [crop.image.width() as usize, crop.image.height() as usize],
                    rgba.as_flat_samples().as_slice(),
                );
                ctx.load_texture("crop_source", color_image, egui::TextureOptions::LINEAR)
            })
            .id();

            let natural = egui::vec2(crop.image.width() as f32, crop.image.height() as f32);
            let display = fit_image(natural, ui.available_size());
            let (image_rect, response) = ui.allocate_exact_size(display, egui::Sense::drag());

            ui.painter().image(
                texture_id,
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            // Keep the selection glued to the image when the window resizes
            if let (Some(old), Some(sel)) = (crop.display_size, crop.selection) {
                if old != display && old.x > 0.0 && old.y > 0.0 {
                    let scale = display / old;
                    crop.selection = Some(egui::Rect::from_min_max(
                        (sel.min.to_vec2() * scale).to_pos2(),
                        (sel.max.to_vec2() * scale).to_pos2(),
                    ));
                }
            }
            crop.display_size = Some(display);

            if crop.needs_initial_selection {
                crop.selection = Some(initial_selection(
                    [crop.image.width(), crop.image.height()],
                    display,
                    crop.aspect.value(),
                ));
                crop.needs_initial_selection = false;
            }

            let event = process_drag_event(
                &response,
                image_rect,
                crop.aspect.value(),
                &mut crop.drag_start,
                &mut crop.selection,
                &mut crop.previous_selection,
            );
            if event == SelectionEvent::Cancelled {
                log::debug!("drag too short, keeping previous selection");
            }

            if let Some(sel) = crop.selection {
                let screen_sel = sel.translate(image_rect.min.to_vec2());
                draw_selection_overlay(ui.painter(), image_rect, screen_sel, 150);
                draw_selection_border(ui.painter(), screen_sel, 2.0, egui::Color32::WHITE);
            }
        });

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            cancel = true;
        }

        if cancel {
            self.crop = None;
        } else if let Some(use_selection) = confirm {
            self.finalize_crop(ctx, use_selection);
        }
    }

    fn render_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                egui::ComboBox::from_label("Model")
                    .selected_text(&self.settings.model)
                    .show_ui(ui, |ui| {
                        for model in AVAILABLE_MODELS {
                            ui.selectable_value(&mut self.settings.model, model.to_string(), *model);
                        }
                    });

                ui.add(egui::Slider::new(&mut self.settings.temperature, 0.0..=2.0).text("Temperature"));
                ui.add(egui::DragValue::new(&mut self.settings.monitor).range(0..=8).prefix("Monitor "));

                ui.label("API Key:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings.api_key)
                        .password(true)
                        .hint_text("Paste Gemini API Key"),
                );

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Export conversation").clicked() {
                        self.export_conversation();
                    }
                    if ui
                        .add_enabled(!self.session.is_busy(), egui::Button::new("Clear conversation"))
                        .clicked()
                    {
                        self.session.clear();
                    }
                });
            });

        if self.show_settings && !open {
            if let Err(e) = self.settings.save() {
                log::warn!("failed to save settings: {e}");
            }
        }
        self.show_settings = open;
    }

    fn export_conversation(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("homework-conversation.json")
            .save_file()
        else {
            return;
        };

        let written = self
            .session
            .to_json()
            .and_then(|json| std::fs::write(&path, json).map_err(AppError::from));
        match written {
            Ok(()) => log::info!("conversation exported to {}", path.display()),
            Err(e) => {
                self.alert = Some(Alert {
                    title: "Export failed".to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn render_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = &self.alert else { return };
        let mut dismissed = false;

        egui::Modal::new(egui::Id::new("alert")).show(ctx, |ui| {
            ui.heading(&alert.title);
            ui.label(&alert.message);
            if ui.button("OK").clicked() {
                dismissed = true;
            }
        });

        if dismissed {
            self.alert = None;
        }
    }
}

impl eframe::App for HelperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_stream_events();
        self.handle_dropped_files(ctx);

        if self.crop.is_some() {
            self.render_crop_editor(ctx);
        } else {
            egui::TopBottomPanel::bottom("input_bar")
                .resizable(false)
                .show(ctx, |ui| {
                    ui.add_space(6.0);
                    self.render_input_bar(ui);
                    ui.add_space(6.0);
                });

            egui::CentralPanel::default().show(ctx, |ui| self.render_conversation(ui));
        }

        if self.show_settings {
            self.render_settings(ctx);
        }
        self.render_alert(ctx);
    }
}

/// Frames a message like a chat bubble.
fn bubble(ui: &mut egui::Ui, role: Role, is_error: bool, add_contents: impl FnOnce(&mut egui::Ui)) {
    let fill = match (role, is_error) {
        (_, true) => egui::Color32::from_rgb(70, 25, 25),
        (Role::User, _) => egui::Color32::from_rgb(35, 45, 65),
        (Role::Model, _) => egui::Color32::from_rgb(30, 30, 30),
    };
    egui::Frame::group(ui.style())
        .fill(fill)
        .inner_margin(8.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui);
        });
}

fn render_message(ui: &mut egui::Ui, message: &Message) {
    bubble(ui, message.role, message.is_error, |ui| {
        ui.horizontal(|ui| {
            let who = match message.role {
                Role::User => "You",
                Role::Model => "Tutor",
            };
            ui.strong(who);
            ui.weak(message.timestamp.with_timezone(&chrono::Local).format("%H:%M").to_string());

            if message.role == Role::Model && !message.is_error && ui.small_button("Copy").clicked() {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => {
                        if let Err(e) = clipboard.set_text(markdown::to_plain_text(&message.text)) {
                            log::warn!("failed to copy to clipboard: {e}");
                        }
                    }
                    Err(e) => log::warn!("could not access clipboard: {e}"),
                }
            }
        });

        if let Some(image) = &message.image {
            ui.weak(format!("📎 {} ({} KB)", image.mime_type, image.byte_len() / 1024));
        }

        if message.is_error {
            ui.colored_label(egui::Color32::LIGHT_RED, &message.text);
        } else if message.role == Role::Model {
            show_markdown(ui, &message.text);
        } else if !message.text.is_empty() {
            ui.label(&message.text);
        }
    });
}

/// Streams the answer on a background thread, reporting through `tx`.
fn spawn_answer_task(config: Config, request: TutorRequest, tx: Sender<StreamEvent>, ctx: egui::Context) {
    thread::spawn(move || {
        let send = |event: StreamEvent| {
            let _ = tx.send(event);
            ctx.request_repaint();
        };

        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                send(StreamEvent::Error(AppError::Io(e)));
                return;
            }
        };

        runtime.block_on(async {
            use futures::StreamExt;

            let client = match GeminiClient::new(&config) {
                Ok(c) => c,
                Err(e) => return send(StreamEvent::Error(e)),
            };

            let mut stream = match client.generate_stream(request).await {
                Ok(stream) => stream,
                Err(e) => return send(StreamEvent::Error(e)),
            };

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(text) => send(StreamEvent::Chunk(text)),
                    Err(e) => return send(StreamEvent::Error(e)),
                }
            }
            send(StreamEvent::Done);
        });
    });
}

/// Launches the helper window and blocks until it is closed.
pub fn run(config: Config, initial_image: Option<DynamicImage>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Homework Helper")
            .with_inner_size([820.0, 720.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Homework Helper",
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(HelperApp::new(config, initial_image)) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
