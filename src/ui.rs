use chrono::Utc;
use eframe::egui;
use egui::{Color32, Context, FontFamily, FontId, Margin, RichText, Stroke, Vec2, Visuals};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Bar, BarChart, Plot};
use mercari_analyzer::cache::{analyze_cached_batch, AnalysisCache, MemoryCache, SqliteCache};
use mercari_analyzer::config::Settings;
use mercari_analyzer::loader::load_search_dump;
use mercari_analyzer::model::{PriceAnalysis, PriceSource, ShippingCalculation, SizeClass};
use mercari_analyzer::shipping::calculate_shipping;
use mercari_analyzer::stats::DEFAULT_BUCKET_WIDTH;
use tracing::{info, warn};

const ACCENT: Color32 = Color32::from_rgb(255, 90, 90);
const HEADER: Color32 = Color32::from_rgb(220, 210, 210);
const MUTED: Color32 = Color32::from_rgb(160, 150, 150);

pub fn set_custom_style(ctx: &Context) {
    let mut visuals = Visuals::dark();

    visuals.panel_fill = Color32::from_rgb(24, 22, 24);
    visuals.window_fill = Color32::from_rgb(30, 28, 30);
    visuals.extreme_bg_color = Color32::from_rgb(40, 36, 38);
    visuals.faint_bg_color = Color32::from_rgb(34, 31, 33);

    visuals.widgets.inactive.bg_fill = Color32::from_rgb(48, 44, 46);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, Color32::from_rgb(80, 70, 72));
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(70, 56, 58);
    visuals.widgets.hovered.bg_stroke = Stroke::new(2.0, ACCENT);
    visuals.widgets.active.bg_fill = Color32::from_rgb(90, 60, 62);
    visuals.widgets.active.bg_stroke = Stroke::new(2.0, ACCENT);

    visuals.selection.bg_fill = Color32::from_rgb(110, 50, 52);
    visuals.selection.stroke = Stroke::new(1.0, ACCENT);

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = Margin::same(12);
    style.spacing.button_padding = egui::vec2(12.0, 8.0);
    style.text_styles.insert(egui::TextStyle::Body, FontId::new(15.0, FontFamily::Proportional));
    style.text_styles.insert(egui::TextStyle::Heading, FontId::new(20.0, FontFamily::Proportional));
    style.text_styles.insert(egui::TextStyle::Button, FontId::new(15.0, FontFamily::Proportional));
    ctx.set_style(style);
}

#[derive(Clone)]
struct Row {
    key: String,
    listings: usize,
    analysis: PriceAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SortBy {
    Name,
    Median,
    Recommended,
    Listings,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SortOrder {
    Ascending,
    Descending,
}

pub struct MarketApp {
    settings: Settings,
    cache: Box<dyn AnalysisCache>,

    dump_path: String,
    loaded: bool,
    status: Option<String>,

    rows: Vec<Row>,
    filtered: Vec<Row>,
    search: String,
    hide_empty: bool,
    sort_by: SortBy,
    sort_order: SortOrder,
    selected: Option<String>,

    ship_size: SizeClass,
    ship_weight_known: bool,
    ship_weight: f64,
    shipping: ShippingCalculation,
}

impl MarketApp {
    pub fn new(settings: Settings) -> Self {
        let cache: Box<dyn AnalysisCache> = match SqliteCache::open(&settings.db_path) {
            Ok(c) => {
                let mut c = c.with_ttl(settings.cache_ttl());
                if let Err(e) = c.clear_expired(Utc::now()) {
                    warn!(error = %e, "could not clear expired analyses");
                }
                Box::new(c)
            }
            Err(e) => {
                warn!(error = %e, path = %settings.db_path.display(), "cache unavailable, keeping results in memory");
                Box::new(MemoryCache::new(settings.cache_ttl()))
            }
        };
        let dump_path = settings
            .search_dump
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let mut app = Self {
            settings,
            cache,
            dump_path,
            loaded: false,
            status: None,
            rows: vec![],
            filtered: vec![],
            search: String::new(),
            hide_empty: false,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Ascending,
            selected: None,
            ship_size: SizeClass::Small,
            ship_weight_known: false,
            ship_weight: 0.5,
            shipping: calculate_shipping(SizeClass::Small, None),
        };
        if !app.dump_path.is_empty() {
            app.load_data();
        }
        app
    }

    fn load_data(&mut self) {
        let groups = match load_search_dump(&self.dump_path, self.settings.max_listings) {
            Ok(g) => g,
            Err(e) => {
                warn!(error = %e, path = %self.dump_path, "could not load search dump");
                self.status = Some(format!("Could not load {}: {e}", self.dump_path));
                return;
            }
        };

        let results = match analyze_cached_batch(&mut *self.cache, groups, Utc::now()) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "cached analysis failed");
                self.status = Some(format!("Analysis failed: {e}"));
                return;
            }
        };

        let hits = results.iter().filter(|r| r.from_cache).count();
        let rows: Vec<Row> = results
            .into_iter()
            .map(|r| Row {
                key: r.key,
                listings: r.listings,
                analysis: r.analysis,
            })
            .collect();

        info!(products = rows.len(), cached = hits, "market data loaded");
        self.status = Some(format!("{} products ({} from cache)", rows.len(), hits));
        self.rows = rows;
        self.apply_filters();
        self.loaded = true;
    }

    fn apply_filters(&mut self) {
        let mut filtered = self.rows.clone();

        if self.hide_empty {
            filtered.retain(|r| r.analysis.has_data());
        }

        if !self.search.is_empty() {
            let search_lower = self.search.to_lowercase();
            filtered.retain(|r| r.key.to_lowercase().contains(&search_lower));
        }

        filtered.sort_by(|a, b| {
            let ord = match self.sort_by {
                SortBy::Name => a.key.cmp(&b.key),
                SortBy::Median => a.analysis.statistics.median.cmp(&b.analysis.statistics.median),
                SortBy::Recommended => a
                    .analysis
                    .statistics
                    .recommended_price
                    .cmp(&b.analysis.statistics.recommended_price),
                SortBy::Listings => a.listings.cmp(&b.listings),
            };
            if self.sort_order == SortOrder::Descending { ord.reverse() } else { ord }
        });

        self.filtered = filtered;
    }

    fn recalc_shipping(&mut self) {
        let weight = self.ship_weight_known.then_some(self.ship_weight);
        self.shipping = calculate_shipping(self.ship_size, weight);
    }

    fn source_badge(ui: &mut egui::Ui, source: PriceSource) {
        let (text, color) = match source {
            PriceSource::Sold => ("● sold", Color32::from_rgb(100, 220, 130)),
            PriceSource::Asking => ("◐ asking", Color32::from_rgb(230, 200, 90)),
            PriceSource::None => ("○ no data", MUTED),
        };
        ui.label(RichText::new(text).color(color));
    }

    fn shipping_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading(RichText::new("📦 Shipping").color(ACCENT));
        ui.separator();

        let mut changed = false;
        egui::ComboBox::from_id_salt("ship_size")
            .selected_text(self.ship_size.as_str())
            .show_ui(ui, |ui| {
                for size in SizeClass::ALL {
                    changed |= ui.selectable_value(&mut self.ship_size, size, size.as_str()).changed();
                }
            });

        ui.horizontal(|ui| {
            changed |= ui.checkbox(&mut self.ship_weight_known, "Weight").changed();
            ui.add_enabled_ui(self.ship_weight_known, |ui| {
                changed |= ui
                    .add(egui::DragValue::new(&mut self.ship_weight).speed(0.05).range(0.0..=30.0).suffix(" kg"))
                    .changed();
            });
        });

        if changed {
            self.recalc_shipping();
        }

        ui.add_space(8.0);
        if self.shipping.methods.is_empty() {
            ui.label(RichText::new("No service fits this package").color(MUTED));
            return;
        }

        egui::ScrollArea::vertical().id_salt("ship_methods").show(ui, |ui| {
            for m in &self.shipping.methods {
                let best = m.name == self.shipping.recommended;
                let name = RichText::new(&m.name);
                let name = if best { name.color(ACCENT).strong() } else { name };
                ui.horizontal(|ui| {
                    ui.label(name);
                    ui.label(RichText::new(format_yen(i64::from(m.cost))).color(HEADER));
                });
                ui.label(RichText::new(&m.description).small().color(MUTED));
                ui.add_space(4.0);
            }
        });
    }

    fn detail_panel(ui: &mut egui::Ui, row: &Row) {
        let a = &row.analysis;
        let s = &a.statistics;

        egui::Frame::new()
            .fill(Color32::from_rgb(34, 30, 32))
            .stroke(Stroke::new(2.0, Color32::from_rgb(90, 60, 62)))
            .inner_margin(Margin::same(12))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(&row.key).color(ACCENT).strong().size(16.0));
                    Self::source_badge(ui, a.source);
                    ui.label(
                        RichText::new(format!(
                            "{} sold · {} outliers removed · {}",
                            a.sold_prices.len(),
                            a.outliers_removed,
                            a.analyzed_at.format("%Y-%m-%d %H:%M")
                        ))
                        .color(MUTED)
                        .italics(),
                    );
                });

                if !a.has_data() {
                    ui.label(RichText::new("No usable price data").color(MUTED));
                    return;
                }

                ui.horizontal(|ui| {
                    for (label, value) in [
                        ("Min", s.min),
                        ("Median", s.median),
                        ("Average", s.average),
                        ("Max", s.max),
                    ] {
                        ui.label(RichText::new(format!("{label}: {}", format_yen(value))).color(HEADER));
                        ui.separator();
                    }
                    ui.label(
                        RichText::new(format!("Suggested: {}", format_yen(s.recommended_price)))
                            .color(Color32::from_rgb(120, 230, 150))
                            .strong(),
                    );
                });

                let bars: Vec<Bar> = a
                    .price_distribution
                    .iter()
                    .map(|b| {
                        Bar::new(b.price + DEFAULT_BUCKET_WIDTH / 2.0, b.count as f64)
                            .width(DEFAULT_BUCKET_WIDTH * 0.9)
                            .name(format!("{}〜", format_yen(b.price as i64)))
                    })
                    .collect();
                let chart = BarChart::new("Listings per ¥1,000", bars).color(ACCENT);

                Plot::new(("distribution", &row.key))
                    .height(200.0)
                    .allow_scroll(false)
                    .show(ui, |plot_ui| plot_ui.bar_chart(chart));
            });
    }
}

impl eframe::App for MarketApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.heading(RichText::new("Mercari Price Analyzer").color(ACCENT).strong().size(22.0));
            ui.separator();

            ui.horizontal(|ui| {
                ui.label(RichText::new("Search dump:").color(HEADER));
                ui.add(
                    egui::TextEdit::singleline(&mut self.dump_path)
                        .hint_text("path/to/search_dump.json")
                        .desired_width(320.0),
                );
                if ui
                    .add_sized(Vec2::new(100.0, 30.0), egui::Button::new(RichText::new("🔍 Analyze").strong()))
                    .clicked()
                {
                    self.load_data();
                }

                ui.separator();

                ui.label(RichText::new("🔎").color(HEADER));
                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search)
                        .hint_text("Filter products...")
                        .desired_width(200.0),
                );
                if search.changed() && self.loaded {
                    self.apply_filters();
                }

                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(RichText::new(status).color(MUTED));
                }
            });
            ui.add_space(2.0);
        });

        if self.settings.show_shipping_calc {
            egui::SidePanel::right("shipping")
                .min_width(260.0)
                .max_width(360.0)
                .show(ctx, |ui| self.shipping_panel(ui));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if !self.loaded {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Load a search dump to analyze market prices").size(20.0).color(MUTED));
                });
                return;
            }

            ui.horizontal(|ui| {
                if ui.checkbox(&mut self.hide_empty, "Hide products without data").changed() {
                    self.apply_filters();
                }
                ui.separator();
                egui::ComboBox::from_id_salt("sort_by")
                    .selected_text(format!("{:?}", self.sort_by))
                    .show_ui(ui, |ui| {
                        for sort in [SortBy::Name, SortBy::Median, SortBy::Recommended, SortBy::Listings] {
                            if ui.selectable_value(&mut self.sort_by, sort, format!("{sort:?}")).clicked() {
                                self.apply_filters();
                            }
                        }
                    });
                let asc = ui.selectable_value(&mut self.sort_order, SortOrder::Ascending, "⬆ Asc").clicked();
                let desc = ui.selectable_value(&mut self.sort_order, SortOrder::Descending, "⬇ Desc").clicked();
                if asc || desc {
                    self.apply_filters();
                }
            });

            if self.filtered.is_empty() {
                ui.label(RichText::new("No products match your filters").color(MUTED));
                return;
            }

            let show_suggestion = self.settings.auto_suggest_price;
            let table_height = (ui.available_height() * 0.5).max(200.0);

            TableBuilder::new(ui)
                .striped(true)
                .vscroll(true)
                .max_scroll_height(table_height)
                .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
                .column(Column::remainder().at_least(200.0).clip(true))
                .column(Column::exact(100.0))
                .column(Column::exact(70.0))
                .column(Column::exact(100.0))
                .column(Column::exact(100.0))
                .column(Column::exact(100.0))
                .column(Column::exact(110.0))
                .column(Column::exact(50.0))
                .header(28.0, |mut header| {
                    for title in ["Product", "Source", "Items", "Min", "Median", "Max", "Suggested", "📋"] {
                        header.col(|ui| {
                            ui.label(RichText::new(title).color(HEADER).strong());
                        });
                    }
                })
                .body(|body| {
                    body.rows(30.0, self.filtered.len(), |mut row| {
                        let r = &self.filtered[row.index()];
                        let s = &r.analysis.statistics;
                        let is_selected = self.selected.as_deref() == Some(r.key.as_str());

                        row.col(|ui| {
                            let text = RichText::new(&r.key);
                            let text = if is_selected { text.color(ACCENT).strong() } else { text };
                            if ui.selectable_label(is_selected, text).clicked() {
                                self.selected = if is_selected { None } else { Some(r.key.clone()) };
                            }
                        });
                        row.col(|ui| Self::source_badge(ui, r.analysis.source));
                        row.col(|ui| {
                            ui.label(r.listings.to_string());
                        });
                        for value in [s.min, s.median, s.max] {
                            row.col(|ui| {
                                ui.label(format_yen(value));
                            });
                        }
                        row.col(|ui| {
                            if show_suggestion {
                                ui.label(
                                    RichText::new(format_yen(s.recommended_price))
                                        .color(Color32::from_rgb(120, 230, 150))
                                        .strong(),
                                );
                            } else {
                                ui.label(RichText::new("—").color(MUTED));
                            }
                        });
                        row.col(|ui| {
                            if ui.button("📋").on_hover_text("Copy summary").clicked() {
                                ui.ctx().copy_text(summary_text(&r.key, &r.analysis));
                            }
                        });
                    });
                });

            if let Some(key) = &self.selected {
                if let Some(r) = self.filtered.iter().find(|r| &r.key == key) {
                    ui.add_space(10.0);
                    Self::detail_panel(ui, r);
                }
            }
        });
    }
}

fn summary_text(key: &str, a: &PriceAnalysis) -> String {
    let s = &a.statistics;
    format!(
        "{key}:\nMin: {}\nMedian: {}\nAverage: {}\nMax: {}\nSuggested: {}",
        format_yen(s.min),
        format_yen(s.median),
        format_yen(s.average),
        format_yen(s.max),
        format_yen(s.recommended_price),
    )
}

fn format_yen(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 { format!("-¥{out}") } else { format!("¥{out}") }
}
