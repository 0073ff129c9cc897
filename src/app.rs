use std::path::Path;

use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::analysis;
use crate::error::{Error, Result};
use crate::gemini::GeminiClient;
use crate::image_prep::{self, PreparedImage};
use crate::model::{AnalysisResult, KeywordRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Images,
    Suggestions,
    RawData,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing into the raw-data editor.
    Editing,
    /// Typing a file path into the add-image prompt.
    PathPrompt,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub input_mode: InputMode,

    // Upload list
    pub images: Vec<PreparedImage>,
    pub image_state: ListState,
    next_image_id: usize,

    // Raw research text editor
    pub raw_data: String,
    pub raw_data_cursor: usize,

    // Add-image path prompt
    pub path_input: String,
    pub path_input_cursor: usize,

    // Keyword-idea suggestions
    pub suggested_keywords: Vec<String>,
    pub suggestions_state: ListState,

    // Latest report
    pub result: Option<AnalysisResult>,
    pub results_scroll: u16,

    // One line of feedback under the inputs
    pub error: Option<String>,
    pub status: Option<String>,

    // In-flight calls; one slot per flow, each single-flight
    pub ideas_task: Option<JoinHandle<Result<Vec<String>>>>,
    pub analyze_task: Option<JoinHandle<Result<AnalysisResult>>>,

    // Animation state (0-2 for ellipsis)
    pub animation_frame: u8,

    // Backend
    pub client: GeminiClient,
    pub model: String,
}

impl App {
    pub fn new(client: GeminiClient, model: String, images: Vec<PreparedImage>) -> Self {
        let mut image_state = ListState::default();
        if !images.is_empty() {
            image_state.select(Some(0));
        }
        let next_image_id = images.len() + 1;

        Self {
            should_quit: false,
            focus: FocusPane::Images,
            input_mode: InputMode::Normal,
            images,
            image_state,
            next_image_id,
            raw_data: String::new(),
            raw_data_cursor: 0,
            path_input: String::new(),
            path_input_cursor: 0,
            suggested_keywords: Vec::new(),
            suggestions_state: ListState::default(),
            result: None,
            results_scroll: 0,
            error: None,
            status: None,
            ideas_task: None,
            analyze_task: None,
            animation_frame: 0,
            client,
            model,
        }
    }

    // --- upload list -----------------------------------------------------

    /// Prepare one file and append it. A failure leaves the existing uploads
    /// untouched and surfaces on the error line.
    pub fn add_image(&mut self, path: &Path) {
        let id = format!("img-{}", self.next_image_id);
        match image_prep::prepare_file(&id, path) {
            Ok(prepared) => {
                self.next_image_id += 1;
                self.images.push(prepared);
                self.image_state.select(Some(self.images.len() - 1));
                self.error = None;
                self.status = Some(format!("Added {}", path.display()));
            }
            Err(err) => {
                self.error = Some(err.user_message());
            }
        }
    }

    pub fn remove_selected_image(&mut self) {
        if let Some(idx) = self.image_state.selected() {
            if idx < self.images.len() {
                self.images.remove(idx);
                if self.images.is_empty() {
                    self.image_state.select(None);
                } else {
                    self.image_state.select(Some(idx.min(self.images.len() - 1)));
                }
            }
        }
    }

    // --- flow gating -----------------------------------------------------

    pub fn ideas_loading(&self) -> bool {
        self.ideas_task.is_some()
    }

    pub fn analysis_loading(&self) -> bool {
        self.analyze_task.is_some()
    }

    /// Kick off the keyword-idea call unless one is already pending.
    pub fn start_ideas(&mut self) {
        if self.ideas_task.is_some() {
            return;
        }
        if self.images.is_empty() {
            self.error = Some("Upload at least one product image first.".to_string());
            return;
        }

        self.error = None;
        self.status = None;

        let client = self.client.clone();
        let model = self.model.clone();
        let images = self.images.clone();
        self.ideas_task = Some(tokio::spawn(async move {
            analysis::generate_keyword_ideas(&client, &model, &images).await
        }));
    }

    /// Kick off the full analysis unless one is already pending.
    pub fn start_analysis(&mut self) {
        if self.analyze_task.is_some() {
            return;
        }
        if self.images.is_empty() {
            self.error = Some("Upload at least one product image first.".to_string());
            return;
        }
        if self.raw_data.trim().is_empty() {
            self.error = Some("Paste some keyword research data first.".to_string());
            return;
        }

        self.error = None;
        self.status = None;

        let client = self.client.clone();
        let model = self.model.clone();
        let images = self.images.clone();
        let raw_data = self.raw_data.clone();
        self.analyze_task = Some(tokio::spawn(async move {
            analysis::analyze_seo_data(&client, &model, &images, &raw_data).await
        }));
    }

    /// Reap finished request tasks and apply their outcomes. Called from the
    /// main loop on every tick; each flow is independent.
    pub async fn poll_tasks(&mut self) {
        if self
            .ideas_task
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(false)
        {
            if let Some(task) = self.ideas_task.take() {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(Error::Generation(join_err.to_string())),
                };
                self.finish_ideas(outcome);
            }
        }

        if self
            .analyze_task
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(false)
        {
            if let Some(task) = self.analyze_task.take() {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => Err(Error::Analysis(join_err.to_string())),
                };
                self.finish_analysis(outcome);
            }
        }
    }

    // --- transitions -----------------------------------------------------

    pub fn finish_ideas(&mut self, outcome: Result<Vec<String>>) {
        match outcome {
            Ok(suggestions) => {
                self.suggestions_state
                    .select(if suggestions.is_empty() { None } else { Some(0) });
                self.suggested_keywords = suggestions;
                self.error = None;
            }
            Err(err) => {
                // Prior suggestions stay usable.
                self.error = Some(err.user_message());
            }
        }
    }

    pub fn finish_analysis(&mut self, outcome: Result<AnalysisResult>) {
        match outcome {
            Ok(result) => {
                // Wholesale replacement, never a merge.
                self.result = Some(result);
                self.results_scroll = 0;
                self.error = None;
            }
            Err(err) => {
                // Last successful report stays on screen.
                self.error = Some(err.user_message());
            }
        }
    }

    // --- presentation helpers --------------------------------------------

    /// Rows for the table, highest search volume first. Render-time only;
    /// the result's own keyword order is never touched.
    pub fn sorted_keywords(&self) -> Vec<&KeywordRecord> {
        let mut rows: Vec<&KeywordRecord> = self
            .result
            .iter()
            .flat_map(|r| r.keywords.iter())
            .collect();
        rows.sort_by(|a, b| {
            b.search_volume
                .partial_cmp(&a.search_volume)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// Write the suggestion list to a file, one phrase per line, for pasting
    /// into a research tool.
    pub fn export_suggestions(&mut self, path: &Path) {
        if self.suggested_keywords.is_empty() {
            self.error = Some("No keyword ideas to export yet.".to_string());
            return;
        }
        let text = self.suggested_keywords.join("\n");
        match std::fs::write(path, text) {
            Ok(()) => {
                self.status = Some(format!("Saved {} ideas to {}", self.suggested_keywords.len(), path.display()));
                self.error = None;
            }
            Err(err) => self.error = Some(format!("Could not write {}: {}", path.display(), err)),
        }
    }

    pub fn tick_animation(&mut self) {
        if self.ideas_loading() || self.analysis_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
