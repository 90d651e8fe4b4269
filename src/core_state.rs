//! Session state shared by every HTTP handler.
//!
//! One `CoreState` holds the editable field map, the loaded template and
//! the user-visible activity log. Extraction, template upload, edits and
//! rendering are serialized through an async gate; the `RwLock`s are only
//! held for short synchronous sections.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Settings;
use crate::models::{FieldKey, FieldMap, FieldSnapshot};
use crate::pipeline::extraction::{DocumentTextExtractor, ExtractionError, SourceTextExtractor};
use crate::pipeline::fields::{ExtractedFields, FieldExtractor};
use crate::pipeline::import::{check_upload_size, detect_format, ImportError, SourceFormat};
use crate::pipeline::template::{
    default_template, expand_aliases, missing_tokens, output_file_name, render, scan_tokens,
    PartRole, TemplateDocument, TemplateError, TokenSet,
};

/// Oldest entries are dropped past this size.
pub const ACTIVITY_LOG_CAPACITY: usize = 200;

/// Name shown for the built-in layout.
pub const BUILTIN_TEMPLATE_NAME: &str = "built-in Randomization Plan";

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

// ═══════════════════════════════════════════════════════════
// Activity log
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    Pdf,
    Docx,
    Text,
    Template,
    Render,
    Edit,
    Api,
}

impl LogSource {
    fn for_format(format: SourceFormat) -> Self {
        match format {
            SourceFormat::Pdf => Self::Pdf,
            SourceFormat::Docx => Self::Docx,
            SourceFormat::PlainText | SourceFormat::Unsupported => Self::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
    pub message: String,
}

/// Bounded, newest-last log of what the session did.
pub struct ActivityLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl ActivityLog {
    /// A capacity of 0 behaves like 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, source: LogSource, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(source = ?source, "{message}");
        if let Ok(mut entries) = self.entries.lock() {
            while entries.len() >= self.capacity.max(1) {
                entries.pop_front();
            }
            entries.push_back(LogEntry {
                timestamp: Utc::now(),
                source,
                message,
            });
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(ACTIVITY_LOG_CAPACITY)
    }
}

// ═══════════════════════════════════════════════════════════
// Views returned to the transport layer
// ═══════════════════════════════════════════════════════════

/// A parsed template and its token set. Immutable once loaded.
#[derive(Debug)]
pub struct LoadedTemplate {
    pub name: String,
    pub builtin: bool,
    pub document: TemplateDocument,
    pub tokens: TokenSet,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedTemplate {
    fn new(name: String, builtin: bool, document: TemplateDocument) -> Self {
        let tokens = scan_tokens(&document);
        let fingerprint = document.fingerprint();
        Self {
            name,
            builtin,
            document,
            tokens,
            fingerprint,
            loaded_at: Utc::now(),
        }
    }

    fn builtin() -> Result<Self, TemplateError> {
        Ok(Self::new(BUILTIN_TEMPLATE_NAME.to_string(), true, default_template()?))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartSummary {
    pub name: String,
    pub role: PartRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub name: String,
    pub builtin: bool,
    pub fingerprint: String,
    pub size_bytes: usize,
    pub parts: Vec<PartSummary>,
    pub tokens: TokenSet,
    /// Tokens the current fields cannot fill yet.
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    pub format: SourceFormat,
    pub characters: usize,
    pub extracted: ExtractedFields,
    pub updated: Vec<FieldKey>,
    pub fields: Vec<FieldSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldsView {
    pub values: FieldMap,
    pub entries: Vec<FieldSnapshot>,
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EditOutcome {
    pub updated: Vec<FieldKey>,
    pub custom: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub tokens: TokenSet,
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    settings: Settings,
    extractor: Arc<dyn SourceTextExtractor + Send + Sync>,
    field_extractor: Arc<FieldExtractor>,
    fields: RwLock<FieldMap>,
    custom: RwLock<BTreeMap<String, String>>,
    template: RwLock<Option<Arc<LoadedTemplate>>>,
    log: ActivityLog,
    /// Serializes user-triggered operations.
    op_gate: tokio::sync::Mutex<()>,
}

impl CoreState {
    pub fn new(settings: Settings) -> Self {
        Self::with_extractor(settings, Arc::new(DocumentTextExtractor::default()))
    }

    pub fn with_extractor(
        settings: Settings,
        extractor: Arc<dyn SourceTextExtractor + Send + Sync>,
    ) -> Self {
        Self {
            settings,
            extractor,
            field_extractor: Arc::new(FieldExtractor::builtin()),
            fields: RwLock::new(FieldMap::new()),
            custom: RwLock::new(BTreeMap::new()),
            template: RwLock::new(None),
            log: ActivityLog::default(),
            op_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    fn read_fields(&self) -> Result<RwLockReadGuard<'_, FieldMap>, CoreError> {
        self.fields.read().map_err(|_| CoreError::LockPoisoned)
    }

    fn write_fields(&self) -> Result<RwLockWriteGuard<'_, FieldMap>, CoreError> {
        self.fields.write().map_err(|_| CoreError::LockPoisoned)
    }

    fn read_custom(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, String>>, CoreError> {
        self.custom.read().map_err(|_| CoreError::LockPoisoned)
    }

    /// Current values under every accepted spelling.
    fn substitution_values(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let fields = self.read_fields()?;
        let custom = self.read_custom()?;
        Ok(expand_aliases(&fields, &custom))
    }

    /// The uploaded template, or the built-in layout when none is loaded.
    fn current_template(&self) -> Result<Arc<LoadedTemplate>, CoreError> {
        let loaded = self
            .template
            .read()
            .map_err(|_| CoreError::LockPoisoned)?
            .clone();
        match loaded {
            Some(template) => Ok(template),
            None => Ok(Arc::new(LoadedTemplate::builtin()?)),
        }
    }

    // ── Source documents ────────────────────────────────────

    /// Extract metadata from a protocol document and merge it into the
    /// field map. Any failure leaves the field map untouched.
    pub async fn ingest_source(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestReport, CoreError> {
        let _gate = self.op_gate.lock().await;

        let detection = detect_format(&bytes);
        let source = LogSource::for_format(detection.format);
        if let Err(e) = check_upload_size(bytes.len(), self.settings.max_upload_bytes) {
            self.log.push(source, format!("{file_name}: rejected ({e})"));
            return Err(e.into());
        }
        if !detection.format.is_supported() {
            self.log
                .push(source, format!("{file_name}: unsupported document format"));
            return Err(ImportError::UnsupportedFormat(file_name.to_string()).into());
        }

        let format = detection.format;
        let extractor = Arc::clone(&self.extractor);
        let field_extractor = Arc::clone(&self.field_extractor);
        let outcome = tokio::task::spawn_blocking(move || {
            let text = extractor.extract(&bytes, format)?;
            let extracted = field_extractor.extract(&text);
            Ok::<_, ExtractionError>((text.as_str().chars().count(), extracted))
        })
        .await
        .unwrap_or_else(|e| Err(ExtractionError::Interrupted(e.to_string())));

        let (characters, extracted) = match outcome {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "Source text extraction failed");
                self.log
                    .push(source, format!("{file_name}: text could not be read ({e})"));
                return Err(e.into());
            }
        };

        let (updated, fields) = {
            let mut fields = self.write_fields()?;
            let updated = fields.merge_extracted(extracted.values(), self.settings.merge_mode);
            (updated, fields.snapshot())
        };

        self.log.push(
            source,
            format!(
                "{file_name}: {} field(s) found, {} updated",
                extracted.len(),
                updated.len()
            ),
        );

        Ok(IngestReport {
            file_name: file_name.to_string(),
            format,
            characters,
            extracted,
            updated,
            fields,
        })
    }

    // ── Templates ───────────────────────────────────────────

    /// Parse and scan a DOCX template. On failure the previous template
    /// stays active.
    pub async fn load_template(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<TemplateSummary, CoreError> {
        let _gate = self.op_gate.lock().await;

        if let Err(e) = check_upload_size(bytes.len(), self.settings.max_upload_bytes) {
            self.log
                .push(LogSource::Template, format!("{file_name}: rejected ({e})"));
            return Err(e.into());
        }

        let name = file_name.to_string();
        let parsed = tokio::task::spawn_blocking(move || {
            TemplateDocument::from_bytes(bytes).map(|document| LoadedTemplate::new(name, false, document))
        })
        .await
        .map_err(|e| CoreError::TaskJoin(e.to_string()))?;

        let loaded = match parsed {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(file = file_name, error = %e, "Template rejected");
                self.log
                    .push(LogSource::Template, format!("{file_name}: not a usable template ({e})"));
                return Err(e.into());
            }
        };

        self.log.push(
            LogSource::Template,
            format!("{file_name}: {} token(s) found", loaded.tokens.len()),
        );
        *self.template.write().map_err(|_| CoreError::LockPoisoned)? = Some(Arc::new(loaded));

        self.template_summary()
    }

    /// Drop the uploaded template and fall back to the built-in layout.
    pub async fn clear_template(&self) -> Result<TemplateSummary, CoreError> {
        let _gate = self.op_gate.lock().await;
        let previous = self
            .template
            .write()
            .map_err(|_| CoreError::LockPoisoned)?
            .take();
        if let Some(previous) = previous {
            self.log
                .push(LogSource::Template, format!("{}: template removed", previous.name));
        }
        self.template_summary()
    }

    pub fn template_summary(&self) -> Result<TemplateSummary, CoreError> {
        let template = self.current_template()?;
        let values = self.substitution_values()?;
        Ok(TemplateSummary {
            name: template.name.clone(),
            builtin: template.builtin,
            fingerprint: template.fingerprint.clone(),
            size_bytes: template.document.size_bytes(),
            parts: template
                .document
                .parts()
                .map(|p| PartSummary {
                    name: p.name.clone(),
                    role: p.role,
                })
                .collect(),
            tokens: template.tokens.clone(),
            missing: missing_tokens(&template.tokens, &values),
        })
    }

    // ── Fields ──────────────────────────────────────────────

    pub fn fields(&self) -> Result<FieldsView, CoreError> {
        let fields = self.read_fields()?;
        Ok(FieldsView {
            values: fields.clone(),
            entries: fields.snapshot(),
            custom: self.read_custom()?.clone(),
        })
    }

    /// Apply user edits. Names that resolve to a field (session name,
    /// token or label) become user values; anything else is kept as a
    /// custom template value.
    pub async fn apply_edits(
        &self,
        edits: BTreeMap<String, String>,
    ) -> Result<EditOutcome, CoreError> {
        let _gate = self.op_gate.lock().await;
        let mut outcome = EditOutcome::default();
        {
            let mut fields = self.write_fields()?;
            let mut custom = self.custom.write().map_err(|_| CoreError::LockPoisoned)?;
            for (name, value) in edits {
                match FieldKey::lookup(&name) {
                    Some(key) => {
                        fields.set_user(key, value);
                        outcome.updated.push(key);
                    }
                    None => {
                        let name = name.trim();
                        if name.is_empty() {
                            continue;
                        }
                        custom.insert(name.to_string(), value);
                        outcome.custom.push(name.to_string());
                    }
                }
            }
        }

        if !outcome.updated.is_empty() || !outcome.custom.is_empty() {
            let mut names: Vec<String> = outcome.updated.iter().map(|k| k.to_string()).collect();
            names.extend(outcome.custom.iter().cloned());
            self.log
                .push(LogSource::Edit, format!("edited {}", names.join(", ")));
        }
        Ok(outcome)
    }

    // ── Rendering ───────────────────────────────────────────

    /// Fill the current template. A failed render changes no state.
    pub async fn render(&self) -> Result<RenderedDocument, CoreError> {
        let _gate = self.op_gate.lock().await;

        let template = self.current_template()?;
        let values = self.substitution_values()?;
        let protocol_no = self.read_fields()?.get(FieldKey::ProtocolNo).to_string();

        let job = Arc::clone(&template);
        let rendered = tokio::task::spawn_blocking(move || {
            render(&job.document, &job.tokens, &values)
        })
        .await
        .map_err(|e| CoreError::TaskJoin(e.to_string()))?;

        match rendered {
            Ok(bytes) => {
                let file_name = output_file_name(&protocol_no);
                self.log.push(
                    LogSource::Render,
                    format!("{file_name} generated from {}", template.name),
                );
                Ok(RenderedDocument {
                    file_name,
                    bytes,
                    tokens: template.tokens.clone(),
                })
            }
            Err(e) => {
                tracing::warn!(template = %template.name, error = %e, "Render failed");
                self.log
                    .push(LogSource::Render, format!("render failed: {e}"));
                Err(e.into())
            }
        }
    }

    // ── Session ─────────────────────────────────────────────

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.entries()
    }

    /// Back to a fresh session: default fields, no custom values, built-in
    /// template, empty log.
    pub async fn reset(&self) -> Result<(), CoreError> {
        let _gate = self.op_gate.lock().await;
        *self.write_fields()? = FieldMap::new();
        self.custom
            .write()
            .map_err(|_| CoreError::LockPoisoned)?
            .clear();
        *self.template.write().map_err(|_| CoreError::LockPoisoned)? = None;
        self.log.clear();
        self.log.push(LogSource::Api, "session reset");
        Ok(())
    }
}
