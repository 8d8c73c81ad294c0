//! Reads ambient page state at trigger time
//!
//! Every read tolerates missing UI elements and degrades to a sentinel or an
//! empty value, logging what it could not find.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::capture::models::{CaptureContext, UNKNOWN};
use crate::page::{Page, Selector};

/// Marker that starts a fenced code block in the prompt editor
pub const CODE_FENCE: &str = "```";

/// Appended in place of a fenced code block; code is never persisted
pub const CODE_BLOCK_PLACEHOLDER: &str = "[attached blockcode]";

/// Model label locations, most specific first
static MODEL_LABEL_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        Selector::builtin("button.gds-mode-switch-button.mat-mdc-button-base .logo-pill-label-container span"),
        Selector::builtin(r#"bard-mode-switcher [data-test-id="attribution-text"] span"#),
        Selector::builtin(".current-mode-title span"),
    ]
});

static PROMPT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::builtin("rich-textarea .ql-editor"));

static ATTACHMENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::builtin(r#"uploader-file-preview-container .file-preview [data-test-id="file-name"]"#)
});

static ACCOUNT_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::builtin(r#"a[aria-label*="Account:"]"#));

static ACCOUNT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*\S.*?\s+Account:\s*(?P<name>.+?)\s*\(\s*(?P<email>[^()\s][^()]*?)\s*\)\s*$")
        .expect("failed to compile account label pattern")
});

/// Known model labels and the names they are recorded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    entries: Vec<(String, String)>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new()
            .with_entry("2.0 Flash", "2.0 Flash")
            .with_entry("2.5 Flash", "2.5 Flash")
            .with_entry("2.5 Pro", "2.5 Pro")
            .with_entry("Deep Research", "Deep Research")
    }
}

impl ModelCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, label_prefix: &str, name: &str) -> Self {
        self.entries
            .push((label_prefix.to_string(), name.to_string()));
        self
    }

    /// Name for the longest key that prefixes `label`; on equal lengths the
    /// earlier-declared key wins
    pub fn resolve(&self, label: &str) -> Option<&str> {
        let mut best: Option<&(String, String)> = None;
        for entry in &self.entries {
            if !label.starts_with(entry.0.as_str()) {
                continue;
            }
            if best.map_or(true, |b| entry.0.len() > b.0.len()) {
                best = Some(entry);
            }
        }
        best.map(|(_, name)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub name: String,
    pub email: String,
}

impl AccountIdentity {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            email: UNKNOWN.to_string(),
        }
    }
}

/// Parses `"<Provider> Account: <name> (<email>)"`
pub fn parse_account_label(label: &str) -> Option<AccountIdentity> {
    let caps = ACCOUNT_LABEL.captures(label)?;
    Some(AccountIdentity {
        name: caps["name"].trim().to_string(),
        email: caps["email"].trim().to_string(),
    })
}

/// Cuts the prompt at the first code fence and appends the placeholder
pub fn truncate_code_fence(prompt: &str) -> String {
    match prompt.find(CODE_FENCE) {
        Some(index) => {
            let before = prompt[..index].trim();
            if before.is_empty() {
                CODE_BLOCK_PLACEHOLDER.to_string()
            } else {
                format!("{} {}", before, CODE_BLOCK_PLACEHOLDER)
            }
        }
        None => prompt.to_string(),
    }
}

/// Stateless reader over the page
pub struct ContextExtractor<'a> {
    page: &'a dyn Page,
    catalog: &'a ModelCatalog,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(page: &'a dyn Page, catalog: &'a ModelCatalog) -> Self {
        Self { page, catalog }
    }

    /// One read of each kind, taken together at trigger time
    pub fn snapshot(&self) -> CaptureContext {
        let account = self.read_account_identity();
        CaptureContext {
            model_name: self.read_selected_model(),
            prompt: self.read_prompt_text(),
            attached_files: self.read_attached_files(),
            account_name: account.name,
            account_email: account.email,
        }
    }

    pub fn read_selected_model(&self) -> String {
        let label = MODEL_LABEL_SELECTORS.iter().find_map(|sel| {
            self.page
                .query(sel)
                .map(|el| el.text_content().trim().to_string())
                .filter(|text| !text.is_empty())
        });

        let Some(label) = label else {
            log::warn!(target: crate::LOG_TARGET, "Could not determine current model name");
            return UNKNOWN.to_string();
        };

        match self.catalog.resolve(&label) {
            Some(name) => name.to_string(),
            None => {
                log::info!(
                    target: crate::LOG_TARGET,
                    "Model text {:?} didn't match known prefixes, using raw text",
                    label
                );
                label
            }
        }
    }

    pub fn read_prompt_text(&self) -> String {
        match self.page.query(&PROMPT_SELECTOR) {
            Some(editor) => truncate_code_fence(editor.text_content().trim()),
            None => {
                log::warn!(target: crate::LOG_TARGET, "Prompt editor not found");
                String::new()
            }
        }
    }

    pub fn read_attached_files(&self) -> Vec<String> {
        self.page
            .query_all(&ATTACHMENT_SELECTOR)
            .iter()
            .filter_map(|el| {
                let name = el
                    .attr("title")
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| el.text_content().trim().to_string());
                (!name.is_empty()).then_some(name)
            })
            .collect()
    }

    pub fn read_account_identity(&self) -> AccountIdentity {
        let Some(label) = self
            .page
            .query(&ACCOUNT_SELECTOR)
            .and_then(|el| el.attr("aria-label").map(str::to_string))
        else {
            log::warn!(target: crate::LOG_TARGET, "Account label not found");
            return AccountIdentity::unknown();
        };

        parse_account_label(&label).unwrap_or_else(|| {
            log::warn!(
                target: crate::LOG_TARGET,
                "Could not parse account label {:?}",
                label
            );
            AccountIdentity::unknown()
        })
    }
}
