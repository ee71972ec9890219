// 📋 Override table - forced participant -> group assignments
// Loaded from a remote sheet or a local CSV; a failed load is never fatal,
// the draw keeps running on whatever table it already had.

use crate::groups::GroupConfig;
use crate::participant::ParticipantKey;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default cell range for the sheet source (header row excluded)
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A2:B100";

// ============================================================================
// OVERRIDE TABLE
// ============================================================================

/// Mapping from participant key to forced group label.
/// Read-only from the engine's perspective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideTable {
    entries: HashMap<ParticipantKey, String>,

    /// When this table was produced; None for the empty placeholder
    pub loaded_at: Option<DateTime<Utc>>,
}

impl OverrideTable {
    /// Build a table from raw (name, group) rows.
    ///
    /// Names normalize to keys; rows with a blank name or a label outside the
    /// configured set are skipped; a later row for the same key wins.
    pub fn from_rows<'a, I>(rows: I, config: &GroupConfig) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = OverrideTable {
            entries: HashMap::new(),
            loaded_at: Some(Utc::now()),
        };
        for (name, group) in rows {
            table.insert_row(name, group, config);
        }
        table
    }

    fn insert_row(&mut self, name: &str, group: &str, config: &GroupConfig) {
        let group = group.trim();
        if !config.contains(group) {
            return;
        }
        if let Some(key) = ParticipantKey::new(name) {
            self.entries.insert(key, group.to_string());
        }
    }

    /// Forced group for this key, if the table has one
    pub fn get(&self, key: &ParticipantKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SOURCES
// ============================================================================

/// Where override rows come from
#[derive(Debug, Clone)]
pub enum OverrideSource {
    /// Google Sheets values endpoint.
    /// Identifier and key are configuration, never compiled in.
    Sheet {
        sheet_id: String,
        api_key: String,
        range: String,
    },

    /// Local CSV file with one name,group row per line
    Csv(PathBuf),
}

/// Payload shape of the sheet values endpoint
#[derive(Debug, Deserialize)]
struct SheetValues {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Fetch and parse an override table from the configured source.
///
/// Errors are returned so the caller can decide what to keep; see
/// [`load_or_keep`] for the degrade-and-continue wrapper.
pub async fn load(
    source: &OverrideSource,
    client: &reqwest::Client,
    config: &GroupConfig,
) -> Result<OverrideTable> {
    match source {
        OverrideSource::Sheet {
            sheet_id,
            api_key,
            range,
        } => load_sheet(sheet_id, api_key, range, client, config).await,
        OverrideSource::Csv(path) => load_csv(path, config),
    }
}

/// Load a fresh table, falling back to `prior` on any failure.
/// A broken source degrades to override-free balancing, it never stops the
/// draw.
pub async fn load_or_keep(
    source: &OverrideSource,
    client: &reqwest::Client,
    config: &GroupConfig,
    prior: OverrideTable,
) -> OverrideTable {
    match load(source, client, config).await {
        Ok(table) => {
            info!(rows = table.len(), "override table loaded");
            table
        }
        Err(err) => {
            warn!("override load failed, keeping previous table: {err:#}");
            prior
        }
    }
}

async fn load_sheet(
    sheet_id: &str,
    api_key: &str,
    range: &str,
    client: &reqwest::Client,
    config: &GroupConfig,
) -> Result<OverrideTable> {
    let url = format!(
        "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}?key={}",
        sheet_id, range, api_key
    );

    let response = client
        .get(&url)
        .send()
        .await
        .context("override sheet request failed")?
        .error_for_status()
        .context("override sheet returned an error status")?;

    let payload = response
        .text()
        .await
        .context("failed to read override sheet body")?;

    parse_sheet_payload(&payload, config)
}

/// Parse the JSON body of a sheet values response
fn parse_sheet_payload(payload: &str, config: &GroupConfig) -> Result<OverrideTable> {
    let body: SheetValues =
        serde_json::from_str(payload).context("override sheet payload was not valid JSON")?;

    // Rows shorter than two cells are malformed and skipped
    let rows = body.values.iter().filter_map(|row| match row.as_slice() {
        [name, group, ..] => Some((name.as_str(), group.as_str())),
        _ => None,
    });

    Ok(OverrideTable::from_rows(rows, config))
}

/// Load overrides from a local CSV file (no header expected)
pub fn load_csv(path: &Path, config: &GroupConfig) -> Result<OverrideTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open override CSV: {:?}", path))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read override CSV row")?;
        if let (Some(name), Some(group)) = (record.get(0), record.get(1)) {
            rows.push((name.to_string(), group.to_string()));
        }
    }

    Ok(OverrideTable::from_rows(
        rows.iter().map(|(n, g)| (n.as_str(), g.as_str())),
        config,
    ))
}

// ============================================================================
// TESTS
// ============================================================================
