//! Editing state of the CTF name list.
//!
//! The list is shown as a sequence of text rows. There are never more than
//! [`MAX_CTF_ENTRIES`] rows, and the add control is only offered while there is
//! room for another one. Saving prunes blank and repeated rows before
//! persisting, without telling the user about them.

use tracing::{info, warn};
use thiserror::Error;

use crate::{
    data::UserID,
    db::{DocumentStore, ProfileClient, StoreError, MAX_CTF_ENTRIES, MAX_ENTRY_NAME_LEN},
    guard::InFlight,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub text: String,
}

impl Row {
    pub fn new(text: &str) -> Self {
        Self { text: text.chars().take(MAX_ENTRY_NAME_LEN).collect() }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditorError {
    #[error("Your previous changes are still being saved")]
    Busy,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CtfNameEditor {
    rows: Vec<Row>,
    focus: Option<usize>,
}

impl CtfNameEditor {
    /// Rows for freshly loaded names. An empty list still gets one empty row
    /// so there is somewhere to type the first entry.
    pub fn load(names: Vec<String>) -> Self {
        let mut rows = names.iter().map(|name| Row::new(name)).collect::<Vec<_>>();
        rows.truncate(MAX_CTF_ENTRIES);
        if rows.is_empty() {
            rows.push(Row::default());
        }
        Self { rows, focus: None }
    }

    /// Rows as they were submitted, in display order.
    pub fn from_rows<I, T>(texts: I) -> Self
        where I: IntoIterator<Item = T>, T: AsRef<str> {
        let rows = texts.into_iter()
            .take(MAX_CTF_ENTRIES)
            .map(|text| Row::new(text.as_ref()))
            .collect();
        Self { rows, focus: None }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row the page should scroll to, if any.
    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn is_add_visible(&self) -> bool {
        self.rows.len() < MAX_CTF_ENTRIES
    }

    /// Appends an empty row. Does nothing once the list is full.
    pub fn add_row(&mut self) -> bool {
        if !self.is_add_visible() {
            return false;
        }
        self.rows.push(Row::default());
        self.focus = Some(self.rows.len() - 1);
        true
    }

    pub fn remove_row(&mut self, index: usize) -> Option<Row> {
        if index >= self.rows.len() {
            return None;
        }
        self.focus = None;
        Some(self.rows.remove(index))
    }

    /// Drops blank rows and rows repeating an earlier one, returning what is left.
    /// Names are compared after trimming, case-sensitively.
    pub fn prune(&mut self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        self.rows.retain(|row| {
            let name = row.text.trim();
            if name.is_empty() || names.iter().any(|x| x == name) {
                false
            } else {
                names.push(name.to_string());
                true
            }
        });
        for (row, name) in self.rows.iter_mut().zip(&names) {
            row.text = name.clone();
        }
        self.focus = None;
        names
    }

    /// Prunes the rows and overwrites the stored list with the result.
    ///
    /// Pruned rows stay pruned when the write fails. Refused with
    /// [`EditorError::Busy`] while another save for `user` is running.
    pub async fn save<S: DocumentStore>(&mut self, profiles: &ProfileClient<S>, saving: &InFlight, user: &UserID) -> Result<Vec<String>, EditorError> {
        let Some(_token) = saving.try_begin(user) else {
            warn!("save for {} refused, another one is in flight", user.0);
            return Err(EditorError::Busy);
        };
        let names = self.prune();
        profiles.set_names(user, &names).await.map_err(|e| {
            warn!("saving CTF names for {} failed: {e}", user.0);
            e
        })?;
        info!("saved {} CTF names for {}", names.len(), user.0);
        Ok(names)
    }
}
