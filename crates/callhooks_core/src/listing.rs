//! Tabular listing of registered callbacks.

use core::fmt;
use std::collections::BTreeSet;

use crate::id::CallbackId;
use crate::options::{OptionKey, Options};
use crate::priority::Priority;

/// One callback as seen by a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackRow {
    /// Id the callback is stored under.
    pub id: CallbackId,
    /// Dispatch priority.
    pub priority: Priority,
    /// Position in its event's dispatch order.
    pub order: usize,
    /// Name of the event holding the callback.
    pub event: String,
    /// Resolved options.
    pub options: Options,
}

/// Every callback visible through a registry, event by event in dispatch
/// order.
///
/// `Display` renders a fixed-width table: id, priority, order and event
/// columns followed by one column per option key seen in any row, sorted by
/// name. Rows lacking an option show `N/A`.
///
/// ```text
/// Label                                   Priority   Order   Event            Handles exception  Pass args  Pass result
/// a                                       0.0        0       on_call          N/A                false      N/A
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackTable {
    rows: Vec<CallbackRow>,
}

impl CallbackTable {
    pub(crate) fn new(rows: Vec<CallbackRow>) -> Self {
        Self { rows }
    }

    /// Rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[CallbackRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no callback is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn option_keys(&self) -> BTreeSet<OptionKey> {
        self.rows.iter().flat_map(|row| row.options.keys()).collect()
    }
}

fn line(id: &str, priority: &str, order: &str, event: &str, options: &str) -> String {
    format!("{id:<38}  {priority:<9}  {order:<6}  {event:<15}  {options}")
}

fn option_cells<'a>(keys: &BTreeSet<OptionKey>, mut cell: impl FnMut(OptionKey) -> &'a str) -> String {
    keys.iter()
        .map(|key| format!("{:<width$}", cell(*key), width = key.as_str().len()))
        .collect::<Vec<_>>()
        .join("  ")
}

impl fmt::Display for CallbackTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.option_keys();
        let headings: Vec<(OptionKey, String)> = keys.iter().map(|key| (*key, key.heading())).collect();
        let header = option_cells(&keys, |key| {
            headings
                .iter()
                .find(|(k, _)| *k == key)
                .map_or("", |(_, heading)| heading.as_str())
        });
        f.write_str(&line("Label", "Priority", "Order", "Event", &header))?;

        for row in &self.rows {
            let cells = option_cells(&keys, |key| match row.options.get(key) {
                Some(true) => "true",
                Some(false) => "false",
                None => "N/A",
            });
            let text = line(
                &row.id.to_string(),
                &row.priority.to_string(),
                &row.order.to_string(),
                &row.event,
                &cells,
            );
            write!(f, "\n{}", text.trim_end())?;
        }
        Ok(())
    }
}
