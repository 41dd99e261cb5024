//! Column Definition
//!
//! Defines table columns with their properties and cell renderers.

use crate::config::ColumnSpec;
use crate::types::JsonValue;

/// Cell renderer: receives the cell value and the whole row
pub type CellRenderer<R> = Box<dyn Fn(&JsonValue, &R) -> String + Send + Sync>;

/// Column definition for a table
pub struct Column<R> {
    /// Row field shown in this column (dotted paths reach nested fields)
    pub key: String,
    /// Column header label
    pub header: String,
    /// Whether clicking the header sorts by this column
    pub sortable: bool,
    render: CellRenderer<R>,
}

impl<R: 'static> Column<R> {
    /// Create a column rendered with `display_value`
    pub fn new(key: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            header: header.into(),
            sortable: false,
            render: Box::new(|value, _| display_value(value)),
        }
    }

    /// Create a column from its configuration
    pub fn from_spec(spec: &ColumnSpec) -> Self {
        let header = spec.header.clone().unwrap_or_else(|| spec.key.clone());
        let column = Self::new(spec.key.clone(), header);
        if spec.sortable {
            column.sortable()
        } else {
            column
        }
    }

    /// Make the column sortable
    #[must_use]
    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    /// Use a custom cell renderer
    #[must_use]
    pub fn render_with(
        mut self,
        render: impl Fn(&JsonValue, &R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.render = Box::new(render);
        self
    }

    /// Render a cell
    pub fn render_cell(&self, value: &JsonValue, row: &R) -> String {
        (self.render)(value, row)
    }
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("sortable", &self.sortable)
            .finish_non_exhaustive()
    }
}

/// Default cell text: strings unquoted, null empty, everything else as JSON
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Look up a dotted key in a serialized row
pub(crate) fn lookup<'a>(row: &'a JsonValue, key: &str) -> Option<&'a JsonValue> {
    key.split('.').try_fold(row, |value, part| value.get(part))
}
