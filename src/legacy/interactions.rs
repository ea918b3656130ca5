use serde::Serialize;

use crate::legacy::markup::{self, Element};

pub const INTERACTION_COLUMNS: [&str; 5] = [
    "Interaction",
    "Interaction type",
    "Confidence",
    "MI score",
    "# Interactions",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRow {
    #[serde(rename = "Interaction")]
    pub interaction: String,
    #[serde(rename = "Interaction type")]
    pub interaction_type: String,
    #[serde(rename = "Confidence")]
    pub confidence: String,
    #[serde(rename = "MI score")]
    pub mi_score: String,
    #[serde(rename = "# Interactions")]
    pub interactions: String,
}

/// Rows of the `sortable` interaction table. A page without the table yields
/// no rows. Cells are matched to columns by header text, falling back to
/// position when the page has no recognisable header.
pub fn parse_interactions(html: &str) -> Vec<InteractionRow> {
    let Some(table) = markup::elements(html, "table")
        .into_iter()
        .find(|table| {
            table
                .attr("class")
                .is_some_and(|class| class.split_whitespace().any(|c| c == "sortable"))
        })
    else {
        return Vec::new();
    };

    let headers = markup::first(table.inner, "thead")
        .map(|thead| {
            markup::elements(thead.inner, "th")
                .iter()
                .map(Element::text)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let column_index = |name: &str, fallback: usize| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .unwrap_or(fallback)
    };
    let positions: Vec<usize> = INTERACTION_COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, name)| column_index(name, idx))
        .collect();

    let body = markup::first(table.inner, "tbody")
        .map(|tbody| tbody.inner)
        .unwrap_or(table.inner);

    let mut rows = Vec::new();
    for tr in markup::elements(body, "tr") {
        let cells = row_cells(tr.inner);
        if cells.is_empty() {
            continue;
        }
        let cell = |col: usize| cells.get(positions[col]).cloned().unwrap_or_default();
        rows.push(InteractionRow {
            interaction: cell(0),
            interaction_type: cell(1),
            confidence: cell(2),
            mi_score: cell(3),
            interactions: cell(4),
        });
    }
    rows
}

/// `<td>` and `<th>` cells in document order.
fn row_cells(row: &str) -> Vec<String> {
    let mut cells = markup::elements(row, "td")
        .into_iter()
        .chain(markup::elements(row, "th"))
        .map(|cell| (cell.open_tag.as_ptr() as usize, cell.text()))
        .collect::<Vec<_>>();
    cells.sort_by_key(|(offset, _)| *offset);
    cells.into_iter().map(|(_, text)| text).collect()
}
