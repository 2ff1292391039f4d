//! Parsers for the HTML the GREAT result pages serve.
//!
//! These work on page source strings, with no browser attached, so the
//! whole output-dispatch layer can be exercised against canned HTML when
//! the remote site is unavailable or has drifted.

use polars::prelude::*;
use scraper::{ElementRef, Html, Selector};

use crate::errors::{GreatError, Result};
use crate::site;

/// Outcome of scraping an enrichment table. An explicitly empty result set
/// and a not-yet-rendered table are different conditions and must never be
/// conflated: the first is final, the second is retried.
#[derive(Debug)]
pub enum TableScrape {
    /// The site states that no results meet the chosen criteria.
    NoResults,
    /// The table has no cells yet; the server is still rendering.
    Pending,
    /// A populated table in the fixed 21-column enrichment schema.
    Rows(DataFrame),
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

///
/// Per-region gene associations from the first association sub-table.
///
/// The table interleaves region-name cells with gene cells; a cell without
/// a strand sign names the next region, cells with one ("Gene (+123)")
/// belong to the current region. Groups come back in input-region order,
/// one (possibly empty) group per region.
///
pub fn gene_association_lists(html: &str) -> Result<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&selector(site::SUBTABLE_CSS)).collect();
    let table = tables
        .first()
        .ok_or_else(|| GreatError::MissingElement("gene association sub-table".to_string()))?;

    let cell_selector = selector("td");
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut in_group = false;

    for cell in table.select(&cell_selector) {
        let text = text_of(cell);
        if text.contains('+') || text.contains('-') {
            current.push(text);
        } else if in_group {
            groups.push(std::mem::take(&mut current));
        } else {
            // first region-name cell; nothing accumulated yet
            in_group = true;
        }
    }
    if in_group {
        groups.push(current);
    }

    Ok(groups)
}

///
/// The gene-to-region pivot from the second association sub-table, whose
/// cells alternate gene name and region id.
///
pub fn gene_pivot(html: &str) -> Result<DataFrame> {
    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&selector(site::SUBTABLE_CSS)).collect();
    let table = tables
        .get(1)
        .ok_or_else(|| GreatError::MissingElement("gene pivot sub-table".to_string()))?;

    let cell_selector = selector("td");
    let mut genes: Vec<String> = Vec::new();
    let mut ids: Vec<String> = Vec::new();
    let cells: Vec<String> = table.select(&cell_selector).map(text_of).collect();
    for pair in cells.chunks_exact(2) {
        genes.push(pair[0].clone());
        ids.push(pair[1].clone());
    }

    Ok(DataFrame::new(vec![
        Column::new("genes".into(), genes),
        Column::new("ids".into(), ids),
    ])?)
}

///
/// Scrape the nth `<table>` of the results page into the fixed 21-column
/// enrichment schema.
///
/// Each data cell carries its value inside a `<b>` (sorted column) or a
/// `<div>`; "Loading..." placeholder cells are dropped before the
/// remaining cells are chunked into rows.
///
pub fn enrichment_table(html: &str, index: usize) -> Result<TableScrape> {
    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&selector("table")).collect();
    let Some(table) = tables.get(index) else {
        // page still rendering; the caller retries
        return Ok(TableScrape::Pending);
    };

    let cell_selector = selector("td");
    let bold_selector = selector("b");
    let div_selector = selector("div");

    let mut cells: Vec<String> = Vec::new();
    for cell in table.select(&cell_selector) {
        let raw = text_of(cell);
        if raw.contains(site::NO_RESULTS_TEXT) {
            return Ok(TableScrape::NoResults);
        }
        let text = if let Some(bold) = cell.select(&bold_selector).next() {
            text_of(bold)
        } else if let Some(div) = cell.select(&div_selector).next() {
            text_of(div)
        } else {
            raw
        };
        if text == site::LOADING_TEXT {
            continue;
        }
        cells.push(text);
    }

    let width = site::ENRICHMENT_COLUMNS.len();
    let rows: Vec<&[String]> = cells.chunks_exact(width).collect();
    if rows.is_empty() {
        return Ok(TableScrape::Pending);
    }

    let columns: Vec<Column> = site::ENRICHMENT_COLUMNS
        .iter()
        .enumerate()
        .map(|(c, name)| {
            let values: Vec<String> = rows.iter().map(|row| row[c].clone()).collect();
            Column::new((*name).into(), values)
        })
        .collect();

    Ok(TableScrape::Rows(DataFrame::new(columns)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn association_page() -> String {
        // first sub-table: region rows; second: gene/id pivot pairs
        "<html><body>
          <table class=\"gSubTable\"><tr>
            <td>0</td>
            <td>Abca1 (+4037)</td><td>Nfia (-1793)</td>
            <td>1</td>
            <td>Sox2 (+120)</td>
            <td>2</td>
          </tr></table>
          <table class=\"gSubTable\"><tr>
            <td>Abca1</td><td>0</td>
            <td>Nfia</td><td>0</td>
            <td>Sox2</td><td>1</td>
          </tr></table>
        </body></html>"
            .to_string()
    }

    fn enrichment_row(term: &str) -> String {
        let mut cells = format!("<td><b>{term}</b></td>");
        for i in 1..21 {
            cells.push_str(&format!("<td><div>v{i}</div></td>"));
        }
        // placeholder cell the live page appends while charts load
        cells.push_str("<td><div>Loading...</div></td>");
        format!("<tr>{cells}</tr>")
    }

    fn results_page(rows: &[&str]) -> String {
        let body: String = rows.iter().map(|term| enrichment_row(term)).collect();
        // tables 0 and 1: ensembl and go_process slots
        format!(
            "<html><body>
              <table><tr><td><div>other table</div></td></tr></table>
              <table>{body}</table>
            </body></html>"
        )
    }

    #[rstest]
    fn test_gene_association_grouping() {
        let groups = gene_association_lists(&association_page()).unwrap();
        assert_eq!(
            groups,
            vec![
                vec!["Abca1 (+4037)".to_string(), "Nfia (-1793)".to_string()],
                vec!["Sox2 (+120)".to_string()],
                vec![],
            ]
        );
    }

    #[rstest]
    fn test_gene_association_missing_table() {
        let err = gene_association_lists("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, GreatError::MissingElement(_)));
    }

    #[rstest]
    fn test_gene_pivot_pairs() {
        let frame = gene_pivot(&association_page()).unwrap();
        assert_eq!(frame.height(), 3);

        let genes: Vec<&str> = frame
            .column("genes")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        let ids: Vec<&str> = frame
            .column("ids")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(genes, vec!["Abca1", "Nfia", "Sox2"]);
        assert_eq!(ids, vec!["0", "0", "1"]);
    }

    #[rstest]
    fn test_enrichment_rows() {
        let html = results_page(&["GO:0006915", "GO:0008219"]);
        let TableScrape::Rows(frame) = enrichment_table(&html, 1).unwrap() else {
            panic!("expected rows");
        };

        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 21);
        let names: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(names, site::ENRICHMENT_COLUMNS.to_vec());

        let terms: Vec<&str> = frame
            .column("term_name")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(terms, vec!["GO:0006915", "GO:0008219"]);
    }

    #[rstest]
    fn test_enrichment_no_results_sentinel() {
        let html = "<html><body><table><tr>
            <td>No results meet your chosen criteria.</td>
          </tr></table></body></html>";
        assert!(matches!(
            enrichment_table(html, 0).unwrap(),
            TableScrape::NoResults
        ));
    }

    #[rstest]
    fn test_enrichment_empty_is_pending() {
        let html = "<html><body><table></table></body></html>";
        assert!(matches!(
            enrichment_table(html, 0).unwrap(),
            TableScrape::Pending
        ));
    }

    #[rstest]
    fn test_enrichment_missing_table_is_pending() {
        assert!(matches!(
            enrichment_table("<html><body></body></html>", 3).unwrap(),
            TableScrape::Pending
        ));
    }
}
