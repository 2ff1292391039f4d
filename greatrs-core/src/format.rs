//! Region Formatter: normalize caller-supplied region data into the fixed
//! BED column layout GREAT expects.
//!
//! Input can be an already-labeled frame, unlabeled rows, or a file path
//! (spreadsheet first, delimited text as fallback). Output is always a
//! [`RegionSet`] whose columns are a subset of the nine recognized BED
//! columns, in a fixed priority order, with chromosome/start/end mandatory.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, warn};
use polars::prelude::*;

use crate::errors::{GreatError, Result};
use crate::models::RegionSet;

/// Caller-chosen names for the nine recognized BED columns, in priority
/// order: chr, start, end, index, score, strand, thickStart, thickEnd, rgb.
#[derive(Debug, Clone)]
pub struct BedColumns {
    pub chr: String,
    pub start: String,
    pub end: String,
    pub index: String,
    pub score: String,
    pub strand: String,
    pub thick_start: String,
    pub thick_end: String,
    pub rgb: String,
}

impl Default for BedColumns {
    fn default() -> Self {
        BedColumns {
            chr: "chr".to_string(),
            start: "start".to_string(),
            end: "end".to_string(),
            index: "index".to_string(),
            score: "score".to_string(),
            strand: "strand".to_string(),
            thick_start: "thickStart".to_string(),
            thick_end: "thickEnd".to_string(),
            rgb: "rgb".to_string(),
        }
    }
}

impl BedColumns {
    /// The nine column names in their fixed priority order.
    pub fn priority_order(&self) -> [&str; 9] {
        [
            &self.chr,
            &self.start,
            &self.end,
            &self.index,
            &self.score,
            &self.strand,
            &self.thick_start,
            &self.thick_end,
            &self.rgb,
        ]
    }
}

/// The accepted input shapes for region data.
#[derive(Debug, Clone)]
pub enum RegionInput {
    /// A labeled table; columns are matched by the caller's names.
    Frame(DataFrame),
    /// Unlabeled rows; columns are named positionally in priority order.
    Rows(Vec<Vec<String>>),
    /// A file on disk: spreadsheet load first, delimited text on failure.
    File(PathBuf),
}

impl From<DataFrame> for RegionInput {
    fn from(frame: DataFrame) -> Self {
        RegionInput::Frame(frame)
    }
}

impl From<Vec<Vec<String>>> for RegionInput {
    fn from(rows: Vec<Vec<String>>) -> Self {
        RegionInput::Rows(rows)
    }
}

impl From<PathBuf> for RegionInput {
    fn from(path: PathBuf) -> Self {
        RegionInput::File(path)
    }
}

impl From<&Path> for RegionInput {
    fn from(path: &Path) -> Self {
        RegionInput::File(path.to_path_buf())
    }
}

///
/// Normalize region data into the fixed BED layout.
///
/// Resolved columns keep the priority order; chromosome, start and end are
/// mandatory; start/end are coerced to integers; when fewer than four
/// columns resolve, a zero-based index column is synthesized so GREAT gets
/// a name for every region. Row count and order are never changed.
///
pub fn format_regions(input: RegionInput, columns: &BedColumns) -> Result<RegionSet> {
    let frame = match input {
        RegionInput::Frame(frame) => frame,
        RegionInput::Rows(rows) => frame_from_rows(rows, columns)?,
        RegionInput::File(path) => load_region_file(&path)?,
    };
    normalize(frame, columns)
}

fn frame_from_rows(rows: Vec<Vec<String>>, columns: &BedColumns) -> Result<DataFrame> {
    let width = rows.first().map_or(0, Vec::len);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(GreatError::RaggedInput {
                row: i,
                expected: width,
                found: row.len(),
            });
        }
    }

    let names = columns.priority_order();
    if width > names.len() {
        warn!(
            "input has {} columns; only the first {} are recognized",
            width,
            names.len()
        );
    }

    let mut cols: Vec<Column> = Vec::new();
    for (c, name) in names.iter().enumerate().take(width) {
        let values: Vec<String> = rows.iter().map(|row| row[c].clone()).collect();
        cols.push(Column::new((*name).into(), values));
    }
    Ok(DataFrame::new(cols)?)
}

fn load_region_file(path: &Path) -> Result<DataFrame> {
    match load_spreadsheet(path) {
        Ok(frame) => Ok(frame),
        Err(err) => {
            debug!(
                "spreadsheet load failed for {} ({}), trying delimited text",
                path.display(),
                err
            );
            load_delimited(path)
        }
    }
}

fn load_spreadsheet(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(calamine::Error::Msg("workbook has no sheets"))??;

    let mut rows = range.rows();
    let header: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_to_string).collect(),
        None => return Err(calamine::Error::Msg("worksheet is empty").into()),
    };

    let mut data: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for row in rows {
        for (c, values) in data.iter_mut().enumerate() {
            values.push(row.get(c).map_or_else(String::new, cell_to_string));
        }
    }

    let cols: Vec<Column> = header
        .iter()
        .zip(data)
        .map(|(name, values)| Column::new(name.as_str().into(), values))
        .collect();
    Ok(DataFrame::new(cols)?)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // spreadsheet coordinates arrive as floats; keep them integral
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}

fn load_delimited(path: &Path) -> Result<DataFrame> {
    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(frame)
}

fn normalize(frame: DataFrame, columns: &BedColumns) -> Result<RegionSet> {
    let available: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    // Mandatory geometry, checked in priority order so the first missing
    // column is the one named in the error.
    for mandatory in [&columns.chr, &columns.start, &columns.end] {
        if !available.contains(mandatory) {
            return Err(GreatError::MissingColumn(mandatory.clone()));
        }
    }

    let resolved: Vec<String> = columns
        .priority_order()
        .iter()
        .map(|name| name.to_string())
        .filter(|name| available.contains(name))
        .collect();

    let mut frame = frame.select(resolved.iter().cloned())?;

    for name in [&columns.start, &columns.end] {
        let coerced = frame
            .column(name)?
            .strict_cast(&DataType::Int64)
            .map_err(|source| GreatError::InvalidCoordinate {
                column: name.clone(),
                source,
            })?;
        frame.with_column(coerced)?;
    }

    let mut resolved = resolved;
    if resolved.len() < 4 {
        // No name column resolved; GREAT still needs one per region.
        let index: Vec<i64> = (0..frame.height() as i64).collect();
        frame.with_column(Column::new(columns.index.as_str().into(), index))?;
        resolved.push(columns.index.clone());
    }

    Ok(RegionSet::new(frame, resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[rstest]
    fn test_three_columns_get_synthesized_index() {
        let input = rows(&[&["chr1", "100", "200"], &["chr2", "300", "400"]]);
        let rs = format_regions(input.into(), &BedColumns::default()).unwrap();

        assert_eq!(rs.columns(), &["chr", "start", "end", "index"]);
        assert_eq!(rs.len(), 2);

        let index = rs.frame().column("index").unwrap();
        let values: Vec<i64> = index.i64().unwrap().into_no_null_iter().collect();
        assert_eq!(values, vec![0, 1]);
    }

    #[rstest]
    fn test_four_columns_no_synthesis() {
        let input = rows(&[
            &["chr1", "100", "200", "peak_a"],
            &["chr2", "300", "400", "peak_b"],
        ]);
        let rs = format_regions(input.into(), &BedColumns::default()).unwrap();

        assert_eq!(rs.columns(), &["chr", "start", "end", "index"]);
        let names = rs.frame().column("index").unwrap();
        assert_eq!(names.str().unwrap().get(0).unwrap(), "peak_a");
    }

    #[rstest]
    fn test_wide_input_caps_at_nine_columns() {
        let row: Vec<&str> = vec![
            "chr1", "100", "200", "0", "960", "+", "100", "200", "255,0,0", "extra", "extra2",
        ];
        let rs = format_regions(rows(&[&row]).into(), &BedColumns::default()).unwrap();

        assert_eq!(rs.columns().len(), 9);
        assert_eq!(
            rs.columns(),
            &["chr", "start", "end", "index", "score", "strand", "thickStart", "thickEnd", "rgb"]
        );
    }

    #[rstest]
    fn test_two_columns_missing_end() {
        let err = format_regions(rows(&[&["chr1", "100"]]).into(), &BedColumns::default())
            .unwrap_err();
        assert!(matches!(err, GreatError::MissingColumn(ref c) if c == "end"));
    }

    #[rstest]
    fn test_labeled_frame_missing_end() {
        let frame = df!(
            "chr" => &["chr1"],
            "start" => &[100i64],
        )
        .unwrap();
        let err = format_regions(frame.into(), &BedColumns::default()).unwrap_err();
        assert!(matches!(err, GreatError::MissingColumn(ref c) if c == "end"));
        assert!(err.to_string().contains("end"));
    }

    #[rstest]
    fn test_labeled_frame_unknown_columns_omitted() {
        let frame = df!(
            "chr" => &["chr1", "chr1"],
            "start" => &[100i64, 500],
            "end" => &[200i64, 600],
            "strand" => &["+", "-"],
            "pval" => &[0.01f64, 0.2],
        )
        .unwrap();
        let rs = format_regions(frame.into(), &BedColumns::default()).unwrap();

        // "pval" is not a recognized column; strand keeps its priority slot.
        assert_eq!(rs.columns(), &["chr", "start", "end", "strand"]);
        assert_eq!(rs.len(), 2);
    }

    #[rstest]
    fn test_labeled_frame_custom_names() {
        let frame = df!(
            "seqname" => &["chr7"],
            "left" => &["1000"],
            "right" => &["2000"],
        )
        .unwrap();
        let columns = BedColumns {
            chr: "seqname".to_string(),
            start: "left".to_string(),
            end: "right".to_string(),
            ..BedColumns::default()
        };
        let rs = format_regions(frame.into(), &columns).unwrap();

        assert_eq!(rs.columns(), &["seqname", "left", "right", "index"]);
        let starts = rs.frame().column("left").unwrap();
        assert_eq!(starts.i64().unwrap().get(0).unwrap(), 1000);
    }

    #[rstest]
    fn test_non_coercible_start() {
        let input = rows(&[&["chr1", "1e", "200"]]);
        let err = format_regions(input.into(), &BedColumns::default()).unwrap_err();
        assert!(matches!(err, GreatError::InvalidCoordinate { ref column, .. } if column == "start"));
    }

    #[rstest]
    fn test_ragged_rows_rejected() {
        let input = rows(&[&["chr1", "100", "200"], &["chr2", "300"]]);
        let err = format_regions(input.into(), &BedColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            GreatError::RaggedInput {
                row: 1,
                expected: 3,
                found: 2
            }
        ));
    }

    #[rstest]
    fn test_row_order_preserved() {
        let input = rows(&[
            &["chr9", "900", "950"],
            &["chr1", "100", "150"],
            &["chr4", "400", "450"],
        ]);
        let rs = format_regions(input.into(), &BedColumns::default()).unwrap();

        let chrs: Vec<&str> = rs
            .frame()
            .column("chr")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(chrs, vec!["chr9", "chr1", "chr4"]);
    }

    #[rstest]
    fn test_delimited_file_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "chr,start,end").unwrap();
        writeln!(file, "chr1,100,200").unwrap();
        writeln!(file, "chr2,300,400").unwrap();

        let rs = format_regions(RegionInput::from(path), &BedColumns::default()).unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.columns(), &["chr", "start", "end", "index"]);
    }

    #[rstest]
    fn test_serialized_form_matches_wire_format() {
        let input = rows(&[&["chr1", "100", "200"], &["chr2", "300", "400"]]);
        let rs = format_regions(input.into(), &BedColumns::default()).unwrap();
        assert_eq!(rs.to_tsv().unwrap(), "chr1\t100\t200\t0\nchr2\t300\t400\t1\n");
    }
}
