use std::fmt::{self, Display};
use std::io::Cursor;

use polars::prelude::*;

use crate::errors::{GreatError, Result};

///
/// RegionSet struct: a set of genomic regions normalized into the fixed
/// BED column layout, ready to be pasted into the GREAT submission form.
///
/// Row count and order are fixed at construction; the per-row gene
/// associations GREAT returns are aligned against them.
///
#[derive(Clone, Debug)]
pub struct RegionSet {
    frame: DataFrame,
    columns: Vec<String>,
}

impl RegionSet {
    /// Wrap an already-normalized frame. `columns` is the resolved semantic
    /// column list, in priority order; the frame must contain exactly them.
    pub(crate) fn new(frame: DataFrame, columns: Vec<String>) -> Self {
        RegionSet { frame, columns }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Resolved semantic column names, in the fixed priority order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    ///
    /// Get number of regions in RegionSet
    ///
    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    ///
    /// Serialize to the wire form GREAT expects: tab-separated values, one
    /// row per region, resolved column order, no header row.
    ///
    pub fn to_tsv(&self) -> Result<String> {
        let mut buf: Vec<u8> = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(false)
            .with_separator(b'\t')
            .finish(&mut self.frame.clone())?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    ///
    /// Re-parse a tab-separated payload under the given column names.
    /// Inverse of [`RegionSet::to_tsv`].
    ///
    pub fn from_tsv(data: &str, columns: Vec<String>) -> Result<Self> {
        let cursor = Cursor::new(data);
        let mut frame = CsvReadOptions::default()
            .with_has_header(false)
            .map_parse_options(|parse_options| parse_options.with_separator(b'\t'))
            .into_reader_with_file_handle(cursor)
            .finish()?;

        let current: Vec<String> = frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        for (old, new) in current.iter().zip(columns.iter()) {
            frame.rename(old, new.as_str().into())?;
        }

        Ok(RegionSet::new(frame, columns))
    }

    ///
    /// Attach the per-region gene associations scraped from GREAT as an
    /// `associated_genes` column, order-aligned with the input rows.
    ///
    pub fn with_gene_column(&self, genes: Vec<Vec<String>>) -> Result<DataFrame> {
        if genes.len() != self.len() {
            return Err(GreatError::AssociationMismatch {
                expected: self.len(),
                found: genes.len(),
            });
        }

        let joined: Vec<String> = genes.iter().map(|g| g.join(",")).collect();
        let mut frame = self.frame.clone();
        frame.with_column(Column::new("associated_genes".into(), joined))?;
        Ok(frame)
    }
}

impl Display for RegionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionSet with {} regions.", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn dummy_region_set() -> RegionSet {
        let frame = df!(
            "chr" => &["chr1", "chr2"],
            "start" => &[100i64, 300],
            "end" => &[200i64, 400],
            "index" => &[0i64, 1],
        )
        .unwrap();
        let columns = vec![
            "chr".to_string(),
            "start".to_string(),
            "end".to_string(),
            "index".to_string(),
        ];
        RegionSet::new(frame, columns)
    }

    #[rstest]
    fn test_to_tsv_no_header() {
        let rs = dummy_region_set();
        assert_eq!(rs.to_tsv().unwrap(), "chr1\t100\t200\t0\nchr2\t300\t400\t1\n");
    }

    #[rstest]
    fn test_tsv_round_trip_preserves_geometry() {
        let rs = dummy_region_set();
        let tsv = rs.to_tsv().unwrap();
        let back = RegionSet::from_tsv(&tsv, rs.columns().to_vec()).unwrap();

        assert_eq!(back.len(), rs.len());
        for column in ["chr", "start", "end"] {
            assert_eq!(
                back.frame().column(column).unwrap(),
                rs.frame().column(column).unwrap(),
            );
        }
    }

    #[rstest]
    fn test_gene_column_is_order_aligned() {
        let rs = dummy_region_set();
        let genes = vec![
            vec!["Abca1 (+4037)".to_string(), "Nfia (-1793)".to_string()],
            vec![],
        ];
        let frame = rs.with_gene_column(genes).unwrap();

        let col = frame.column("associated_genes").unwrap();
        let values = col.str().unwrap();
        assert_eq!(values.get(0).unwrap(), "Abca1 (+4037),Nfia (-1793)");
        assert_eq!(values.get(1).unwrap(), "");
    }

    #[rstest]
    fn test_gene_column_length_mismatch() {
        let rs = dummy_region_set();
        let result = rs.with_gene_column(vec![vec!["Gm1 (+1)".to_string()]]);
        assert!(matches!(
            result,
            Err(GreatError::AssociationMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[rstest]
    fn test_display() {
        assert_eq!(dummy_region_set().to_string(), "RegionSet with 2 regions.");
    }
}
