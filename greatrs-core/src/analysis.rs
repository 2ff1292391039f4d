//! One-call orchestration of a full GREAT round-trip.

use std::path::PathBuf;

use headless_chrome::Browser;
use log::info;
use polars::prelude::DataFrame;

use crate::artifacts;
use crate::config::AnalysisOptions;
use crate::errors::{GreatError, Result};
use crate::models::RegionSet;
use crate::scrape;
use crate::session::GreatSession;

/// What a finished analysis hands back, by output mode.
pub enum AnalysisOutput {
    /// A scraped table: the gene-annotated regions, the gene pivot, or one
    /// of the seven enrichment tables.
    Table(DataFrame),
    /// The requested enrichment table matched nothing under the current
    /// filters.
    NoResults,
    /// A plot or chart was saved to this path.
    ImageSaved(PathBuf),
    /// A live UCSC genome browser session. Dropping the browser closes it,
    /// so callers wanting to inspect the tracks must hold on to it.
    UcscBrowser(Browser),
}

///
/// Run a complete analysis: submit `regions` (and optionally `background`)
/// to GREAT and retrieve whatever `opts.output` selects.
///
/// The browser session lives for exactly this call, except for the UCSC
/// output mode where the returned handoff browser outlives it.
///
pub fn run_analysis(
    regions: &RegionSet,
    background: Option<&RegionSet>,
    opts: &AnalysisOptions,
) -> Result<AnalysisOutput> {
    // a chart only exists for the seven enrichment tables, so reject the
    // combination before paying for a browser launch
    if opts.plot.is_some() && !opts.output.is_enrichment_table() {
        return Err(GreatError::InvalidOption {
            what: "plot target",
            given: opts.output.to_string(),
            valid: "ensembl_genes, go_process, go_component, go_function, \
                    human_phenotype, mouse_phenotype, mouse_phenotype_KO",
        });
    }

    info!(
        "running GREAT analysis: assembly={}, output={}",
        opts.assembly, opts.output
    );
    let session = GreatSession::open(opts)?;
    let output = drive(&session, regions, background, opts)?;
    session.close();
    Ok(output)
}

fn drive(
    session: &GreatSession,
    regions: &RegionSet,
    background: Option<&RegionSet>,
    opts: &AnalysisOptions,
) -> Result<AnalysisOutput> {
    session.configure(regions, background, opts)?;
    session.set_association_options(opts)?;
    session.submit_and_await()?;

    if let Some(controls) = opts.global_controls.as_ref().filter(|c| !c.is_empty()) {
        session.adjust_global_controls(controls)?;
    }

    if opts.output.is_enrichment_table() {
        let index = opts
            .output
            .table_index()
            .unwrap_or_else(|| unreachable!("enrichment outputs carry a table index"));
        return match session.enrichment_table(index)? {
            None => Ok(AnalysisOutput::NoResults),
            Some(frame) => {
                if let Some(plot) = opts.plot {
                    let stem =
                        artifacts::chart_plot_stem(opts.output, plot, opts.file_stem.as_deref());
                    let path = session.save_chart(index, plot, &stem)?;
                    info!("chart saved to {}", path.display());
                }
                Ok(AnalysisOutput::Table(frame))
            }
        };
    }

    if let Some(offset) = opts.output.plot_offset() {
        let stem = artifacts::distance_plot_stem(opts.output, opts.file_stem.as_deref());
        let path = session.save_distance_plot(offset, &stem)?;
        return Ok(AnalysisOutput::ImageSaved(path));
    }

    match opts.output {
        crate::config::Output::Genes => {
            let html = session.association_page()?;
            let genes = scrape::gene_association_lists(&html)?;
            let frame = regions.with_gene_column(genes)?;
            Ok(AnalysisOutput::Table(frame))
        }
        crate::config::Output::GenesPivot => {
            let html = session.association_page()?;
            Ok(AnalysisOutput::Table(scrape::gene_pivot(&html)?))
        }
        crate::config::Output::UcscBrowser => {
            Ok(AnalysisOutput::UcscBrowser(session.ucsc_handoff()?))
        }
        _ => unreachable!("table and plot outputs are dispatched above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::*;

    use crate::config::{Output, PlotKind};
    use crate::format::{format_regions, BedColumns};

    fn regions() -> RegionSet {
        let rows = vec![
            vec!["chr1".to_string(), "100".to_string(), "200".to_string()],
            vec!["chr2".to_string(), "300".to_string(), "400".to_string()],
        ];
        format_regions(rows.into(), &BedColumns::default()).unwrap()
    }

    #[rstest]
    #[case(Output::Genes)]
    #[case(Output::GenesPivot)]
    #[case(Output::UcscBrowser)]
    #[case(Output::NGenesRegion)]
    fn test_plot_rejected_for_non_enrichment_outputs(#[case] output: Output) {
        let opts = AnalysisOptions {
            output,
            plot: Some(PlotKind::Bar),
            ..AnalysisOptions::default()
        };
        // fails during validation, before any browser is launched
        let Err(err) = run_analysis(&regions(), None, &opts) else {
            panic!("plot on {output} should have been rejected");
        };
        assert!(matches!(err, GreatError::InvalidOption { .. }));
        assert!(err.to_string().contains("go_process"));
    }

    #[rstest]
    fn test_plot_allowed_for_enrichment_outputs() {
        let opts = AnalysisOptions {
            output: Output::GoProcess,
            plot: Some(PlotKind::Hierarchy),
            ..AnalysisOptions::default()
        };
        assert!(opts.output.is_enrichment_table());
        assert!(opts.plot.is_some());
    }
}
