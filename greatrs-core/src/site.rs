//! The GREAT page integration contract.
//!
//! Every element id, selector, link text, option label, sentinel string and
//! timeout the session driver depends on lives here. None of this is under
//! our control: it mirrors the live page at [`GREAT_URL`] and breaks
//! silently if the site is redesigned, so treat this module as a versioned
//! contract and fix layout drift here rather than in the driver.

use std::time::Duration;

/// Entry point of the public GREAT submission form.
pub const GREAT_URL: &str = "https://great.stanford.edu/great/public/html/";

// --- submission form ---

/// Radio selecting the "BED data" paste-in input mode.
pub const BED_CHOICE_ID: &str = "fgChoiceData";
/// Name of the textarea the foreground BED payload is pasted into.
pub const BED_DATA_NAME: &str = "fgData";
/// Radio enabling the background region input (third list item of the form).
pub const BG_CHOICE_CSS: &str = "form fieldset div:nth-of-type(3) ul li:nth-of-type(3) label input";
/// Textarea for the background BED payload.
pub const BG_DATA_CSS: &str = "form fieldset div:nth-of-type(3) ul li:nth-of-type(3) textarea";
/// Button revealing the association-rule panel.
pub const ASSOC_PANEL_ID: &str = "assoc_btn";
/// Radio ids for the non-default association rules.
pub const ONE_CLOSEST_ID: &str = "oneClosestRule";
pub const TWO_CLOSEST_ID: &str = "twoClosestRule";
/// Checkbox for curated regulatory domains (checked by default on the site).
pub const CURATED_DOMAINS_ID: &str = "adv_includeCuratedRegDoms";
pub const SUBMIT_ID: &str = "submit_button";

// --- results page ---

/// Container that appears once the analysis job has finished.
pub const JOB_CONTAINER_ID: &str = "job_description_container";
/// Where the site prints its own error text when a submission is rejected.
pub const INLINE_ERROR_CSS: &str = "blockquote";
pub const GLOBAL_CONTROLS_ID: &str = "global_controls_container";
/// Field id behind the `n_gene_hits` global-control alias.
pub const GENE_HITS_FIELD_ID: &str = "minAnnotFgHitGenes";
/// Significance-view radio ids accepted for the `view` global control.
pub const VIEW_OPTIONS: [&str; 3] = ["viewSigByBoth", "viewSigByRegion", "viewFull"];
/// Value of the buttons that re-apply global-control filtering.
pub const SET_BUTTON_VALUE: &str = "Set";

/// Class of the gene-association sub-tables on the association tab.
pub const SUBTABLE_CSS: &str = "table.gSubTable";
pub const ASSOC_LINK_TEXT: &str = "View all genomic region-gene associations.";
pub const UCSC_LINK_TEXT: &str = "Show in UCSC genome browser.";
/// Element that must exist before the UCSC tab's URL is trustworthy.
pub const UCSC_READY_ID: &str = "assemblyName";

/// The distance plots are the 7th, 8th and 9th `<img>` on the results page.
pub const PLOT_IMG_OFFSET: usize = 6;

// --- chart widget ---

/// Class of the per-table visualization `<select>` controls.
pub const VIS_LIST_CLASS: &str = "visList";
pub const BAR_OPTION_TEXT: &str = "Bar chart of current sorted value";
pub const HIERARCHY_OPTION_TEXT: &str = "Visualize shown terms in hierarchy";
pub const VIS_RESET_OPTION_TEXT: &str = "[select one]";
pub const CHART_CONTAINER_ID: &str = "chart_container";
pub const SVG_CONTAINER_ID: &str = "svgContainer";
pub const PNG_LINK_TEXT: &str = "PNG";
pub const PDF_LINK_TEXT: &str = "PDF";
pub const FULL_SIZE_LINK_TEXT: &str = "click here";

// --- sentinels ---

pub const NO_RESULTS_TEXT: &str = "No results meet your chosen criteria.";
pub const LOADING_TEXT: &str = "Loading...";

// --- timeouts and retry policy ---

/// Budget for the main analysis job after submission.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);
/// Budget for a freshly opened tab to attach and render.
pub const TAB_TIMEOUT: Duration = Duration::from_secs(10);
/// Budget for each chart-widget transition.
pub const CHART_TIMEOUT: Duration = Duration::from_secs(15);
/// Cap on re-scraping a table that renders empty (transient on the server).
pub const MAX_SCRAPE_RETRIES: usize = 30;
pub const SCRAPE_RETRY_DELAY: Duration = Duration::from_secs(2);

pub const OVERSIZE_HINT: &str = "Potential reasons: invalid input (generally or for the chosen \
     assembly), a dataset too large for GREAT, or connection problems. \
     Use headless(false) to troubleshoot.";
pub const CONNECTIVITY_HINT: &str =
    "Potential reason: connection problems. Use headless(false) to troubleshoot.";

/// Column layout of the seven enrichment tables, in site order.
pub const ENRICHMENT_COLUMNS: [&str; 21] = [
    "term_name",
    "go_annotation",
    "binom_rank",
    "binom_raw_pval",
    "binom_bonferroni_pval",
    "binom_fdr_qval",
    "binom_fold_enrichment",
    "binom_expected",
    "binom_obs_region_hits",
    "binom_genome_fraction",
    "binom_region_set_coverage",
    "hyper_rank",
    "hyper_raw_pval",
    "hyper_bonferroni_pval",
    "hyper_fdr_qval",
    "hyper_fold_enrichment",
    "hyper_expected",
    "hyper_obs_gene_hits",
    "hyper_total_genes",
    "hyper_gene_set_coverage",
    "hyper_term_gene_coverage",
];
