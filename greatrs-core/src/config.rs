//! Session configuration: assembly, association rule, output selector,
//! plot kind and the post-analysis global controls.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::GreatError;
use crate::site;

/// Reference assemblies GREAT accepts. The id of each assembly radio on the
/// submission form is the lowercase assembly name itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assembly {
    Hg38,
    Hg19,
    Mm10,
    Mm9,
}

impl Assembly {
    pub fn element_id(&self) -> &'static str {
        match self {
            Assembly::Hg38 => "hg38",
            Assembly::Hg19 => "hg19",
            Assembly::Mm10 => "mm10",
            Assembly::Mm9 => "mm9",
        }
    }
}

impl FromStr for Assembly {
    type Err = GreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hg38" => Ok(Assembly::Hg38),
            "hg19" => Ok(Assembly::Hg19),
            "mm10" => Ok(Assembly::Mm10),
            "mm9" => Ok(Assembly::Mm9),
            _ => Err(GreatError::InvalidOption {
                what: "assembly",
                given: s.to_string(),
                valid: "hg38, hg19, mm10, mm9",
            }),
        }
    }
}

impl Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element_id())
    }
}

/// Policy by which GREAT links a region to nearby genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssociationRule {
    #[default]
    Basal,
    OneClosest,
    TwoClosest,
}

impl AssociationRule {
    /// Radio id to click, or None for the site default.
    pub fn element_id(&self) -> Option<&'static str> {
        match self {
            AssociationRule::Basal => None,
            AssociationRule::OneClosest => Some(site::ONE_CLOSEST_ID),
            AssociationRule::TwoClosest => Some(site::TWO_CLOSEST_ID),
        }
    }
}

impl FromStr for AssociationRule {
    type Err = GreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basal" => Ok(AssociationRule::Basal),
            "one_closest" => Ok(AssociationRule::OneClosest),
            "two_closest" => Ok(AssociationRule::TwoClosest),
            _ => Err(GreatError::InvalidOption {
                what: "association rule",
                given: s.to_string(),
                valid: "basal, one_closest, two_closest",
            }),
        }
    }
}

/// What to retrieve once the analysis job has finished. Each variant maps
/// to exactly one dispatch branch in the session driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    /// Input regions with an attached column of associated genes.
    Genes,
    /// Two-column (gene, region id) pivot of the association table.
    GenesPivot,
    /// Open the region set in the UCSC genome browser.
    UcscBrowser,
    /// Barplot: number of associated genes per region.
    NGenesRegion,
    /// Barplot: region-gene distance from TSS, signed.
    NGenesTss,
    /// Barplot: region-gene distance from TSS, absolute.
    NGenesAbsTss,
    Ensembl,
    GoProcess,
    GoComponent,
    GoFunction,
    HumanPhenotype,
    MousePhenotype,
    MousePhenotypeKo,
}

impl Output {
    /// Index of the enrichment table on the results page, for the seven
    /// table outputs.
    pub fn table_index(&self) -> Option<usize> {
        match self {
            Output::Ensembl => Some(0),
            Output::GoProcess => Some(1),
            Output::GoComponent => Some(2),
            Output::GoFunction => Some(3),
            Output::HumanPhenotype => Some(4),
            Output::MousePhenotypeKo => Some(5),
            Output::MousePhenotype => Some(6),
            _ => None,
        }
    }

    /// Offset of the distance plot image, for the three plot outputs.
    pub fn plot_offset(&self) -> Option<usize> {
        match self {
            Output::NGenesRegion => Some(0),
            Output::NGenesTss => Some(1),
            Output::NGenesAbsTss => Some(2),
            _ => None,
        }
    }

    pub fn is_enrichment_table(&self) -> bool {
        self.table_index().is_some()
    }
}

impl FromStr for Output {
    type Err = GreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "genes" => Ok(Output::Genes),
            "genes_pivot" => Ok(Output::GenesPivot),
            "ucsc_browser" => Ok(Output::UcscBrowser),
            "n_genes_region" => Ok(Output::NGenesRegion),
            "n_genes_TSS" => Ok(Output::NGenesTss),
            "n_genes_abs_TSS" => Ok(Output::NGenesAbsTss),
            "ensembl_genes" => Ok(Output::Ensembl),
            "go_process" => Ok(Output::GoProcess),
            "go_component" => Ok(Output::GoComponent),
            "go_function" => Ok(Output::GoFunction),
            "human_phenotype" => Ok(Output::HumanPhenotype),
            "mouse_phenotype" => Ok(Output::MousePhenotype),
            "mouse_phenotype_KO" => Ok(Output::MousePhenotypeKo),
            _ => Err(GreatError::InvalidOption {
                what: "output selector",
                given: s.to_string(),
                valid: "genes, genes_pivot, ucsc_browser, n_genes_region, n_genes_TSS, \
                        n_genes_abs_TSS, ensembl_genes, go_process, go_component, go_function, \
                        human_phenotype, mouse_phenotype, mouse_phenotype_KO",
            }),
        }
    }
}

impl Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Output::Genes => "genes",
            Output::GenesPivot => "genes_pivot",
            Output::UcscBrowser => "ucsc_browser",
            Output::NGenesRegion => "n_genes_region",
            Output::NGenesTss => "n_genes_TSS",
            Output::NGenesAbsTss => "n_genes_abs_TSS",
            Output::Ensembl => "ensembl_genes",
            Output::GoProcess => "go_process",
            Output::GoComponent => "go_component",
            Output::GoFunction => "go_function",
            Output::HumanPhenotype => "human_phenotype",
            Output::MousePhenotype => "mouse_phenotype",
            Output::MousePhenotypeKo => "mouse_phenotype_KO",
        };
        write!(f, "{}", s)
    }
}

/// Chart kinds the site's own visualization widget can render for an
/// enrichment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    Bar,
    Hierarchy,
}

impl PlotKind {
    pub fn option_text(&self) -> &'static str {
        match self {
            PlotKind::Bar => site::BAR_OPTION_TEXT,
            PlotKind::Hierarchy => site::HIERARCHY_OPTION_TEXT,
        }
    }

    pub fn container_id(&self) -> &'static str {
        match self {
            PlotKind::Bar => site::CHART_CONTAINER_ID,
            PlotKind::Hierarchy => site::SVG_CONTAINER_ID,
        }
    }
}

impl FromStr for PlotKind {
    type Err = GreatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(PlotKind::Bar),
            "hierarchy" => Ok(PlotKind::Hierarchy),
            _ => Err(GreatError::InvalidOption {
                what: "plot kind",
                given: s.to_string(),
                valid: "bar, hierarchy",
            }),
        }
    }
}

impl Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotKind::Bar => write!(f, "bar"),
            PlotKind::Hierarchy => write!(f, "hierarchy"),
        }
    }
}

/// One global-control adjustment, resolved from a raw key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAdjustment {
    /// Type into the "minimum observed gene hits" field.
    GeneHits(String),
    /// Click one of the three significance-view radios.
    View(&'static str),
    /// Clear a field by its raw control id and type the value.
    Field { id: String, value: String },
}

/// Ordered set of post-analysis filtering adjustments. Keys are either the
/// documented aliases (`n_gene_hits`, `view`) or raw control ids
/// (`minFold`, `filterText`, `allMinAC`, `allMaxAC`, `sigValue`, ...).
#[derive(Debug, Clone, Default)]
pub struct GlobalControls {
    adjustments: Vec<ControlAdjustment>,
}

impl GlobalControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), GreatError> {
        let adjustment = match key {
            "n_gene_hits" => ControlAdjustment::GeneHits(value.to_string()),
            "view" => {
                let view = site::VIEW_OPTIONS
                    .iter()
                    .find(|v| **v == value)
                    .ok_or_else(|| GreatError::InvalidOption {
                        what: "significance view",
                        given: value.to_string(),
                        valid: "viewSigByBoth, viewSigByRegion, viewFull",
                    })?;
                ControlAdjustment::View(view)
            }
            id => ControlAdjustment::Field {
                id: id.to_string(),
                value: value.to_string(),
            },
        };
        self.adjustments.push(adjustment);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlAdjustment> {
        self.adjustments.iter()
    }
}

/// Everything one analysis round-trip needs besides the regions themselves.
///
/// TLS relaxation and headless operation are explicit, per-session options
/// rather than process-wide toggles.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub assembly: Assembly,
    pub output: Output,
    pub association_rule: AssociationRule,
    /// Include curated regulatory domains in the association rule.
    pub include_curated_domains: bool,
    pub headless: bool,
    pub accept_invalid_certs: bool,
    /// Drive the site's chart widget after an enrichment-table scrape.
    pub plot: Option<PlotKind>,
    /// File stem for persisted images; derived from the output mode if None.
    pub file_stem: Option<String>,
    pub global_controls: Option<GlobalControls>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            assembly: Assembly::Mm10,
            output: Output::Genes,
            association_rule: AssociationRule::Basal,
            include_curated_domains: true,
            headless: true,
            accept_invalid_certs: true,
            plot: None,
            file_stem: None,
            global_controls: None,
        }
    }
}
