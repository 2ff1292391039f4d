use clap::{Arg, ArgAction, Command, arg};

pub const ANALYZE_CMD: &str = "analyze";
pub const FORMAT_CMD: &str = "format";

pub fn create_analyze_cli() -> Command {
    Command::new(ANALYZE_CMD)
        .about("Submit a region set to GREAT and retrieve one output.")
        .arg(Arg::new("regions").required(true).help(
            "Region file (BED-like text, tsv/csv, or a spreadsheet with the regions on the first sheet)",
        ))
        .arg(arg!(--background <background> "Optional background region file"))
        .arg(
            arg!(--get <output> "What to retrieve")
                .default_value("genes")
                .long_help(
                    "One of: genes, genes_pivot, ucsc_browser, n_genes_region, n_genes_TSS, \
                     n_genes_abs_TSS, ensembl_genes, go_process, go_component, go_function, \
                     human_phenotype, mouse_phenotype, mouse_phenotype_KO",
                ),
        )
        .arg(arg!(--assembly <assembly> "Reference assembly").default_value("mm10"))
        .arg(
            arg!(--"assoc-rule" <rule> "Region-gene association rule")
                .default_value("basal"),
        )
        .arg(
            arg!(--"no-curated" "Exclude curated regulatory domains from the association rule")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--headful "Show the browser window instead of running headless")
                .action(ArgAction::SetTrue),
        )
        .arg(arg!(--plot <kind> "Chart an enrichment table on the site (bar or hierarchy)"))
        .arg(arg!(--out <stem> "File stem for saved images"))
        .arg(
            arg!(--control <KEY_VALUE> "Global-control adjustment as key=value; repeatable")
                .action(ArgAction::Append),
        )
        .args(column_overrides())
}

pub fn create_format_cli() -> Command {
    Command::new(FORMAT_CMD)
        .about("Normalize a region file into GREAT's BED column layout and print it.")
        .arg(Arg::new("regions").required(true).help("Region file to normalize"))
        .args(column_overrides())
}

/// Column-name overrides for labeled inputs, one per BED field.
fn column_overrides() -> Vec<Arg> {
    vec![
        arg!(--"chr-col" <name> "Chromosome column name"),
        arg!(--"start-col" <name> "Start coordinate column name"),
        arg!(--"end-col" <name> "End coordinate column name"),
        arg!(--"index-col" <name> "Region index column name"),
        arg!(--"score-col" <name> "Score column name"),
        arg!(--"strand-col" <name> "Strand column name"),
        arg!(--"thick-start-col" <name> "Thick-start column name"),
        arg!(--"thick-end-col" <name> "Thick-end column name"),
        arg!(--"rgb-col" <name> "Item RGB column name"),
    ]
}
