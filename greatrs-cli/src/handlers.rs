use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Result;
use clap::ArgMatches;
use log::info;

use greatrs_core::analysis::{run_analysis, AnalysisOutput};
use greatrs_core::config::{AnalysisOptions, GlobalControls};
use greatrs_core::format::{format_regions, BedColumns, RegionInput};

pub fn run_analyze(matches: &ArgMatches) -> Result<()> {
    let columns = bed_columns(matches);
    let regions_path = matches
        .get_one::<String>("regions")
        .expect("A region file is required.");
    let regions = format_regions(RegionInput::from(Path::new(regions_path)), &columns)?;

    let background = matches
        .get_one::<String>("background")
        .map(|path| format_regions(RegionInput::from(Path::new(path)), &columns))
        .transpose()?;

    let opts = analysis_options(matches)?;
    let result = run_analysis(&regions, background.as_ref(), &opts)?;

    match result {
        AnalysisOutput::Table(frame) => {
            println!("{frame}");
        }
        AnalysisOutput::NoResults => {
            println!("No results meet your chosen criteria.");
        }
        AnalysisOutput::ImageSaved(path) => {
            info!("image written to {}", path.display());
        }
        AnalysisOutput::UcscBrowser(browser) => {
            // the UCSC session closes when the handle is dropped
            print!("UCSC genome browser is open. Press Enter to close it. ");
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            drop(browser);
        }
    }

    Ok(())
}

pub fn run_format(matches: &ArgMatches) -> Result<()> {
    let columns = bed_columns(matches);
    let path = matches
        .get_one::<String>("regions")
        .expect("A region file is required.");
    let regions = format_regions(RegionInput::from(Path::new(path)), &columns)?;

    info!("{regions}");
    print!("{}", regions.to_tsv()?);
    Ok(())
}

fn analysis_options(matches: &ArgMatches) -> Result<AnalysisOptions> {
    let mut opts = AnalysisOptions::default();

    if let Some(assembly) = matches.get_one::<String>("assembly") {
        opts.assembly = assembly.parse()?;
    }
    if let Some(output) = matches.get_one::<String>("get") {
        opts.output = output.parse()?;
    }
    if let Some(rule) = matches.get_one::<String>("assoc-rule") {
        opts.association_rule = rule.parse()?;
    }
    opts.include_curated_domains = !matches.get_flag("no-curated");
    opts.headless = !matches.get_flag("headful");
    opts.plot = matches
        .get_one::<String>("plot")
        .map(|kind| kind.parse())
        .transpose()?;
    opts.file_stem = matches.get_one::<String>("out").cloned();

    if let Some(raw) = matches.get_many::<String>("control") {
        let mut controls = GlobalControls::new();
        for pair in raw {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                anyhow::anyhow!("global control \"{pair}\" is not of the form key=value")
            })?;
            controls.set(key, value)?;
        }
        opts.global_controls = Some(controls);
    }

    Ok(opts)
}

fn bed_columns(matches: &ArgMatches) -> BedColumns {
    let mut columns = BedColumns::default();
    let set = |target: &mut String, id: &str| {
        if let Some(name) = matches.get_one::<String>(id) {
            *target = name.clone();
        }
    };
    set(&mut columns.chr, "chr-col");
    set(&mut columns.start, "start-col");
    set(&mut columns.end, "end-col");
    set(&mut columns.index, "index-col");
    set(&mut columns.score, "score-col");
    set(&mut columns.strand, "strand-col");
    set(&mut columns.thick_start, "thick-start-col");
    set(&mut columns.thick_end, "thick-end-col");
    set(&mut columns.rgb, "rgb-col");
    columns
}
