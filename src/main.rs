//! CLI entry point for facebench.
//!
//! Two subcommands, `verify` and `identify`, corresponding to the two
//! pipelines the library implements. Both share an extraction stage and
//! diverge into all-pairs matching versus gallery search.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use facebench::binio::write_manifest;
use facebench::config::{tpir_ranks, CommonConfig, IdentifyConfig, VerifyConfig, IDENTIFICATION_RANKS};
use facebench::driver::{ident, verif};
use facebench::engine::{EngineStatus, IdentificationEngine, StubEngine, VerificationEngine};
use facebench::extractor::{self, ExtractionOptions, ExtractionPaths};
use facebench::input_list::parse_input_list;
use facebench::types::TemplateRole;

#[derive(Parser, Debug)]
#[command(name = "facebench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the 1:1 verification pipeline: extract, all-pairs match, ROC.
    Verify(VerifyArgs),
    /// Run the 1:N identification pipeline: extract, gallery build, search, TPIR.
    Identify(IdentifyArgs),
}

#[derive(ClapArgs, Debug)]
struct CommonArgs {
    /// Base directory for all relative paths and generated artifacts.
    #[arg(long)]
    split: PathBuf,

    /// Engine configuration directory.
    #[arg(long)]
    config: PathBuf,

    /// Directory image paths in list files are relative to.
    #[arg(long = "extract-prefix")]
    extract_prefix: PathBuf,

    /// Decode images as grayscale instead of RGB.
    #[arg(long)]
    grayscale: bool,

    /// Number of extraction worker threads (defaults to available parallelism).
    #[arg(long = "count-proc")]
    count_proc: Option<u32>,

    /// Fixed template byte size every engine template must match.
    #[arg(long = "desc-size", default_value_t = 512)]
    desc_size: u32,

    /// Percentile used in extended timing summaries, 0..=100.
    #[arg(long, default_value_t = 90)]
    percentile: u32,

    /// Emit a debug line per extracted template.
    #[arg(long = "debug-info")]
    debug_info: bool,

    /// Emit an extraction info line per extracted template.
    #[arg(long = "extract-info")]
    extract_info: bool,

    /// Collect percentile/min/max/std-dev timing alongside the running average.
    #[arg(long = "extra-timings")]
    extra_timings: bool,
}

impl CommonArgs {
    fn into_config(self) -> CommonConfig {
        CommonConfig {
            split_dir: self.split,
            config_dir: self.config,
            extract_prefix: self.extract_prefix,
            grayscale: self.grayscale,
            count_proc: self.count_proc.unwrap_or_else(|| num_cpus::get() as u32),
            desc_size: self.desc_size,
            percentile: self.percentile,
            debug_info: self.debug_info,
            extract_info: self.extract_info,
            extra_timings: self.extra_timings,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct VerifyArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Input list of images to extract.
    #[arg(long = "extract-list")]
    extract_list: PathBuf,

    #[arg(long = "do-extract", default_value_t = true, action = clap::ArgAction::Set)]
    do_extract: bool,

    #[arg(long = "do-match", default_value_t = true, action = clap::ArgAction::Set)]
    do_match: bool,

    #[arg(long = "do-roc", default_value_t = true, action = clap::ArgAction::Set)]
    do_roc: bool,
}

#[derive(ClapArgs, Debug)]
struct IdentifyArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Input list of images that make up the gallery.
    #[arg(long = "db-list")]
    db_list: Option<PathBuf>,

    /// Input list of mate (in-gallery) query images.
    #[arg(long = "mate-list")]
    mate_list: Option<PathBuf>,

    /// Input list of non-mate (out-of-gallery) query images.
    #[arg(long = "nonmate-list")]
    nonmate_list: Option<PathBuf>,

    /// Input list of images to insert into the gallery after it is built.
    #[arg(long = "insert-list")]
    insert_list: Option<PathBuf>,

    /// Text file of gallery ids to delete after the gallery is built.
    #[arg(long = "remove-list")]
    remove_list: Option<PathBuf>,

    /// Candidate list length requested from the engine per query.
    #[arg(long = "nearest-count", default_value_t = 100)]
    nearest_count: u32,

    /// Emit a search info line per query.
    #[arg(long = "search-info")]
    search_info: bool,

    #[arg(long = "do-extract", default_value_t = true, action = clap::ArgAction::Set)]
    do_extract: bool,

    /// Accepted for CLI parity with the original; gallery visualization is out of scope, logged as a no-op.
    #[arg(long = "do-graph", default_value_t = true, action = clap::ArgAction::Set)]
    do_graph: bool,

    #[arg(long = "do-insert", default_value_t = true, action = clap::ArgAction::Set)]
    do_insert: bool,

    #[arg(long = "do-remove", default_value_t = true, action = clap::ArgAction::Set)]
    do_remove: bool,

    #[arg(long = "do-search", default_value_t = true, action = clap::ArgAction::Set)]
    do_search: bool,

    #[arg(long = "do-tpir", default_value_t = true, action = clap::ArgAction::Set)]
    do_tpir: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Verify(args) => run_verify(args),
        Command::Identify(args) => run_identify(args),
    };

    if let Err(err) = &result {
        tracing::error!(error = %err, "run failed");
    }
    result
}

/// Extract one input list into its own descriptor file + auxiliary logs
/// under `split_dir`, named by `stem`. Returns the descriptor path.
fn extract_list(
    stem: &str,
    list_path: &PathBuf,
    common: &CommonConfig,
    role: TemplateRole,
    creator: &(dyn Fn(&facebench::Multiface, TemplateRole, &mut Vec<u8>) -> EngineStatus + Sync),
) -> Result<PathBuf> {
    let (buckets, total) = parse_input_list(list_path, common.count_proc as usize)
        .with_context(|| format!("parsing {} list", stem))?;

    let paths = ExtractionPaths {
        descriptors: common.split_dir.join(format!("{stem}_descriptors.bin")),
        debug_info: common.split_dir.join(format!("{stem}_debug_info.txt")),
        extra_info: common.split_dir.join(format!("{stem}_info.txt")),
        fail_detect: common.split_dir.join(format!("{stem}_fail.txt")),
    };
    let options = ExtractionOptions {
        extract_prefix: common.extract_prefix.clone(),
        gray_flag: common.grayscale,
        desc_size: common.desc_size as usize,
        role,
        debug_info: common.debug_info,
        extract_info: common.extract_info,
        extra_timings: common.extra_timings,
        percentile: common.percentile_fraction(),
    };

    let wrapped = |faces: &facebench::Multiface, role: TemplateRole, templ: &mut Vec<u8>| creator(faces, role, templ);
    let report = extractor::run(&buckets, &options, &paths, &wrapped).with_context(|| format!("extracting {} list", stem))?;
    tracing::info!(stem, total, refusals = report.refusals, "extraction stage done");

    Ok(paths.descriptors)
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let config = VerifyConfig {
        common: args.common.into_config(),
        extract_list: args.extract_list,
        do_extract: args.do_extract,
        do_match: args.do_match,
        do_roc: args.do_roc,
    };
    config.validate()?;

    let mut engine = StubEngine::new();
    let status = VerificationEngine::initialize(&mut engine, &config.common.config_dir.display().to_string());
    if !status.is_success() {
        anyhow::bail!("engine initialization failed: {}", status.info);
    }

    let descriptors_path = config.common.split_dir.join("extract_descriptors.bin");

    if config.do_extract {
        let creator = |faces: &facebench::Multiface, role: TemplateRole, templ: &mut Vec<u8>| {
            let mut eyes = Vec::new();
            let mut quality = 0.0;
            VerificationEngine::create_template(&engine, faces, role, templ, &mut eyes, &mut quality)
        };
        extract_list("extract", &config.extract_list, &config.common, TemplateRole::InitV, &creator)?;
    }

    let matches_true = config.common.split_dir.join("matches_true.bin");
    let matches_false = config.common.split_dir.join("matches_false.bin");
    let roc_path = config.common.split_dir.join("ROC.txt");

    let matcher = |a: &[u8], b: &[u8], sim: &mut f64| engine.match_templates(a, b, sim);

    if config.do_match {
        let options = verif::VerifyOptions {
            desc_size: config.common.desc_size as usize,
            fprs: vec![4, 5, 6, 7, 8],
            true_median_range: (0.0, 1.0),
            false_median_range: (0.0, 1.0),
            extra_timings: config.common.extra_timings,
            percentile: config.common.percentile_fraction(),
        };
        let paths = verif::VerifyPaths {
            descriptors: descriptors_path,
            matches_true: matches_true.clone(),
            matches_false: matches_false.clone(),
            roc: roc_path.clone(),
        };
        let report = verif::run(&options, &paths, &matcher)?;
        tracing::info!(pairs = report.pairs, mated = report.mated, non_mated = report.non_mated, "match stage done");
    } else if config.do_roc {
        verif::roc(&matches_true, &matches_false, &[4, 5, 6, 7, 8], &roc_path)?;
    }

    Ok(())
}

fn run_identify(args: IdentifyArgs) -> Result<()> {
    let config = IdentifyConfig {
        common: args.common.into_config(),
        db_list: args.db_list,
        mate_list: args.mate_list,
        nonmate_list: args.nonmate_list,
        insert_list: args.insert_list,
        remove_list: args.remove_list,
        nearest_count: args.nearest_count,
        search_info: args.search_info,
        do_extract: args.do_extract,
        do_graph: args.do_graph,
        do_insert: args.do_insert,
        do_remove: args.do_remove,
        do_search: args.do_search,
        do_tpir: args.do_tpir,
    };
    config.validate()?;

    if config.do_graph {
        tracing::info!("do-graph requested: gallery visualization is out of scope, skipping");
    }

    let mut engine = StubEngine::new();
    let config_dir = config.common.config_dir.display().to_string();
    let status = IdentificationEngine::initialize_template_creation(&mut engine, &config_dir, TemplateRole::InitI);
    if !status.is_success() {
        anyhow::bail!("engine initialization failed: {}", status.info);
    }

    let creator = |faces: &facebench::Multiface, role: TemplateRole, templ: &mut Vec<u8>| {
        let mut eyes = Vec::new();
        IdentificationEngine::create_template(&engine, faces, role, templ, &mut eyes)
    };

    let db_path = if config.do_extract {
        if let Some(db_list) = &config.db_list {
            Some(extract_list("db", db_list, &config.common, TemplateRole::InitI, &creator)?)
        } else {
            None
        }
    } else {
        config.db_list.as_ref().map(|_| config.common.split_dir.join("db_descriptors.bin"))
    };

    if config.do_extract {
        if let Some(mate_list) = &config.mate_list {
            extract_list("mate", mate_list, &config.common, TemplateRole::Identification, &creator)?;
        }
        if let Some(nonmate_list) = &config.nonmate_list {
            extract_list("nonmate", nonmate_list, &config.common, TemplateRole::Identification, &creator)?;
        }
        if let Some(insert_list) = &config.insert_list {
            extract_list("insert", insert_list, &config.common, TemplateRole::InitI, &creator)?;
        }
    }

    if let Some(db_path) = &db_path {
        let records = facebench::binio::read_descriptors(db_path, config.common.desc_size as usize)?;
        let manifest_path = config.common.split_dir.join("manifest.txt");
        write_manifest(&manifest_path, &records, config.common.desc_size as usize)?;

        let out_dir = config.common.split_dir.display().to_string();
        let status = engine.finalize_init(&config_dir, &out_dir, &db_path.display().to_string(), &manifest_path.display().to_string());
        if !status.is_success() {
            anyhow::bail!("gallery finalize failed: {}", status.info);
        }
        let status = engine.initialize_identification(&config_dir, &out_dir);
        if !status.is_success() {
            anyhow::bail!("identification initialization failed: {}", status.info);
        }
    }

    if config.do_insert {
        if let Some(insert_list) = &config.insert_list {
            let _ = insert_list;
            let insert_path = config.common.split_dir.join("insert_descriptors.bin");
            let db_path = db_path.clone().ok_or_else(|| anyhow::anyhow!("insert requires a db list"))?;
            let mut insert_fn = |templ: &[u8], id: &str| engine.gallery_insert_id(templ, id);
            let inserted = ident::insert(&insert_path, &db_path, config.common.desc_size as usize, &mut insert_fn)?;
            tracing::info!(inserted, "insert stage done");
        }
    }

    if config.do_remove {
        if let Some(remove_list) = &config.remove_list {
            let mut remove_fn = |id: &str| engine.gallery_delete_id(id);
            let removed = ident::remove(remove_list, &mut remove_fn)?;
            tracing::info!(removed, "remove stage done");
        }
    }

    if config.do_search {
        let (mate_list, nonmate_list) = match (&config.mate_list, &config.nonmate_list) {
            (Some(m), Some(n)) => (m, n),
            _ => anyhow::bail!("search requires both --mate-list and --nonmate-list"),
        };
        let _ = mate_list;
        let _ = nonmate_list;

        let mate_path = config.common.split_dir.join("mate_descriptors.bin");
        let nonmate_path = config.common.split_dir.join("nonmate_descriptors.bin");

        let identify = |templ: &[u8], k: u32, candidates: &mut Vec<facebench::Candidate>, decision: &mut bool| engine.identify_template(templ, k, candidates, decision);

        let options = ident::SearchOptions {
            desc_size: config.common.desc_size as usize,
            ranks: IDENTIFICATION_RANKS.to_vec(),
            nearest_count: config.nearest_count,
            extra_timings: config.common.extra_timings,
            percentile: config.common.percentile_fraction(),
        };

        let report = ident::search(&options, &mate_path, &nonmate_path, &config.common.split_dir, &identify)?;
        tracing::info!(queries = report.queries, skipped = report.skipped, "search stage done");
    }

    if config.do_tpir {
        ident::tpir(&config.common.split_dir, &tpir_ranks(), &[1, 2, 3])?;
    }

    Ok(())
}
