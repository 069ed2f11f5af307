use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use lexitrie::{
    clean_outputs, group_records, load_artifact, BuildCatalog, BuildConfig, CancellationToken,
    LangPair, LexitrieError, Orchestrator, Result, SourceReader, XmlSourceReader,
};

/// Exit status when the catalog was written but some pairs failed.
const EXIT_TASK_FAILURES: u8 = 2;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Only build these pairs, e.g. `eng-fin,sme-nob`
    #[clap(long, value_delimiter = ',')]
    only: Vec<LangPair>,

    /// Worker threads; defaults to 75% of the available cores
    #[clap(long)]
    jobs: Option<usize>,

    /// Rebuild even when the catalog says a pair is up to date
    #[clap(long)]
    force: bool,
}

impl BuildArgs {
    pub fn apply(self, config: &mut BuildConfig) {
        if !self.only.is_empty() {
            config.pairs = Some(self.only);
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        config.force |= self.force;
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Source language
    #[clap(long)]
    from: Option<String>,

    /// Target language
    #[clap(long)]
    to: Option<String>,
}

#[derive(Args, Debug)]
pub struct LookupArgs {
    /// Language pair, e.g. `sme-nob`
    pair: LangPair,

    prefix: String,

    /// Maximum number of lemmas to print
    #[clap(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// A language-pair source directory
    dir: PathBuf,
}

pub fn build(config: BuildConfig, cancel: CancellationToken) -> Result<ExitCode> {
    if config.jobs == Some(0) {
        return Err(LexitrieError::InvalidInput(
            "--jobs must be at least 1".to_string(),
        ));
    }
    let orchestrator = Orchestrator::new(config).with_cancel(cancel);
    let report = orchestrator.run()?;
    print!("{report}");
    println!(
        "catalog written to {}",
        orchestrator.config().catalog_path.display()
    );

    if report.has_failures() {
        Ok(ExitCode::from(EXIT_TASK_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

pub fn clean(config: &BuildConfig) -> Result<ExitCode> {
    let removed = clean_outputs(config)?;
    println!("removed {removed} files");
    Ok(ExitCode::SUCCESS)
}

pub fn list(config: &BuildConfig, args: &ListArgs) -> Result<ExitCode> {
    let catalog = BuildCatalog::load(&config.catalog_path)?;
    let from = args.from.as_deref();
    let to = args.to.as_deref();

    let mut sources = BTreeSet::new();
    for entry in catalog.find(from, to) {
        println!(
            "{}-{}\t{:>8} lemmas\t{}\t{}",
            entry.lang1,
            entry.lang2,
            entry.lemma_count,
            entry.artifact_filename,
            entry.source_last_modified.format("%Y-%m-%d %H:%M:%S")
        );
        sources.insert(entry.lang1.as_str());
    }
    for lang in sources {
        println!("{lang}: {} lemmas in total", catalog.total_lemmas(lang));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn lookup(config: &BuildConfig, args: &LookupArgs) -> Result<ExitCode> {
    let path = config.output_dir.join(args.pair.artifact_filename());
    let trie = load_artifact(&path)?;

    let mut shown = 0;
    for (lemma, senses) in trie.prefix_search(&args.prefix).take(args.limit) {
        let translations: Vec<String> = senses
            .iter()
            .map(|sense| match &sense.pos {
                Some(pos) => format!("{} ({pos})", sense.translation),
                None => sense.translation.clone(),
            })
            .collect();
        println!("{lemma}\t{}", translations.join("; "));
        shown += 1;
    }
    if shown == 0 {
        log::info!("no lemmas start with {:?} in {}", args.prefix, args.pair);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn dump(args: &DumpArgs) -> Result<ExitCode> {
    let source = XmlSourceReader.read(&args.dir)?;
    for (lemma, senses) in group_records(source.records) {
        let translations: Vec<&str> = senses
            .iter()
            .map(|sense| sense.translation.as_str())
            .collect();
        println!("{lemma}\t{}", translations.join(", "));
    }
    Ok(ExitCode::SUCCESS)
}
