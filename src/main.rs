//! Command-line interface for bo-wordseg
//!
//! Usage:
//!   bo-wordseg build <INPUT>... -o <OUTPUT>
//!   bo-wordseg segment [OPTIONS] [TEXT]
//!   echo "བཀྲ་ཤིས་བདེ་ལེགས།" | bo-wordseg segment --compiled bo.dump

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::LevelFilter;

use bo_wordseg::{Analyzer, AnalyzerConfig, ReaderSource, Result, SegmentMode, StopWords, Token, Trie, TrieBuilder};

/// bo-wordseg - A Tibetan word segmenter
#[derive(Parser, Debug)]
#[command(name = "bo-wordseg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile dictionary files into a binary trie
    Build(BuildArgs),
    /// Segment text read from the command line or stdin
    Segment(SegmentArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Dictionary files, one `<surface form> <command>` per line
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to write the compiled trie
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct SegmentArgs {
    /// Dictionary file to compile on the fly
    #[arg(short, long, conflicts_with = "compiled")]
    dict: Option<PathBuf>,

    /// Compiled trie written by `build`
    #[arg(short, long)]
    compiled: Option<PathBuf>,

    /// Analyzer configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Segmentation mode: word, syllable or stack
    #[arg(short, long)]
    mode: Option<SegmentMode>,

    /// Keep matched words as they are written
    #[arg(long)]
    no_lemmatize: bool,

    /// Stop word list, one word per line, `#` for comments
    #[arg(long)]
    stop_words: Option<PathBuf>,

    /// Print tokens as JSON lines
    #[arg(short, long)]
    json: bool,

    /// Text to segment; stdin is read when absent
    text: Option<String>,
}

fn build(args: BuildArgs) -> Result<()> {
    let mut builder = TrieBuilder::new();
    for input in &args.inputs {
        builder.add_file(input)?;
    }
    let trie = builder.build();
    trie.store(&args.output)?;
    log::info!("wrote {} entries to {}", trie.len(), args.output.display());
    Ok(())
}

fn load_trie(args: &SegmentArgs) -> Result<Trie> {
    if let Some(path) = &args.compiled {
        return Trie::load(path);
    }
    let mut builder = TrieBuilder::new();
    if let Some(path) = &args.dict {
        builder.add_file(path)?;
    } else {
        log::warn!("no dictionary given, every token will be a fallback token");
    }
    Ok(builder.build())
}

fn write_token(out: &mut impl Write, token: &Token, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, token)?;
        writeln!(out)
    } else {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            token.text,
            token.start,
            token.end,
            token.confidence.as_str()
        )
    }
}

fn segment(args: SegmentArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::from_path(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.segmenter.mode = mode;
    }
    if args.no_lemmatize {
        config.segmenter.lemmatize = false;
    }

    let mut analyzer = Analyzer::new(Arc::new(load_trie(&args)?), config)?;
    if let Some(path) = &args.stop_words {
        analyzer = analyzer.with_stop_words(StopWords::from_reader(BufReader::new(File::open(path)?))?);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let emit = |token: Token| -> Result<()> { Ok(write_token(&mut out, &token, args.json)?) };

    match &args.text {
        Some(text) => analyzer.analyze_text(text, emit)?,
        None if analyzer.config().split_merged_syllables => {
            let mut text = String::new();
            io::stdin().lock().read_to_string(&mut text)?;
            analyzer.analyze_text(&text, emit)?;
        }
        None => analyzer.analyze_source(ReaderSource::new(io::stdin().lock()), emit)?,
    }

    out.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(cli.log_level())
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let result = match cli.command {
        Command::Build(args) => build(args),
        Command::Segment(args) => segment(args),
    };
    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
