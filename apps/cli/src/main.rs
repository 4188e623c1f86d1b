//! `codeset` — build cross-vocabulary clinical code sets from a seed code.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use codeset_core::{
    domain_for_semantic_types, export_file_name, select_for_export, to_tsv, CancelToken,
    CodeSetBuilder, Domain, ExportFilter, HierarchyNode, SearchSort, TerminologyGateway,
};
use codeset_terminology_client::TerminologyClient;

#[derive(Parser)]
#[command(
    name = "codeset",
    version,
    about = "Build cross-vocabulary clinical code sets from a seed terminology code"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search concepts by name.
    Search {
        term: String,
        /// Restrict hits to these vocabularies (repeatable).
        #[arg(long = "vocab")]
        vocabularies: Vec<String>,
        /// Keep the service's relevance order instead of sorting by name.
        #[arg(long)]
        relevance: bool,
    },
    /// Show ancestors and immediate descendants of a code.
    Tree { vocabulary: String, code: String },
    /// Count the immediate descendants of a seed code.
    Estimate { vocabulary: String, code: String },
    /// Build the full code set for a seed code.
    Build {
        vocabulary: String,
        code: String,
        /// Clinical domain; auto-detected from the seed concept's semantic
        /// types when omitted.
        #[arg(long)]
        domain: Option<Domain>,
        /// Output path; defaults to <concept-id>.tsv in the working directory.
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Free-text export filter (minimum 3 characters).
        #[arg(long)]
        filter: Option<String>,
        /// Export only these vocabularies (repeatable).
        #[arg(long = "only-vocab")]
        only_vocabularies: Vec<String>,
        /// Skip the large-hierarchy confirmation prompt.
        #[arg(long, short)]
        yes: bool,
        /// Immediate-descendant count above which confirmation is required.
        #[arg(long, default_value_t = 200)]
        threshold: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("codeset=info,codeset_core=warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let client = TerminologyClient::from_env().context("terminology client configuration")?;

    match cli.command {
        Command::Search {
            term,
            vocabularies,
            relevance,
        } => search(&client, &term, &vocabularies, relevance).await,
        Command::Tree { vocabulary, code } => tree(&client, &vocabulary, &code).await,
        Command::Estimate { vocabulary, code } => estimate(&client, &vocabulary, &code).await,
        Command::Build {
            vocabulary,
            code,
            domain,
            out,
            filter,
            only_vocabularies,
            yes,
            threshold,
        } => {
            build(
                &client,
                BuildArgs {
                    vocabulary,
                    code,
                    domain,
                    out,
                    filter,
                    only_vocabularies,
                    yes,
                    threshold,
                },
            )
            .await
        }
    }
}

async fn search(
    client: &TerminologyClient,
    term: &str,
    vocabularies: &[String],
    relevance: bool,
) -> anyhow::Result<()> {
    let sort = if relevance {
        SearchSort::Relevance
    } else {
        SearchSort::Alphabetical
    };
    let filter = (!vocabularies.is_empty()).then_some(vocabularies);
    let hits = client.search_concepts(term, filter, sort).await?;
    if hits.is_empty() {
        println!("no concepts found for '{term}'");
        return Ok(());
    }
    for hit in hits {
        println!("{}\t{}\t{}", hit.concept_id, hit.root_source, hit.name);
    }
    Ok(())
}

async fn tree(client: &TerminologyClient, vocabulary: &str, code: &str) -> anyhow::Result<()> {
    // Both listings are read-only and independent; fetch them in parallel.
    let (ancestors, descendants) = tokio::join!(
        client.ancestors(vocabulary, code),
        client.descendants(vocabulary, code)
    );
    let (ancestors, descendants) = (ancestors?, descendants?);

    println!("ancestors ({}):", ancestors.len());
    for node in &ancestors {
        println!("  {}\t{}", node.code, node.term);
    }
    println!("descendants ({}):", descendants.len());
    for node in &descendants {
        println!("  {}\t{}", node.code, node.term);
    }
    Ok(())
}

async fn estimate(client: &TerminologyClient, vocabulary: &str, code: &str) -> anyhow::Result<()> {
    let count = CodeSetBuilder::new(client)
        .estimate_immediate_descendant_count(vocabulary, code)
        .await?;
    println!("{count}");
    Ok(())
}

struct BuildArgs {
    vocabulary: String,
    code: String,
    domain: Option<Domain>,
    out: Option<PathBuf>,
    filter: Option<String>,
    only_vocabularies: Vec<String>,
    yes: bool,
    threshold: usize,
}

async fn build(client: &TerminologyClient, args: BuildArgs) -> anyhow::Result<()> {
    // Resolve the seed to its concept for the root term and, when not given
    // explicitly, the clinical domain.
    let concept_id = client
        .source_concept_id(&args.vocabulary, &args.code)
        .await?
        .with_context(|| format!("no concept found for {}/{}", args.vocabulary, args.code))?;
    let (concept, atoms) = client
        .concept_with_atoms(&concept_id, std::slice::from_ref(&args.vocabulary))
        .await?;
    let term = atoms
        .iter()
        .find(|a| a.source_code == args.code)
        .map(|a| a.display_term.clone())
        .unwrap_or_else(|| concept.preferred_name.clone());

    let domain = args
        .domain
        .unwrap_or_else(|| domain_for_semantic_types(&concept.semantic_types));
    eprintln!("building {domain} code set for {}/{} ({term})", args.vocabulary, args.code);

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ncancelling...");
                cancel.cancel();
            }
        });
    }

    let builder = CodeSetBuilder::new(client).with_cancel(cancel);
    let seed = HierarchyNode::new(args.vocabulary.clone(), args.code.clone(), term);

    // Size the hierarchy the build will actually walk: a non-standard seed
    // is re-anchored to the standard vocabulary before being counted.
    let estimated = builder.estimate_build_size(&seed, domain).await?;
    if estimated > args.threshold && !args.yes {
        confirm_large_build(estimated)?;
    }

    let progress = |phase: &str, current: usize, total: usize| {
        if total > 0 {
            eprint!("\r{phase}: {current}/{total}        ");
        } else {
            eprint!("\r{phase}: {current}        ");
        }
        let _ = io::stderr().flush();
    };
    let builder = builder.with_progress(&progress);

    let result = builder.build(seed, domain).await?;
    eprintln!();

    let filter = ExportFilter {
        text: args.filter,
        vocabularies: (!args.only_vocabularies.is_empty()).then_some(args.only_vocabularies),
    };
    let selected = select_for_export(&result.codes, &filter);
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(export_file_name(&concept_id)));
    std::fs::write(&path, to_tsv(&selected))
        .with_context(|| format!("writing {}", path.display()))?;

    println!(
        "{} codes ({} source concepts, {} exported) -> {}",
        result.codes.len(),
        result.source_concept_count,
        selected.len(),
        path.display()
    );
    Ok(())
}

fn confirm_large_build(estimated: usize) -> anyhow::Result<()> {
    if !io::stdin().is_terminal() {
        bail!("walk root has {estimated} immediate descendants; re-run with --yes to proceed");
    }
    eprint!("walk root has {estimated} immediate descendants; the build may take a while. Proceed? [y/N] ");
    io::stderr().flush().ok();
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    if !matches!(answer.trim(), "y" | "Y" | "yes") {
        bail!("aborted");
    }
    Ok(())
}
