//! Quadstore CLI: create, load, query and dump a quad store file

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use quadstore::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, QuadStore, RdfFormat, RdfObject,
    RdfPredicate, RdfSubject, StatementRow, StoreConfig, LOOKUP_STATEMENTS,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quadstore", version, about = "Dictionary-encoded RDF quad store")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Storage options, e.g. "update_index_stats='yes', cache_size='1024'"
    #[arg(long, default_value = "", global = true)]
    options: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    N3,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum InputFormat {
    Nt,
    Nq,
    Ttl,
}

impl From<InputFormat> for RdfFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Nt => RdfFormat::NTriples,
            InputFormat::Nq => RdfFormat::NQuads,
            InputFormat::Ttl => RdfFormat::Turtle,
        }
    }
}

/// Object of a statement: exactly one kind
#[derive(Args)]
#[group(required = true, multiple = false)]
struct ObjectArg {
    /// Object URI
    #[arg(long)]
    object_uri: Option<String>,

    /// Object blank node name
    #[arg(long)]
    object_blank: Option<String>,

    /// Literal object value
    #[arg(long)]
    literal: Option<String>,
}

/// Object filter for `find`: at most one kind
#[derive(Args)]
#[group(required = false, multiple = false)]
struct ObjectFilter {
    #[arg(long)]
    object_uri: Option<String>,

    #[arg(long)]
    object_blank: Option<String>,

    #[arg(long)]
    literal: Option<String>,
}

/// Literal qualifiers
#[derive(Args)]
struct LiteralArgs {
    /// Language tag of the literal
    #[arg(long, conflicts_with = "datatype")]
    lang: Option<String>,

    /// Datatype URI of the literal
    #[arg(long)]
    datatype: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty store
    Init {
        db: PathBuf,
    },
    /// Load an N-Triples, N-Quads or Turtle file
    Import {
        db: PathBuf,
        file: PathBuf,

        /// Input format (guessed from the extension when omitted)
        #[arg(long = "input-format")]
        input_format: Option<InputFormat>,

        /// Context for statements without one (defaults to the file's URI)
        #[arg(long, conflicts_with = "no_context")]
        context: Option<String>,

        /// Put statements without a context in the default graph
        #[arg(long)]
        no_context: bool,
    },
    /// Add one statement
    Add {
        db: PathBuf,
        /// Subject URI, or _:name for a blank node
        #[arg(long)]
        subject: String,
        #[arg(long)]
        predicate: String,
        #[command(flatten)]
        object: ObjectArg,
        #[command(flatten)]
        literal: LiteralArgs,
        #[arg(long)]
        context: Option<String>,
    },
    /// Remove one statement
    Remove {
        db: PathBuf,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        predicate: String,
        #[command(flatten)]
        object: ObjectArg,
        #[command(flatten)]
        literal: LiteralArgs,
        #[arg(long)]
        context: Option<String>,
    },
    /// Find statements matching a single-quad pattern
    Find {
        db: PathBuf,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        predicate: Option<String>,
        #[command(flatten)]
        object: ObjectFilter,
        #[command(flatten)]
        literal: LiteralArgs,
        /// Only this context
        #[arg(long, conflicts_with = "default_context")]
        context: Option<String>,
        /// Only the default graph
        #[arg(long)]
        default_context: bool,
    },
    /// Print every statement
    Dump {
        db: PathBuf,
    },
    /// Table sizes and contexts
    Stats {
        db: PathBuf,
    },
    /// Print the shape -> lookup statement table
    Statements,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Init { db } => run_init(db, &cli.options),
        Commands::Import {
            db,
            file,
            input_format,
            context,
            no_context,
        } => run_import(
            db,
            &cli.options,
            file,
            input_format.map(RdfFormat::from),
            context.as_deref(),
            *no_context,
        ),
        Commands::Add {
            db,
            subject,
            predicate,
            object,
            literal,
            context,
        } => build_quad(subject, predicate, object, literal, context.as_deref())
            .and_then(|quad| run_add(db, &cli.options, &quad)),
        Commands::Remove {
            db,
            subject,
            predicate,
            object,
            literal,
            context,
        } => build_quad(subject, predicate, object, literal, context.as_deref())
            .and_then(|quad| run_remove(db, &cli.options, &quad)),
        Commands::Find {
            db,
            subject,
            predicate,
            object,
            literal,
            context,
            default_context,
        } => build_pattern(
            subject.as_deref(),
            predicate.as_deref(),
            object,
            literal,
            context.as_deref(),
            *default_context,
        )
        .and_then(|pattern| run_find(db, &cli.options, &pattern, &cli.format)),
        Commands::Dump { db } => run_dump(db, &cli.options, &cli.format),
        Commands::Stats { db } => run_stats(db, &cli.options, &cli.format),
        Commands::Statements => run_statements(&cli.format),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn open_existing(db: &Path, options: &str) -> Result<QuadStore> {
    let config = StoreConfig::from_options(Some(db.to_path_buf()), options)?;
    QuadStore::open(config).with_context(|| format!("cannot open {}", db.display()))
}

fn run_init(db: &Path, options: &str) -> Result<()> {
    let mut config = StoreConfig::from_options(Some(db.to_path_buf()), options)?;
    config.create_schema = true;
    QuadStore::open(config).with_context(|| format!("cannot create {}", db.display()))?;
    println!("Initialized {}", db.display());
    Ok(())
}

fn run_import(
    db: &Path,
    options: &str,
    file: &Path,
    format: Option<RdfFormat>,
    context: Option<&str>,
    no_context: bool,
) -> Result<()> {
    let store = open_existing(db, options)?;

    let default_context = if no_context {
        None
    } else if let Some(uri) = context {
        Some(NamedNode::new(uri)?)
    } else {
        Some(quadstore::rdf::file_iri(file)?)
    };

    let inserted = store
        .load_file(file, format, default_context.as_ref())
        .with_context(|| format!("cannot import {}", file.display()))?;
    println!("Imported {} new statement(s) from {}", inserted, file.display());
    Ok(())
}

fn run_add(db: &Path, options: &str, quad: &Quad) -> Result<()> {
    let store = open_existing(db, options)?;
    let (id, inserted) = store.add(quad)?;
    if inserted {
        println!("Added statement {}", id.as_i64());
    } else {
        println!("Statement {} already present", id.as_i64());
    }
    Ok(())
}

fn run_remove(db: &Path, options: &str, quad: &Quad) -> Result<()> {
    let store = open_existing(db, options)?;
    if store.remove(quad)? {
        println!("Removed {}", quad);
    } else {
        println!("Not found: {}", quad);
    }
    Ok(())
}

fn run_find(db: &Path, options: &str, pattern: &QuadPattern, format: &OutputFormat) -> Result<()> {
    let store = open_existing(db, options)?;
    let rows = store.find_rows(pattern)?;
    print_rows(&rows, format)
}

fn run_dump(db: &Path, options: &str, format: &OutputFormat) -> Result<()> {
    let store = open_existing(db, options)?;
    match format {
        OutputFormat::N3 => {
            print!("{}", store.serialize_n3()?);
            Ok(())
        }
        _ => print_rows(&store.statement_rows()?, format),
    }
}

fn run_stats(db: &Path, options: &str, format: &OutputFormat) -> Result<()> {
    let store = open_existing(db, options)?;
    let stats = store.stats()?;
    let contexts = store.contexts()?;

    match format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(stats)?;
            value["context_uris"] = contexts.iter().map(|c| c.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            println!("Quads:     {}", stats.quads);
            println!("Resources: {}", stats.resources);
            println!("Literals:  {}", stats.literals);
            println!("Bnodes:    {}", stats.bnodes);
            println!("Contexts:  {}", stats.contexts);
            for context in &contexts {
                println!("  {}", context);
            }
        }
    }
    Ok(())
}

fn run_statements(format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", quadstore::lookup_table_json()?),
        _ => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "subject", "object", "context", "params", "sql"]);
            for (i, lookup) in LOOKUP_STATEMENTS.iter().enumerate() {
                table.add_row(vec![
                    i.to_string(),
                    format!("{:?}", lookup.shape.subject),
                    format!("{:?}", lookup.shape.object),
                    format!("{:?}", lookup.shape.context),
                    lookup.param_count.to_string(),
                    lookup.sql.to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

fn print_rows(rows: &[StatementRow], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
        OutputFormat::N3 => {
            for row in rows {
                println!("{}", row.to_quad()?);
            }
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("(no results)");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["id", "subject", "predicate", "object", "context"]);

            for row in rows {
                let quad = row.to_quad()?;
                table.add_row(vec![
                    row.statement_id.as_i64().to_string(),
                    quad.subject.to_string(),
                    quad.predicate.to_string(),
                    quad.object.to_string(),
                    quad.graph.map(|g| g.to_string()).unwrap_or_default(),
                ]);
            }

            println!("{}", table);
            println!("{} row(s)", rows.len());
        }
    }
    Ok(())
}

fn parse_subject(text: &str) -> Result<RdfSubject> {
    match text.strip_prefix("_:") {
        Some(name) => Ok(BlankNode::new(name)?.into()),
        None => Ok(NamedNode::new(text)?.into()),
    }
}

fn parse_object(
    object_uri: Option<&str>,
    object_blank: Option<&str>,
    literal: Option<&str>,
    qualifiers: &LiteralArgs,
) -> Result<Option<RdfObject>> {
    if literal.is_none() && (qualifiers.lang.is_some() || qualifiers.datatype.is_some()) {
        bail!("--lang and --datatype only apply to --literal");
    }
    let object = match (object_uri, object_blank, literal) {
        (Some(uri), None, None) => Some(NamedNode::new(uri)?.into()),
        (None, Some(name), None) => Some(BlankNode::new(name)?.into()),
        (None, None, Some(value)) => Some(
            Literal::from_parts(
                value,
                qualifiers.lang.as_deref(),
                qualifiers.datatype.as_deref(),
            )?
            .into(),
        ),
        (None, None, None) => None,
        _ => bail!("give at most one of --object-uri, --object-blank, --literal"),
    };
    Ok(object)
}

fn build_quad(
    subject: &str,
    predicate: &str,
    object: &ObjectArg,
    literal: &LiteralArgs,
    context: Option<&str>,
) -> Result<Quad> {
    let object = parse_object(
        object.object_uri.as_deref(),
        object.object_blank.as_deref(),
        object.literal.as_deref(),
        literal,
    )?
    .context("an object is required")?;
    let graph = context.map(NamedNode::new).transpose()?;
    Ok(Quad::new(
        parse_subject(subject)?,
        RdfPredicate::new(predicate)?,
        object,
        graph,
    ))
}

fn build_pattern(
    subject: Option<&str>,
    predicate: Option<&str>,
    object: &ObjectFilter,
    literal: &LiteralArgs,
    context: Option<&str>,
    default_context: bool,
) -> Result<QuadPattern> {
    let mut pattern = QuadPattern::any();
    if let Some(subject) = subject {
        pattern.subject = Some(parse_subject(subject)?);
    }
    if let Some(predicate) = predicate {
        pattern.predicate = Some(RdfPredicate::new(predicate)?);
    }
    pattern.object = parse_object(
        object.object_uri.as_deref(),
        object.object_blank.as_deref(),
        object.literal.as_deref(),
        literal,
    )?;
    if let Some(context) = context {
        pattern = pattern.in_graph(Some(NamedNode::new(context)?));
    } else if default_context {
        pattern = pattern.in_graph(None);
    }
    Ok(pattern)
}
