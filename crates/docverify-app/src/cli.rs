// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line parser and command implementations.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use docverify_core::error::Result;
use docverify_core::types::{
    DocumentCategory, DocumentId, DocumentKind, DocumentRecord, VerificationStatus,
};

use crate::services::app_services::AppServices;
use crate::services::data_dir;

#[derive(Parser)]
#[command(name = "docverify")]
#[command(about = "Automated identity document verification")]
#[command(version)]
pub struct Cli {
    /// Data directory holding the databases and config
    #[arg(long, global = true, env = data_dir::DATA_DIR_ENV)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an uploaded image and analyse it
    Analyze {
        /// Path to the uploaded image
        image: PathBuf,
        /// Category the submitter claims (tax-id, national-id, voter-id, driving-license)
        #[arg(long)]
        claimed: Option<DocumentCategory>,
        /// Submitting account
        #[arg(long, default_value = "local")]
        owner: String,
        /// What the submitter says the upload is
        #[arg(long, value_enum, default_value_t = KindArg::IdProof)]
        kind: KindArg,
    },

    /// Show one document record
    Show {
        id: DocumentId,
        /// Also print the recognized text
        #[arg(long)]
        raw: bool,
    },

    /// List document records, newest first
    List {
        /// Only this owner's documents
        #[arg(long)]
        owner: Option<String>,
    },

    /// Documents waiting on a reviewer
    Queue,

    /// Record a reviewer decision
    Review {
        id: DocumentId,
        #[arg(long, value_enum)]
        status: ReviewArg,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Show the audit trail
    Audit {
        #[arg(short, long, default_value = "20")]
        limit: u32,
        /// Only entries for this document
        #[arg(long)]
        document: Option<DocumentId>,
    },

    /// Show or change analysis settings
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current settings as JSON
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Restore default settings
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    IdProof,
    AddressProof,
    Photo,
}

impl From<KindArg> for DocumentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::IdProof => Self::IdProof,
            KindArg::AddressProof => Self::AddressProof,
            KindArg::Photo => Self::Photo,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReviewArg {
    Verified,
    Rejected,
}

impl From<ReviewArg> for VerificationStatus {
    fn from(status: ReviewArg) -> Self {
        match status {
            ReviewArg::Verified => Self::Verified,
            ReviewArg::Rejected => Self::Rejected,
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let dir = data_dir::data_dir(cli.data_dir.as_deref())?;
    let mut services = AppServices::init(dir)?;

    match cli.command {
        Commands::Analyze {
            image,
            claimed,
            owner,
            kind,
        } => cmd_analyze(&mut services, image, claimed, &owner, kind.into()).await,
        Commands::Show { id, raw } => {
            print_record(&services.document(&id)?, raw);
            Ok(())
        }
        Commands::List { owner } => {
            print_table(&services.documents(owner.as_deref())?);
            Ok(())
        }
        Commands::Queue => {
            let queue = services.review_queue()?;
            if queue.is_empty() {
                println!("Review queue is empty");
            } else {
                print_table(&queue);
            }
            Ok(())
        }
        Commands::Review { id, status, comment } => {
            let record = services.review(&id, status.into(), comment.as_deref())?;
            println!("{} is now {}", record.id, record.status);
            Ok(())
        }
        Commands::Audit { limit, document } => cmd_audit(&services, limit, document),
        Commands::Config { command } => cmd_config(&mut services, command),
    }
}

async fn cmd_analyze(
    services: &mut AppServices,
    image: PathBuf,
    claimed: Option<DocumentCategory>,
    owner: &str,
    kind: DocumentKind,
) -> Result<()> {
    services.start_analysis()?;
    let id = services.register_document(&image, owner, kind, claimed)?;
    println!("Registered {id}; analysing...");

    services.finish().await;
    print_record(&services.document(&id)?, false);
    Ok(())
}

fn cmd_audit(services: &AppServices, limit: u32, document: Option<DocumentId>) -> Result<()> {
    let entries = match document {
        Some(id) => services.audit_entries_for_document(&id)?,
        None => services.recent_audit_entries(limit)?,
    };
    if entries.is_empty() {
        println!("No audit entries");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{:<25}  {:<18}  {}  {:<5}  {}  {}",
            entry.timestamp,
            entry.action,
            entry.document_id,
            if entry.success { "ok" } else { "FAIL" },
            short_hash(&entry.fingerprint),
            entry.details.unwrap_or_default()
        );
    }
    println!("({} entries total)", services.audit_count()?);
    Ok(())
}

fn cmd_config(services: &mut AppServices, command: Option<ConfigCommands>) -> Result<()> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {}
        ConfigCommands::Set { key, value } => {
            let mut config = services.config().clone();
            config.set(&key, &value)?;
            services.save_config(config)?;
        }
        ConfigCommands::Reset => services.save_config(Default::default())?,
    }
    let json = serde_json::to_string_pretty(services.config())?;
    println!("{json}");
    if let Some(dir) = services.data_dir() {
        println!("(data directory: {})", dir.display());
    }
    Ok(())
}

fn short_hash(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}

fn print_table(records: &[DocumentRecord]) {
    if records.is_empty() {
        println!("No documents");
        return;
    }
    println!(
        "{:<36}  {:<10}  {:<5}  {:<16}  {:<12}  NAME",
        "ID", "STATUS", "CONF", "CREATED", "OWNER"
    );
    for record in records {
        println!(
            "{:<36}  {:<10}  {:>4.0}%  {:<16}  {:<12}  {}",
            record.id,
            record.status.as_str(),
            record.confidence * 100.0,
            record.created_at.format("%Y-%m-%d %H:%M").to_string(),
            record.owner,
            record.original_name
        );
    }
}

fn print_record(record: &DocumentRecord, show_raw: bool) {
    println!("Document   {}", record.id);
    println!("Owner      {}", record.owner);
    println!("File       {}", record.file_path.display());
    if let Some(mime) = &record.mime_type {
        println!("Type       {mime}");
    }
    println!("Status     {}", record.status);
    println!("Confidence {:.0}%", record.confidence * 100.0);
    println!("Updated    {}", record.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if let Some(comments) = &record.admin_comments {
        println!("Notes      {comments}");
    }
    if let Some(data) = &record.extracted_data {
        println!("Extracted:");
        for (key, value) in data {
            if key == "raw_text" && !show_raw {
                continue;
            }
            println!("  {key:<14} {value}");
        }
    }
}
