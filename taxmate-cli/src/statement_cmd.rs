use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::{Path, PathBuf};
use taxmate_core::{
    build_import_payload, Category, CommitRefused, DecisionEdit, Direction, Review, ReviewSession,
    Statement,
};
use taxmate_ingest::{extract_file, Extraction, PreviewRow, SourceFormat};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::config::Config;
use crate::state::{read_session, session_path, write_session, StoredSession};

const PREVIEW_LIMIT: usize = 100;

#[derive(Subcommand, Debug)]
pub enum StatementCommand {
    /// Parse a CSV or PDF statement and show how its rows were interpreted
    Preview {
        file: PathBuf,
    },

    /// Parse a statement, send it for auto-categorisation and open it for review
    Import {
        file: PathBuf,

        #[arg(long)]
        hustle: String,
    },

    /// Show the statement under review and the current decisions
    Review,

    /// Change decisions for one or more rows
    Edit {
        /// Imported row ids
        #[arg(required = true)]
        rows: Vec<String>,

        #[arg(long, conflicts_with = "exclude")]
        include: bool,

        #[arg(long)]
        exclude: bool,

        /// INCOME or EXPENSE
        #[arg(long = "type")]
        final_type: Option<Direction>,

        #[arg(long)]
        category: Option<Category>,

        #[arg(long, conflicts_with = "clear_note")]
        note: Option<String>,

        #[arg(long)]
        clear_note: bool,
    },

    /// Save the selected rows into the hustle
    Confirm,

    /// Reload a previously imported statement from the server
    Resume {
        #[arg(long)]
        hustle: String,

        #[arg(long)]
        statement: String,
    },

    /// Drop the current review session
    Discard,
}

pub async fn run(cmd: StatementCommand, cfg: &Config) -> Result<()> {
    match cmd {
        StatementCommand::Preview { file } => preview(&file, cfg),
        StatementCommand::Import { file, hustle } => import(&file, &hustle, cfg).await,
        StatementCommand::Review => review(),
        StatementCommand::Edit {
            rows,
            include,
            exclude,
            final_type,
            category,
            note,
            clear_note,
        } => {
            let edit = DecisionEdit {
                include: match (include, exclude) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                final_type,
                final_category: category,
                note: if clear_note { Some(None) } else { note.map(Some) },
            };
            edit_rows(&rows, &edit)
        }
        StatementCommand::Confirm => confirm(cfg).await,
        StatementCommand::Resume { hustle, statement } => resume(&hustle, &statement, cfg).await,
        StatementCommand::Discard => discard(),
    }
}

/// Read and extract a statement file; `None` (after a warning) when nothing usable was found.
fn load_statement_file(file: &Path, cfg: &Config) -> Result<Option<(SourceFormat, String, Extraction)>> {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("not a file: {}", file.display()))?;
    // reject unknown extensions before touching the file
    SourceFormat::from_file_name(&file_name)?;

    let bytes = fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let (format, extraction) = extract_file(&file_name, &bytes, &cfg.pdf)?;

    print_extraction(&file_name, &extraction);
    if extraction.is_empty() {
        println!("\nWarning: No usable rows found in this statement.");
        return Ok(None);
    }
    Ok(Some((format, file_name, extraction)))
}

fn preview(file: &Path, cfg: &Config) -> Result<()> {
    load_statement_file(file, cfg)?;
    Ok(())
}

async fn import(file: &Path, hustle_id: &str, cfg: &Config) -> Result<()> {
    let Some((format, file_name, extraction)) = load_statement_file(file, cfg)? else {
        return Ok(());
    };

    let payload = build_import_payload(extraction.entries, format.source_label(), &file_name);
    let client = ApiClient::from_config(&cfg.api)?;
    let statement = match client.import_statement(hustle_id, &payload).await {
        Ok(s) => s,
        Err(e) => {
            print_service_error(&e);
            return Ok(());
        }
    };

    println!("\nStatement imported with {} rows.", statement.rows.len());
    open_review(hustle_id, statement)
}

async fn resume(hustle_id: &str, statement_id: &str, cfg: &Config) -> Result<()> {
    let client = ApiClient::from_config(&cfg.api)?;
    let rows = match client.statement_rows(hustle_id, statement_id).await {
        Ok(rows) => rows,
        Err(e) => {
            print_service_error(&e);
            return Ok(());
        }
    };

    let statement = Statement {
        id: statement_id.to_string(),
        source: None,
        file_name: None,
        rows,
    };
    open_review(hustle_id, statement)
}

/// Start a fresh session for `statement`, replacing any previous one.
fn open_review(hustle_id: &str, statement: Statement) -> Result<()> {
    let mut session = ReviewSession::new();
    session.load(statement);
    let stored = StoredSession {
        hustle_id: hustle_id.to_string(),
        session,
    };
    write_session(&session_path()?, &stored)?;
    info!(hustle_id, "review session opened");

    print_review(&stored);
    Ok(())
}

fn current_session() -> Result<StoredSession> {
    current_session_at(&session_path()?)
}

fn current_session_at(path: &Path) -> Result<StoredSession> {
    let Some(mut stored) = read_session(path)?.filter(|s| s.session.review().is_some()) else {
        bail!("No statement under review. Run: taxmate statement import <file> --hustle <id>");
    };
    if stored.session.recover_interrupted() {
        warn!("previous confirm was interrupted; its outcome is unknown");
        println!("Note: the last confirm was interrupted. Check the hustle before confirming again.\n");
        write_session(path, &stored)?;
    }
    Ok(stored)
}

fn review() -> Result<()> {
    let stored = current_session()?;
    print_review(&stored);
    Ok(())
}

fn edit_rows(rows: &[String], edit: &DecisionEdit) -> Result<()> {
    if edit.is_empty() {
        bail!("nothing to change: pass --include/--exclude, --type, --category, --note or --clear-note");
    }
    let mut stored = current_session()?;
    for id in rows {
        stored.session.edit(id, edit)?;
    }
    write_session(&session_path()?, &stored)?;
    println!("Updated {} row(s).\n", rows.len());
    print_review(&stored);
    Ok(())
}

async fn confirm(cfg: &Config) -> Result<()> {
    let path = session_path()?;
    let mut stored = current_session()?;

    let request = match stored.session.begin_commit() {
        Ok(r) => r,
        Err(CommitRefused::NothingSelected) => {
            println!("Warning: No rows selected for import.");
            return Ok(());
        }
        Err(e) => bail!(e),
    };
    let statement_id = match stored.session.review() {
        Some(r) => r.statement.id.clone(),
        None => bail!("no statement is loaded"),
    };
    write_session(&path, &stored)?;

    let client = ApiClient::from_config(&cfg.api)?;
    let outcome = client
        .confirm_statement(&stored.hustle_id, &statement_id, &request)
        .await;
    let result = stored.session.complete_commit(outcome);
    write_session(&path, &stored)?;

    match result {
        Ok(created) => {
            println!("Imported {created} transactions into your hustle.");
            Ok(())
        }
        Err(e) => {
            print_service_error(&e);
            println!("Your selections are kept; run `taxmate statement confirm` to retry.");
            Ok(())
        }
    }
}

fn discard() -> Result<()> {
    if discard_at(&session_path()?)? {
        println!("Review session discarded.");
    } else {
        println!("No review session to discard.");
    }
    Ok(())
}

/// End the stored session; the hustle it belonged to stays on record.
fn discard_at(path: &Path) -> Result<bool> {
    let Some(mut stored) = read_session(path)? else {
        return Ok(false);
    };
    if !stored.session.discard() {
        return Ok(false);
    }
    write_session(path, &stored)?;
    info!(hustle_id = %stored.hustle_id, "review session discarded");
    Ok(true)
}

fn print_service_error(e: &taxmate_core::ServiceError) {
    println!("Error: {}", e.error);
    if let Some(details) = &e.details {
        println!("Details: {details}");
    }
}

fn print_extraction(file_name: &str, extraction: &Extraction) {
    let s = &extraction.stats;
    println!("# {file_name}\n");
    println!(
        "Rows: {} usable of {} seen (headers {}, short {}, incomplete {}, no movement {})",
        extraction.len(),
        s.rows_seen,
        s.header_rows,
        s.short_rows,
        s.incomplete_rows,
        s.no_movement_rows
    );
    if s.parse_warnings > 0 {
        println!("Unreadable amounts treated as 0: {}", s.parse_warnings);
    }
    if extraction.is_empty() {
        return;
    }

    println!("\n## Preview of interpreted rows\n");
    for row in extraction.preview.iter().take(PREVIEW_LIMIT) {
        match row {
            PreviewRow::Pdf(p) => println!(
                "{:<12} {:<8} {:>14.2} | ref={} value_date={} debit={:.2} credit={:.2} balance={} | {}",
                p.date,
                p.mapped_direction,
                p.mapped_amount,
                p.reference,
                p.value_date,
                p.debit,
                p.credit,
                p.balance,
                p.remarks
            ),
            PreviewRow::Csv(c) => println!(
                "{:<12} {:<8} {:>14.2} | debit={:.2} credit={:.2} | {}",
                c.date, c.mapped_direction, c.mapped_amount, c.debit, c.credit, c.description
            ),
        }
    }
    if extraction.preview.len() > PREVIEW_LIMIT {
        println!("... and {} more", extraction.preview.len() - PREVIEW_LIMIT);
    }
}

fn print_review(stored: &StoredSession) {
    let Some(review) = stored.session.review() else {
        println!("No statement under review.");
        return;
    };

    println!(
        "## Review statement {} (hustle {}) [{}]\n",
        review.statement.id,
        stored.hustle_id,
        stored.session.state_name()
    );
    if review.decisions.is_empty() {
        println!("No rows available in this imported statement.");
        return;
    }

    for line in review_lines(review) {
        println!("{line}");
    }

    let s = review.summary();
    println!(
        "\nSelected {} of {} rows | income {:.2} | expense {:.2}",
        s.selected, s.rows, s.income_total, s.expense_total
    );
    if let Some(err) = stored.session.last_error() {
        println!("Last confirm failed: {}", err.error);
    }
    if let ReviewSession::Committed { created_count, .. } = &stored.session {
        println!("Committed: {created_count} transactions created.");
    }
}

fn review_lines(review: &Review) -> Vec<String> {
    review
        .lines()
        .map(|l| {
            let d = l.decision;
            let mut line = format!(
                "[{}] {:<10} {:<12} {:>14.2} {:<8} {:<13} {:>5} {:<8} {}",
                if d.include { "x" } else { " " },
                d.imported_row_id,
                l.row.date_raw.as_deref().unwrap_or("-"),
                l.row.amount(),
                d.final_type,
                d.final_category,
                l.row
                    .confidence
                    .map(|c| format!("{c:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
                l.row.source.as_deref().unwrap_or("-"),
                l.row.description_raw.as_deref().unwrap_or(""),
            );
            if let Some(note) = &d.note {
                line.push_str(&format!("  (note: {note})"));
            }
            line
        })
        .collect()
}
