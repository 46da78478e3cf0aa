use std::{fs, io::Write, path::PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::{
    csv_codec,
    models::{Entry, EntryPayload},
    store::EntryStore,
};

#[derive(Parser, Debug)]
#[command(name = "archilog")]
#[command(about = "Keep track of financial entries from the shell, the browser or the API")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Database connection string, overrides `ARCHILOG_DATABASE_URL`.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the entries table if it does not exist yet.
    InitDb,
    Create(EntryArgs),
    Get {
        #[arg(long)]
        id: i64,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        entry: EntryArgs,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// List every entry.
    GetEntries {
        /// Print CSV instead of a table.
        #[arg(long)]
        as_csv: bool,
    },
    ImportCsv { file: PathBuf },
    ExportCsv { file: PathBuf },
    /// Run the web interface and the JSON API.
    Serve,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    #[arg(short, long)]
    pub name: String,
    #[arg(short, long, allow_negative_numbers = true)]
    pub amount: f64,
    #[arg(short, long)]
    pub category: Option<String>,
}

impl From<EntryArgs> for EntryPayload {
    fn from(args: EntryArgs) -> Self {
        EntryPayload {
            name: args.name,
            amount: args.amount,
            category: args.category,
        }
    }
}

/// Runs every command except [`Command::Serve`], printing results to `out`.
pub async fn execute(
    command: Command,
    store: &EntryStore,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match command {
        Command::InitDb => {
            store.init().await?;
            writeln!(out, "Database initialized")?;
        }
        Command::Create(args) => {
            let name = args.name.clone();
            let id = store.create(args.into()).await?;
            writeln!(out, "Entry for {} created successfully with id {id}", name.trim())?;
        }
        Command::Get { id } => {
            let entry = store.get(id).await?;
            write!(out, "{}", render_table(&[entry]))?;
        }
        Command::Update { id, entry } => {
            store.update(id, entry.into()).await?;
            writeln!(out, "Entry {id} updated")?;
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            writeln!(out, "Entry {id} deleted")?;
        }
        Command::GetEntries { as_csv } => {
            let entries = store.get_all().await?;
            if as_csv {
                write!(out, "{}", csv_codec::export_entries(&entries)?)?;
            } else {
                write!(out, "{}", render_table(&entries))?;
            }
        }
        Command::ImportCsv { file } => {
            let input = fs::File::open(&file)
                .with_context(|| format!("opening {}", file.display()))?;
            let report = csv_codec::import(store, input).await?;
            writeln!(
                out,
                "{} entries imported, {} rows rejected",
                report.imported.len(),
                report.rejected.len()
            )?;
            for rejected in &report.rejected {
                writeln!(out, "  row {}: {}", rejected.row, rejected.reason)?;
            }
        }
        Command::ExportCsv { file } => {
            let csv = csv_codec::export(store).await?;
            fs::write(&file, csv).with_context(|| format!("writing {}", file.display()))?;
            writeln!(out, "Exported file: {}", file.display())?;
        }
        Command::Serve => anyhow::bail!("serve is handled by the binary"),
    }

    Ok(())
}

/// Renders entries as a grid:
///
/// ```text
/// +----+--------+--------+----------+
/// | ID | Name   | Amount | Category |
/// +====+========+========+==========+
/// | 1  | Coffee | 3.5    | Food     |
/// +----+--------+--------+----------+
/// ```
pub fn render_table(entries: &[Entry]) -> String {
    let headers = ["ID", "Name", "Amount", "Category"];
    let rows: Vec<[String; 4]> = entries
        .iter()
        .map(|e| {
            [
                e.id.to_string(),
                e.name.clone(),
                csv_codec::format_amount(e.amount),
                e.category.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let rule = |fill: char| {
        let mut line = String::from("+");
        for width in widths {
            line.extend(std::iter::repeat(fill).take(width + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };
    let line = |cells: &[String]| {
        let mut line = String::from("|");
        for (cell, width) in cells.iter().zip(widths) {
            let pad = width - cell.chars().count();
            line.push_str(&format!(" {cell}{} |", " ".repeat(pad)));
        }
        line.push('\n');
        line
    };

    let mut table = rule('-');
    table.push_str(&line(headers.map(String::from).as_slice()));
    table.push_str(&rule('='));
    for row in &rows {
        table.push_str(&line(row.as_slice()));
        table.push_str(&rule('-'));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(command: Command, store: &EntryStore) -> anyhow::Result<String> {
        let mut out = Vec::new();
        execute(command, store, &mut out).await?;
        Ok(String::from_utf8(out)?)
    }

    fn entry_args(name: &str, amount: f64, category: Option<&str>) -> EntryArgs {
        EntryArgs {
            name: name.to_string(),
            amount,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn command_names_match_the_documented_cli() {
        let cli = Cli::try_parse_from(["archilog", "get-entries", "--as-csv"]).unwrap();
        assert!(matches!(cli.command, Command::GetEntries { as_csv: true }));

        let cli = Cli::try_parse_from([
            "archilog", "update", "--id", "3", "-n", "Tea", "-a", "2.5", "-c", "Drinks",
        ])
        .unwrap();
        match cli.command {
            Command::Update { id, entry } => {
                assert_eq!(id, 3);
                assert_eq!(entry.name, "Tea");
                assert_eq!(entry.amount, 2.5);
                assert_eq!(entry.category.as_deref(), Some("Drinks"));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["archilog", "init-db", "--database-url", "sqlite::memory:"])
            .unwrap();
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn table_is_aligned() {
        let table = render_table(&[
            Entry {
                id: 1,
                name: "Coffee".to_string(),
                amount: 3.5,
                category: Some("Food".to_string()),
            },
            Entry {
                id: 12,
                name: "Tea".to_string(),
                amount: 2.0,
                category: None,
            },
        ]);

        assert_eq!(
            table,
            "+----+--------+--------+----------+\n\
             | ID | Name   | Amount | Category |\n\
             +====+========+========+==========+\n\
             | 1  | Coffee | 3.5    | Food     |\n\
             +----+--------+--------+----------+\n\
             | 12 | Tea    | 2.0    |          |\n\
             +----+--------+--------+----------+\n"
        );
    }

    #[tokio::test]
    async fn commands_drive_the_store() {
        let store = EntryStore::in_memory().await.unwrap();

        let out = run(Command::Create(entry_args("Coffee", 3.5, Some("Food"))), &store)
            .await
            .unwrap();
        assert_eq!(out, "Entry for Coffee created successfully with id 1\n");

        run(
            Command::Update {
                id: 1,
                entry: entry_args("Coffee", 4.0, Some("Food")),
            },
            &store,
        )
        .await
        .unwrap();

        let out = run(Command::GetEntries { as_csv: true }, &store).await.unwrap();
        assert_eq!(out, "id,name,amount,category\n1,Coffee,4.0,Food\n");

        run(Command::Delete { id: 1 }, &store).await.unwrap();
        let err = run(Command::Get { id: 1 }, &store).await.unwrap_err();
        assert_eq!(err.to_string(), "entry 1 not found");
    }

    #[tokio::test]
    async fn invalid_input_is_reported() {
        let store = EntryStore::in_memory().await.unwrap();
        let err = run(Command::Create(entry_args("ok", -1.0, None)), &store)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid amount"));
    }

    #[tokio::test]
    async fn csv_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("export.csv");

        let source = EntryStore::in_memory().await.unwrap();
        source
            .create(EntryPayload::new("Coffee", 3.5, Some("Food")))
            .await
            .unwrap();
        source.create(EntryPayload::new("Tea", 2.0, None)).await.unwrap();
        run(Command::ExportCsv { file: file.clone() }, &source)
            .await
            .unwrap();

        let target = EntryStore::in_memory().await.unwrap();
        let out = run(Command::ImportCsv { file }, &target).await.unwrap();
        assert_eq!(out, "2 entries imported, 0 rows rejected\n");
        assert_eq!(target.get_all().await.unwrap().len(), 2);
    }
}
