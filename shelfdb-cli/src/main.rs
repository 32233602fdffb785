use clap::{Parser, Subcommand, ValueEnum};
use shelfdb::{generate_id, Document, Record, ShelfDbError, Store};
use std::process;

/// Manage a shelfdb JSON collection store from the command line
#[derive(Parser)]
#[command(name = "shelfdb", version, about)]
struct Cli {
    /// Path to the managed JSON file
    #[arg(long, default_value = "data.json")]
    file: String,

    /// Output format
    #[arg(long, default_value = "yaml")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Create the file with empty collections if it does not exist
    Init {
        /// Collections to seed (e.g. --collection users --collection workshops)
        #[arg(long = "collection", default_value = "users")]
        collections: Vec<String>,
    },

    /// Print the whole document
    Read,

    /// List records in a collection
    List {
        /// Collection name
        collection: String,
        /// Exact-match filters (e.g. --filter role=admin)
        #[arg(long = "filter", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,
    },

    /// Add a new record
    Add {
        /// Collection name
        collection: String,
        /// Field values (e.g. --field email=alice@example.org)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Update an existing record
    Update {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
        /// Field values to update (e.g. --field isActive=false)
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Delete a record
    Delete {
        /// Collection name
        collection: String,
        /// Record ID
        id: String,
        /// Show what would be deleted without actually deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a fresh record identifier
    GenerateId,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("Invalid key=value pair: no '=' found in '{s}'"))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // Machine-readable prefix so scripts can match on failures
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::new(&cli.file);

    match cli.command {
        Command::Init { collections } => {
            if store.path().exists() {
                print_output(
                    &serde_json::json!({ "ok": true, "created": false, "file": store.path() }),
                    &cli.format,
                );
            } else {
                let mut doc = Document::new();
                for collection in &collections {
                    doc.insert(collection.clone(), serde_json::Value::Array(Vec::new()));
                }
                store.write(&doc)?;
                print_output(
                    &serde_json::json!({
                        "ok": true,
                        "created": true,
                        "file": store.path(),
                        "collections": collections,
                    }),
                    &cli.format,
                );
            }
        }

        Command::Read => {
            let doc = store.read()?;
            print_output(&serde_json::Value::from(doc), &cli.format);
        }

        Command::List {
            collection,
            filters,
        } => {
            let filter = fields_to_record(&filters);
            let records = store.find_records(&collection, &filter)?;
            print_output(&serde_json::to_value(&records)?, &cli.format);
        }

        Command::Add { collection, fields } => {
            let record = fields_to_record(&fields);
            let stored = store.add_record(&collection, record)?;
            print_output(&serde_json::Value::Object(stored), &cli.format);
        }

        Command::Update {
            collection,
            id,
            fields,
        } => {
            let updates = fields_to_record(&fields);
            let updated = store.update_record(&collection, &id, updates)?;
            print_output(&serde_json::Value::Object(updated), &cli.format);
        }

        Command::Delete {
            collection,
            id,
            dry_run,
        } => {
            if dry_run {
                // Look the record up and show what would go away.
                let record = preview_delete(&store, &collection, &id)?;
                print_output(
                    &serde_json::json!({
                        "dry_run": true,
                        "would_delete": { "collection": collection, "id": id },
                        "record": record,
                    }),
                    &cli.format,
                );
            } else {
                store.delete_record(&collection, &id)?;
                print_output(
                    &serde_json::json!({ "ok": true, "deleted": id }),
                    &cli.format,
                );
            }
        }

        Command::GenerateId => {
            print_output(&serde_json::json!({ "id": generate_id() }), &cli.format);
        }
    }

    Ok(())
}

fn print_output(value: &serde_json::Value, format: &OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).unwrap());
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value).unwrap());
        }
    }
}

fn fields_to_record(fields: &[(String, String)]) -> Record {
    let mut record = Record::new();
    for (key, val) in fields {
        // Try to parse as JSON value (for numbers, booleans, arrays, objects)
        let json_val =
            serde_json::from_str(val).unwrap_or(serde_json::Value::String(val.clone()));
        record.insert(key.clone(), json_val);
    }
    record
}

/// Look a record up the way `delete` does, so a dry run fails with the same
/// error a real delete would: a missing or null collection is
/// `CollectionNotFound`, a missing id is `RecordNotFound`.
fn preview_delete(store: &Store, collection: &str, id: &str) -> shelfdb::Result<Record> {
    let doc = store.read()?;
    if matches!(doc.get(collection), None | Some(serde_json::Value::Null)) {
        return Err(ShelfDbError::CollectionNotFound(collection.to_string()));
    }

    let mut filter = Record::new();
    filter.insert("id".to_string(), serde_json::Value::String(id.to_string()));
    store
        .find_records(collection, &filter)?
        .into_iter()
        .next()
        .ok_or_else(|| ShelfDbError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })
}
