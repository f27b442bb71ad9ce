use clap::{Args as ClapArgs, Parser, Subcommand};
use ersm_core::{
    AssumeYes, BackupStore, Catalog, Config, ConsolePrompter, CreateOutcome, Error, Prompter,
    Session, Slot, confirm, locate,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ersm",
    about = "Back up and restore Elden Ring save files",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
    /// Directory holding the archive (saves/), the catalog and the remembered save path
    #[arg(long, global = true, env = "ERSM_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Live save file (or its folder); skips save-location discovery
    #[arg(long, global = true, env = "ERSM_SAVE_FILE")]
    save_file: Option<PathBuf>,
    /// Read the save location from game_savepath.txt instead of searching for it
    #[arg(long, global = true, default_value_t = false)]
    custom_location: bool,
    /// Print all saves before running the command
    #[arg(long, global = true, default_value_t = false)]
    list: bool,
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a named save, or with --backup fill the userbackup slot
    Save(SaveArgs),
    /// Restore a named save, the userbackup slot, or the temporary slot
    Load(LoadArgs),
    /// List saves and backup slots
    List,
    /// Remove a named save and its stored copy
    Remove(RemoveArgs),
}

#[derive(ClapArgs, Debug)]
struct SaveArgs {
    /// Copy into the userbackup slot instead of creating a named save
    #[arg(short = 'b', long, default_value_t = false, conflicts_with_all = ["name", "description"])]
    backup: bool,
    /// Save name (prompted for when missing)
    #[arg(long)]
    name: Option<String>,
    /// Short description (prompted for when missing)
    #[arg(long)]
    description: Option<String>,
    /// Overwrite an existing save without asking
    #[arg(short, long, default_value_t = false)]
    yes: bool,
}

#[derive(ClapArgs, Debug)]
struct LoadArgs {
    /// Name of the save to restore (prompted for when no flag is given)
    #[arg(conflicts_with_all = ["load_backup", "temporary"])]
    name: Option<String>,
    /// Restore the userbackup slot
    #[arg(long = "load-backup", default_value_t = false, conflicts_with = "temporary")]
    load_backup: bool,
    /// Swap the live file with the temporary slot taken on the previous run
    #[arg(long, default_value_t = false)]
    temporary: bool,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    name: String,
    /// Do not ask for confirmation
    #[arg(short, long, default_value_t = false)]
    yes: bool,
}

fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => {}
        Err(Error::Aborted) => {
            println!("Exiting...");
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(exit_code(&e));
        }
    }
}

fn exit_code(e: &Error) -> i32 {
    match e {
        Error::Aborted => 0,
        Error::InvalidName { .. } | Error::UnknownSave(_) => 3,
        Error::Catalog { .. } | Error::Json(_) => 4,
        Error::Io { .. }
        | Error::MissingSource(_)
        | Error::EmptySlot { .. }
        | Error::NoSaveFile(_)
        | Error::Prompt(_) => 2,
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = cli.data_dir.as_deref().map(Config::in_dir).unwrap_or_default();
    let mut prompter = ConsolePrompter;

    match cli.cmd {
        Cmd::List => cmd_list(&config),
        Cmd::Remove(a) => cmd_remove(&config, a, cli.list, &mut prompter),
        Cmd::Save(a) => {
            let catalog = Catalog::load(&config.catalog_path)?;
            announce(&catalog, cli.list);
            let live = live_path(&config, cli.save_file, cli.custom_location, &mut prompter)?;
            let mut session = Session::with_catalog(&config, catalog, live)?;
            session.auto_backup()?;
            cmd_save(&mut session, a, &mut prompter)
        }
        Cmd::Load(a) => {
            let catalog = Catalog::load(&config.catalog_path)?;
            announce(&catalog, cli.list);
            let live = live_path(&config, cli.save_file, cli.custom_location, &mut prompter)?;
            let session = Session::with_catalog(&config, catalog, live)?;
            // Restoring the temporary slot must not refresh it first.
            if !a.temporary {
                session.auto_backup()?;
            }
            cmd_load(&session, a, &mut prompter)
        }
    }
}

fn live_path(
    config: &Config,
    save_file: Option<PathBuf>,
    custom_location: bool,
    prompter: &mut dyn Prompter,
) -> Result<PathBuf, Error> {
    match save_file {
        Some(p) => locate::resolve(&p),
        None => locate::locate(config, custom_location, &locate::default_save_dir(), prompter),
    }
}

fn announce(catalog: &Catalog, list: bool) {
    if catalog.is_empty() {
        println!("Save data currently empty...");
    }
    if list {
        print_saves(catalog);
    }
}

fn cmd_save(
    session: &mut Session,
    args: SaveArgs,
    prompter: &mut dyn Prompter,
) -> Result<(), Error> {
    if args.backup {
        session.backup(Slot::UserBackup)?;
        println!("Backed up {} to the {} slot.", session.live().display(), Slot::UserBackup);
        return Ok(());
    }
    let name = match args.name {
        Some(n) => n.trim().to_string(),
        None => prompter.ask("Please enter the name of your save: ").map_err(Error::Prompt)?,
    };
    let description = match args.description {
        Some(d) => d.trim().to_string(),
        None => prompter
            .ask("Please enter a brief description of your save: ")
            .map_err(Error::Prompt)?,
    };
    let outcome = if args.yes {
        session.create_save(&name, &description, &mut AssumeYes)?
    } else {
        session.create_save(&name, &description, prompter)?
    };
    match outcome {
        CreateOutcome::Created => println!("Created save '{}'.", name),
        CreateOutcome::Overwritten => println!("Overwrote save '{}'.", name),
        CreateOutcome::Declined => println!("Exiting..."),
    }
    Ok(())
}

fn cmd_load(session: &Session, args: LoadArgs, prompter: &mut dyn Prompter) -> Result<(), Error> {
    if args.load_backup {
        session.restore_backup(Slot::UserBackup)?;
        println!("Restored the {} slot.", Slot::UserBackup);
    } else if args.temporary {
        session.undo_with_temporary()?;
        println!("Swapped the live save with the {} slot.", Slot::Temporary);
    } else {
        let name = match args.name {
            Some(n) => n,
            None => {
                print_saves(session.catalog());
                let n = prompter
                    .ask("Which save would you like to load? (q to quit): ")
                    .map_err(Error::Prompt)?;
                if n.is_empty() || n == "q" {
                    return Err(Error::Aborted);
                }
                n
            }
        };
        session.restore_save(&name)?;
        println!("Restored save '{}'.", name);
    }
    Ok(())
}

fn cmd_list(config: &Config) -> Result<(), Error> {
    let catalog = Catalog::load(&config.catalog_path)?;
    let store = BackupStore::open(&config.archive_root)?;
    print_saves(&catalog);
    println!("Slots:");
    for entry in store.entries()? {
        if Slot::from_tag(&entry.key).is_some() {
            println!("  {}: {} ({} bytes)", entry.key, entry.path.display(), entry.len);
        }
    }
    Ok(())
}

fn cmd_remove(
    config: &Config,
    args: RemoveArgs,
    list: bool,
    prompter: &mut dyn Prompter,
) -> Result<(), Error> {
    let mut catalog = Catalog::load(&config.catalog_path)?;
    let store = BackupStore::open(&config.archive_root)?;
    if list {
        print_saves(&catalog);
    }
    let Some(save) = catalog.get(&args.name) else {
        return Err(Error::UnknownSave(args.name));
    };
    let question = format!("Remove save '{}'?", save);
    if !args.yes && !confirm(prompter, &question).map_err(Error::Prompt)? {
        return Err(Error::Aborted);
    }
    let removed = catalog.remove_save(&store, &args.name)?;
    println!("Removed save '{}'.", removed.name);
    Ok(())
}

fn print_saves(catalog: &Catalog) {
    println!("Saves:");
    for save in catalog.list() {
        println!("  {} ({})", save, save.created_at.format("%Y-%m-%d %H:%M UTC"));
    }
    let rejected = catalog.rejected_lines().len();
    if rejected > 0 {
        println!("  ({} unreadable catalog entries skipped)", rejected);
    }
}
