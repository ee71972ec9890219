// Group Draw - interactive terminal front end
// Stands in for the wheel widget and the announcement popup at their
// interfaces: it feeds events into the reducer and renders the directives
// that come back as plain text.

use anyhow::Result;
use group_draw::{
    load_or_keep, App, Directive, Event, GroupConfig, OverrideSource, OverrideTable,
    DEFAULT_SHEET_RANGE,
};
use rand::Rng;
use std::env;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = group_config_from_env()?;
    println!("🎡 Group Draw v{}", group_draw::VERSION);
    println!("Groups: {}", config.labels().join(", "));

    // The override fetch runs concurrently; the draw works on an empty table
    // until (and unless) the load lands.
    let (table_tx, mut table_rx) = mpsc::channel::<OverrideTable>(1);
    match override_source_from_env() {
        Some(source) => {
            let config = config.clone();
            tokio::spawn(async move {
                let client = reqwest::Client::new();
                let table =
                    load_or_keep(&source, &client, &config, OverrideTable::default()).await;
                let _ = table_tx.send(table).await;
            });
        }
        None => {
            info!("no override source configured, balancing only");
            drop(table_tx);
        }
    }

    let mut app = App::new(config);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(table) = table_rx.recv() => {
                println!("✓ Override table ready ({} rows)", table.len());
                render(app.apply(Event::OverridesLoaded(table)));
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut app, line.trim()) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn handle_command(app: &mut App, input: &str) -> bool {
    let (command, rest) = match input.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command {
        "" => {}
        "help" => print_help(),
        "add" => render(app.apply(Event::AddRequested(rest.to_string()))),
        "edit" => {
            // Comma-separated stand-in for the textarea
            let text = rest
                .split(',')
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("\n");
            render(app.apply(Event::TextEdited(text)));
        }
        "list" => print_pending(app),
        "groups" => print_groups(app),
        "spin" => {
            if app.pool_size() == 0 {
                println!("The wheel is empty. Add names first!");
            } else if app.engine().live_proposal().is_some() {
                println!("Finish the current announcement first (ok / no).");
            } else {
                // The selector contract: one uniform index over the pool
                let index = rand::thread_rng().gen_range(0..app.pool_size());
                render(app.apply(Event::SpinResolved(index)));
            }
        }
        "ok" => render(app.apply(Event::ConfirmRequested)),
        "no" => render(app.apply(Event::DismissRequested)),
        "quit" | "exit" => return false,
        other => println!("Unknown command '{}', try 'help'.", other),
    }

    true
}

fn render(directives: Vec<Directive>) {
    for directive in directives {
        match directive {
            Directive::ShowPending { entries, .. } => {
                println!("✓ Wheel now has {} name(s)", entries.len());
            }
            Directive::ShowGroups(groups) => {
                for (label, members) in groups {
                    let names: Vec<String> =
                        members.iter().map(|key| key.to_string()).collect();
                    println!(
                        "  Group {}: {}",
                        label,
                        if names.is_empty() {
                            "-".to_string()
                        } else {
                            names.join(", ")
                        }
                    );
                }
            }
            Directive::ShowAnnouncement {
                name,
                group,
                conflict,
            } => match conflict {
                Some(message) => println!("🔔 {}  (ok to close)", message),
                None => println!(
                    "🔔 {} -> group {}  (ok to confirm, no to cancel)",
                    name,
                    group.unwrap_or_default()
                ),
            },
            Directive::ShowValidationError(err) => println!("✗ {}", err),
        }
    }
}

fn print_pending(app: &App) {
    if app.pending().is_empty() {
        println!("(wheel is empty)");
        return;
    }
    for entry in app.pending() {
        println!("  {}  [{}]", entry.display_name, entry.style.background_color);
    }
}

fn print_groups(app: &App) {
    for (label, members) in app.engine().groups().iter() {
        let names: Vec<String> = members.iter().map(|key| key.to_string()).collect();
        println!(
            "  Group {}: {}",
            label,
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(", ")
            }
        );
    }
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  add <name>        add one name to the wheel");
    println!("  edit <a, b, c>    replace the whole list (comma separated)");
    println!("  list              show the wheel");
    println!("  spin              spin the wheel");
    println!("  ok / no           confirm or cancel the announcement");
    println!("  groups            show group membership");
    println!("  quit              leave");
    println!();
}

/// Group labels come from GROUP_LABELS (comma separated); default A-D
fn group_config_from_env() -> Result<GroupConfig> {
    match env::var("GROUP_LABELS") {
        Ok(raw) => GroupConfig::new(raw.split(',').map(str::trim).map(String::from)),
        Err(_) => GroupConfig::new(["A", "B", "C", "D"]),
    }
}

/// Sheet credentials and the CSV path are configuration, never compiled in
fn override_source_from_env() -> Option<OverrideSource> {
    if let Ok(path) = env::var("OVERRIDE_CSV") {
        return Some(OverrideSource::Csv(PathBuf::from(path)));
    }

    let sheet_id = env::var("OVERRIDE_SHEET_ID").ok()?;
    let api_key = env::var("OVERRIDE_API_KEY").ok()?;
    let range =
        env::var("OVERRIDE_SHEET_RANGE").unwrap_or_else(|_| DEFAULT_SHEET_RANGE.to_string());

    Some(OverrideSource::Sheet {
        sheet_id,
        api_key,
        range,
    })
}
