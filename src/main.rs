use clap::Parser;
use colored::Colorize;
use freightplan::config::Profile;
use freightplan::flight::FlightInstance;
use freightplan::report::{self, EventRow};
use freightplan::scenario::Scenario;
use freightplan::session::PlanningSession;
use freightplan::simulation::CancellationRecord;
use freightplan::time::Time;
use freightplan::logging;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::{Context, Editor, Helper, Highlighter, Hinter, Validator};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tabled::Tabled;
use tabled::settings::{Alignment, Style};

#[derive(Parser)]
struct Args {
    /// Path to the JSON scenario file
    #[arg(short, long, value_name = "FILE", default_value = "data/default.json")]
    scenario: PathBuf,
    /// Search effort preset, overrides the scenario's ants and iterations
    #[arg(short, long, value_enum)]
    profile: Option<Profile>,
    /// Seed of the route search
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct CompleteHelper {
    pub commands: Vec<String>,
}

impl Completer for CompleteHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, _pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.clone(),
                replacement: format!("{} ", cmd),
            })
            .collect();
        Ok((0, candidates))
    }
}

fn paginate(content: String) {
    let pager = Command::new("less")
        .arg("-R")
        .stdin(Stdio::piped())
        .spawn()
        // Fallback to 'more' if 'less' isn't available
        .or_else(|_| Command::new("more").stdin(Stdio::piped()).spawn());
    let Ok(mut pager) = pager else {
        println!("{}", content);
        return;
    };

    if let Some(mut stdin) = pager.stdin.take() {
        if let Err(e) = stdin.write_all(content.as_bytes()) {
            // Broken pipe is common if the user quits the pager early
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("Error writing to pager: {}", e);
            }
        }
    }

    // Wait for the user to close the pager before returning to the ">> " prompt
    let _ = pager.wait();
}

fn print_table<T: Tabled>(rows: &[T], empty: &str) {
    if rows.is_empty() {
        println!("{}", empty);
        return;
    }
    let mut table = tabled::Table::new(rows);
    table.with(Style::rounded());
    table.with(Alignment::left());
    if rows.len() > 20 {
        paginate(table.to_string());
    } else {
        println!("{}", table);
    }
}

fn parse_time(arg: Option<&&str>, usage: &str) -> Option<Time> {
    match arg.map(|s| s.parse::<Time>()) {
        Some(Ok(t)) => Some(t),
        Some(Err(e)) => {
            println!("{}", e.to_string().red());
            None
        }
        None => {
            println!("Usage: {}", usage);
            None
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let args = Args::parse();

    let mut scenario = Scenario::load_from_file(&args.scenario)?;
    if let Some(profile) = args.profile {
        scenario.params = scenario.params.with_profile(profile);
    }
    if let Some(seed) = args.seed {
        scenario.params = scenario.params.with_seed(seed);
    }
    let cancellations = std::mem::take(&mut scenario.cancellations);
    let mut session = PlanningSession::from_scenario(scenario)?;
    println!("Planner online. Loaded scenario from {}", args.scenario.display());

    let planned = session.plan();
    let assigned = planned.iter().map(|a| a.assigned).sum::<u32>();
    let pending = planned.iter().map(|a| a.pending).sum::<u32>();
    println!(
        "Planned {} shipments: {} units assigned, {} pending.",
        planned.len(),
        assigned.to_string().green(),
        if pending > 0 { pending.to_string().yellow() } else { pending.to_string().green() }
    );
    if !cancellations.is_empty() {
        let summary = session.apply_cancellations(&cancellations);
        println!(
            "Applied {} scenario cancellations, {} timeline events affected.",
            summary.cancelled.len(),
            summary.affected
        );
    }

    let config = rustyline::Config::builder()
        .history_ignore_space(true)
        .completion_type(rustyline::CompletionType::List)
        .build();

    let helper = CompleteHelper {
        commands: ["ls", "flights", "state", "events", "cancel", "replan", "help", "exit"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    };

    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(trimmed)?;

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                match parts[0] {
                    "ls" => {
                        let sub = parts.get(1).copied().unwrap_or("a");
                        let filtered = session
                            .assignments()
                            .iter()
                            .filter(|a| match sub {
                                "p" | "pending" => a.pending > 0,
                                "u" | "unassigned" => a.is_unassigned(),
                                _ => true, // 'ls' or 'ls a'
                            })
                            .cloned()
                            .collect::<Vec<_>>();
                        print_table(&report::rows(&filtered), "No matching shipments found.");
                    }
                    "flights" => {
                        let filtered: Vec<&FlightInstance> = session
                            .network()
                            .instances()
                            .iter()
                            .filter(|f| parts.get(1).is_none_or(|ap| *f.origin_id == **ap))
                            .collect();
                        print_table(&filtered, "No matching flights found.");
                    }
                    "state" => {
                        if let Some(t) = parse_time(parts.get(1), "state <YYYY-MM-DDTHH:MM>") {
                            let snapshot = session.state_at(t);
                            let (warehouses, flights) = report::load_rows(&snapshot);
                            println!(
                                "State at {}: {} goods in warehouses, {} in flight, {} cancelled legs.",
                                t,
                                warehouses.iter().map(|r| r.load).sum::<u32>(),
                                flights.iter().map(|r| r.load).sum::<u32>(),
                                snapshot.cancelled.len()
                            );
                            print_table(&warehouses, "No goods in any warehouse.");
                            print_table(&report::shipment_rows(&snapshot), "No shipments yet.");
                        }
                    }
                    "events" => {
                        let events = match (parts.get(1), parts.get(2)) {
                            (Some(_), Some(_)) => {
                                let usage = "events [FROM TO]";
                                match (parse_time(parts.get(1), usage), parse_time(parts.get(2), usage)) {
                                    (Some(from), Some(to)) => session.events_between(from, to),
                                    _ => continue,
                                }
                            }
                            _ => session.timeline().events().to_vec(),
                        };
                        let rows = events.iter().map(EventRow::from).collect::<Vec<_>>();
                        print_table(&rows, "No events in range.");
                    }
                    "cancel" => {
                        if parts.len() < 2 {
                            println!("Usage: cancel <dd.ORIG-DEST-HH:MM>...");
                            continue;
                        }
                        match parts[1..].iter().map(|r| r.parse::<CancellationRecord>()).collect::<Result<Vec<_>, _>>() {
                            Ok(records) => {
                                let summary = session.apply_cancellations(&records);
                                println!(
                                    "Cancelled {} legs, {} timeline events affected, timeline at version {}.",
                                    summary.cancelled.len().to_string().red(),
                                    summary.affected,
                                    summary.version
                                );
                                for r in &summary.unresolved {
                                    println!("{} {}", "No scheduled leg matches".yellow(), r);
                                }
                            }
                            Err(e) => println!("{}", e.to_string().red()),
                        }
                    }
                    "replan" => {
                        if let Some(now) = parse_time(parts.get(1), "replan <YYYY-MM-DDTHH:MM>") {
                            let summary = session.replan_pending(now);
                            println!(
                                "Replanned {} of {} stranded shipments, {} units still pending, timeline at version {}.",
                                summary.replanned.to_string().green(),
                                summary.stranded,
                                summary.pending,
                                summary.version
                            );
                            print_table(&report::rows(&summary.assignments), "Nothing was stranded.");
                        }
                    }
                    "help" | "?" => {
                        println!("\nAvailable Commands:");
                        println!("  ls [a|p|u]          - List planned routes: a - all, p - with pending units, u - unassigned");
                        println!("  flights [AIRPORT]   - List flight instances, optionally departing from AIRPORT");
                        println!("  state <t>           - Replay the timeline up to <t> (YYYY-MM-DDTHH:MM, UTC)");
                        println!("  events [<t> <t>]    - List timeline events, optionally from <t> (inclusive) to <t> (exclusive)");
                        println!("  cancel <rec>...     - Cancel legs given as dd.ORIG-DEST-HH:MM (origin local time)");
                        println!("  replan <t>          - Reroute goods stranded at <t>");
                        println!("  help / ?            - Show this help menu");
                        println!("  exit / quit         - Exit the planner\n");
                    }
                    "exit" | "quit" => break,
                    _ => println!("Unknown command: {}", parts[0]),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}
