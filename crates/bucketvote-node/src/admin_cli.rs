//! vote-admin CLI tool
//!
//! Operator access to a running vote node.
//!
//! Usage:
//!   vote-admin totals <session_key>
//!   vote-admin delete <session_key> <item_key>
//!   vote-admin ping

use bucketvote_node::admin_socket::{AdminCommand, AdminResponse};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

fn print_usage() {
    eprintln!("vote-admin - Inspect and manage bucket votes");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  vote-admin totals <session_key>             Show per-item totals");
    eprintln!("  vote-admin delete <session_key> <item_key>  Delete an item for all users");
    eprintln!("  vote-admin ping                             Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BUCKETVOTE_SOCKET  Path to admin socket (default: ./bucketvote-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("BUCKETVOTE_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./bucketvote-data/admin.sock"))
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to vote-node at {:?}: {}\n\
             Is the vote-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn require(args: &[String], count: usize, command: &str) -> Vec<String> {
    if args.len() < count + 2 {
        eprintln!("Error: {} requires {} argument(s)", command, count);
        print_usage();
        std::process::exit(1);
    }
    args[2..2 + count].to_vec()
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "totals" => {
            let rest = require(&args, 1, "totals");
            AdminCommand::Totals {
                session_key: rest[0].clone(),
            }
        }
        "delete" => {
            let rest = require(&args, 2, "delete");
            AdminCommand::DeleteItem {
                session_key: rest[0].clone(),
                item_key: rest[1].clone(),
            }
        }
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::Totals { items } => {
                if items.is_empty() {
                    println!("(no votes)");
                } else {
                    for item in items {
                        println!("{}\t{}", item.item_key, item.total);
                    }
                }
            }
            AdminResponse::Pong => {
                println!("pong - vote-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
